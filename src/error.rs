//! Error types for schema generation and annotation processing.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors during schema generation.
#[derive(Debug, Error)]
pub enum AnnotateError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("line {line}: unsupported document structure: {message}")]
    InvalidDocument { line: usize, message: String },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Annotation and patch errors (exit code 2)
    #[error("{} invalid annotation(s): {}", errors.len(), first_message(errors))]
    Annotations { errors: Vec<AnnotationError> },

    #[error("failed to assemble patch: {message}")]
    PatchAssembly { message: String },

    #[error("failed to apply patch: {message}")]
    PatchApply { message: String },

    #[error("failed to merge override document: {message}")]
    Merge { message: String },

    #[error("produced schema is invalid: {message}")]
    InvalidSchema { message: String },

    #[error("generation task failed: {message}")]
    TaskFailed { message: String },

    #[error("generation did not finish within {timeout:?}")]
    TimedOut { timeout: Duration },
}

fn first_message(errors: &[AnnotationError]) -> String {
    errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_default()
}

/// A problem with a single annotated node, collected while walking the document.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("line {line}: invalid @jsonSchema directive at {path}: {source} (comment: {comment})")]
    DirectiveDecode {
        /// JSON Pointer of the annotated field.
        path: String,
        line: usize,
        comment: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: invalid \"{key}\" value {value} at {path}: expected a boolean")]
    RequiredValueParse {
        path: String,
        line: usize,
        /// Either `required` or `optional`.
        key: &'static str,
        value: String,
    },
}

impl AnnotationError {
    /// Source line (1-based) of the annotated node.
    pub fn line(&self) -> usize {
        match self {
            Self::DirectiveDecode { line, .. } | Self::RequiredValueParse { line, .. } => *line,
        }
    }

    /// JSON Pointer of the annotated field.
    pub fn path(&self) -> &str {
        match self {
            Self::DirectiveDecode { path, .. } | Self::RequiredValueParse { path, .. } => path,
        }
    }
}

impl AnnotateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            AnnotateError::FileNotFound { .. }
            | AnnotateError::ReadError { .. }
            | AnnotateError::WriteError { .. } => 3,
            #[cfg(feature = "remote")]
            AnnotateError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}
