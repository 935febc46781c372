//! Annotation linting - static analysis of annotated values files.
//!
//! Checks YAML files for:
//! - syntax errors and unsupported structures
//! - `@jsonSchema` directives whose payload is not a JSON object
//! - `required`/`optional` values that are not booleans
//! - flags on sequence items, which have no parent field to mark

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{AnnotateError, AnnotationError};
use crate::loader::load_document;
use crate::walker::Annotations;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// 1-based source line, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Schema pointer of the annotated field (e.g., "/properties/image/properties/tag")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .yaml and .yml files.
/// If `strict` is true, warnings are treated as errors.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_values_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        for diagnostic in &file_result.diagnostics {
            match diagnostic.severity {
                Severity::Error => total_errors += 1,
                Severity::Warning => total_warnings += 1,
            }
        }
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single values file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();
    let display = file.strip_prefix(base_path).unwrap_or(file).to_path_buf();

    let doc = match load_document(file) {
        Ok(doc) => doc,
        Err(e) => {
            let line = match &e {
                AnnotateError::InvalidDocument { line, .. } => Some(*line),
                AnnotateError::InvalidYaml { source } => source.location().map(|l| l.line()),
                _ => None,
            };
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "E001".to_string(),
                file: file.to_path_buf(),
                line,
                path: "/".to_string(),
                message: format!("syntax error: {}", e),
            });
            return FileResult {
                file: display,
                status: FileStatus::Error,
                diagnostics,
            };
        }
    };

    let annotations = Annotations::collect(&doc.root);

    for error in &annotations.errors {
        let (code, message) = match error {
            AnnotationError::DirectiveDecode { source, .. } => {
                ("E002", format!("directive is not a JSON object: {}", source))
            }
            AnnotationError::RequiredValueParse { key, value, .. } => (
                "E003",
                format!("invalid \"{}\" value {}: expected a boolean", key, value),
            ),
        };
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            code: code.to_string(),
            file: file.to_path_buf(),
            line: Some(error.line()),
            path: error.path().to_string(),
            message,
        });
    }

    for ignored in &annotations.ignored {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            code: "W001".to_string(),
            file: file.to_path_buf(),
            line: Some(ignored.line),
            path: ignored.path.to_string(),
            message: format!(
                "\"{}\" on a sequence item has no effect: items have no field name",
                ignored.key
            ),
        });
    }

    diagnostics.sort_by_key(|d| d.line);

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: display,
        status,
        diagnostics,
    }
}

fn is_values_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

/// Collect all YAML files in a path (file or directory).
fn collect_values_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if is_values_file(path) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if is_values_file(&path) {
            files.push(path);
        }
    }
}
