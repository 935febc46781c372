//! Input loading from files and HTTP URLs.

use std::path::Path;

use serde_json::Value;

use crate::applier::parse_override;
use crate::error::AnnotateError;
use crate::node::Document;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Read a file to a string.
///
/// # Errors
///
/// Returns `AnnotateError::FileNotFound` if the file doesn't exist,
/// or `AnnotateError::ReadError` if it cannot be read.
pub fn read_source(path: &Path) -> Result<String, AnnotateError> {
    if !path.exists() {
        return Err(AnnotateError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| AnnotateError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Load an annotated YAML document from a file path.
pub fn load_document(path: &Path) -> Result<Document, AnnotateError> {
    let content = read_source(path)?;
    Document::parse(&content)
}

/// Load a JSON document (e.g. a pre-generated baseline schema) from a file path.
///
/// # Errors
///
/// Returns `AnnotateError::InvalidJson` if the file isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, AnnotateError> {
    let content = read_source(path)?;
    serde_json::from_str(&content).map_err(|source| AnnotateError::InvalidJson { source })
}

/// Fetch a document body from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `AnnotateError::NetworkError` if the request fails or the server
/// answers with an error status.
#[cfg(feature = "remote")]
pub fn fetch_url(url: &str) -> Result<String, AnnotateError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| AnnotateError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .map_err(|source| AnnotateError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    // Check for HTTP errors before reading the body
    let response = response
        .error_for_status()
        .map_err(|source| AnnotateError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    response.text().map_err(|source| AnnotateError::NetworkError {
        url: url.to_string(),
        source,
    })
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load an override document from a file path or URL.
///
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns IO errors for the source and `AnnotateError::Merge` if the
/// content is not a JSON object.
pub fn load_override(source: &str) -> Result<Value, AnnotateError> {
    let content = if is_url(source) {
        #[cfg(feature = "remote")]
        {
            fetch_url(source)?
        }
        #[cfg(not(feature = "remote"))]
        {
            return Err(AnnotateError::FileNotFound {
                path: std::path::PathBuf::from(source),
            });
        }
    } else {
        read_source(Path::new(source))?
    };
    parse_override(&content)
}

/// Write output, creating parent directories as needed.
///
/// # Errors
///
/// Returns `AnnotateError::WriteError` if the file cannot be written.
pub fn write_output(path: &Path, contents: &str) -> Result<(), AnnotateError> {
    let write_err = |source| AnnotateError::WriteError {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, contents).map_err(write_err)
}
