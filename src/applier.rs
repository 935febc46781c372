//! Patch application, override merging and output rendering.

use serde_json::Value;

use crate::assembler::{to_json_patch, PatchOperation};
use crate::error::AnnotateError;

/// Apply operations in order to a copy of `baseline`.
///
/// Uses RFC 6902 semantics: `replace` requires the target to exist, `add`
/// creates or overwrites it. The baseline is left untouched on failure.
///
/// # Errors
///
/// Returns `AnnotateError::PatchApply` if an operation cannot be applied,
/// e.g. a `replace` whose path is absent from the baseline.
pub fn apply_patches(baseline: &Value, operations: &[PatchOperation]) -> Result<Value, AnnotateError> {
    let patch = to_json_patch(operations)?;
    let mut doc = baseline.clone();
    json_patch::patch(&mut doc, &patch).map_err(|e| AnnotateError::PatchApply {
        message: e.to_string(),
    })?;
    Ok(doc)
}

/// Parse an override document.
///
/// # Errors
///
/// Returns `AnnotateError::Merge` if the content is not a JSON object.
pub fn parse_override(content: &str) -> Result<Value, AnnotateError> {
    let doc: Value = serde_json::from_str(content).map_err(|e| AnnotateError::Merge {
        message: e.to_string(),
    })?;
    if !doc.is_object() {
        return Err(AnnotateError::Merge {
            message: "override document must be a JSON object".to_string(),
        });
    }
    Ok(doc)
}

/// Fold an override document into `doc` with RFC 7396 merge-patch semantics:
/// objects merge recursively, `null` deletes a key, anything else replaces.
///
/// # Errors
///
/// Returns `AnnotateError::Merge` if the override is not a JSON object.
pub fn merge_override(doc: &mut Value, override_doc: &Value) -> Result<(), AnnotateError> {
    if !override_doc.is_object() {
        return Err(AnnotateError::Merge {
            message: "override document must be a JSON object".to_string(),
        });
    }
    json_patch::merge(doc, override_doc);
    Ok(())
}

/// Compile `schema` to confirm it is a valid JSON Schema.
pub fn check_schema(schema: &Value) -> Result<(), AnnotateError> {
    jsonschema::validator_for(schema)
        .map(|_| ())
        .map_err(|e| AnnotateError::InvalidSchema {
            message: e.to_string(),
        })
}

/// Render a document with two-space indentation and a trailing newline.
pub fn to_pretty(doc: &Value) -> Result<String, AnnotateError> {
    let mut rendered =
        serde_json::to_string_pretty(doc).map_err(|source| AnnotateError::InvalidJson { source })?;
    rendered.push('\n');
    Ok(rendered)
}
