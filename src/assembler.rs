//! Patch assembly - turns collected annotations into RFC 6902 operations.
//!
//! The patch set always starts by forcing `$schema`, followed by one `add`
//! per object with required fields and then one `replace` per annotated
//! field. Within each group, paths are ordered so parents come before their
//! children.
//!
//! Every operation is staged onto a working copy of the baseline as it is
//! emitted, and payloads are built from that copy. An operation therefore
//! never drops what an earlier one wrote, and applying the whole set to the
//! baseline reproduces the staged document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::AnnotateError;
use crate::path::SchemaPath;
use crate::types::{GenerateOptions, REQUIRED_KEY};
use crate::walker::Annotations;

/// JSON Patch operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Replace,
    Remove,
    Add,
}

/// A single JSON Patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: OpKind,
    /// JSON Pointer (RFC 6901) of the target.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: OpKind::Replace,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: OpKind::Add,
            path: path.into(),
            value: Some(value),
        }
    }
}

/// Assemble the ordered patch set for `annotations` against `baseline`.
///
/// Required-field lists are de-duplicated unless `options.keep_duplicates`
/// is set. A required list whose object is missing from the baseline is
/// dropped with a warning, or rejected when `options.strict` is set.
///
/// # Errors
///
/// Returns `AnnotateError::PatchAssembly` for a missing required target in
/// strict mode.
pub fn assemble(
    baseline: &Value,
    annotations: &Annotations,
    options: &GenerateOptions,
) -> Result<Vec<PatchOperation>, AnnotateError> {
    let mut staged = baseline.clone();
    let mut operations = Vec::new();

    let dialect = Value::String(options.schema_url.clone());
    if let Some(slot) = staged.get_mut("$schema") {
        *slot = dialect.clone();
    }
    operations.push(PatchOperation::replace("/$schema", dialect));

    for (object, names) in annotations.required.entries() {
        let names = if options.keep_duplicates {
            names.clone()
        } else {
            dedupe(names)
        };

        let merged = match object.lookup(&staged) {
            Some(Value::Object(map)) if !map.is_empty() => {
                let mut merged = map.clone();
                merged.insert(
                    REQUIRED_KEY.to_string(),
                    Value::Array(names.into_iter().map(Value::String).collect()),
                );
                Value::Object(merged)
            }
            _ if options.strict => {
                return Err(AnnotateError::PatchAssembly {
                    message: format!(
                        "required fields [{}] target {}, which is not an object in the baseline schema",
                        names.join(", "),
                        object
                    ),
                });
            }
            _ => {
                warn!(path = %object, fields = ?names, "required fields dropped: object not in baseline schema");
                continue;
            }
        };

        debug!(path = %object, "add required");
        stage(&mut staged, object, &merged);
        operations.push(PatchOperation::add(object.pointer(), merged));
    }

    for (target, fragment) in &annotations.patches {
        if fragment.is_empty() {
            debug!(path = %target, "annotation has no schema keywords");
            continue;
        }

        let value = match target.lookup(&staged) {
            Some(existing @ Value::Object(map)) if !map.is_empty() => {
                let mut merged = existing.clone();
                deep_merge(&mut merged, fragment);
                merged
            }
            _ => Value::Object(fragment.clone()),
        };

        debug!(path = %target, "replace annotated schema");
        stage(&mut staged, target, &value);
        operations.push(PatchOperation::replace(target.pointer(), value));
    }

    info!(
        operations = operations.len(),
        required = annotations.required.entries().len(),
        annotations = annotations.patches.len(),
        "assembled patch"
    );
    Ok(operations)
}

/// Convert operations into a decoded `json_patch::Patch`.
///
/// # Errors
///
/// Returns `AnnotateError::PatchAssembly` if the operations do not form a
/// valid JSON Patch document.
pub fn to_json_patch(operations: &[PatchOperation]) -> Result<json_patch::Patch, AnnotateError> {
    let encoded = serde_json::to_value(operations).map_err(|e| AnnotateError::PatchAssembly {
        message: e.to_string(),
    })?;
    serde_json::from_value(encoded).map_err(|e| AnnotateError::PatchAssembly {
        message: e.to_string(),
    })
}

/// Merge `overlay` into `base`. Nested objects merge key by key; any other
/// value in `overlay` replaces the one in `base`.
pub fn deep_merge(base: &mut Value, overlay: &Map<String, Value>) {
    let Value::Object(map) = base else {
        *base = Value::Object(overlay.clone());
        return;
    };

    for (key, value) in overlay {
        let both_objects = value.is_object() && matches!(map.get(key), Some(Value::Object(_)));
        match (both_objects, value) {
            (true, Value::Object(inner)) => {
                if let Some(existing) = map.get_mut(key) {
                    deep_merge(existing, inner);
                }
            }
            _ => {
                map.insert(key.clone(), value.clone());
            }
        }
    }
}

fn stage(staged: &mut Value, path: &SchemaPath, value: &Value) {
    if let Some(slot) = path.lookup_mut(staged) {
        *slot = value.clone();
    }
}

fn dedupe(names: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !unique.contains(name) {
            unique.push(name.clone());
        }
    }
    unique
}
