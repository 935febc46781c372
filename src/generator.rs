//! Baseline schema generation.
//!
//! The baseline is produced from the document's data alone, before any
//! annotation is applied. [`InferredSchema`] derives it from value shapes;
//! callers with another generator implement [`SchemaGenerator`].

use serde_json::{Map, Value};

use crate::error::AnnotateError;

/// Produces a baseline JSON Schema from a data value.
pub trait SchemaGenerator {
    /// Generate the baseline schema. The result must carry a `$schema`
    /// key, which the patch set replaces.
    fn generate(&self, data: &Value) -> Result<Value, AnnotateError>;
}

/// Shape-inferring generator.
///
/// Objects list every property and integers are distinguished from other
/// numbers. Array items are described by one schema merged from every
/// element: properties are unioned and differing types become a type list.
#[derive(Debug, Clone)]
pub struct InferredSchema {
    /// `$schema` written by the generator. Replaced by the configured
    /// dialect when patches are applied.
    pub dialect: String,
}

impl Default for InferredSchema {
    fn default() -> Self {
        Self {
            dialect: "http://json-schema.org/schema#".to_string(),
        }
    }
}

impl SchemaGenerator for InferredSchema {
    fn generate(&self, data: &Value) -> Result<Value, AnnotateError> {
        let mut schema = Map::new();
        schema.insert("$schema".to_string(), Value::String(self.dialect.clone()));
        schema.extend(infer(data));
        Ok(Value::Object(schema))
    }
}

fn typed(name: &str) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".to_string(), Value::String(name.to_string()));
    schema
}

fn infer(value: &Value) -> Map<String, Value> {
    match value {
        Value::Null => typed("null"),
        Value::Bool(_) => typed("boolean"),
        Value::Number(n) if n.is_i64() || n.is_u64() => typed("integer"),
        Value::Number(_) => typed("number"),
        Value::String(_) => typed("string"),
        Value::Array(items) => {
            let mut schema = typed("array");
            if let Some(merged) = items.iter().map(infer).reduce(merge) {
                schema.insert("items".to_string(), Value::Object(merged));
            }
            schema
        }
        Value::Object(map) => {
            let properties: Map<String, Value> = map
                .iter()
                .map(|(key, value)| (key.clone(), Value::Object(infer(value))))
                .collect();
            let mut schema = typed("object");
            schema.insert("properties".to_string(), Value::Object(properties));
            schema
        }
    }
}

/// Combine two inferred schemas so both values validate against the result.
fn merge(mut base: Map<String, Value>, other: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in other {
        if key == "type" {
            let merged = merge_types(base.get("type"), &value);
            base.insert(key, merged);
        } else if key == "properties" {
            let Value::Object(incoming) = value else {
                continue;
            };
            let slot = base.entry(key).or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(properties) = slot {
                for (name, schema) in incoming {
                    merge_into(properties, name, schema);
                }
            }
        } else {
            merge_into(&mut base, key, value);
        }
    }
    base
}

/// Merge `schema` into the entry `name` of `map`, inserting it if absent.
fn merge_into(map: &mut Map<String, Value>, name: String, schema: Value) {
    if !map.contains_key(&name) {
        map.insert(name, schema);
        return;
    }
    if let (Some(Value::Object(existing)), Value::Object(incoming)) = (map.get_mut(&name), schema) {
        let previous = std::mem::take(existing);
        *existing = merge(previous, incoming);
    }
}

/// Union of type names in first-seen order. `integer` folds into `number`.
fn merge_types(existing: Option<&Value>, incoming: &Value) -> Value {
    let mut names: Vec<&str> = Vec::new();
    for value in existing.into_iter().chain([incoming]) {
        let listed = match value {
            Value::String(name) => vec![name.as_str()],
            Value::Array(list) => list.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        for name in listed {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    if names.contains(&"number") {
        names.retain(|name| *name != "integer");
    }

    match names.as_slice() {
        [single] => Value::String((*single).to_string()),
        _ => Value::Array(names.into_iter().map(|n| Value::String(n.to_string())).collect()),
    }
}
