//! Schema locations for annotated fields.
//!
//! A [`SchemaPath`] is the list of keys leading from the schema root to the
//! schema of a field, e.g. `properties / a / items / properties / b`. It
//! renders both as a JSON Pointer (for patch operations) and as a dot-path
//! (for logs and lookups).

use std::fmt;

use serde_json::Value;

const PROPERTIES: &str = "properties";
const ITEMS: &str = "items";

/// Location of a schema object inside the generated schema document.
///
/// Ordering is lexicographic by segment, so an object always sorts before
/// any of its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaPath(Vec<String>);

impl SchemaPath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Schema of field `name` of the object described at this path.
    ///
    /// When `in_sequence` is true this path describes a sequence and the
    /// field belongs to its item objects (`items.properties.<name>`).
    pub fn field(&self, name: &str, in_sequence: bool) -> Self {
        let mut segments = self.0.clone();
        if in_sequence {
            segments.push(ITEMS.to_string());
        }
        segments.push(PROPERTIES.to_string());
        segments.push(name.to_string());
        Self(segments)
    }

    /// Schema of the items of the sequence described at this path.
    pub fn items(&self) -> Self {
        let mut segments = self.0.clone();
        segments.push(ITEMS.to_string());
        Self(segments)
    }

    /// Object schema whose `properties` hold the fields walked with
    /// `(self, in_sequence)`.
    pub fn object(&self, in_sequence: bool) -> Self {
        if in_sequence {
            self.items()
        } else {
            self.clone()
        }
    }

    /// RFC 6901 JSON Pointer. The root is the empty string.
    pub fn pointer(&self) -> String {
        self.0
            .iter()
            .map(|s| format!("/{}", s.replace('~', "~0").replace('/', "~1")))
            .collect()
    }

    /// Dot-joined segments, e.g. `properties.a.properties.b`.
    pub fn dot_path(&self) -> String {
        self.0.join(".")
    }

    pub fn lookup<'v>(&self, schema: &'v Value) -> Option<&'v Value> {
        self.0.iter().try_fold(schema, |node, key| node.get(key.as_str()))
    }

    pub fn lookup_mut<'v>(&self, schema: &'v mut Value) -> Option<&'v mut Value> {
        self.0
            .iter()
            .try_fold(schema, |node, key| node.get_mut(key.as_str()))
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("/")
        } else {
            f.write_str(&self.pointer())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_field() {
        let path = SchemaPath::root().field("name", false);
        assert_eq!(path.pointer(), "/properties/name");
        assert_eq!(path.dot_path(), "properties.name");
    }

    #[test]
    fn nested_field() {
        let path = SchemaPath::root().field("a", false).field("b", false);
        assert_eq!(path.pointer(), "/properties/a/properties/b");
    }

    #[test]
    fn sequence_item_field() {
        let path = SchemaPath::root().field("items", false).field("name", true);
        assert_eq!(path.pointer(), "/properties/items/items/properties/name");
        assert_eq!(path.dot_path(), "properties.items.items.properties.name");
    }

    #[test]
    fn pointer_escapes_segments() {
        let path = SchemaPath::root().field("a/b~c", false);
        assert_eq!(path.pointer(), "/properties/a~1b~0c");
        assert_eq!(path.dot_path(), "properties.a/b~c");
    }

    #[test]
    fn root_renders_empty_pointer() {
        assert_eq!(SchemaPath::root().pointer(), "");
        assert_eq!(SchemaPath::root().to_string(), "/");
    }

    #[test]
    fn parents_sort_before_children() {
        let parent = SchemaPath::root().field("a", false);
        let child = parent.field("b", false);
        let sibling = SchemaPath::root().field("b", false);
        let mut paths = vec![child.clone(), sibling.clone(), parent.clone()];
        paths.sort();
        assert_eq!(paths, [parent, child, sibling]);
    }

    #[test]
    fn lookup_follows_segments() {
        let schema = json!({
            "properties": {
                "a": { "type": "object", "properties": { "b": { "type": "string" } } }
            }
        });
        let path = SchemaPath::root().field("a", false).field("b", false);
        assert_eq!(path.lookup(&schema), Some(&json!({"type": "string"})));
        assert_eq!(SchemaPath::root().field("zzz", false).lookup(&schema), None);

        let mut schema = schema;
        if let Some(Value::Object(map)) = path.lookup_mut(&mut schema) {
            map.insert("minLength".into(), json!(1));
        }
        assert_eq!(schema["properties"]["a"]["properties"]["b"]["minLength"], 1);
    }

    #[test]
    fn object_path() {
        let seq = SchemaPath::root().field("list", false);
        assert_eq!(seq.object(true).pointer(), "/properties/list/items");
        assert_eq!(seq.object(false), seq);
    }
}
