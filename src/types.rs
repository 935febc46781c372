//! Core types and constants for schema generation.

use serde_json::Value;

/// Marker that identifies an annotation comment.
pub const DIRECTIVE_PREFIX: &str = "@jsonSchema";

/// Dialect written to `$schema` in every produced document.
pub const DEFAULT_SCHEMA_URL: &str = "https://json-schema.org/draft/2019-09/schema";

/// Reserved directive keys that control the parent's `required` array.
pub const REQUIRED_KEY: &str = "required";
pub const OPTIONAL_KEY: &str = "optional";

/// Options for schema generation.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// URI forced into the output's `$schema`.
    pub schema_url: String,
    /// When true, a `required` directive whose parent object is missing
    /// from the baseline schema is an error instead of being dropped.
    pub strict: bool,
    /// Keep repeated names in `required` arrays instead of de-duplicating.
    pub keep_duplicates: bool,
    /// Compile the final document as a JSON Schema before returning it.
    pub check: bool,
    /// Document merged over the patched schema with RFC 7396 semantics.
    pub override_doc: Option<Value>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerateOptions {
    /// Create options targeting the default draft, non-strict, de-duplicating.
    pub fn new() -> Self {
        Self {
            schema_url: DEFAULT_SCHEMA_URL.to_string(),
            strict: false,
            keep_duplicates: false,
            check: false,
            override_doc: None,
        }
    }

    /// Set the `$schema` dialect URI.
    pub fn schema_url(mut self, url: impl Into<String>) -> Self {
        self.schema_url = url.into();
        self
    }

    /// Fail on required-field patches that target a missing object.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn keep_duplicates(mut self, keep: bool) -> Self {
        self.keep_duplicates = keep;
        self
    }

    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    /// Merge-patch applied after the in-tree annotations.
    pub fn override_doc(mut self, doc: Value) -> Self {
        self.override_doc = Some(doc);
        self
    }
}
