//! Values Schema Generator
//!
//! Builds a JSON Schema for a YAML values document from `@jsonSchema`
//! annotations written as trailing comments.
//!
//! A baseline schema is inferred from the document's data. Each annotation
//! is then turned into an RFC 6902 patch against that baseline, and the
//! patched result can be combined with an RFC 7396 override document.
//!
//! # Example
//!
//! ```
//! use values_schema::{generate_with, GenerateOptions, InferredSchema};
//! use serde_json::json;
//!
//! let source = r#"
//! image:
//!   repository: nginx # @jsonSchema: {"minLength": 1, "required": true}
//!   tag: latest # @jsonSchema: {"pattern": "^[a-z0-9.]+$"}
//! replicas: 2 # @jsonSchema: {"minimum": 1}
//! "#;
//!
//! let generated = generate_with(source, &InferredSchema::default(), &GenerateOptions::new()).unwrap();
//! let schema = &generated.schema;
//!
//! assert_eq!(schema["properties"]["replicas"]["minimum"], json!(1));
//! assert_eq!(schema["properties"]["image"]["required"], json!(["repository"]));
//! ```
//!
//! # Annotation Format
//!
//! Any JSON object after `@jsonSchema:` is merged into the schema of the
//! annotated field:
//! ```yaml
//! port: 8080 # @jsonSchema: {"minimum": 1, "maximum": 65535}
//! ```
//!
//! Two reserved keys control the parent object's `required` array instead:
//!
//! | Key | Value | Effect on parent `required` |
//! |-----|-------|-----------------------------|
//! | `required` | `true` | Add field |
//! | `required` | `false` | None |
//! | `optional` | `true` | None |
//! | `optional` | `false` | Add field |
//!
//! Values may be booleans or boolean strings (`"true"`, `"F"`, `"1"`, ...).
//!
//! # Placement
//!
//! | Source | Annotated schema |
//! |--------|------------------|
//! | `key: value # ...` | `/properties/key` |
//! | `key: # ...` with a nested block | `/properties/key` |
//! | `- value # ...` in sequence `key` | `/properties/key/items` |
//! | `- # ...` before a mapping item | first field of the item, under `items/properties` |

mod applier;
mod assembler;
mod directive;
mod error;
mod generator;
mod linter;
mod loader;
mod node;
mod path;
mod pipeline;
mod types;
mod walker;

pub use applier::{apply_patches, check_schema, merge_override, parse_override, to_pretty};
pub use assembler::{assemble, deep_merge, to_json_patch, OpKind, PatchOperation};
pub use directive::{match_directive, parse_flag, Directive, FlagKind};
pub use error::{AnnotateError, AnnotationError};
pub use generator::{InferredSchema, SchemaGenerator};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{is_url, load_document, load_json, load_override, read_source, write_output};
pub use node::{parse_tree, Document, Node, NodeKind};
pub use path::SchemaPath;
pub use pipeline::{generate, generate_with, patch_set, spawn, spawn_with, Generated, Pending};
pub use types::{GenerateOptions, DEFAULT_SCHEMA_URL, DIRECTIVE_PREFIX, OPTIONAL_KEY, REQUIRED_KEY};
pub use walker::{Annotations, IgnoredFlag, RequiredCollector};

#[cfg(feature = "remote")]
pub use loader::fetch_url;
