//! Document walk: collects directive payloads and required-field lists.
//!
//! The walk descends the node tree carrying the schema path of the current
//! container. Fields of a mapping live at `<path>.properties.<key>`, or at
//! `<path>.items.properties.<key>` when the mapping is an item of the
//! sequence described by `<path>`.
//!
//! Decode problems do not stop the walk; they are collected and surfaced
//! afterwards so every bad annotation in a file is reported at once.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::directive::{match_directive, parse_flag, Directive, FlagKind};
use crate::error::{AnnotateError, AnnotationError};
use crate::node::{Node, NodeKind};
use crate::path::SchemaPath;
use crate::types::DIRECTIVE_PREFIX;

/// Field names that belong in each object's `required` array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequiredCollector {
    entries: BTreeMap<SchemaPath, Vec<String>>,
}

impl RequiredCollector {
    /// Record a `required`/`optional` declaration for `field` of `object`.
    ///
    /// | Flag | Value | Effect |
    /// |------|-------|--------|
    /// | `required` | true | append |
    /// | `required` | false | none |
    /// | `optional` | true | none |
    /// | `optional` | false | append |
    ///
    /// Names accumulate in discovery order without de-duplication.
    ///
    /// # Errors
    ///
    /// Returns `AnnotationError::RequiredValueParse` if `value` is neither a
    /// boolean nor a boolean string. `target` and `line` locate the annotated
    /// field in the error.
    pub fn append(
        &mut self,
        value: &Value,
        kind: FlagKind,
        object: &SchemaPath,
        field: &str,
        target: &SchemaPath,
        line: usize,
    ) -> Result<(), AnnotationError> {
        let Some(flag) = parse_flag(value) else {
            return Err(AnnotationError::RequiredValueParse {
                path: target.to_string(),
                line,
                key: kind.key(),
                value: value.to_string(),
            });
        };

        if kind.marks_required(flag) {
            self.entries
                .entry(object.clone())
                .or_default()
                .push(field.to_string());
        }
        Ok(())
    }

    pub fn entries(&self) -> &BTreeMap<SchemaPath, Vec<String>> {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A `required`/`optional` flag that has no parent object to apply to.
#[derive(Debug, Clone, PartialEq)]
pub struct IgnoredFlag {
    pub path: SchemaPath,
    pub line: usize,
    pub key: &'static str,
}

/// Everything collected from one document.
#[derive(Debug, Default)]
pub struct Annotations {
    /// Directive schema fragments keyed by field path. A later annotation
    /// resolving to the same path replaces the earlier one.
    pub patches: BTreeMap<SchemaPath, Map<String, Value>>,
    pub required: RequiredCollector,
    pub errors: Vec<AnnotationError>,
    /// Flags on sequence items, which have no field name.
    pub ignored: Vec<IgnoredFlag>,
}

impl Annotations {
    /// Walk a document tree from its root.
    pub fn collect(root: &Node) -> Self {
        let mut annotations = Self::default();
        annotations.walk(root, &SchemaPath::root(), false);
        debug!(
            patches = annotations.patches.len(),
            required = annotations.required.entries().len(),
            errors = annotations.errors.len(),
            "document walk complete"
        );
        annotations
    }

    /// Fail with every collected annotation error, if any.
    pub fn into_result(self) -> Result<Self, AnnotateError> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(AnnotateError::Annotations {
                errors: self.errors,
            })
        }
    }

    /// Visit the children of `node`.
    ///
    /// `path` is the schema of the container; `in_sequence` means `node` is
    /// an item of the sequence described by `path`.
    pub fn walk(&mut self, node: &Node, path: &SchemaPath, in_sequence: bool) {
        match node.kind {
            NodeKind::Mapping => {
                let object = path.object(in_sequence);
                for pair in node.children.chunks(2) {
                    let [key, value] = pair else {
                        continue;
                    };
                    let field = path.field(&key.value, in_sequence);

                    for annotated in [key, value] {
                        self.record(annotated, &field, Some((&object, key.value.as_str())));
                    }
                    self.descend(value, &field);
                }
            }
            NodeKind::Sequence => {
                let items = path.items();
                for item in &node.children {
                    self.record(item, &items, None);
                    match item.kind {
                        NodeKind::Mapping => self.walk(item, path, true),
                        NodeKind::Sequence => self.walk(item, &items, false),
                        NodeKind::Scalar => {}
                    }
                }
            }
            NodeKind::Scalar => {}
        }
    }

    fn descend(&mut self, value: &Node, field: &SchemaPath) {
        if value.has_children() {
            self.walk(value, field, false);
        }
    }

    /// Record the directive in `node`'s comment, if any, against `target`.
    /// `parent` is the object holding the field and the field's name.
    fn record(&mut self, node: &Node, target: &SchemaPath, parent: Option<(&SchemaPath, &str)>) {
        if !node.comment.contains(DIRECTIVE_PREFIX) {
            return;
        }
        let Some(fragment) = match_directive(&node.comment) else {
            debug!(line = node.line, comment = %node.comment, "comment mentions @jsonSchema without a directive");
            return;
        };

        let directive = match Directive::decode(fragment) {
            Ok(directive) => directive,
            Err(source) => {
                self.errors.push(AnnotationError::DirectiveDecode {
                    path: target.to_string(),
                    line: node.line,
                    comment: node.comment.clone(),
                    source,
                });
                return;
            }
        };

        debug!(path = %target, line = node.line, "recorded annotation");

        for (kind, value) in directive.flags() {
            match parent {
                Some((object, field)) => {
                    if let Err(err) =
                        self.required
                            .append(value, kind, object, field, target, node.line)
                    {
                        self.errors.push(err);
                    }
                }
                None => {
                    warn!(path = %target, line = node.line, key = kind.key(), "flag on a sequence item ignored");
                    self.ignored.push(IgnoredFlag {
                        path: target.clone(),
                        line: node.line,
                        key: kind.key(),
                    });
                }
            }
        }

        if self
            .patches
            .insert(target.clone(), directive.schema)
            .is_some()
        {
            warn!(path = %target, line = node.line, "annotation replaces an earlier one for the same path");
        }
    }
}
