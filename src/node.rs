//! Comment-preserving document tree.
//!
//! `serde_yaml` discards comments, so the annotated tree is rebuilt from the
//! block structure of the source text. The data itself (used for the
//! baseline schema) still comes from `serde_yaml`, which also rejects
//! syntactically invalid input before the outline is built.
//!
//! Mapping nodes hold their children interleaved as `key, value, key, value`;
//! sequence nodes hold their items. Trailing comments attach as follows:
//!
//! | Source | Comment attaches to |
//! |--------|---------------------|
//! | `key: value # c` | value node |
//! | `key: # c` (block value follows) | key node |
//! | `- value # c` | the item |
//! | `- # c` (block item follows) | first key of the item, or the item itself |

use serde_json::{Map, Value};

use crate::error::AnnotateError;

/// Structural kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    Mapping,
    Sequence,
}

/// A node of the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Scalar text with quotes removed. Empty for block collections;
    /// flow collections keep their raw text.
    pub value: String,
    /// Trailing comment including the leading `#`, or empty.
    pub comment: String,
    /// 1-based source line.
    pub line: usize,
    pub children: Vec<Node>,
}

impl Node {
    fn new(kind: NodeKind, value: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            comment: String::new(),
            line,
            children: Vec::new(),
        }
    }

    /// True for mappings and sequences that have block children.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_mapping(&self) -> bool {
        self.kind == NodeKind::Mapping
    }

    pub fn is_sequence(&self) -> bool {
        self.kind == NodeKind::Sequence
    }
}

/// A loaded document: the annotated tree plus its data.
#[derive(Debug, Clone)]
pub struct Document {
    pub root: Node,
    /// The document's data with comments ignored. An empty document is `{}`.
    pub data: Value,
}

impl Document {
    /// Parse YAML source into a tree and a data value.
    ///
    /// # Errors
    ///
    /// Returns `AnnotateError::InvalidYaml` on syntax errors and
    /// `AnnotateError::InvalidDocument` for structures the outline
    /// does not support (complex keys, tab indentation).
    pub fn parse(source: &str) -> Result<Self, AnnotateError> {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(source).map_err(|source| AnnotateError::InvalidYaml { source })?;
        let mut data =
            serde_json::to_value(yaml).map_err(|source| AnnotateError::InvalidJson { source })?;
        if data.is_null() {
            data = Value::Object(Map::new());
        }

        let root = parse_tree(source)?;
        Ok(Self { root, data })
    }
}

/// Build the node tree of a YAML document, keeping trailing comments.
pub fn parse_tree(source: &str) -> Result<Node, AnnotateError> {
    let lines = outline(source)?;
    let mut parser = Parser { lines, pos: 0 };

    let Some(first) = parser.peek().copied() else {
        return Ok(Node::new(NodeKind::Mapping, "", 1));
    };
    let root = parser.parse_block(first.indent)?;

    if let Some(line) = parser.peek() {
        return Err(invalid(line, "content outside the document root"));
    }
    Ok(root)
}

// --- Internal implementation ---

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    indent: usize,
    text: &'a str,
    comment: Option<&'a str>,
}

/// Split source into significant lines. Blank and comment-only lines are
/// dropped; only the first document of a stream is kept.
fn outline(source: &str) -> Result<Vec<Line<'_>>, AnnotateError> {
    let mut lines = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let trimmed = raw.trim_start_matches(' ');
        let indent = raw.len() - trimmed.len();
        let (text, comment) = split_comment(trimmed);
        let text = text.trim_end();
        if text.is_empty() {
            continue;
        }

        if text == "---" || text.starts_with("--- ") || text == "..." {
            if lines.is_empty() && text != "..." {
                continue;
            }
            break;
        }

        let line = Line {
            number: idx + 1,
            indent,
            text,
            comment,
        };
        if text.starts_with('\t') {
            return Err(invalid(&line, "tab indentation"));
        }
        if text == "?" || text.starts_with("? ") {
            return Err(invalid(&line, "complex mapping keys"));
        }
        lines.push(line);
    }

    Ok(lines)
}

struct Parser<'a> {
    lines: Vec<Line<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Line<'a>> {
        self.lines.get(self.pos)
    }

    fn parse_block(&mut self, indent: usize) -> Result<Node, AnnotateError> {
        let Some(line) = self.peek().copied() else {
            return Ok(Node::new(NodeKind::Scalar, "", 0));
        };

        if is_sequence_item(line.text) {
            self.parse_sequence(indent)
        } else if mapping_separator(line.text).is_some() {
            self.parse_mapping(indent)
        } else {
            self.pos += 1;
            Ok(self.parse_inline(line.text, &line, indent))
        }
    }

    fn parse_mapping(&mut self, indent: usize) -> Result<Node, AnnotateError> {
        let start = self.lines[self.pos].number;
        let mut node = Node::new(NodeKind::Mapping, "", start);

        while let Some(line) = self.peek().copied() {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(invalid(&line, "unexpected indentation"));
            }
            if is_sequence_item(line.text) {
                return Err(invalid(&line, "sequence item where a mapping key was expected"));
            }
            let Some(sep) = mapping_separator(line.text) else {
                return Err(invalid(&line, "expected a mapping key"));
            };

            let mut key = Node::new(
                NodeKind::Scalar,
                scalar_text(line.text[..sep].trim_end()),
                line.number,
            );
            let rest = strip_properties(line.text[sep + 1..].trim());
            self.pos += 1;

            let value = if rest.is_empty() {
                if let Some(comment) = line.comment {
                    key.comment = comment.to_string();
                }
                match self.peek().copied() {
                    Some(next)
                        if next.indent > indent
                            || (next.indent == indent && is_sequence_item(next.text)) =>
                    {
                        self.parse_block(next.indent)?
                    }
                    _ => Node::new(NodeKind::Scalar, "", line.number),
                }
            } else {
                self.parse_inline(rest, &line, indent)
            };

            node.children.push(key);
            node.children.push(value);
        }

        Ok(node)
    }

    fn parse_sequence(&mut self, indent: usize) -> Result<Node, AnnotateError> {
        let start = self.lines[self.pos].number;
        let mut node = Node::new(NodeKind::Sequence, "", start);

        while let Some(line) = self.peek().copied() {
            if line.indent > indent {
                return Err(invalid(&line, "unexpected indentation"));
            }
            if line.indent < indent || !is_sequence_item(line.text) {
                break;
            }

            let rest = strip_properties(line.text[1..].trim_start());
            if rest.is_empty() {
                self.pos += 1;
                let mut item = match self.peek().copied() {
                    Some(next) if next.indent > indent => self.parse_block(next.indent)?,
                    _ => Node::new(NodeKind::Scalar, "", line.number),
                };
                if let Some(comment) = line.comment {
                    attach_leading_comment(&mut item, comment);
                }
                node.children.push(item);
            } else if !is_sequence_item(rest) && mapping_separator(rest).is_none() {
                // Scalar continuation lines only need to be deeper than the dash.
                self.pos += 1;
                let item = self.parse_inline(rest, &line, indent);
                node.children.push(item);
            } else {
                // Re-read the item body as its own line at the column it starts.
                let column = indent + line.text.len() - rest.len();
                self.lines[self.pos] = Line {
                    number: line.number,
                    indent: column,
                    text: rest,
                    comment: line.comment,
                };
                node.children.push(self.parse_block(column)?);
            }
        }

        Ok(node)
    }

    /// Parse a value written on the same line as its key or `-` marker.
    /// The line itself has already been consumed.
    fn parse_inline(&mut self, text: &str, line: &Line<'a>, parent_indent: usize) -> Node {
        let mut text = text.to_string();
        let mut comment = line.comment;

        if text.starts_with(['[', '{']) {
            while !flow_balanced(&text) {
                let Some(next) = self.peek().copied() else {
                    break;
                };
                text.push(' ');
                text.push_str(next.text);
                comment = next.comment.or(comment);
                self.pos += 1;
            }
        }

        let mut continuation = Vec::new();
        while let Some(next) = self.peek() {
            if next.indent <= parent_indent {
                break;
            }
            continuation.push(next.text);
            self.pos += 1;
        }

        let (kind, value) = match text.chars().next() {
            Some('[') => (NodeKind::Sequence, text),
            Some('{') => (NodeKind::Mapping, text),
            _ if is_block_scalar_header(&text) => (NodeKind::Scalar, continuation.join("\n")),
            _ if continuation.is_empty() => (NodeKind::Scalar, scalar_text(&text)),
            _ => {
                let mut folded = vec![text.as_str()];
                folded.extend(continuation.iter().copied());
                (NodeKind::Scalar, scalar_text(&folded.join(" ")))
            }
        };

        let mut node = Node::new(kind, value, line.number);
        if let Some(comment) = comment {
            node.comment = comment.to_string();
        }
        node
    }
}

fn attach_leading_comment(item: &mut Node, comment: &str) {
    let target = match item.children.first_mut() {
        Some(first) if item.kind == NodeKind::Mapping && first.comment.is_empty() => first,
        _ => item,
    };
    if target.comment.is_empty() {
        target.comment = comment.to_string();
    }
}

fn invalid(line: &Line<'_>, message: &str) -> AnnotateError {
    AnnotateError::InvalidDocument {
        line: line.number,
        message: message.to_string(),
    }
}

fn is_sequence_item(text: &str) -> bool {
    text == "-" || text.starts_with("- ")
}

fn is_block_scalar_header(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some('|') | Some('>'))
        && chars.all(|c| c == '-' || c == '+' || c.is_ascii_digit())
}

/// Drop leading anchors (`&name`) and tags (`!tag`).
fn strip_properties(mut text: &str) -> &str {
    while text.starts_with(['&', '!']) {
        text = match text.find(' ') {
            Some(idx) => text[idx..].trim_start(),
            None => "",
        };
    }
    text
}

/// Characters after which a quote opens a quoted scalar.
fn opens_quote(prev: Option<char>) -> bool {
    prev.map_or(true, |p| {
        p.is_whitespace() || matches!(p, ':' | '[' | '{' | ',' | '-' | '?')
    })
}

/// Scans `text` outside of quoted scalars, calling `visit` with each
/// character's byte offset, the character, the previous character and the
/// following character. Stops when `visit` returns `Some`.
fn scan_unquoted<T>(
    text: &str,
    mut visit: impl FnMut(usize, char, Option<char>, Option<char>) -> Option<T>,
) -> Option<T> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        match quote {
            Some(q) => {
                if q == '"' && c == '\\' && !escaped {
                    escaped = true;
                    prev = Some(c);
                    continue;
                }
                if c == q && !escaped {
                    quote = None;
                }
                escaped = false;
            }
            None => {
                if (c == '"' || c == '\'') && opens_quote(prev) {
                    quote = Some(c);
                } else if let Some(found) = visit(idx, c, prev, next) {
                    return Some(found);
                }
            }
        }
        prev = Some(c);
    }
    None
}

/// Split a line into content and trailing comment (with its `#`).
fn split_comment(text: &str) -> (&str, Option<&str>) {
    let start = scan_unquoted(text, |idx, c, prev, _| {
        (c == '#' && prev.map_or(true, char::is_whitespace)).then_some(idx)
    });
    match start {
        Some(idx) => (&text[..idx], Some(text[idx..].trim_end())),
        None => (text, None),
    }
}

/// Byte offset of the `:` separating a mapping key from its value.
fn mapping_separator(text: &str) -> Option<usize> {
    if text.starts_with(['[', '{', '|', '>', '*']) {
        return None;
    }
    let mut depth = 0i32;
    scan_unquoted(text, |idx, c, _, next| {
        match c {
            '[' | '{' => depth += 1,
            ']' | '}' => depth -= 1,
            ':' if depth == 0 && next.map_or(true, |n| n == ' ') => return Some(idx),
            _ => {}
        }
        None
    })
}

fn flow_balanced(text: &str) -> bool {
    let mut depth = 0i32;
    scan_unquoted(text, |_, c, _, _| {
        match c {
            '[' | '{' => depth += 1,
            ']' | '}' => depth -= 1,
            _ => {}
        }
        None::<()>
    });
    depth <= 0
}

/// Unquote a scalar; plain scalars are returned as written.
fn scalar_text(raw: &str) -> String {
    let raw = raw.trim();
    match raw.chars().next() {
        Some(q @ ('"' | '\'')) => serde_yaml::from_str::<String>(raw)
            .unwrap_or_else(|_| raw.trim_matches(q).to_string()),
        _ => raw.to_string(),
    }
}
