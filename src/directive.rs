//! Directive extraction from annotation comments.
//!
//! A directive is the JSON object following `@jsonSchema:` in a trailing
//! comment. Its keys are schema keywords, except for the reserved
//! `required` and `optional` keys which control the parent's `required` array.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::types::{OPTIONAL_KEY, REQUIRED_KEY};

fn directive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"@jsonSchema:\s?(?P<json>\{.*\})").expect("directive pattern is valid")
    })
}

/// Extract the JSON fragment of a directive from a comment.
///
/// Returns `None` when the comment carries no `@jsonSchema:` marker. A marker
/// followed by something other than a braced fragment yields the raw
/// remainder so that decoding reports it.
pub fn match_directive(comment: &str) -> Option<&str> {
    if let Some(m) = directive_pattern()
        .captures(comment)
        .and_then(|caps| caps.name("json"))
    {
        return Some(m.as_str());
    }
    let (_, rest) = comment.split_once("@jsonSchema:")?;
    Some(rest.trim())
}

/// Reserved directive key that declares requiredness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    Required,
    Optional,
}

impl FlagKind {
    pub fn key(&self) -> &'static str {
        match self {
            FlagKind::Required => REQUIRED_KEY,
            FlagKind::Optional => OPTIONAL_KEY,
        }
    }

    /// Whether declaring this flag with `value` puts the field in its
    /// parent's `required` array (`required: true` or `optional: false`).
    pub fn marks_required(&self, value: bool) -> bool {
        match self {
            FlagKind::Required => value,
            FlagKind::Optional => !value,
        }
    }
}

/// A decoded directive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directive {
    /// Schema keywords to merge into the annotated field's schema.
    pub schema: Map<String, Value>,
    pub required: Option<Value>,
    pub optional: Option<Value>,
}

impl Directive {
    /// Decode a directive fragment, separating the reserved keys.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the fragment is not a JSON object.
    pub fn decode(fragment: &str) -> Result<Self, serde_json::Error> {
        let decoded: Map<String, Value> = serde_json::from_str(fragment)?;

        let mut directive = Directive::default();
        for (key, value) in decoded {
            match key.as_str() {
                REQUIRED_KEY => directive.required = Some(value),
                OPTIONAL_KEY => directive.optional = Some(value),
                _ => {
                    directive.schema.insert(key, value);
                }
            }
        }
        Ok(directive)
    }

    /// Declared flags in evaluation order (`required` before `optional`).
    pub fn flags(&self) -> impl Iterator<Item = (FlagKind, &Value)> {
        [
            (FlagKind::Required, self.required.as_ref()),
            (FlagKind::Optional, self.optional.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, value)| value.map(|v| (kind, v)))
    }
}

/// Parse a flag value given as a JSON boolean or a boolean string.
///
/// Accepts the spellings `1 t T TRUE true True` and `0 f F FALSE false False`.
/// Returns `None` for anything else (caller should error).
pub fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn match_extracts_fragment() {
        let comment = r#"# @jsonSchema: {"minLength": 1, "required": true}"#;
        assert_eq!(
            match_directive(comment),
            Some(r#"{"minLength": 1, "required": true}"#)
        );
    }

    #[test]
    fn match_without_space_after_colon() {
        assert_eq!(
            match_directive(r#"#@jsonSchema:{"type":"string"}"#),
            Some(r#"{"type":"string"}"#)
        );
    }

    #[test]
    fn match_ignores_other_comments() {
        assert_eq!(match_directive("# plain comment"), None);
        assert_eq!(match_directive("# @jsonSchema without payload"), None);
    }

    #[test]
    fn match_keeps_invalid_json_for_decoding() {
        assert_eq!(match_directive("# @jsonSchema: {not valid}"), Some("{not valid}"));
        assert_eq!(match_directive("# @jsonSchema: {not valid"), Some("{not valid"));
        assert_eq!(match_directive("# @jsonSchema:"), Some(""));
    }

    #[test]
    fn match_uses_last_closing_brace() {
        assert_eq!(
            match_directive(r#"# @jsonSchema: {"a": {"b": 1}} trailing"#),
            Some(r#"{"a": {"b": 1}}"#)
        );
    }

    #[test]
    fn decode_separates_reserved_keys() {
        let directive =
            Directive::decode(r#"{"minLength": 1, "required": true, "optional": "false"}"#)
                .unwrap();
        assert_eq!(Value::Object(directive.schema), json!({"minLength": 1}));
        assert_eq!(directive.required, Some(json!(true)));
        assert_eq!(directive.optional, Some(json!("false")));
    }

    #[test]
    fn decode_preserves_keyword_order() {
        let directive = Directive::decode(r#"{"type": "string", "enum": ["a"], "default": "a"}"#)
            .unwrap();
        let keys: Vec<_> = directive.schema.keys().map(String::as_str).collect();
        assert_eq!(keys, ["type", "enum", "default"]);
    }

    #[test]
    fn decode_rejects_invalid_json() {
        assert!(Directive::decode("{not valid}").is_err());
        assert!(Directive::decode("[1, 2]").is_err());
    }

    #[test]
    fn flags_in_order() {
        let directive = Directive::decode(r#"{"optional": false, "required": "true"}"#).unwrap();
        let flags: Vec<_> = directive.flags().map(|(kind, _)| kind).collect();
        assert_eq!(flags, [FlagKind::Required, FlagKind::Optional]);

        let directive = Directive::decode(r#"{"type": "string"}"#).unwrap();
        assert_eq!(directive.flags().count(), 0);
    }

    #[test]
    fn parse_flag_values() {
        assert_eq!(parse_flag(&json!(true)), Some(true));
        assert_eq!(parse_flag(&json!(false)), Some(false));
        assert_eq!(parse_flag(&json!("true")), Some(true));
        assert_eq!(parse_flag(&json!("F")), Some(false));
        assert_eq!(parse_flag(&json!("1")), Some(true));
        assert_eq!(parse_flag(&json!("yes")), None);
        assert_eq!(parse_flag(&json!(1)), None);
        assert_eq!(parse_flag(&json!(null)), None);
    }

    #[test]
    fn policy_table() {
        assert!(FlagKind::Required.marks_required(true));
        assert!(!FlagKind::Required.marks_required(false));
        assert!(!FlagKind::Optional.marks_required(true));
        assert!(FlagKind::Optional.marks_required(false));
    }
}
