//! Integration tests for schema generation.

use serde_json::{json, Value};
use values_schema::{
    apply_patches, generate, generate_with, patch_set, AnnotateError, AnnotationError,
    GenerateOptions, InferredSchema, OpKind, SchemaGenerator,
};

fn schema(source: &str) -> Value {
    generate_with(source, &InferredSchema::default(), &GenerateOptions::new())
        .unwrap()
        .schema
}

fn replaced_paths(source: &str) -> Vec<String> {
    patch_set(source, &GenerateOptions::new())
        .unwrap()
        .into_iter()
        .filter(|op| op.op == OpKind::Replace && op.path != "/$schema")
        .map(|op| op.path)
        .collect()
}

// === Placement Tests ===

mod placement {
    use super::*;

    #[test]
    fn root_scalar() {
        assert_eq!(
            replaced_paths("name: foo # @jsonSchema: {\"minLength\": 1}\n"),
            ["/properties/name"]
        );
    }

    #[test]
    fn nested_under_mapping() {
        let source = "\
a:
  b: 1 # @jsonSchema: {\"minimum\": 0}
  c:
    d: x # @jsonSchema: {\"enum\": [\"x\", \"y\"]}
";
        assert_eq!(
            replaced_paths(source),
            [
                "/properties/a/properties/b",
                "/properties/a/properties/c/properties/d"
            ]
        );
    }

    #[test]
    fn key_with_block_value() {
        let source = "\
resources: # @jsonSchema: {\"description\": \"Pod resources\"}
  cpu: 100m
";
        let schema = schema(source);
        assert_eq!(schema["properties"]["resources"]["description"], "Pod resources");
        assert_eq!(
            schema["properties"]["resources"]["properties"]["cpu"],
            json!({"type": "string"})
        );
    }

    #[test]
    fn fields_of_sequence_items() {
        let source = "\
servers:
  - host: a # @jsonSchema: {\"format\": \"hostname\"}
    port: 80 # @jsonSchema: {\"maximum\": 65535}
";
        assert_eq!(
            replaced_paths(source),
            [
                "/properties/servers/items/properties/host",
                "/properties/servers/items/properties/port"
            ]
        );
        let schema = schema(source);
        assert_eq!(
            schema["properties"]["servers"]["items"]["properties"]["port"],
            json!({"type": "integer", "maximum": 65535})
        );
    }

    #[test]
    fn dash_comment_before_mapping_item() {
        let source = "\
items:
  - # @jsonSchema: {\"type\": \"object\"}
    name: a
";
        let paths = replaced_paths(source);
        assert_eq!(paths.len(), 1);
        assert!(paths[0].contains("/properties/items/items/properties"));
    }

    #[test]
    fn dash_comment_without_block() {
        let source = "\
items:
  - # @jsonSchema: {\"type\": \"object\"}
";
        assert_eq!(replaced_paths(source), ["/properties/items/items"]);
        assert_eq!(schema(source)["properties"]["items"]["items"]["type"], "object");
    }

    #[test]
    fn field_only_in_later_item() {
        let source = "\
servers:
  - host: a
  - host: b
    port: 80 # @jsonSchema: {\"maximum\": 65535}
";
        assert_eq!(
            replaced_paths(source),
            ["/properties/servers/items/properties/port"]
        );
        let items = &schema(source)["properties"]["servers"]["items"];
        assert_eq!(items["properties"]["host"], json!({"type": "string"}));
        assert_eq!(
            items["properties"]["port"],
            json!({"type": "integer", "maximum": 65535})
        );
    }

    #[test]
    fn block_scalar_item_before_annotated_item() {
        let source = "\
args:
  - |
    echo hi
  - b # @jsonSchema: {\"minLength\": 1}
";
        assert_eq!(
            schema(source)["properties"]["args"]["items"],
            json!({"type": "string", "minLength": 1})
        );
    }

    #[test]
    fn multi_line_plain_item() {
        let source = "\
notes:
  - first line
    continues here
  - second # @jsonSchema: {\"maxLength\": 80}
";
        assert_eq!(replaced_paths(source), ["/properties/notes/items"]);
    }

    #[test]
    fn scalar_items() {
        let source = "\
tags:
  - web # @jsonSchema: {\"minLength\": 2}
";
        let schema = schema(source);
        assert_eq!(
            schema["properties"]["tags"]["items"],
            json!({"type": "string", "minLength": 2})
        );
    }

    #[test]
    fn mapping_nested_in_sequence_item() {
        let source = "\
containers:
  - name: app
    image:
      tag: v1 # @jsonSchema: {\"pattern\": \"^v\"}
";
        assert_eq!(
            replaced_paths(source),
            ["/properties/containers/items/properties/image/properties/tag"]
        );
    }

    #[test]
    fn sibling_after_sequence() {
        let source = "\
list:
  - a: 1
after: 2 # @jsonSchema: {\"minimum\": 0}
";
        assert_eq!(replaced_paths(source), ["/properties/after"]);
    }

    #[test]
    fn keys_needing_pointer_escapes() {
        let source = "\
annotations:
  example.com/owner: team # @jsonSchema: {\"minLength\": 1}
";
        assert_eq!(
            replaced_paths(source),
            ["/properties/annotations/properties/example.com~1owner"]
        );
        let schema = schema(source);
        assert_eq!(
            schema["properties"]["annotations"]["properties"]["example.com/owner"]["minLength"],
            1
        );
    }
}

// === Required Field Tests ===

mod required_fields {
    use super::*;

    #[test]
    fn policy_table() {
        let source = "\
obj:
  a: 1 # @jsonSchema: {\"required\": true}
  b: 1 # @jsonSchema: {\"required\": false}
  c: 1 # @jsonSchema: {\"optional\": true}
  d: 1 # @jsonSchema: {\"optional\": false}
";
        assert_eq!(schema(source)["properties"]["obj"]["required"], json!(["a", "d"]));
    }

    #[test]
    fn string_flags() {
        let source = "\
obj:
  a: 1 # @jsonSchema: {\"required\": \"true\"}
  b: 1 # @jsonSchema: {\"required\": \"F\"}
  c: 1 # @jsonSchema: {\"optional\": \"0\"}
";
        assert_eq!(schema(source)["properties"]["obj"]["required"], json!(["a", "c"]));
    }

    #[test]
    fn root_required() {
        let schema = schema("name: \"foo\" # @jsonSchema: {\"minLength\": 1, \"required\": true}\n");
        assert_eq!(schema["required"], json!(["name"]));
        assert_eq!(schema["properties"]["name"]["minLength"], 1);
        assert!(schema["properties"]["name"].get("required").is_none());
    }

    #[test]
    fn required_in_sequence_items() {
        let source = "\
users:
  - name: a # @jsonSchema: {\"required\": true}
    email: b
";
        assert_eq!(
            schema(source)["properties"]["users"]["items"]["required"],
            json!(["name"])
        );
    }

    #[test]
    fn repeated_items_are_deduplicated() {
        let source = "\
users:
  - name: a # @jsonSchema: {\"required\": true}
  - name: b # @jsonSchema: {\"required\": true}
";
        assert_eq!(
            schema(source)["properties"]["users"]["items"]["required"],
            json!(["name"])
        );

        let kept = generate_with(
            source,
            &InferredSchema::default(),
            &GenerateOptions::new().keep_duplicates(true),
        )
        .unwrap();
        assert_eq!(
            kept.schema["properties"]["users"]["items"]["required"],
            json!(["name", "name"])
        );
    }

    #[test]
    fn parent_annotation_keeps_child_required() {
        let source = "\
db: # @jsonSchema: {\"additionalProperties\": false}
  host: localhost # @jsonSchema: {\"required\": true}
";
        let db = &schema(source)["properties"]["db"];
        assert_eq!(db["additionalProperties"], false);
        assert_eq!(db["required"], json!(["host"]));
    }
}

// === Patch Set Tests ===

mod patch_set_properties {
    use super::*;

    const SOURCE: &str = "\
z: 1 # @jsonSchema: {\"minimum\": 0}
a:
  b: x # @jsonSchema: {\"minLength\": 1, \"required\": true}
m:
  - n: 1 # @jsonSchema: {\"optional\": false}
";

    #[test]
    fn ordering() {
        let ops = patch_set(SOURCE, &GenerateOptions::new()).unwrap();
        let kinds: Vec<_> = ops.iter().map(|op| (op.op, op.path.as_str())).collect();
        assert_eq!(
            kinds,
            [
                (OpKind::Replace, "/$schema"),
                (OpKind::Add, "/properties/a"),
                (OpKind::Add, "/properties/m/items"),
                (OpKind::Replace, "/properties/a/properties/b"),
                (OpKind::Replace, "/properties/z"),
            ]
        );
    }

    #[test]
    fn output_is_deterministic() {
        let first = generate(SOURCE, &GenerateOptions::new()).unwrap();
        for _ in 0..5 {
            assert_eq!(generate(SOURCE, &GenerateOptions::new()).unwrap(), first);
        }
    }

    #[test]
    fn patch_set_reproduces_schema() {
        let baseline = InferredSchema::default()
            .generate(&serde_yaml::from_str::<Value>(SOURCE).unwrap())
            .unwrap();
        let ops = patch_set(SOURCE, &GenerateOptions::new()).unwrap();
        assert_eq!(apply_patches(&baseline, &ops).unwrap(), schema(SOURCE));
    }

    #[test]
    fn reapplication_is_a_noop() {
        let schema = schema(SOURCE);
        let ops = patch_set(SOURCE, &GenerateOptions::new()).unwrap();
        assert_eq!(apply_patches(&schema, &ops).unwrap(), schema);
    }
}

// === Error Tests ===

mod errors {
    use super::*;

    #[test]
    fn invalid_directive_json() {
        let result = generate("name: foo # @jsonSchema: {not valid\n", &GenerateOptions::new());
        match result {
            Err(AnnotateError::Annotations { errors }) => {
                assert_eq!(errors.len(), 1);
                let AnnotationError::DirectiveDecode { path, comment, .. } = &errors[0] else {
                    panic!("expected decode error, got {:?}", errors[0]);
                };
                assert_eq!(path, "/properties/name");
                assert!(comment.contains("{not valid"));
            }
            other => panic!("expected annotation errors, got {other:?}"),
        }
    }

    #[test]
    fn invalid_flag_value() {
        let result = generate(
            "a:\n  b: 1 # @jsonSchema: {\"optional\": \"sometimes\"}\n",
            &GenerateOptions::new(),
        );
        let Err(AnnotateError::Annotations { errors }) = result else {
            panic!("expected annotation errors");
        };
        assert!(matches!(
            &errors[0],
            AnnotationError::RequiredValueParse { key: "optional", line: 2, .. }
        ));
    }

    #[test]
    fn replace_on_missing_baseline_path() {
        struct Flat;

        impl SchemaGenerator for Flat {
            fn generate(&self, _data: &Value) -> Result<Value, AnnotateError> {
                Ok(json!({"$schema": "http://json-schema.org/schema#", "type": "object"}))
            }
        }

        let result = generate_with(
            "a:\n  b: 1 # @jsonSchema: {\"minimum\": 0}\n",
            &Flat,
            &GenerateOptions::new(),
        );
        assert!(matches!(result, Err(AnnotateError::PatchApply { .. })));
    }

    #[test]
    fn invalid_yaml() {
        let result = generate("key: [unclosed\n", &GenerateOptions::new());
        assert!(matches!(result, Err(AnnotateError::InvalidYaml { .. })));
    }
}

// === Override Tests ===

mod overrides {
    use super::*;

    #[test]
    fn merge_patch_semantics() {
        let options = GenerateOptions::new().override_doc(json!({
            "title": "values",
            "properties": {
                "debug": null,
                "port": { "maximum": 9000 }
            }
        }));
        let generated = generate_with(
            "debug: false\nport: 80 # @jsonSchema: {\"minimum\": 1}\n",
            &InferredSchema::default(),
            &options,
        )
        .unwrap();

        let schema = generated.schema;
        assert_eq!(schema["title"], "values");
        assert!(schema["properties"].get("debug").is_none());
        assert_eq!(
            schema["properties"]["port"],
            json!({"type": "integer", "minimum": 1, "maximum": 9000})
        );
    }

    #[test]
    fn override_can_replace_schema_dialect() {
        let options = GenerateOptions::new()
            .override_doc(json!({"$schema": "https://json-schema.org/draft/2020-12/schema"}));
        let output = generate("a: 1\n", &options).unwrap();
        assert!(output.contains("draft/2020-12"));
    }
}
