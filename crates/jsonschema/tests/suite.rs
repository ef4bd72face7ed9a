#[cfg(not(target_arch = "wasm32"))]
mod tests {
    use jsonschema::Draft;
    use serde_json::{json, Value};
    use test_case::test_case;

    fn pretty_json(v: &Value) -> String {
        serde_json::to_string_pretty(v).expect("Failed to format JSON")
    }

    fn check(draft: Draft, schema: &Value, instance: &Value, valid: bool) {
        let validator = jsonschema::options()
            .with_draft(draft)
            .build(schema)
            .unwrap_or_else(|error| panic!("Failed to build a schema: {error}\nSchema: {}", pretty_json(schema)));
        let result = validator.validate(instance);
        if valid {
            if let Err(mut errors) = result {
                let first = errors.next();
                assert!(
                    first.is_none(),
                    "Instance should be valid:\nSchema: {}\nInstance: {}\nError: {:?}",
                    pretty_json(schema),
                    pretty_json(instance),
                    first.map(|e| e.to_string()),
                );
            }
            assert!(
                validator.is_valid(instance),
                "Instance should be valid:\nSchema: {}\nInstance: {}",
                pretty_json(schema),
                pretty_json(instance),
            );
            assert!(validator.apply(instance).basic().is_valid());
        } else {
            assert!(
                result.is_err(),
                "Instance should be invalid:\nSchema: {}\nInstance: {}",
                pretty_json(schema),
                pretty_json(instance),
            );
            assert!(
                !validator.is_valid(instance),
                "Instance should be invalid:\nSchema: {}\nInstance: {}",
                pretty_json(schema),
                pretty_json(instance),
            );
            assert!(!validator.apply(instance).basic().is_valid());
        }
    }

    #[test_case(Draft::Draft4; "draft4")]
    #[test_case(Draft::Draft6; "draft6")]
    #[test_case(Draft::Draft7; "draft7")]
    #[test_case(Draft::Draft201909; "draft2019_09")]
    #[test_case(Draft::Draft202012; "draft2020_12")]
    fn boolean_schemas(draft: Draft) {
        check(draft, &json!(true), &json!("anything"), true);
        check(draft, &json!(false), &json!("anything"), false);
    }

    #[test_case(Draft::Draft4; "draft4")]
    #[test_case(Draft::Draft6; "draft6")]
    #[test_case(Draft::Draft7; "draft7")]
    #[test_case(Draft::Draft201909; "draft2019_09")]
    #[test_case(Draft::Draft202012; "draft2020_12")]
    fn type_and_required(draft: Draft) {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "integer", "minimum": 0},
            },
            "required": ["name"],
        });
        check(draft, &schema, &json!({"name": "Alice", "age": 30}), true);
        check(draft, &schema, &json!({"age": 30}), false);
        check(draft, &schema, &json!({"name": "Alice", "age": -1}), false);
    }

    #[test_case(Draft::Draft4; "draft4")]
    #[test_case(Draft::Draft6; "draft6")]
    #[test_case(Draft::Draft7; "draft7")]
    #[test_case(Draft::Draft201909; "draft2019_09")]
    #[test_case(Draft::Draft202012; "draft2020_12")]
    fn nested_ref_resolution(draft: Draft) {
        let schema = json!({
            "$defs": {
                "node": {
                    "type": "object",
                    "properties": {
                        "value": {"type": "integer"},
                        "next": {"$ref": "#/$defs/node"},
                    },
                    "additionalProperties": false,
                },
            },
            "$ref": "#/$defs/node",
        });
        check(
            draft,
            &schema,
            &json!({"value": 1, "next": {"value": 2, "next": {"value": 3}}}),
            true,
        );
        check(draft, &schema, &json!({"value": 1, "bogus": true}), false);
    }

    #[test_case(Draft::Draft4; "draft4")]
    #[test_case(Draft::Draft6; "draft6")]
    #[test_case(Draft::Draft7; "draft7")]
    #[test_case(Draft::Draft201909; "draft2019_09")]
    #[test_case(Draft::Draft202012; "draft2020_12")]
    fn combinators(draft: Draft) {
        let schema = json!({
            "anyOf": [
                {"type": "integer"},
                {"type": "string", "minLength": 3},
            ],
        });
        check(draft, &schema, &json!(42), true);
        check(draft, &schema, &json!("abc"), true);
        check(draft, &schema, &json!("ab"), false);
        check(draft, &schema, &json!(true), false);

        let schema = json!({
            "allOf": [
                {"type": "number"},
                {"minimum": 0},
                {"maximum": 10},
            ],
        });
        check(draft, &schema, &json!(5), true);
        check(draft, &schema, &json!(-1), false);
        check(draft, &schema, &json!(11), false);

        let schema = json!({"not": {"type": "string"}});
        check(draft, &schema, &json!(1), true);
        check(draft, &schema, &json!("x"), false);
    }

    #[test]
    fn instance_path_points_at_the_failing_nested_property() {
        let schema = json!({
            "type": "object",
            "properties": {
                "a": {
                    "type": "object",
                    "properties": {
                        "b": {"type": "integer"},
                    },
                },
            },
        });
        let validator = jsonschema::validator_for(&schema).expect("Valid schema");
        let instance = json!({"a": {"b": "not an integer"}});
        let error = validator
            .validate(&instance)
            .expect_err("Should contain an error")
            .next()
            .expect("Validation error");
        assert_eq!(error.instance_path.as_str(), "/a/b");
    }

    #[test]
    fn data_reference_reads_sibling_value_at_validation_time() {
        let schema = json!({
            "properties": {
                "smaller": {"maximum": {"$data": "1/larger"}},
                "larger": {"type": "integer"},
            },
        });
        let validator = jsonschema::options()
            .with_data_refs()
            .build(&schema)
            .expect("Valid schema");
        assert!(validator.is_valid(&json!({"smaller": 5, "larger": 10})));
        assert!(!validator.is_valid(&json!({"smaller": 15, "larger": 10})));
    }

    #[test]
    fn nullable_true_unions_type_with_null() {
        let schema = json!({"type": "string", "nullable": true});
        let validator = jsonschema::validator_for(&schema).expect("Valid schema");
        assert!(validator.is_valid(&json!("hello")));
        assert!(validator.is_valid(&Value::Null));
        assert!(!validator.is_valid(&json!(42)));
    }

    #[test]
    fn nullable_false_still_rejects_null() {
        let schema = json!({"type": "string", "nullable": false});
        let validator = jsonschema::validator_for(&schema).expect("Valid schema");
        assert!(validator.is_valid(&json!("hello")));
        assert!(!validator.is_valid(&Value::Null));
    }

    #[test]
    fn nullable_false_conflicting_with_explicit_null_type_fails_to_compile() {
        let schema = json!({"type": ["string", "null"], "nullable": false});
        assert!(jsonschema::validator_for(&schema).is_err());
    }

    #[test]
    fn nullable_without_type_is_a_no_op() {
        let schema = json!({"nullable": true, "minLength": 3});
        let validator = jsonschema::validator_for(&schema).expect("Valid schema");
        assert!(validator.is_valid(&json!("abcd")));
        assert!(!validator.is_valid(&json!("ab")));
    }

    #[test]
    fn strict_mode_rejects_unknown_keyword() {
        let schema = json!({"type": "string", "totallyMadeUp": true});
        let result = jsonschema::options().with_strict(true).build(&schema);
        assert!(result.is_err());
    }

    #[test]
    fn non_strict_mode_treats_unknown_keyword_as_annotation() {
        let schema = json!({"type": "string", "totallyMadeUp": true});
        let validator = jsonschema::validator_for(&schema).expect("Valid schema");
        assert!(validator.is_valid(&json!("hello")));
    }

    #[test]
    fn strict_mode_still_tolerates_standard_annotation_keywords() {
        let schema = json!({
            "type": "string",
            "title": "Name",
            "description": "A person's name",
            "default": "",
            "examples": ["Alice"],
            "$comment": "internal note",
        });
        let result = jsonschema::options().with_strict(true).build(&schema);
        assert!(result.is_ok());
    }
}
