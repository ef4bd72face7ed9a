use codspeed_criterion_compat::{criterion_group, criterion_main, BenchmarkId, Criterion};
use jsonschema::Validator;
use serde_json::{json, Value};

struct Case {
    name: &'static str,
    schema: Value,
    instances: Vec<(&'static str, Value)>,
}

fn cases() -> Vec<Case> {
    vec![
        Case {
            name: "boolean",
            schema: json!(true),
            instances: vec![("valid", json!("anything"))],
        },
        Case {
            name: "small_flat_object",
            schema: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "age": {"type": "integer", "minimum": 0},
                },
                "required": ["name", "age"],
            }),
            instances: vec![
                ("valid", json!({"name": "Alice", "age": 30})),
                ("invalid", json!({"name": "Alice", "age": -1})),
            ],
        },
        Case {
            name: "nested_refs",
            schema: json!({
                "$defs": {
                    "node": {
                        "type": "object",
                        "properties": {
                            "value": {"type": "integer"},
                            "next": {"$ref": "#/$defs/node"},
                        },
                    },
                },
                "$ref": "#/$defs/node",
            }),
            instances: vec![(
                "valid",
                json!({"value": 1, "next": {"value": 2, "next": {"value": 3}}}),
            )],
        },
        Case {
            name: "array_of_strings",
            schema: json!({
                "type": "array",
                "items": {"type": "string"},
                "minItems": 1,
                "uniqueItems": true,
            }),
            instances: vec![
                ("valid", json!(["a", "b", "c"])),
                ("invalid", json!(["a", "a"])),
            ],
        },
    ]
}

fn bench_compile(c: &mut Criterion, name: &str, schema: &Value) {
    c.bench_function(&format!("{name}/compile"), |b| {
        b.iter(|| jsonschema::validator_for(schema).expect("Valid schema"))
    });
}

fn bench_is_valid(c: &mut Criterion, name: &str, validator: &Validator, instance: &Value) {
    c.bench_with_input(BenchmarkId::new(name, "is_valid"), instance, |b, instance| {
        b.iter(|| {
            let _ = validator.is_valid(instance);
        })
    });
}

fn bench_validate(c: &mut Criterion, name: &str, validator: &Validator, instance: &Value) {
    c.bench_with_input(BenchmarkId::new(name, "validate"), instance, |b, instance| {
        b.iter(|| {
            let _ = validator.validate(instance);
        })
    });
}

fn run_benchmarks(c: &mut Criterion) {
    for case in cases() {
        bench_compile(c, case.name, &case.schema);
        let validator = jsonschema::validator_for(&case.schema).expect("Valid schema");
        for (label, instance) in &case.instances {
            let name = format!("{}/{}", case.name, label);
            bench_is_valid(c, &name, &validator, instance);
            bench_validate(c, &name, &validator, instance);
        }
    }
}

criterion_group!(jsonschema, run_benchmarks);
criterion_main!(jsonschema);
