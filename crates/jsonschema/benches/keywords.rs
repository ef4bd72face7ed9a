use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
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
            name: "pattern",
            schema: json!({"type": "string", "pattern": "^[a-z0-9-]{3,32}$"}),
            instances: vec![("valid", json!("a-valid-slug")), ("invalid", json!("Not Valid!"))],
        },
        Case {
            name: "properties",
            schema: json!({
                "type": "object",
                "properties": {
                    "a": {"type": "integer"},
                    "b": {"type": "string"},
                    "c": {"type": "boolean"},
                },
                "additionalProperties": false,
            }),
            instances: vec![
                ("valid", json!({"a": 1, "b": "x", "c": true})),
                ("invalid", json!({"a": 1, "d": "extra"})),
            ],
        },
        Case {
            name: "any_of",
            schema: json!({
                "anyOf": [
                    {"type": "integer"},
                    {"type": "string", "minLength": 3},
                ],
            }),
            instances: vec![("valid", json!(42)), ("invalid", json!("ab"))],
        },
        Case {
            name: "format",
            schema: json!({"type": "string", "format": "email"}),
            instances: vec![("valid", json!("user@example.com")), ("invalid", json!("not-an-email"))],
        },
    ]
}

fn bench_keyword_compile(c: &mut Criterion, name: &str, schema: &Value) {
    c.bench_function(&format!("keyword/{name}/compile"), |b| {
        b.iter(|| jsonschema::validator_for(schema).expect("Valid schema"))
    });
}

fn bench_keyword_is_valid(c: &mut Criterion, name: &str, validator: &Validator, instance: &Value) {
    c.bench_with_input(
        BenchmarkId::new(format!("keyword/{name}"), "is_valid"),
        instance,
        |b, instance| {
            b.iter(|| {
                let _ = validator.is_valid(instance);
            })
        },
    );
}

fn bench_keyword_validate(c: &mut Criterion, name: &str, validator: &Validator, instance: &Value) {
    c.bench_with_input(
        BenchmarkId::new(format!("keyword/{name}"), "validate"),
        instance,
        |b, instance| {
            b.iter(|| {
                let _ = validator.validate(instance);
            })
        },
    );
}

fn run_benchmarks(c: &mut Criterion) {
    for case in cases() {
        bench_keyword_compile(c, case.name, &case.schema);
        let validator = jsonschema::validator_for(&case.schema).expect("Valid schema");
        for (label, instance) in &case.instances {
            let name = format!("jsonschema/{}/{}", case.name, label);
            bench_keyword_is_valid(c, &name, &validator, instance);
            bench_keyword_validate(c, &name, &validator, instance);
        }
    }
}

criterion_group!(keywords, run_benchmarks);
criterion_main!(keywords);
