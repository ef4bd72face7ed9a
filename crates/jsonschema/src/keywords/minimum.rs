use crate::{
    compiler,
    error::{error, no_error, ErrorIterator, ValidationError},
    keywords::{data::DataRef, CompilationResult},
    paths::{LazyLocation, JsonPointer},
    primitive_type::PrimitiveType,
    validator::Validate,
};
use num_cmp::NumCmp;
use serde_json::{Map, Value};

/// `{"minimum": {"$data": "..."}}` — the limit is read from the instance
/// being validated rather than fixed at compile time. An unresolvable
/// `$data` pointer, or one that doesn't resolve to a number, makes the
/// keyword a no-op, matching Ajv's `$data` semantics.
pub(crate) struct MinimumDataValidator {
    data_ref: DataRef,
    location: JsonPointer,
}

impl Validate for MinimumDataValidator {
    fn is_valid(&self, _instance: &Value) -> bool {
        // `$data` resolution needs the instance location, which `is_valid`
        // doesn't carry; treated as valid here and re-checked in `validate`.
        true
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        location: &LazyLocation,
    ) -> ErrorIterator<'instance> {
        let Some(limit) = self.data_ref.resolve(location).and_then(|v| v.as_f64()) else {
            return no_error();
        };
        if let Value::Number(item) = instance {
            let valid = if let Some(item) = item.as_u64() {
                !NumCmp::num_lt(item, limit)
            } else if let Some(item) = item.as_i64() {
                !NumCmp::num_lt(item, limit)
            } else {
                let item = item.as_f64().expect("Always valid");
                !NumCmp::num_lt(item, limit)
            };
            if !valid {
                return error(ValidationError::minimum(
                    self.location.clone(),
                    location.into(),
                    instance,
                    Value::from(limit),
                ));
            }
        }
        no_error()
    }
}

pub(crate) struct MinimumU64Validator {
    limit: u64,
    limit_val: Value,
    location: JsonPointer,
}
pub(crate) struct MinimumI64Validator {
    limit: i64,
    limit_val: Value,
    location: JsonPointer,
}
pub(crate) struct MinimumF64Validator {
    limit: f64,
    limit_val: Value,
    location: JsonPointer,
}

macro_rules! validate {
    ($validator: ty) => {
        impl Validate for $validator {
            fn validate<'instance>(
        &self,
        instance: &'instance Value,
        location: &LazyLocation,
    ) -> ErrorIterator<'instance> {
                if self.is_valid(instance) {
                    no_error()
                } else {
                    error(ValidationError::minimum(
                        self.location.clone(),
                        location.into(),
                        instance,
                        self.limit_val.clone(),
                    )) // do not cast
                }
            }

            fn is_valid(&self, instance: &Value) -> bool {
                if let Value::Number(item) = instance {
                    return if let Some(item) = item.as_u64() {
                        !NumCmp::num_lt(item, self.limit)
                    } else if let Some(item) = item.as_i64() {
                        !NumCmp::num_lt(item, self.limit)
                    } else {
                        let item = item.as_f64().expect("Always valid");
                        !NumCmp::num_lt(item, self.limit)
                    };
                }
                true
            }
        }
    };
}

validate!(MinimumU64Validator);
validate!(MinimumI64Validator);

impl Validate for MinimumF64Validator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Number(item) = instance {
            return if let Some(item) = item.as_u64() {
                !NumCmp::num_lt(item, self.limit)
            } else if let Some(item) = item.as_i64() {
                !NumCmp::num_lt(item, self.limit)
            } else {
                let item = item.as_f64().expect("Always valid");
                !NumCmp::num_lt(item, self.limit)
            };
        }
        true
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        location: &LazyLocation,
    ) -> ErrorIterator<'instance> {
        if self.is_valid(instance) {
            no_error()
        } else {
            error(ValidationError::minimum(
                self.location.clone(),
                location.into(),
                instance,
                self.limit_val.clone(),
            ))
        }
    }
}

#[inline]
pub(crate) fn compile<'a>(
    ctx: &compiler::Context,
    _: &'a Map<String, Value>,
    schema: &'a Value,
) -> Option<CompilationResult<'a>> {
    if ctx.data_refs_enabled() {
        if let Some(data_ref) = DataRef::from_value(schema) {
            let location = ctx.location().join("minimum");
            return Some(Ok(Box::new(MinimumDataValidator { data_ref, location })));
        }
    }
    if let Value::Number(limit) = schema {
        let location = ctx.location().join("minimum");
        if let Some(limit) = limit.as_u64() {
            Some(Ok(Box::new(MinimumU64Validator {
                limit,
                limit_val: schema.clone(),
                location,
            })))
        } else if let Some(limit) = limit.as_i64() {
            Some(Ok(Box::new(MinimumI64Validator {
                limit,
                limit_val: schema.clone(),
                location,
            })))
        } else {
            let limit = limit.as_f64().expect("Always valid");
            Some(Ok(Box::new(MinimumF64Validator {
                limit,
                limit_val: schema.clone(),
                location,
            })))
        }
    } else {
        Some(Err(ValidationError::single_type_error(
            JsonPointer::new(),
            ctx.location().clone(),
            schema,
            PrimitiveType::Number,
        )))
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"minimum": 1_u64 << 54}), &json!((1_u64 << 54) - 1))]
    #[test_case(&json!({"minimum": 1_i64 << 54}), &json!((1_i64 << 54) - 1))]
    fn is_not_valid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance)
    }

    #[test_case(&json!({"minimum": 5}), &json!(1), "/minimum")]
    #[test_case(&json!({"minimum": 6}), &json!(1), "/minimum")]
    #[test_case(&json!({"minimum": 7}), &json!(1), "/minimum")]
    fn location(schema: &Value, instance: &Value, expected: &str) {
        tests_util::assert_schema_location(schema, instance, expected)
    }
}
