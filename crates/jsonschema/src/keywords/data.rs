//! Resolution of `{"$data": "<pointer>"}` schema values (see
//! [`crate::rules::Rule::data`]) to a concrete [`Value`] at validation time.
//!
//! Only the keywords a [`crate::rules::Rule`] marks with `.data(true)` accept
//! this shape in place of a literal schema value; everything else treats an
//! object with a `$data` key as an ordinary (and almost certainly invalid)
//! schema value.
use crate::paths::{JsonPointer, LazyLocation};
use serde_json::Value;
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static ROOTS: RefCell<Vec<Rc<Value>>> = const { RefCell::new(Vec::new()) };
}

/// Push the document being validated onto the `$data` resolution stack.
/// Paired with [`pop_root`] around every top-level `validate`/`is_valid`/
/// `apply` call so nested, possibly recursive, validation sees the right
/// root even when one validator invokes another.
pub(crate) fn push_root(root: Rc<Value>) {
    ROOTS.with(|stack| stack.borrow_mut().push(root));
}

pub(crate) fn pop_root() {
    ROOTS.with(|stack| {
        stack.borrow_mut().pop();
    });
}

/// Run `f` with `instance` as the current `$data` resolution root.
pub(crate) fn with_root<T>(instance: &Value, f: impl FnOnce() -> T) -> T {
    push_root(Rc::new(instance.clone()));
    let result = f();
    pop_root();
    result
}

fn with_current_root<T>(f: impl FnOnce(&Value) -> T) -> Option<T> {
    ROOTS.with(|stack| stack.borrow().last().map(|root| f(root)))
}

/// A schema value of the shape `{"$data": "<pointer>"}`.
#[derive(Debug, Clone)]
pub(crate) struct DataRef {
    pointer: String,
}

impl DataRef {
    /// Returns `Some` if `value` is (syntactically) a `$data` reference.
    pub(crate) fn from_value(value: &Value) -> Option<DataRef> {
        let object = value.as_object()?;
        if object.len() != 1 {
            return None;
        }
        let pointer = object.get("$data")?.as_str()?;
        Some(DataRef {
            pointer: pointer.to_string(),
        })
    }

    /// Resolve this reference against the document currently being
    /// validated, relative to `location` (the instance path of the keyword
    /// that carries the `$data` value).
    ///
    /// Follows Ajv's relative JSON Pointer convention: a pointer starting
    /// with `/` is absolute from the document root. Otherwise it starts
    /// with a non-negative integer counting how many levels to go up from
    /// `location` before applying the remaining `/`-separated path, e.g.
    /// `"1/minimum"` means "go to the parent of the current instance, then
    /// read its `minimum` property". Returns `None` if the pointer cannot
    /// be resolved, which callers should treat as "keyword is absent"
    /// rather than a validation failure.
    pub(crate) fn resolve(&self, location: &LazyLocation) -> Option<Value> {
        with_current_root(|root| self.resolve_against(root, location)).flatten()
    }

    fn resolve_against(&self, root: &Value, location: &LazyLocation) -> Option<Value> {
        if let Some(rest) = self.pointer.strip_prefix('/') {
            return resolve_pointer(root, rest).cloned();
        }
        let digits: String = self
            .pointer
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        if digits.is_empty() {
            return None;
        }
        let levels: usize = digits.parse().ok()?;
        let rest = self.pointer[digits.len()..]
            .strip_prefix('/')
            .unwrap_or("");

        let full_path: JsonPointer = location.into();
        let segments = full_path.into_vec();
        if levels > segments.len() {
            return None;
        }
        let base_len = segments.len() - levels;
        let mut current = root;
        for segment in &segments[..base_len] {
            current = index(current, segment)?;
        }
        if rest.is_empty() {
            Some(current.clone())
        } else {
            resolve_pointer(current, rest).cloned()
        }
    }
}

fn index<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn resolve_pointer<'a>(value: &'a Value, pointer: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in pointer.split('/') {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        current = index(current, &segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_data_ref() {
        let value = json!({"$data": "1/minimum"});
        assert!(DataRef::from_value(&value).is_some());
    }

    #[test]
    fn ignores_plain_object() {
        let value = json!({"type": "string"});
        assert!(DataRef::from_value(&value).is_none());
    }

    #[test]
    fn ignores_multi_key_object() {
        let value = json!({"$data": "1/minimum", "extra": true});
        assert!(DataRef::from_value(&value).is_none());
    }

    #[test]
    fn resolves_absolute_pointer() {
        let root = Rc::new(json!({"limits": {"min": 5}}));
        push_root(root);
        let data_ref = DataRef {
            pointer: "/limits/min".to_string(),
        };
        let location = LazyLocation::new();
        assert_eq!(data_ref.resolve(&location), Some(json!(5)));
        pop_root();
    }

    #[test]
    fn resolves_relative_pointer() {
        let root = Rc::new(json!({"minimum": 3, "value": 10}));
        push_root(root);
        let data_ref = DataRef {
            pointer: "1/minimum".to_string(),
        };
        let location = LazyLocation::new();
        let location = location.push("value");
        assert_eq!(data_ref.resolve(&location), Some(json!(3)));
        pop_root();
    }

    #[test]
    fn missing_pointer_resolves_to_none() {
        let root = Rc::new(json!({"value": 10}));
        push_root(root);
        let data_ref = DataRef {
            pointer: "/nope".to_string(),
        };
        let location = LazyLocation::new();
        assert_eq!(data_ref.resolve(&location), None);
        pop_root();
    }
}
