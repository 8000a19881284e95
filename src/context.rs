//! The context value mirrored onto `$httpBackend`
//!
//! Response functions running in the page cannot see Rust state, so the
//! proxy keeps one value that it copies onto a field of `$httpBackend`
//! whenever it is pushed.

use crate::error::SerializeError;
use crate::script::context_assignment;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// A context cell shared between a root proxy and its on-load child
#[derive(Debug, Clone)]
pub struct SharedContext {
    field: String,
    value: Rc<RefCell<Option<Value>>>,
}

impl SharedContext {
    /// A context holding an empty object
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: Rc::new(RefCell::new(Some(Value::object()))),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn get(&self) -> Option<Value> {
        self.value.borrow().clone()
    }

    /// Replace the local value without pushing anything
    pub fn replace(&self, value: Option<Value>) -> Option<Value> {
        std::mem::replace(&mut *self.value.borrow_mut(), value)
    }

    /// Apply a `sync_context` update and return the assignment to push.
    ///
    /// - no update: keep the current value, creating `{}` when absent
    /// - object into object: shallow merge, update wins per key
    /// - anything else: the update replaces the current value
    ///
    /// The cell only changes when the resulting value serializes.
    pub fn sync(&self, update: Option<Value>) -> Result<String, SerializeError> {
        let candidate = {
            let slot = self.value.borrow();
            match (update, slot.as_ref()) {
                (None, Some(current)) => current.clone(),
                (None, None) => Value::object(),
                (Some(Value::Object(fields)), Some(current)) if current.is_object() => {
                    let mut merged = current.clone();
                    for (key, value) in fields {
                        merged.insert(key, value);
                    }
                    merged
                }
                (Some(replacement), _) => replacement,
            }
        };
        let statement = context_assignment(&self.field, &candidate)?;
        *self.value.borrow_mut() = Some(candidate);
        Ok(statement)
    }

    /// Assignment statement for the current value, or `None` when absent
    pub fn assignment(&self) -> Result<Option<String>, SerializeError> {
        self.value
            .borrow()
            .as_ref()
            .map(|v| context_assignment(&self.field, v))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(initial: serde_json::Value) -> SharedContext {
        let c = SharedContext::new("context");
        c.replace(Some(Value::from(initial)));
        c
    }

    #[test]
    fn test_objects_merge_shallowly() {
        let c = ctx(json!({"a": 1, "b": 2}));
        let pushed = c.sync(Some(Value::from(json!({"b": 3, "c": 4})))).unwrap();
        assert_eq!(pushed, r#"$httpBackend["context"] = {"a":1,"b":3,"c":4}"#);
        assert_eq!(c.get(), Some(Value::from(json!({"a": 1, "b": 3, "c": 4}))));
    }

    #[test]
    fn test_merge_does_not_recurse() {
        let c = ctx(json!({"n": {"x": 1, "y": 2}}));
        c.sync(Some(Value::from(json!({"n": {"x": 5}})))).unwrap();
        assert_eq!(c.get(), Some(Value::from(json!({"n": {"x": 5}}))));
    }

    #[test]
    fn test_arrays_replace_wholly() {
        let c = ctx(json!({"a": 1}));
        c.sync(Some(Value::from(json!([1, 2])))).unwrap();
        assert_eq!(c.get(), Some(Value::from(json!([1, 2]))));
        c.sync(Some(Value::from(json!({"a": 1})))).unwrap();
        assert_eq!(c.get(), Some(Value::from(json!({"a": 1}))));
    }

    #[test]
    fn test_absent_context_becomes_empty_object() {
        let c = SharedContext::new("context");
        c.replace(None);
        assert_eq!(c.assignment().unwrap(), None);
        assert_eq!(c.sync(None).unwrap(), r#"$httpBackend["context"] = {}"#);
        assert_eq!(c.get(), Some(Value::object()));
    }

    #[test]
    fn test_unserializable_merge_leaves_the_cell_alone() {
        let mut current = Value::object();
        current.insert("n", Value::Number(f64::NAN));
        let c = SharedContext::new("context");
        c.replace(Some(current));

        let err = c.sync(Some(Value::from(json!({"a": 1})))).unwrap_err();
        assert!(matches!(err, SerializeError::NonFiniteNumber(_)));
        let after = c.get().unwrap();
        assert!(after.get("a").is_none());
        assert!(matches!(after.get("n"), Some(Value::Number(n)) if n.is_nan()));
    }

    #[test]
    fn test_clones_share_the_cell() {
        let c = SharedContext::new("alt");
        let child = c.clone();
        c.sync(Some(Value::from(json!({"k": "v"})))).unwrap();
        assert_eq!(child.get(), Some(Value::from(json!({"k": "v"}))));
        assert_eq!(child.field(), "alt");
    }
}
