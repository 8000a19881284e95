//! Values that can be shipped into the page as source text
//!
//! `Value` mirrors what a JavaScript caller could hand to `$httpBackend`:
//! JSON data plus dates, regular expressions and functions. It is an owned
//! tree, so cyclic structures cannot be built.

use crate::error::SerializeError;
use std::time::{SystemTime, UNIX_EPOCH};

/// A value destined for the page
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    /// Key/value pairs in insertion order. Keys are unique.
    Object(Vec<(String, Value)>),
    /// Milliseconds since the Unix epoch
    Date(i64),
    RegExp { source: String, flags: String },
    /// Verbatim function source, e.g. `function(url){ return url.indexOf('/api') == 0; }`.
    ///
    /// The source is re-evaluated inside the page. Anything it references
    /// must exist there: captured local variables do not travel.
    Function(String),
}

impl Value {
    /// An empty object (`{}`)
    pub fn object() -> Self {
        Value::Object(Vec::new())
    }

    /// Build a regular expression from its literal form, `/pattern/flags`.
    ///
    /// The pattern is everything between the first and the last slash, as in
    /// the literal's own textual form.
    pub fn regex(literal: &str) -> Result<Self, SerializeError> {
        let end = literal
            .rfind('/')
            .filter(|&end| literal.starts_with('/') && end > 0)
            .ok_or_else(|| SerializeError::InvalidRegExpLiteral(literal.to_string()))?;
        Ok(Value::RegExp {
            source: literal[1..end].to_string(),
            flags: literal[end + 1..].to_string(),
        })
    }

    /// A function value carried as source text
    pub fn function(source: impl Into<String>) -> Self {
        Value::Function(source.into())
    }

    pub fn date_millis(millis: i64) -> Self {
        Value::Date(millis)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Look up a key on an object value
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Set a key on an object value. An existing key keeps its position.
    /// Returns the previous value, or `None` when the key is new or `self` is
    /// not an object.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let Value::Object(fields) = self else {
            return None;
        };
        let key = key.into();
        match fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                fields.push((key, value));
                None
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_number {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(n as f64)
            }
        })*
    };
}

from_number!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<SystemTime> for Value {
    fn from(t: SystemTime) -> Self {
        let millis = match t.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_millis() as i64,
            Err(e) => -(e.duration().as_millis() as i64),
        };
        Value::Date(millis)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Build an argument list for a verb or action call.
///
/// ```
/// use backend_proxy::{args, Value};
/// let a = args!["/remote", 200, serde_json::json!({"msg": "hi"})];
/// assert_eq!(a.len(), 3);
/// assert_eq!(a[0], Value::from("/remote"));
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        vec![$($crate::Value::from($arg)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_regex_literal_splits_at_last_slash() {
        let re = Value::regex("/a\\/b/gi").unwrap();
        assert_eq!(
            re,
            Value::RegExp { source: "a\\/b".into(), flags: "gi".into() }
        );
        assert_eq!(
            Value::regex("/find me/").unwrap(),
            Value::RegExp { source: "find me".into(), flags: String::new() }
        );
    }

    #[test]
    fn test_regex_literal_must_be_delimited() {
        assert!(Value::regex("find me").is_err());
        assert!(Value::regex("/").is_err());
        assert!(Value::regex("").is_err());
    }

    #[test]
    fn test_json_objects_keep_their_key_order() {
        let v = Value::from(json!({"zeta": 1, "alpha": {"nested": [1, "x", null]}}));
        let Value::Object(fields) = &v else { panic!("expected object") };
        assert_eq!(fields[0].0, "zeta");
        assert_eq!(fields[1].0, "alpha");
        assert_eq!(
            v.get("alpha").and_then(|a| a.get("nested")),
            Some(&Value::Array(vec![Value::Number(1.0), "x".into(), Value::Null]))
        );
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut v = Value::from(json!({"a": 1, "b": 2}));
        assert_eq!(v.insert("a", 5.into()), Some(Value::Number(1.0)));
        assert_eq!(v.insert("c", 3.into()), None);
        assert_eq!(v, Value::from(json!({"a": 5, "b": 2, "c": 3})));

        let mut not_object = Value::from(vec![1, 2]);
        assert_eq!(not_object.insert("a", 1.into()), None);
        assert_eq!(not_object, Value::from(vec![1, 2]));
    }

    #[test]
    fn test_args_macro_converts_each_argument() {
        let a = args!["GET", 200, true, Value::Null];
        assert_eq!(
            a,
            vec![Value::from("GET"), Value::Number(200.0), Value::Bool(true), Value::Null]
        );
        assert!(args![].is_empty());
    }
}
