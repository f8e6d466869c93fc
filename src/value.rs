//! A small tagged value for loosely structured data.
//!
//! Import summaries are handed to callers that want to render or serialize
//! them without knowing the pipeline's types. [`Value`] covers that with
//! explicit, total accessors: every `as_*` returns `None` on a kind
//! mismatch instead of panicking or coercing.
//!
//! # Example
//!
//! ```
//! use chatprep::value::Value;
//!
//! let v = Value::map([("lines", Value::from(42i64)), ("warning", Value::Null)]);
//! assert_eq!(v.get("lines").and_then(Value::as_int), Some(42));
//! assert!(v.get("warning").is_some_and(Value::is_null));
//! assert_eq!(v.get("missing"), None);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A dynamically typed value.
///
/// Serializes untagged: `Int(3)` becomes `3`, `Map` becomes a JSON object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// String
    String(String),
    /// Ordered list
    List(Vec<Value>),
    /// String-keyed map, sorted by key
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Builds a [`Value::Map`] from key/value pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats as-is; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up `key` if this is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(key)
    }

    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

/// Saturates at `i64::MAX`.
impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

/// Saturates at `i64::MAX`.
impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

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

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "-"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:.2}"),
            Value::String(s) => write!(f, "{s}"),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Map(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_are_total() {
        let values = [
            Value::Null,
            Value::from(true),
            Value::from(7i64),
            Value::from(1.5),
            Value::from("s"),
            Value::from(vec![1i64, 2]),
            Value::map([("k", Value::Null)]),
        ];
        for v in &values {
            // No accessor panics on any variant.
            let _ = (
                v.as_bool(),
                v.as_int(),
                v.as_float(),
                v.as_str(),
                v.as_list(),
                v.as_map(),
                v.get("k"),
            );
        }
        assert_eq!(values[1].as_bool(), Some(true));
        assert_eq!(values[1].as_int(), None);
        assert_eq!(values[2].as_int(), Some(7));
        assert_eq!(values[2].as_float(), Some(7.0));
        assert_eq!(values[3].as_int(), None);
        assert_eq!(values[4].as_str(), Some("s"));
        assert_eq!(values[5].as_list().map(<[Value]>::len), Some(2));
        assert!(values[6].get("k").is_some());
        assert_eq!(values[4].get("k"), None);
    }

    #[test]
    fn test_from_option() {
        assert!(Value::from(None::<i64>).is_null());
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }

    #[test]
    fn test_from_unsigned_saturates() {
        assert_eq!(Value::from(u64::MAX), Value::Int(i64::MAX));
        assert_eq!(Value::from(3usize), Value::Int(3));
    }

    #[test]
    fn test_type_name() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::map::<&str, _>([]).type_name(), "map");
    }

    #[test]
    fn test_serialize_untagged() {
        let v = Value::map([
            ("b", Value::from(false)),
            ("a", Value::from(1i64)),
            ("n", Value::Null),
            ("l", Value::from(vec!["x"])),
        ]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"a":1,"b":false,"l":["x"],"n":null}"#);
    }

    #[test]
    fn test_deserialize_untagged() {
        let v: Value = serde_json::from_str(r#"{"n": 3, "f": 0.5, "s": "t"}"#).unwrap();
        assert_eq!(v.get("n").and_then(Value::as_int), Some(3));
        assert_eq!(v.get("f").and_then(Value::as_float), Some(0.5));
        assert_eq!(v.get("s").and_then(Value::as_str), Some("t"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(vec![1i64, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::Null.to_string(), "-");
        assert_eq!(Value::from(0.5).to_string(), "0.50");
    }
}
