//! Open-ended node payload values
//!
//! Every node carries a [`DataMap`]: an insertion-ordered map from string keys
//! to [`Value`]s. The map is the only persisted payload of a node, so
//! serialization captures anything stored in it, including the reserved
//! `_vntree` namespace that holds the node's name and identity.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Insertion-ordered mapping from keys to values
pub type DataMap = IndexMap<String, Value>;

/// A dynamically typed payload value
///
/// Serialized untagged, so a `Value` reads and writes as the plain JSON, YAML
/// or MessagePack value it holds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent / null
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(DataMap),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&DataMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut DataMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Coerce a text token to the narrowest value it can represent
    ///
    /// Integers are tried first, then floats; anything else stays a string.
    pub fn coerce(token: &str) -> Value {
        if let Ok(i) = token.parse::<i64>() {
            return Value::Int(i);
        }
        match token.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::Float(f),
            _ => Value::String(token.to_string()),
        }
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

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<DataMap> for Value {
    fn from(map: DataMap) -> Self {
        Value::Map(map)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        i64::try_from(i).map_or(Value::Float(i as f64), Value::Int)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
            Value::List(_) | Value::Map(_) => {
                let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                write!(f, "{text}")
            }
        }
    }
}

/// Read a value at a nested key path
///
/// Each key but the last must resolve to a map. An empty path yields `None`.
pub fn lookup<'a, K: AsRef<str>>(data: &'a DataMap, keys: &[K]) -> Option<&'a Value> {
    let (last, parents) = keys.split_last()?;
    let mut current = data;
    for key in parents {
        current = current.get(key.as_ref())?.as_map()?;
    }
    current.get(last.as_ref())
}

/// Write a value at a nested key path, creating intermediate maps
///
/// A non-map value sitting on the path is replaced by a map.
pub fn assign<K: AsRef<str>>(data: &mut DataMap, keys: &[K], value: Value) {
    let Some((last, parents)) = keys.split_last() else {
        return;
    };
    let mut current = data;
    for key in parents {
        let slot = current
            .entry(key.as_ref().to_string())
            .or_insert_with(|| Value::Map(DataMap::new()));
        if !matches!(slot, Value::Map(_)) {
            *slot = Value::Map(DataMap::new());
        }
        let Value::Map(map) = slot else {
            return;
        };
        current = map;
    }
    current.insert(last.as_ref().to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce() {
        assert_eq!(Value::coerce("11515793"), Value::Int(11515793));
        assert_eq!(Value::coerce("-4"), Value::Int(-4));
        assert_eq!(Value::coerce("2.5"), Value::Float(2.5));
        assert_eq!(Value::coerce("Brussels"), Value::from("Brussels"));
        assert_eq!(Value::coerce("inf"), Value::from("inf"));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(7i64), Value::Int(7));
        assert_eq!(Value::from(7i32), Value::Int(7));
        assert_eq!(Value::from(7usize), Value::Int(7));
        assert_eq!(Value::from(0.5), Value::Float(0.5));
        assert_eq!(Value::from(String::from("s")), Value::String("s".into()));
        assert_eq!(Value::from(vec![Value::Null]), Value::List(vec![Value::Null]));
        assert_eq!(Value::from(DataMap::new()), Value::Map(DataMap::new()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }

    #[test]
    fn test_nested_assign_and_lookup() {
        let mut data = DataMap::new();
        assign(&mut data, &["vn", "fs_path"], Value::from("/one/two"));
        assert_eq!(
            lookup(&data, &["vn", "fs_path"]),
            Some(&Value::from("/one/two"))
        );
        assert_eq!(lookup(&data, &["vn", "missing"]), None);
        assert_eq!(lookup::<&str>(&data, &[]), None);
    }

    #[test]
    fn test_assign_replaces_scalar_on_path() {
        let mut data = DataMap::new();
        data.insert("a".into(), Value::Int(1));
        assign(&mut data, &["a", "b"], Value::Bool(true));
        assert_eq!(lookup(&data, &["a", "b"]), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_untagged_json() {
        let mut data = DataMap::new();
        data.insert("n".into(), Value::Int(3));
        data.insert("x".into(), Value::Float(1.5));
        data.insert("s".into(), Value::from("hi"));
        data.insert("l".into(), Value::List(vec![Value::Null, Value::Bool(false)]));
        let text = serde_json::to_string(&data).unwrap();
        assert_eq!(text, r#"{"n":3,"x":1.5,"s":"hi","l":[null,false]}"#);
        let back: DataMap = serde_json::from_str(&text).unwrap();
        assert_eq!(back, data);
    }
}
