//! Generic values produced by expression evaluation.
//!
//! A [`Value`] is the intermediate form between the parsed DSL and a
//! compiled resource record. Maps are ordered so that the canonical
//! encoding of a value does not depend on declaration order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered map of named values
pub type ValueMap = BTreeMap<String, Value>;

/// A generic tagged value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// String scalar
    String(String),
    /// Ordered list
    List(Vec<Value>),
    /// Named entries
    Map(ValueMap),
}

impl Value {
    /// Short name of the variant, used in error messages
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Borrow as a string scalar
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a list
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as a map
    #[must_use]
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Convert to plain JSON (untagged) for display and export
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Self::Map(map)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name() {
        assert_eq!(Value::from("x").type_name(), "string");
        assert_eq!(Value::List(Vec::new()).type_name(), "list");
        assert_eq!(Value::Map(ValueMap::new()).type_name(), "map");
    }

    #[test]
    fn test_accessors() {
        let v = Value::from("abc");
        assert_eq!(v.as_str(), Some("abc"));
        assert!(v.as_list().is_none());
        assert!(v.as_map().is_none());
    }

    #[test]
    fn test_to_json_untagged() {
        let mut map = ValueMap::new();
        map.insert("pattern".to_string(), Value::from("(foo)"));
        map.insert(
            "lines".to_string(),
            Value::List(vec![Value::from("a"), Value::from("b")]),
        );
        let json = Value::Map(map).to_json();
        assert_eq!(json["pattern"], "(foo)");
        assert_eq!(json["lines"][1], "b");
    }

    #[test]
    fn test_empty_string_and_empty_list_differ() {
        let a = crate::ContentHash::of(&Value::from("")).unwrap();
        let b = crate::ContentHash::of(&Value::List(Vec::new())).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("x").to_string(), "\"x\"");
    }

    proptest::proptest! {
        #[test]
        fn prop_scalar_and_singleton_list_hash_apart(s: String) {
            let scalar = crate::ContentHash::of(&Value::String(s.clone())).unwrap();
            let list = crate::ContentHash::of(&Value::List(vec![Value::String(s)])).unwrap();
            proptest::prop_assert_ne!(scalar, list);
        }
    }
}
