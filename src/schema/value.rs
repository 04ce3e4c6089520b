//! Local value model for schema-described objects.
//!
//! A [`Value`] is the local (state-side) representation of a field. Blocks
//! are a one-element [`Value::List`] holding a [`Value::Object`], tables are
//! a [`Value::List`] of objects, and unordered string lists are a
//! [`Value::Set`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Attributes of one object instance, keyed by local field name.
pub type Attributes = BTreeMap<String, Value>;

/// A local attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// String.
    String(String),
    /// Ordered sequence.
    List(Vec<Value>),
    /// Unordered set of strings.
    Set(BTreeSet<String>),
    /// Nested object keyed by local field name.
    Object(Attributes),
}

impl Value {
    /// Converts an untyped JSON value structurally, without a descriptor.
    ///
    /// Arrays become lists and objects keep their keys unchanged.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or_default()), Self::Int),
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            serde_json::Value::Object(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts this value back to untyped JSON. Sets are emitted sorted.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Set(items) => serde_json::Value::Array(
                items.iter().cloned().map(serde_json::Value::String).collect(),
            ),
            Self::Object(map) => serde_json::Value::Object(attributes_to_json(map)),
        }
    }

    /// Returns the string form of a scalar, used for ids and loose comparison.
    #[must_use]
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::String(s) => Some(s.clone()),
            Self::Null | Self::List(_) | Self::Set(_) | Self::Object(_) => None,
        }
    }

    /// Returns true for null, empty lists, empty sets and empty objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::List(items) => items.is_empty(),
            Self::Set(items) => items.is_empty(),
            Self::Object(map) => map.is_empty(),
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::String(_) => false,
        }
    }

    /// Checks whether an observed value satisfies this desired value.
    ///
    /// Objects only compare the keys present on the desired side, so fields
    /// the server fills in on its own do not count as differences. Scalars
    /// compare by their string form (`5` and `"5"` are equal).
    #[must_use]
    pub fn is_satisfied_by(&self, observed: &Self) -> bool {
        match (self, observed) {
            (Self::Object(want), Self::Object(have)) => want.iter().all(|(k, v)| {
                have.get(k)
                    .map_or_else(|| v.is_empty(), |actual| v.is_satisfied_by(actual))
            }),
            (Self::List(want), Self::List(have)) => {
                want.len() == have.len()
                    && want.iter().zip(have).all(|(w, h)| w.is_satisfied_by(h))
            }
            (Self::Set(want), Self::Set(have)) => want == have,
            (Self::Set(want), Self::List(have)) | (Self::List(have), Self::Set(want)) => {
                let have: Option<BTreeSet<String>> = have.iter().map(Self::scalar_string).collect();
                have.is_some_and(|h| &h == want)
            }
            (Self::Null, other) | (other, Self::Null) => other.is_empty(),
            (want, have) => match (want.scalar_string(), have.scalar_string()) {
                (Some(w), Some(h)) => w == h,
                _ => false,
            },
        }
    }

    /// Short shape name used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Object(_) => "object",
        }
    }
}

/// Converts attributes to a JSON object keyed by local names.
#[must_use]
pub fn attributes_to_json(attributes: &Attributes) -> serde_json::Map<String, serde_json::Value> {
    attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            other => write!(f, "{}", other.to_json()),
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

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_conversion_keeps_scalars() {
        let json = json!({"a": 1, "b": "x", "c": true, "d": [1, 2], "e": null});
        let value = Value::from_json(&json);
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_satisfied_ignores_server_filled_keys() {
        let desired = Value::from_json(&json!({"ip": "10.0.0.1 255.255.255.255"}));
        let observed = Value::from_json(&json!({
            "ip": "10.0.0.1 255.255.255.255",
            "ha_direct": "disable"
        }));
        assert!(desired.is_satisfied_by(&observed));
        assert!(!observed.is_satisfied_by(&desired));
    }

    #[test]
    fn test_satisfied_loose_scalars() {
        assert!(Value::Int(5).is_satisfied_by(&Value::String("5".into())));
        assert!(!Value::Int(5).is_satisfied_by(&Value::Int(6)));
    }

    #[test]
    fn test_satisfied_set_against_list() {
        let set = Value::Set(["b".to_string(), "a".to_string()].into_iter().collect());
        let list = Value::List(vec!["a".into(), "b".into()]);
        assert!(set.is_satisfied_by(&list));
        assert!(list.is_satisfied_by(&set));
    }

    #[test]
    fn test_null_matches_empty() {
        assert!(Value::Null.is_satisfied_by(&Value::List(vec![])));
        assert!(!Value::Null.is_satisfied_by(&Value::Int(0)));
    }
}
