//! Fact Model: typed observations supplied once per diagnosis request
//!
//! Values keep the shape they arrived with. A string that looks like a boolean
//! or a number stays a string; conditions that expect another kind simply do
//! not match it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// The value of a single fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Coarse kind of a fact value, used by variable catalogs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Number,
    Text,
}

impl FactValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            FactValue::Bool(_) => ValueKind::Bool,
            FactValue::Int(_) | FactValue::Float(_) => ValueKind::Number,
            FactValue::Text(_) => ValueKind::Text,
        }
    }

    /// Numeric view; only integer and float facts have one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FactValue::Int(i) => Some(*i as f64),
            FactValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FactValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FactValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Equality across the numeric variants (`5 == 5.0`), exact otherwise.
    /// Values of different kinds are never equal.
    pub fn matches(&self, other: &FactValue) -> bool {
        match (self, other) {
            (FactValue::Bool(a), FactValue::Bool(b)) => a == b,
            (FactValue::Text(a), FactValue::Text(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Convert a JSON scalar. Arrays, objects and `null` have no fact form.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(FactValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(FactValue::Int)
                .or_else(|| n.as_f64().map(FactValue::Float)),
            Value::String(s) => Some(FactValue::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FactValue::Bool(b) => Value::Bool(*b),
            FactValue::Int(i) => Value::from(*i),
            FactValue::Float(f) => Value::from(*f),
            FactValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FactValue::Bool(b) => write!(f, "{}", b),
            FactValue::Int(i) => write!(f, "{}", i),
            FactValue::Float(x) => write!(f, "{}", x),
            FactValue::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<bool> for FactValue {
    fn from(v: bool) -> Self {
        FactValue::Bool(v)
    }
}

impl From<i32> for FactValue {
    fn from(v: i32) -> Self {
        FactValue::Int(v as i64)
    }
}

impl From<i64> for FactValue {
    fn from(v: i64) -> Self {
        FactValue::Int(v)
    }
}

impl From<u32> for FactValue {
    fn from(v: u32) -> Self {
        FactValue::Int(v as i64)
    }
}

impl From<f64> for FactValue {
    fn from(v: f64) -> Self {
        FactValue::Float(v)
    }
}

impl From<&str> for FactValue {
    fn from(v: &str) -> Self {
        FactValue::Text(v.to_string())
    }
}

impl From<String> for FactValue {
    fn from(v: String) -> Self {
        FactValue::Text(v)
    }
}

/// An immutable-by-convention mapping of fact keys to values.
///
/// Keys are unique and iteration order is lexical, so serialized snapshots
/// are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Facts {
    values: BTreeMap<String, FactValue>,
}

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FactValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a fact; later values win
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FactValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FactValue> {
        self.values.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FactValue)> {
        self.values.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    /// Overlay another fact set; its values replace ours on shared keys
    pub fn merge(&mut self, other: Facts) {
        self.values.extend(other.values);
    }

    /// Build from a JSON object.
    ///
    /// `null` entries are dropped. Arrays and objects are not facts; their keys
    /// are returned as the second element so the caller can report them.
    pub fn from_json(map: &Map<String, Value>) -> (Self, Vec<String>) {
        let mut facts = Facts::new();
        let mut ignored = Vec::new();

        for (key, value) in map {
            match FactValue::from_json(value) {
                Some(v) => facts.insert(key.clone(), v),
                None if value.is_null() => {}
                None => {
                    tracing::debug!(key = %key, "ignoring non-scalar fact value");
                    ignored.push(key.clone());
                }
            }
        }

        (facts, ignored)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Content digest of the canonical JSON form
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(&self.values).unwrap_or_default();
        format!("blake3:{}", blake3::hash(&canonical))
    }
}

impl<K: Into<String>, V: Into<FactValue>> FromIterator<(K, V)> for Facts {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut facts = Facts::new();
        for (k, v) in iter {
            facts.insert(k, v);
        }
        facts
    }
}
