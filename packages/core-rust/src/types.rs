use std::cmp::Ordering;
use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Generic runtime value type for data provider rows.
///
/// Supports all JSON-compatible types plus binary data. Rows are usually
/// `Value::Map`; the provider and the view never require a fixed schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// JSON null.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON integer (signed 64-bit).
    Int(i64),
    /// JSON floating-point (64-bit IEEE 754).
    Float(f64),
    /// JSON string (UTF-8).
    String(String),
    /// Binary data (not directly representable in JSON).
    Bytes(Vec<u8>),
    /// JSON array (ordered sequence of values).
    Array(Vec<Value>),
    /// JSON object (ordered map of string keys to values).
    /// Uses `BTreeMap` for deterministic field order.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the named field of a `Map` value, or `None` for other variants.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Value::Map(fields) => fields.get(field),
            _ => None,
        }
    }

    /// Returns the string slice of a `String` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Rank of the variant in the cross-type ordering used by [`Value::total_cmp`].
    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::Bytes(_) => 4,
            Value::Array(_) => 5,
            Value::Map(_) => 6,
        }
    }

    /// Total ordering over values, used for sorting and comparison filters.
    ///
    /// Variants order as `Null < Bool < numbers < String < Bytes < Array < Map`.
    /// `Int` and `Float` compare numerically with each other; NaN sorts after
    /// every other number.
    #[must_use]
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                OrderedFloat(self.as_f64()).cmp(&OrderedFloat(other.as_f64()))
            }
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.total_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Map(a), Value::Map(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b) {
                    let ord = ka.cmp(kb).then_with(|| va.total_cmp(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    /// Numeric view of `Int`/`Float` values; 0.0 for anything else.
    // i64 -> f64 loses precision above 2^53, acceptable for ordering.
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(&self) -> f64 {
        match self {
            Value::Int(i) => *i as f64,
            Value::Float(f) => *f,
            _ => 0.0,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s),
            Value::Bytes(bytes) => {
                serde_json::Value::Array(bytes.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(fields) => serde_json::Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// Opaque row identifier assigned by a data provider.
///
/// Keys are compared by equality only. A view must not infer row order from
/// key values; the `Hash`/`Eq` derives exist for set and map membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Int(i64),
    Float(OrderedFloat<f64>),
    String(String),
    Bool(bool),
    /// Multi-attribute key, one part per key attribute in declaration order.
    Composite(Vec<Key>),
}

impl Key {
    /// Converts a scalar value into a key.
    ///
    /// Returns `None` for `Null`, bytes, arrays, and maps, which cannot
    /// identify a row.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Int(i) => Some(Key::Int(*i)),
            Value::Float(f) => Some(Key::Float(OrderedFloat(*f))),
            Value::String(s) => Some(Key::String(s.clone())),
            Value::Bool(b) => Some(Key::Bool(*b)),
            Value::Null | Value::Bytes(_) | Value::Array(_) | Value::Map(_) => None,
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::String(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::String(value)
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Int(i) => Value::Int(i),
            Key::Float(f) => Value::Float(f.into_inner()),
            Key::String(s) => Value::String(s),
            Key::Bool(b) => Value::Bool(b),
            Key::Composite(parts) => Value::Array(parts.into_iter().map(Value::from).collect()),
        }
    }
}

/// Identity metadata attached to every row a provider returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub key: Key,
}

impl ItemMetadata {
    #[must_use]
    pub fn new(key: Key) -> Self {
        Self { key }
    }
}

/// Immutable snapshot of one data row and its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub data: Value,
    pub metadata: ItemMetadata,
}

impl Item {
    #[must_use]
    pub fn new(key: Key, data: Value) -> Self {
        Self {
            data,
            metadata: ItemMetadata::new(key),
        }
    }

    /// The row key.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.metadata.key
    }
}

/// Builds a `Value::Map` from `(field, value)` pairs.
///
/// Convenience for tests and callers assembling rows by hand.
#[must_use]
pub fn row<I, K, V>(fields: I) -> Value
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    Value::Map(
        fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
    )
}
