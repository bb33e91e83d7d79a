//! Scalar property values for nodes and relationships
//!
//! Values are stored in the collection files as plain JSON scalars, so the enum
//! is untagged: `true`, `30`, `30.5` and `"Alice"` map onto the four variants.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Property value type
///
/// Variant order matters for deserialization: integers must be tried before
/// floats so that `30` stays an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    /// Get string value if this is a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get integer value if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view used by WHERE comparisons.
    ///
    /// Strings count as numeric when their trimmed text parses as a float.
    /// Booleans are 1 and 0.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::String(s) => s.trim().parse::<f64>().ok(),
            PropertyValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        }
    }

    /// Canonical string form used for index keys and property equality
    pub fn to_key_string(&self) -> String {
        match self {
            PropertyValue::Boolean(b) => b.to_string(),
            PropertyValue::Integer(i) => i.to_string(),
            PropertyValue::Float(f) => format_float(*f),
            PropertyValue::String(s) => s.clone(),
        }
    }

    /// Loose equality: two values are equal when their key strings are
    pub fn loosely_equals(&self, other: &PropertyValue) -> bool {
        self.to_key_string() == other.to_key_string()
    }

    /// Compare for WHERE evaluation
    ///
    /// Numeric when both sides have a numeric view, string otherwise. `None`
    /// means the pair is incomparable (NaN) and must fail closed.
    pub fn compare(&self, other: &PropertyValue) -> Option<Ordering> {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => Some(self.to_key_string().cmp(&other.to_key_string())),
        }
    }
}

// Integral floats keep a trailing ".0" so 1.0 and 1 never share an index key.
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "\"{}\"", s),
            other => write!(f, "{}", other.to_key_string()),
        }
    }
}

// Convenience conversions
impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

/// Property map for node and relationship properties, in insertion order
pub type PropertyMap = IndexMap<String, PropertyValue>;

/// True when every entry of `required` is present in `actual` with a loosely equal value
pub fn properties_match(actual: &PropertyMap, required: &PropertyMap) -> bool {
    required.iter().all(|(key, expected)| {
        actual
            .get(key)
            .map(|value| value.loosely_equals(expected))
            .unwrap_or(false)
    })
}
