//! Value Union
//!
//! Every node in the sheet publishes exactly one `Value`. Values are tagged
//! scalars: once constructed they are immutable, equality is structural, and
//! there is no implicit coercion between tags. Callers that need a specific
//! representation go through the typed accessors, which fail with a
//! [`ValueError::TypeMismatch`] instead of converting silently.
//!
//! # Numeric Widening
//!
//! The only declared widening is integer-to-float: [`Value::as_float`]
//! accepts an `Int` and widens it. Nothing narrows, and nothing crosses
//! between numeric and non-numeric tags.
//!
//! # Persistence
//!
//! Values round-trip through the raw scalar the host persists: null, bool,
//! number, or string. A `Timestamp` survives the scalar round-trip by
//! encoding as a `"time|<RFC 3339>"` tagged string, so a plain string value
//! starting with that prefix is reserved.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Prefix that marks a persisted string as an encoded timestamp.
const TIME_TAG: &str = "time|";

/// Errors produced by the typed accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The stored tag cannot be interpreted as the requested type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// A tagged scalar value flowing through the graph.
///
/// `Null` is the default everywhere: an unconnected input reads as `Null`,
/// and a freshly constructed node holds `Null` unless its kind says
/// otherwise.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Name of the stored tag, used in error reports.
    pub fn tag(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError::TypeMismatch {
            expected,
            found: self.tag(),
        }
    }

    /// Interpret as an integer. No narrowing from `Float`.
    pub fn as_int(&self) -> Result<i64, ValueError> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(other.mismatch("int")),
        }
    }

    /// Interpret as a float, widening `Int` if necessary.
    pub fn as_float(&self) -> Result<f64, ValueError> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Int(n) => Ok(*n as f64),
            other => Err(other.mismatch("float")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_text(&self) -> Result<&str, ValueError> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(other.mismatch("text")),
        }
    }

    pub fn as_timestamp(&self) -> Result<DateTime<Utc>, ValueError> {
        match self {
            Value::Timestamp(t) => Ok(*t),
            other => Err(other.mismatch("timestamp")),
        }
    }

    /// Numeric addition with the declared widening rule.
    ///
    /// `Int + Int` stays integral while the sum fits; on overflow it
    /// widens to a float rather than wrapping. Any float on either side
    /// widens the result. Non-numeric operands are a `TypeMismatch`.
    pub fn add(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a
                .checked_add(*b)
                .map(Value::Int)
                .unwrap_or_else(|| Value::Float(*a as f64 + *b as f64))),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                // Both sides numeric, accessors cannot fail here.
                Ok(Value::Float(self.as_float()? + other.as_float()?))
            }
            (Value::Int(_) | Value::Float(_), other) => Err(other.mismatch("numeric")),
            (other, _) => Err(other.mismatch("numeric")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Timestamp(t) => {
                serializer.serialize_str(&format!("{TIME_TAG}{}", t.to_rfc3339()))
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null, bool, number, or string")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, n: i64) -> Result<Value, E> {
        Ok(Value::Int(n))
    }

    fn visit_u64<E: de::Error>(self, n: u64) -> Result<Value, E> {
        i64::try_from(n)
            .map(Value::Int)
            .map_err(|_| E::custom("integer out of range"))
    }

    fn visit_f64<E: de::Error>(self, x: f64) -> Result<Value, E> {
        Ok(Value::Float(x))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Value, E> {
        if let Some(encoded) = s.strip_prefix(TIME_TAG) {
            let parsed = DateTime::parse_from_rfc3339(encoded)
                .map_err(|e| E::custom(format!("bad timestamp: {e}")))?;
            return Ok(Value::Timestamp(parsed.with_timezone(&Utc)));
        }
        Ok(Value::Text(s.to_owned()))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}
