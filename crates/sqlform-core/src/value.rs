//! Dynamic scalar values.
//!
//! `Value` is the runtime representation of every persisted scalar in the
//! adapter layer. Attribute maps, identity keys, validator inputs, and form
//! cleaning all traffic in `Value`.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A dynamically-typed scalar value.
///
/// Temporal variants carry canonical ISO-8601 strings (`2024-01-31`,
/// `13:05:00`, `2024-01-31T13:05:00`). `Decimal` carries the exact decimal
/// digits as text. `Duration` carries whole microseconds.
///
/// # Example
///
/// ```
/// use sqlform_core::value::Value;
///
/// let v = Value::Text("alice".to_string());
/// assert_eq!(v.as_str(), Some("alice"));
/// assert!(!v.is_blank());
/// assert!(Value::Null.is_blank());
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// SQL NULL / absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer (covers small/regular/big integer columns).
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// Exact decimal, stored as its canonical string form.
    Decimal(String),
    /// Text / varchar.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Calendar date, ISO-8601 (`YYYY-MM-DD`).
    Date(String),
    /// Time of day, ISO-8601 (`HH:MM:SS`).
    Time(String),
    /// Date and time, ISO-8601 (`YYYY-MM-DDTHH:MM:SS`).
    DateTime(String),
    /// Elapsed time in whole microseconds.
    Duration(i64),
    /// UUID in canonical hyphenated form.
    Uuid(String),
    /// Arbitrary JSON document.
    Json(serde_json::Value),
    /// Homogeneous array of values.
    Array(Vec<Value>),
}

impl Value {
    /// Whether this is `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value is blank: `Null`, or text that is empty after
    /// trimming whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Borrow the inner string for text-like variants.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s)
            | Value::Decimal(s)
            | Value::Date(s)
            | Value::Time(s)
            | Value::DateTime(s)
            | Value::Uuid(s) => Some(s),
            _ => None,
        }
    }

    /// Extract an integer if this is an `Int`.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract a float, widening `Int` when needed.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Extract a boolean if this is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Duration(_) => "duration",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
        }
    }

    /// Convert into a plain JSON value.
    ///
    /// `Float` NaN/infinities become JSON null (JSON has no representation
    /// for them). `Bytes` become an array of numbers.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Decimal(s)
            | Value::Text(s)
            | Value::Date(s)
            | Value::Time(s)
            | Value::DateTime(s)
            | Value::Uuid(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => {
                serde_json::Value::Array(b.iter().map(|x| serde_json::Value::from(*x)).collect())
            }
            Value::Duration(micros) => serde_json::Value::Number((*micros).into()),
            Value::Json(j) => j.clone(),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }

    /// Build a `Value` from a JSON value without consulting a column type.
    ///
    /// Strings become `Text`, numbers become `Int` or `Float`, nested
    /// structures become `Array`/`Json`. Type-aware conversion lives in
    /// the coercion module.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float))
                .unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(_) => Value::Json(json.clone()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // Bitwise float comparison so values can back Eq/Hash.
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Decimal(a), Value::Decimal(b))
            | (Value::Text(a), Value::Text(b))
            | (Value::Date(a), Value::Date(b))
            | (Value::Time(a), Value::Time(b))
            | (Value::DateTime(a), Value::DateTime(b))
            | (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Variant tag first so e.g. Int(0) and Bool(false) never collide.
        match self {
            Value::Null => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Int(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Value::Float(f) => {
                3u8.hash(state);
                f.to_bits().hash(state);
            }
            Value::Decimal(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Value::Text(s) => {
                5u8.hash(state);
                s.hash(state);
            }
            Value::Bytes(b) => {
                6u8.hash(state);
                b.hash(state);
            }
            Value::Date(s) => {
                7u8.hash(state);
                s.hash(state);
            }
            Value::Time(s) => {
                8u8.hash(state);
                s.hash(state);
            }
            Value::DateTime(s) => {
                9u8.hash(state);
                s.hash(state);
            }
            Value::Duration(micros) => {
                10u8.hash(state);
                micros.hash(state);
            }
            Value::Uuid(s) => {
                11u8.hash(state);
                s.hash(state);
            }
            Value::Json(j) => {
                12u8.hash(state);
                j.to_string().hash(state);
            }
            Value::Array(items) => {
                13u8.hash(state);
                for item in items {
                    item.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Decimal(s)
            | Value::Text(s)
            | Value::Date(s)
            | Value::Time(s)
            | Value::DateTime(s)
            | Value::Uuid(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Duration(micros) => write!(f, "{micros}us"),
            Value::Json(j) => write!(f, "{j}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
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

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(v: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        v.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_blankness() {
        assert!(Value::Null.is_blank());
        assert!(Value::Text(String::new()).is_blank());
        assert!(Value::Text("   ".to_string()).is_blank());
        assert!(!Value::Text("x".to_string()).is_blank());
        assert!(!Value::Int(0).is_blank());
        assert!(!Value::Bool(false).is_blank());
    }

    #[test]
    fn test_float_equality_is_bitwise() {
        assert_eq!(Value::Float(1.5), Value::Float(1.5));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
    }

    #[test]
    fn test_hash_distinguishes_variants() {
        assert_ne!(hash_of(&Value::Int(0)), hash_of(&Value::Bool(false)));
        assert_ne!(
            hash_of(&Value::Text("1".to_string())),
            hash_of(&Value::Decimal("1".to_string()))
        );
        assert_eq!(hash_of(&Value::Int(42)), hash_of(&Value::Int(42)));
    }

    #[test]
    fn test_json_round_trip() {
        let v = Value::Array(vec![
            Value::Int(1),
            Value::Text("two".to_string()),
            Value::Null,
        ]);
        let json = v.to_json();
        assert_eq!(Value::from_json(&json), v);
    }

    #[test]
    fn test_nan_float_serializes_as_null() {
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(7).to_string(), "7");
        assert_eq!(Value::Text("hi".to_string()).to_string(), "hi");
        assert_eq!(Value::Null.to_string(), "");
    }
}
