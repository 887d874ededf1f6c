//! Logical-type coercion.
//!
//! Converts raw attribute input into the canonical [`Value`] form for a
//! [`LogicalType`]. Column cleaning, form cleaning, and graph
//! deserialization all funnel through here so the canonical forms stay
//! consistent. Failures are [`ValidationError`]s with stable codes, never
//! panics.

use crate::error::ValidationError;
use crate::types::{EnumDef, LogicalType};
use crate::validators::matches_pattern;
use crate::value::Value;

const DATE_SHAPE: &str = r"^\d{4}-\d{2}-\d{2}$";
const TIME_SHAPE: &str = r"^\d{2}:\d{2}(:\d{2})?$";
const DATETIME_SHAPE: &str = r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2})?$";
const DECIMAL_SHAPE: &str = r"^[+-]?\d+(\.\d+)?$";
const UUID_SHAPE: &str =
    r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

/// Coerce a raw value to the canonical form for `logical_type`.
///
/// `Null` passes through untouched; requiredness is the caller's concern.
pub fn coerce(value: &Value, logical_type: &LogicalType) -> Result<Value, ValidationError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match logical_type {
        LogicalType::String { .. } | LogicalType::Text => coerce_text(value),
        LogicalType::SmallInteger | LogicalType::Integer | LogicalType::BigInteger => {
            coerce_integer(value)
        }
        LogicalType::Float
        | LogicalType::Numeric {
            asdecimal: false, ..
        } => coerce_float(value),
        LogicalType::Numeric {
            asdecimal: true, ..
        } => coerce_decimal(value),
        LogicalType::Boolean => coerce_boolean(value),
        LogicalType::Date => coerce_date(value),
        LogicalType::DateTime => coerce_datetime(value),
        LogicalType::Time => coerce_time(value),
        LogicalType::Interval => coerce_interval(value),
        LogicalType::Enum(def) => coerce_enum(value, def),
        LogicalType::Uuid => coerce_uuid(value),
        LogicalType::Json => coerce_json(value),
        LogicalType::Binary => coerce_binary(value),
        LogicalType::Array(elem) => coerce_array(value, elem),
    }
}

fn invalid(message: &str, code: &str) -> ValidationError {
    ValidationError::coded(message, code)
}

fn coerce_text(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Text(_) => Ok(value.clone()),
        Value::Int(_) | Value::Float(_) | Value::Bool(_) | Value::Decimal(_) => {
            Ok(Value::Text(value.to_string()))
        }
        _ => Err(invalid("enter a valid string", "invalid")),
    }
}

fn coerce_integer(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Int(_) => Ok(value.clone()),
        Value::Float(f) if f.fract() == 0.0 => Ok(Value::Int(*f as i64)),
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| invalid("enter a whole number", "invalid")),
        _ => Err(invalid("enter a whole number", "invalid")),
    }
}

fn coerce_float(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Float(_) => Ok(value.clone()),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Decimal(s) => s
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| invalid("enter a number", "invalid")),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| invalid("enter a number", "invalid")),
        _ => Err(invalid("enter a number", "invalid")),
    }
}

fn coerce_decimal(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Decimal(_) => Ok(value.clone()),
        Value::Int(i) => Ok(Value::Decimal(i.to_string())),
        Value::Float(f) if f.is_finite() => Ok(Value::Decimal(f.to_string())),
        Value::Text(s) if matches_pattern(s.trim(), DECIMAL_SHAPE) => {
            Ok(Value::Decimal(s.trim().to_string()))
        }
        _ => Err(invalid("enter a number", "invalid")),
    }
}

fn coerce_boolean(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::Int(0) => Ok(Value::Bool(false)),
        Value::Int(1) => Ok(Value::Bool(true)),
        Value::Text(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Ok(Value::Bool(true)),
            "false" | "0" | "off" | "no" => Ok(Value::Bool(false)),
            _ => Err(invalid("enter a valid boolean", "invalid")),
        },
        _ => Err(invalid("enter a valid boolean", "invalid")),
    }
}

fn coerce_date(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Date(_) => Ok(value.clone()),
        Value::DateTime(s) => s
            .get(..10)
            .map(|d| Value::Date(d.to_string()))
            .ok_or_else(|| invalid("enter a valid date", "invalid")),
        Value::Text(s) if matches_pattern(s.trim(), DATE_SHAPE) => {
            Ok(Value::Date(s.trim().to_string()))
        }
        _ => Err(invalid("enter a valid date", "invalid")),
    }
}

fn coerce_datetime(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::DateTime(_) => Ok(value.clone()),
        Value::Date(s) => Ok(Value::DateTime(format!("{s}T00:00:00"))),
        Value::Text(s) if matches_pattern(s.trim(), DATETIME_SHAPE) => {
            let mut canonical = s.trim().replace(' ', "T");
            // Seconds are optional on input; the canonical form carries them.
            if canonical.len() == 16 {
                canonical.push_str(":00");
            }
            Ok(Value::DateTime(canonical))
        }
        Value::Text(s) if matches_pattern(s.trim(), DATE_SHAPE) => {
            Ok(Value::DateTime(format!("{}T00:00:00", s.trim())))
        }
        _ => Err(invalid("enter a valid date/time", "invalid")),
    }
}

fn coerce_time(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Time(_) => Ok(value.clone()),
        Value::Text(s) if matches_pattern(s.trim(), TIME_SHAPE) => {
            let mut canonical = s.trim().to_string();
            if canonical.len() == 5 {
                canonical.push_str(":00");
            }
            Ok(Value::Time(canonical))
        }
        _ => Err(invalid("enter a valid time", "invalid")),
    }
}

fn coerce_interval(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Duration(_) => Ok(value.clone()),
        Value::Int(seconds) => seconds
            .checked_mul(1_000_000)
            .map(Value::Duration)
            .ok_or_else(|| invalid("enter a valid duration", "invalid")),
        Value::Float(seconds) if seconds.is_finite() => {
            let micros = seconds * 1_000_000.0;
            if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
                return Err(invalid("enter a valid duration", "invalid"));
            }
            Ok(Value::Duration(micros as i64))
        }
        Value::Text(s) => parse_duration(s.trim())
            .map(Value::Duration)
            .ok_or_else(|| invalid("enter a valid duration", "invalid")),
        _ => Err(invalid("enter a valid duration", "invalid")),
    }
}

fn coerce_enum(value: &Value, def: &EnumDef) -> Result<Value, ValidationError> {
    let raw = match value {
        Value::Text(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        _ => {
            return Err(invalid(
                "select a valid choice",
                "invalid_choice",
            ));
        }
    };
    match def {
        EnumDef::Values(values) => {
            if values.iter().any(|v| *v == raw) {
                Ok(Value::Text(raw))
            } else {
                Err(invalid(
                    &format!("`{raw}` is not one of the available choices"),
                    "invalid_choice",
                ))
            }
        }
        EnumDef::Typed(def) => {
            // Values coerce to their variant; names are the canonical form.
            if let Some(variant) = def.by_value(&raw) {
                Ok(Value::Text(variant.name.clone()))
            } else if def.by_name(&raw).is_some() {
                Ok(Value::Text(raw))
            } else {
                Err(invalid(
                    &format!("`{raw}` is not a member of {}", def.name),
                    "invalid_choice",
                ))
            }
        }
    }
}

fn coerce_uuid(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Uuid(_) => Ok(value.clone()),
        Value::Text(s) if matches_pattern(s.trim(), UUID_SHAPE) => {
            Ok(Value::Uuid(s.trim().to_lowercase()))
        }
        _ => Err(invalid("enter a valid UUID", "invalid")),
    }
}

fn coerce_json(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Json(_) => Ok(value.clone()),
        Value::Text(s) => serde_json::from_str(s)
            .map(Value::Json)
            .map_err(|_| invalid("enter valid JSON", "invalid")),
        other => Ok(Value::Json(other.to_json())),
    }
}

fn coerce_binary(value: &Value) -> Result<Value, ValidationError> {
    match value {
        Value::Bytes(_) => Ok(value.clone()),
        Value::Text(s) => Ok(Value::Bytes(s.clone().into_bytes())),
        _ => Err(invalid("enter valid binary data", "invalid")),
    }
}

fn coerce_array(value: &Value, elem: &LogicalType) -> Result<Value, ValidationError> {
    match value {
        Value::Array(items) => {
            let coerced: Result<Vec<Value>, ValidationError> =
                items.iter().map(|item| coerce(item, elem)).collect();
            Ok(Value::Array(coerced?))
        }
        _ => Err(invalid("enter a list of values", "invalid")),
    }
}

/// Parse a duration string into whole microseconds.
///
/// Accepted forms: `[-][D ]HH:MM[:SS[.ffffff]]` or a plain number of
/// seconds.
#[must_use]
pub fn parse_duration(input: &str) -> Option<i64> {
    let (negative, body) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let micros = if let Ok(seconds) = body.parse::<i64>() {
        seconds.checked_mul(1_000_000)?
    } else if let Ok(seconds) = body.parse::<f64>() {
        if !seconds.is_finite() {
            return None;
        }
        (seconds * 1_000_000.0) as i64
    } else {
        let (days, clock) = match body.split_once(' ') {
            Some((d, rest)) => (d.parse::<i64>().ok()?, rest),
            None => (0, body),
        };
        let mut parts = clock.split(':');
        let hours = parts.next()?.parse::<i64>().ok()?;
        let minutes = parts.next()?.parse::<i64>().ok()?;
        let seconds_part = parts.next().unwrap_or("0");
        if parts.next().is_some() {
            return None;
        }
        let seconds = seconds_part.parse::<f64>().ok()?;
        if !(0.0..60.0).contains(&seconds) || !(0..60).contains(&minutes) {
            return None;
        }
        let whole = days * 86_400 + hours * 3_600 + minutes * 60;
        whole.checked_mul(1_000_000)? + (seconds * 1_000_000.0) as i64
    };

    Some(if negative { -micros } else { micros })
}
