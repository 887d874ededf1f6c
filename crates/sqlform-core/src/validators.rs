//! Validator callables and the stock validator library.
//!
//! A [`Validator`] wraps a named check over a value. Columns, composites,
//! mappers, and form fields all carry ordered validator lists; cascades run
//! every validator and accumulate the failures.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::error::ValidationError;
use crate::value::Value;

/// A named validation callable over `T`.
///
/// Validators never short-circuit a cascade; each returns its own failure and
/// the caller accumulates. Stock validators skip `Null` input, since
/// requiredness is checked separately.
#[derive(Clone)]
pub struct Validator<T = Value> {
    name: String,
    func: Arc<dyn Fn(&T) -> Result<(), ValidationError> + Send + Sync>,
}

impl<T> Validator<T> {
    /// Wrap a closure as a named validator.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&T) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// The validator's name, for logs and debugging.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the check.
    pub fn check(&self, value: &T) -> Result<(), ValidationError> {
        (self.func)(value)
    }
}

impl<T> std::fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator").field("name", &self.name).finish()
    }
}

// ===== Stock validators =====

/// Numeric value must be at least `min`.
#[must_use]
pub fn min_value(min: f64) -> Validator {
    Validator::new(format!("min_value({min})"), move |value: &Value| {
        if value.is_null() {
            return Ok(());
        }
        match numeric(value) {
            Some(n) if n < min => Err(ValidationError::coded(
                format!("ensure this value is greater than or equal to {min}"),
                "min_value",
            )),
            _ => Ok(()),
        }
    })
}

/// Numeric value must be at most `max`.
#[must_use]
pub fn max_value(max: f64) -> Validator {
    Validator::new(format!("max_value({max})"), move |value: &Value| {
        if value.is_null() {
            return Ok(());
        }
        match numeric(value) {
            Some(n) if n > max => Err(ValidationError::coded(
                format!("ensure this value is less than or equal to {max}"),
                "max_value",
            )),
            _ => Ok(()),
        }
    })
}

/// Text must be at least `min` characters long.
#[must_use]
pub fn min_length(min: usize) -> Validator {
    Validator::new(format!("min_length({min})"), move |value: &Value| {
        if value.is_null() {
            return Ok(());
        }
        match value.as_str() {
            Some(s) if s.chars().count() < min => Err(ValidationError::coded(
                format!("ensure this value has at least {min} characters"),
                "min_length",
            )),
            _ => Ok(()),
        }
    })
}

/// Text must be at most `max` characters long.
#[must_use]
pub fn max_length(max: usize) -> Validator {
    Validator::new(format!("max_length({max})"), move |value: &Value| {
        if value.is_null() {
            return Ok(());
        }
        match value.as_str() {
            Some(s) if s.chars().count() > max => Err(ValidationError::coded(
                format!("ensure this value has at most {max} characters"),
                "max_length",
            )),
            _ => Ok(()),
        }
    })
}

/// Text must match the regex `pattern`.
///
/// Compiled patterns are cached process-wide; an invalid pattern fails the
/// check (and logs a warning) rather than panicking.
#[must_use]
pub fn pattern(pattern: impl Into<String>) -> Validator {
    let pattern = pattern.into();
    Validator::new(format!("pattern({pattern})"), move |value: &Value| {
        if value.is_null() {
            return Ok(());
        }
        let Some(s) = value.as_str() else {
            return Ok(());
        };
        if matches_pattern(s, &pattern) {
            Ok(())
        } else {
            Err(ValidationError::coded(
                "enter a valid value",
                "invalid",
            ))
        }
    })
}

/// Value must be one of the allowed choices.
#[must_use]
pub fn one_of<I, S>(choices: I) -> Validator
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
    Validator::new("one_of", move |value: &Value| {
        if value.is_null() {
            return Ok(());
        }
        let rendered = value.to_string();
        if choices.iter().any(|c| *c == rendered) {
            Ok(())
        } else {
            Err(ValidationError::coded(
                format!("`{rendered}` is not one of the available choices"),
                "invalid_choice",
            ))
        }
    })
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Decimal(s) => s.parse().ok(),
        other => other.as_float(),
    }
}

// ===== Regex cache =====

/// Thread-safe cache of compiled regex patterns.
///
/// Patterns compile lazily on first use and stay cached for the lifetime of
/// the process.
struct RegexCache {
    cache: std::sync::RwLock<std::collections::HashMap<String, Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: std::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str) -> Result<Regex, regex::Error> {
        // Fast path: already cached
        {
            let cache = self.cache.read().unwrap();
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }

        // Slow path: compile and cache
        let regex = Regex::new(pattern)?;
        {
            let mut cache = self.cache.write().unwrap();
            cache.insert(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

/// Check a string against a regex pattern, using the process-wide cache.
///
/// Returns `false` (with a warning) when the pattern itself is invalid;
/// validation stays resilient rather than panicking.
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    match regex_cache().get_or_compile(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(
                pattern = pattern,
                error = %e,
                "Invalid regex pattern in validation, treating as non-match"
            );
            false
        }
    }
}
