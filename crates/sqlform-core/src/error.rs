//! Error types.
//!
//! Two families with different lifecycles. [`Error`] covers fatal per-call
//! failures (misconfiguration, unknown-field lookups). [`ValidationError`] is
//! a recoverable nested tree: cleaning cascades accumulate failures per field
//! and raise the aggregate once at the outermost boundary.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error as ThisError;

/// Key under which non-field (model-level) failures accumulate.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Result alias used across the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Fatal errors raised by the metadata and form layers.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The caller or host wiring is wrong; retrying cannot succeed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No mapper was registered for the named model.
    #[error("no mapper registered for model `{0}`")]
    UnregisteredModel(String),

    /// A field lookup named something the model does not have.
    #[error("unknown field `{field}` on model `{model}`")]
    UnknownField {
        /// Model the lookup ran against.
        model: String,
        /// The unknown attribute name.
        field: String,
    },

    /// Input data whose shape does not match the model it claims to be.
    #[error("malformed graph data: {0}")]
    Malformed(String),

    /// An aggregated validation failure escaping through a fatal boundary.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    /// Build a configuration error from any displayable message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Build a malformed-data error from any displayable message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::Malformed(message.into())
    }
}

/// One validation failure message with an optional stable code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    /// Human-readable message.
    pub message: String,
    /// Stable machine code (e.g. `required`, `max_length`).
    pub code: Option<String>,
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// A nested validation failure tree.
///
/// Leaves are coded messages. Lists collect sibling failures for one target.
/// Nested maps scope failures under field names, mirroring the shape of the
/// model that produced them (composites and relations nest recursively).
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A single failure.
    Message(ErrorMessage),
    /// Several failures for the same target.
    List(Vec<ValidationError>),
    /// Failures scoped under field names.
    Nested(BTreeMap<String, ValidationError>),
}

impl ValidationError {
    /// A plain message leaf with no code.
    pub fn message(message: impl Into<String>) -> Self {
        ValidationError::Message(ErrorMessage {
            message: message.into(),
            code: None,
        })
    }

    /// A message leaf with a stable code.
    pub fn coded(message: impl Into<String>, code: impl Into<String>) -> Self {
        ValidationError::Message(ErrorMessage {
            message: message.into(),
            code: Some(code.into()),
        })
    }

    /// Borrow the nested map when this is a `Nested` node.
    #[must_use]
    pub fn as_nested(&self) -> Option<&BTreeMap<String, ValidationError>> {
        match self {
            ValidationError::Nested(map) => Some(map),
            _ => None,
        }
    }

    /// The failure under `field` when this is a `Nested` node.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&ValidationError> {
        self.as_nested().and_then(|map| map.get(field))
    }

    /// Flatten this node into leaf messages, depth-first.
    #[must_use]
    pub fn messages(&self) -> Vec<&ErrorMessage> {
        let mut out = Vec::new();
        self.collect_messages(&mut out);
        out
    }

    fn collect_messages<'a>(&'a self, out: &mut Vec<&'a ErrorMessage>) {
        match self {
            ValidationError::Message(m) => out.push(m),
            ValidationError::List(items) => {
                for item in items {
                    item.collect_messages(out);
                }
            }
            ValidationError::Nested(map) => {
                for item in map.values() {
                    item.collect_messages(out);
                }
            }
        }
    }

    /// Merge another failure into this one, preserving both sides.
    ///
    /// Nested maps merge key-wise; everything else collapses into a list.
    #[must_use]
    pub fn merge(self, other: ValidationError) -> ValidationError {
        match (self, other) {
            (ValidationError::Nested(mut a), ValidationError::Nested(b)) => {
                for (key, value) in b {
                    match a.remove(&key) {
                        Some(existing) => {
                            a.insert(key, existing.merge(value));
                        }
                        None => {
                            a.insert(key, value);
                        }
                    }
                }
                ValidationError::Nested(a)
            }
            (ValidationError::List(mut a), ValidationError::List(b)) => {
                a.extend(b);
                ValidationError::List(a)
            }
            (ValidationError::List(mut a), other) => {
                a.push(other);
                ValidationError::List(a)
            }
            (this, ValidationError::List(mut b)) => {
                b.insert(0, this);
                ValidationError::List(b)
            }
            (this, other) => ValidationError::List(vec![this, other]),
        }
    }

    /// Render the tree as plain JSON (strings, arrays, objects).
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ValidationError::Message(m) => serde_json::Value::String(m.message.clone()),
            ValidationError::List(items) => {
                serde_json::Value::Array(items.iter().map(ValidationError::to_json).collect())
            }
            ValidationError::Nested(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {}", self.to_json())
    }
}

impl std::error::Error for ValidationError {}

impl serde::Serialize for ValidationError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Accumulator for validation cascades.
///
/// Stages add failures under field names (or the non-field bucket) without
/// short-circuiting; `result` raises the aggregate once at the end.
///
/// # Example
///
/// ```
/// use sqlform_core::error::{ValidationError, ValidationErrors};
///
/// let mut errs = ValidationErrors::new();
/// errs.add("name", ValidationError::coded("required", "required"));
/// errs.add("name", ValidationError::message("too plain"));
/// let err = errs.result().unwrap_err();
/// assert_eq!(err.field("name").unwrap().messages().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ValidationErrors {
    fields: BTreeMap<String, ValidationError>,
}

impl ValidationErrors {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no failures have accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Add a failure under a field name.
    pub fn add(&mut self, field: impl Into<String>, error: ValidationError) {
        let field = field.into();
        match self.fields.remove(&field) {
            Some(existing) => {
                self.fields.insert(field, existing.merge(error));
            }
            None => {
                self.fields.insert(field, error);
            }
        }
    }

    /// Add a model-level failure to the non-field bucket.
    pub fn add_non_field(&mut self, error: ValidationError) {
        self.add(NON_FIELD_ERRORS, error);
    }

    /// Merge a whole failure tree into the accumulator.
    ///
    /// Nested trees merge per field; anything else lands in the non-field
    /// bucket.
    pub fn extend(&mut self, error: ValidationError) {
        match error {
            ValidationError::Nested(map) => {
                for (field, err) in map {
                    self.add(field, err);
                }
            }
            other => self.add_non_field(other),
        }
    }

    /// Peek at the accumulated failures so far.
    #[must_use]
    pub fn errors(&self) -> &BTreeMap<String, ValidationError> {
        &self.fields
    }

    /// Finish: `Ok` when empty, the aggregated tree otherwise.
    pub fn result(self) -> Result<(), ValidationError> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Nested(self.fields))
        }
    }
}
