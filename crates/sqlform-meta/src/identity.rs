//! Identity keys.
//!
//! An identity key is the `(class, primary key values)` pair that names one
//! persisted row. Deserialization uses it to share one instance across
//! repeated references; serialization and cloning use it to know which
//! columns never copy.

use std::fmt;

use sqlform_core::mapper::EntityKey;
use sqlform_core::value::Value;

/// Identity of one persisted instance.
///
/// Values are ordered by the class's primary key column order, so two keys
/// for the same row always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    class: EntityKey,
    values: Vec<Value>,
}

impl IdentityKey {
    /// Build a key from a class token and ordered primary key values.
    pub fn new(class: EntityKey, values: Vec<Value>) -> Self {
        Self { class, values }
    }

    /// The class token.
    #[must_use]
    pub fn class(&self) -> &EntityKey {
        &self.class
    }

    /// The ordered primary key values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.class)?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

/// Primary key values of one instance, shaped by key cardinality.
///
/// Callers must match; a composite key is never silently flattened into a
/// scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrimaryKey {
    /// Single-column key.
    Scalar(Value),
    /// Multi-column key, in primary key column order.
    Composite(Vec<Value>),
}

impl PrimaryKey {
    /// Shape ordered key values by cardinality.
    #[must_use]
    pub fn from_values(mut values: Vec<Value>) -> Self {
        if values.len() == 1 {
            PrimaryKey::Scalar(values.remove(0))
        } else {
            PrimaryKey::Composite(values)
        }
    }

    /// The single value when this is a scalar key.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            PrimaryKey::Scalar(value) => Some(value),
            PrimaryKey::Composite(_) => None,
        }
    }

    /// The ordered values regardless of shape.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        match self {
            PrimaryKey::Scalar(value) => vec![value],
            PrimaryKey::Composite(values) => values,
        }
    }
}
