//! Logical column types.
//!
//! `LogicalType` is the closed set of persisted types the inspection layer
//! understands. Specialization dispatch, coercion, and form-field synthesis
//! all branch on it.

use serde::Serialize;

/// Logical type of a persisted column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LogicalType {
    /// Bounded string (varchar). `length` is the declared bound, if any.
    String { length: Option<u32> },
    /// Unbounded text.
    Text,
    /// 16-bit integer column.
    SmallInteger,
    /// 32-bit integer column.
    Integer,
    /// 64-bit integer column.
    BigInteger,
    /// Floating-point column.
    Float,
    /// Fixed or floating decimal column.
    ///
    /// `asdecimal` records whether the driver yields exact decimals; when
    /// false the column behaves as a float regardless of precision/scale.
    Numeric {
        precision: Option<u8>,
        scale: Option<u8>,
        asdecimal: bool,
    },
    /// Boolean column.
    Boolean,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Time of day.
    Time,
    /// Elapsed-time interval.
    Interval,
    /// Enumerated column.
    Enum(EnumDef),
    /// UUID column.
    Uuid,
    /// JSON document column.
    Json,
    /// Raw binary column.
    Binary,
    /// Array column with a uniform element type.
    Array(Box<LogicalType>),
}

impl LogicalType {
    /// Short name of the type, for error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            LogicalType::String { .. } => "string",
            LogicalType::Text => "text",
            LogicalType::SmallInteger => "small_integer",
            LogicalType::Integer => "integer",
            LogicalType::BigInteger => "big_integer",
            LogicalType::Float => "float",
            LogicalType::Numeric { .. } => "numeric",
            LogicalType::Boolean => "boolean",
            LogicalType::Date => "date",
            LogicalType::DateTime => "datetime",
            LogicalType::Time => "time",
            LogicalType::Interval => "interval",
            LogicalType::Enum(_) => "enum",
            LogicalType::Uuid => "uuid",
            LogicalType::Json => "json",
            LogicalType::Binary => "binary",
            LogicalType::Array(_) => "array",
        }
    }

    /// Whether this is one of the integer column types.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            LogicalType::SmallInteger | LogicalType::Integer | LogicalType::BigInteger
        )
    }

    /// Whether this type yields exact decimals.
    #[must_use]
    pub const fn is_decimal(&self) -> bool {
        matches!(self, LogicalType::Numeric { asdecimal: true, .. })
    }
}

/// Declared enumeration backing an [`LogicalType::Enum`] column.
///
/// A plain value list enumerates the allowed strings directly. A typed
/// enumeration wraps a host-language enum type with named variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EnumDef {
    /// Allowed string values, in declaration order.
    Values(Vec<String>),
    /// A host enum type with named variants.
    Typed(EnumTypeDef),
}

impl EnumDef {
    /// Build a plain value-list enumeration.
    pub fn values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EnumDef::Values(values.into_iter().map(Into::into).collect())
    }

    /// Choice pairs `(stored value, display label)` in declaration order.
    ///
    /// Plain lists pair each value with itself. Typed enumerations store the
    /// variant name and display the variant value.
    #[must_use]
    pub fn choice_pairs(&self) -> Vec<(String, String)> {
        match self {
            EnumDef::Values(values) => values.iter().map(|v| (v.clone(), v.clone())).collect(),
            EnumDef::Typed(def) => def
                .variants
                .iter()
                .map(|v| (v.name.clone(), v.value.clone()))
                .collect(),
        }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            EnumDef::Values(values) => values.len(),
            EnumDef::Typed(def) => def.variants.len(),
        }
    }

    /// Whether the enumeration has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A typed host enumeration: type name plus ordered variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumTypeDef {
    /// Host type name (e.g. `VehicleType`).
    pub name: String,
    /// Variants in declaration order.
    pub variants: Vec<EnumVariant>,
}

impl EnumTypeDef {
    /// Create a typed enumeration definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
        }
    }

    /// Append a variant.
    #[must_use]
    pub fn variant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variants.push(EnumVariant {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Look up a variant by its name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Look up a variant by its value.
    #[must_use]
    pub fn by_value(&self, value: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.value == value)
    }
}

/// One variant of a typed enumeration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumVariant {
    /// Variant name (the canonical stored form).
    pub name: String,
    /// Variant value (the display form).
    pub value: String,
}
