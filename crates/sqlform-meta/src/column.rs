//! Column descriptors and specialization dispatch.
//!
//! A [`ColumnInfo`] wraps one declared column and answers the form-facing
//! questions: is it required, what label does it carry, which validators run,
//! and what field configuration does it produce. The *kind* of a column is
//! picked by the first matching rule of an ordered dispatch table over the
//! logical type, so host applications can install narrower rules ahead of
//! the stock ones.

use std::sync::{Arc, OnceLock, RwLock};

use serde::Serialize;

use sqlform_core::coerce::coerce;
use sqlform_core::error::ValidationError;
use sqlform_core::mapper::{ColumnDef, DefaultValue};
use sqlform_core::types::{EnumDef, EnumTypeDef, LogicalType};
use sqlform_core::validators::Validator;
use sqlform_core::value::Value;
use sqlform_core::widget::Widget;

/// Form-facing specialization of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnKind {
    /// No specialization matched; no default form field exists.
    Plain,
    /// Bounded string.
    String,
    /// Unbounded text.
    Text,
    /// Integer.
    Integer,
    /// Float (including float-backed numerics).
    Float,
    /// Exact decimal.
    Decimal,
    /// Boolean.
    Boolean,
    /// Enumerated choice.
    Enum,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Time of day.
    Time,
    /// Elapsed-time interval.
    Interval,
}

/// One dispatch rule: a named predicate over logical types and the kind it
/// selects.
#[derive(Clone)]
pub struct SpecializationRule {
    name: String,
    kind: ColumnKind,
    matches: Arc<dyn Fn(&LogicalType) -> bool + Send + Sync>,
}

impl SpecializationRule {
    /// Create a rule.
    pub fn new<F>(name: impl Into<String>, kind: ColumnKind, matches: F) -> Self
    where
        F: Fn(&LogicalType) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind,
            matches: Arc::new(matches),
        }
    }

    /// Rule name, for logs and diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind this rule selects.
    #[must_use]
    pub const fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// Whether the rule matches a logical type.
    #[must_use]
    pub fn matches(&self, logical_type: &LogicalType) -> bool {
        (self.matches)(logical_type)
    }
}

impl std::fmt::Debug for SpecializationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecializationRule")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Ordered, overridable dispatch table from logical type to [`ColumnKind`].
///
/// First matching rule wins, so narrower rules belong ahead of broader
/// ones. Unmatched types fall back to [`ColumnKind::Plain`].
pub struct SpecializationRegistry {
    rules: RwLock<Vec<SpecializationRule>>,
}

impl SpecializationRegistry {
    /// Registry preloaded with the stock rules.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            rules: RwLock::new(default_rules()),
        }
    }

    /// Registry with no rules; everything is `Plain` until rules install.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
        }
    }

    /// Resolve the kind for a logical type.
    #[must_use]
    pub fn kind_for(&self, logical_type: &LogicalType) -> ColumnKind {
        let rules = self.rules.read().unwrap();
        for rule in rules.iter() {
            if rule.matches(logical_type) {
                return rule.kind;
            }
        }
        tracing::debug!(
            logical_type = logical_type.name(),
            "No specialization rule matched; treating column as plain"
        );
        ColumnKind::Plain
    }

    /// Install a rule ahead of every existing rule.
    pub fn prepend(&self, rule: SpecializationRule) {
        self.rules.write().unwrap().insert(0, rule);
    }

    /// Install a rule behind every existing rule.
    pub fn append(&self, rule: SpecializationRule) {
        self.rules.write().unwrap().push(rule);
    }

    /// Replace the whole table.
    pub fn replace(&self, rules: Vec<SpecializationRule>) {
        *self.rules.write().unwrap() = rules;
    }

    /// Rule names in dispatch order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<String> {
        self.rules
            .read()
            .unwrap()
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }
}

impl Default for SpecializationRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// The stock dispatch rules, narrowest first.
#[must_use]
pub fn default_rules() -> Vec<SpecializationRule> {
    vec![
        SpecializationRule::new("enum", ColumnKind::Enum, |t| {
            matches!(t, LogicalType::Enum(_))
        }),
        SpecializationRule::new("boolean", ColumnKind::Boolean, |t| {
            matches!(t, LogicalType::Boolean)
        }),
        SpecializationRule::new("decimal", ColumnKind::Decimal, |t| {
            matches!(t, LogicalType::Numeric { asdecimal: true, .. })
        }),
        SpecializationRule::new("float", ColumnKind::Float, |t| {
            matches!(
                t,
                LogicalType::Float | LogicalType::Numeric { asdecimal: false, .. }
            )
        }),
        SpecializationRule::new("integer", ColumnKind::Integer, LogicalType::is_integer),
        SpecializationRule::new("datetime", ColumnKind::DateTime, |t| {
            matches!(t, LogicalType::DateTime)
        }),
        SpecializationRule::new("date", ColumnKind::Date, |t| {
            matches!(t, LogicalType::Date)
        }),
        SpecializationRule::new("time", ColumnKind::Time, |t| {
            matches!(t, LogicalType::Time)
        }),
        SpecializationRule::new("interval", ColumnKind::Interval, |t| {
            matches!(t, LogicalType::Interval)
        }),
        SpecializationRule::new("text", ColumnKind::Text, |t| {
            matches!(t, LogicalType::Text)
        }),
        SpecializationRule::new("string", ColumnKind::String, |t| {
            matches!(t, LogicalType::String { .. })
        }),
    ]
}

/// Process-wide dispatch table.
pub fn specialization_registry() -> &'static SpecializationRegistry {
    static REGISTRY: OnceLock<SpecializationRegistry> = OnceLock::new();
    REGISTRY.get_or_init(SpecializationRegistry::with_defaults)
}

/// Recognized form-field configuration produced by a column descriptor.
///
/// Field constructors read this; callers may merge their own overrides on
/// top.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldOptions {
    /// Display label.
    pub label: Option<String>,
    /// Help text.
    pub help_text: Option<String>,
    /// Whether input is required.
    pub required: Option<bool>,
    /// Initial value (only literal column defaults surface here).
    pub initial: Option<Value>,
    /// Validators to run during field cleaning.
    #[serde(skip)]
    pub validators: Vec<Validator>,
    /// Declared widget.
    pub widget: Option<Widget>,
    /// Maximum length, for bounded strings.
    pub max_length: Option<u32>,
    /// Choice pairs `(stored value, display label)`, for enums.
    pub choices: Option<Vec<(String, String)>>,
    /// The typed enumeration itself, when the column wraps one.
    pub enum_type: Option<EnumTypeDef>,
    /// Total digits, for exact decimals.
    pub max_digits: Option<u8>,
    /// Fractional digits, for exact decimals.
    pub decimal_places: Option<u8>,
}

impl FieldOptions {
    /// Merge caller overrides on top of these options.
    ///
    /// Every populated override wins; an override validator list replaces
    /// the declared one.
    #[must_use]
    pub fn merged_with(mut self, overrides: FieldOptions) -> FieldOptions {
        if overrides.label.is_some() {
            self.label = overrides.label;
        }
        if overrides.help_text.is_some() {
            self.help_text = overrides.help_text;
        }
        if overrides.required.is_some() {
            self.required = overrides.required;
        }
        if overrides.initial.is_some() {
            self.initial = overrides.initial;
        }
        if !overrides.validators.is_empty() {
            self.validators = overrides.validators;
        }
        if overrides.widget.is_some() {
            self.widget = overrides.widget;
        }
        if overrides.max_length.is_some() {
            self.max_length = overrides.max_length;
        }
        if overrides.choices.is_some() {
            self.choices = overrides.choices;
        }
        if overrides.enum_type.is_some() {
            self.enum_type = overrides.enum_type;
        }
        if overrides.max_digits.is_some() {
            self.max_digits = overrides.max_digits;
        }
        if overrides.decimal_places.is_some() {
            self.decimal_places = overrides.decimal_places;
        }
        self
    }
}

/// Descriptor for one scalar persisted attribute.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    def: ColumnDef,
    kind: ColumnKind,
}

impl ColumnInfo {
    /// Build a descriptor using the process-wide dispatch table.
    #[must_use]
    pub fn new(def: ColumnDef) -> Self {
        Self::with_registry(def, specialization_registry())
    }

    /// Build a descriptor against an explicit dispatch table.
    #[must_use]
    pub fn with_registry(def: ColumnDef, registry: &SpecializationRegistry) -> Self {
        let kind = registry.kind_for(&def.logical_type);
        Self { def, kind }
    }

    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// The declared column.
    #[must_use]
    pub fn def(&self) -> &ColumnDef {
        &self.def
    }

    /// Logical type.
    #[must_use]
    pub fn logical_type(&self) -> &LogicalType {
        &self.def.logical_type
    }

    /// Resolved specialization kind.
    #[must_use]
    pub const fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// Whether the column stores NULL.
    #[must_use]
    pub const fn nullable(&self) -> bool {
        self.def.nullable
    }

    /// Whether the column participates in the primary key.
    #[must_use]
    pub const fn primary_key(&self) -> bool {
        self.def.primary_key
    }

    /// Whether the column's value can appear without input: a declared
    /// default or a database-generated value.
    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.def.default.is_some() || self.def.auto_increment
    }

    /// Declared validators, in declaration order.
    #[must_use]
    pub fn validators(&self) -> &[Validator] {
        &self.def.validators
    }

    /// Whether form input is required: the declared override, else the
    /// inverse of nullability.
    #[must_use]
    pub fn required(&self) -> bool {
        self.def.required.unwrap_or(!self.def.nullable)
    }

    /// Display label: the declared override, else derived from the name
    /// (underscores become spaces, first letter upper-cased).
    #[must_use]
    pub fn label(&self) -> String {
        self.def
            .label
            .clone()
            .unwrap_or_else(|| derive_label(&self.def.name))
    }

    /// Build the recognized form-field configuration for this column.
    #[must_use]
    pub fn field_options(&self) -> FieldOptions {
        let mut options = FieldOptions {
            label: Some(self.label()),
            help_text: self.def.help_text.clone(),
            required: Some(self.required()),
            initial: self
                .def
                .default
                .as_ref()
                .and_then(DefaultValue::as_scalar)
                .cloned(),
            validators: self.def.validators.clone(),
            widget: self.def.widget,
            ..FieldOptions::default()
        };
        if self.kind == ColumnKind::String {
            if let LogicalType::String { length } = self.def.logical_type {
                options.max_length = length;
            }
        }
        if self.kind == ColumnKind::Enum {
            if let LogicalType::Enum(def) = &self.def.logical_type {
                options.choices = Some(def.choice_pairs());
                if let EnumDef::Typed(typed) = def {
                    options.enum_type = Some(typed.clone());
                }
            }
        }
        // Digit bounds only apply to exact decimals; a float-backed numeric
        // must not inherit them.
        if self.kind == ColumnKind::Decimal {
            if let LogicalType::Numeric {
                precision,
                scale,
                asdecimal: true,
            } = self.def.logical_type
            {
                options.max_digits = precision;
                options.decimal_places = scale;
            }
        }
        options
    }

    /// Coerce a raw value to the column's canonical form and run the
    /// declared validators, accumulating every failure.
    pub fn clean_value(&self, raw: &Value) -> Result<Value, ValidationError> {
        let cleaned = coerce(raw, &self.def.logical_type)?;
        let mut failures = Vec::new();
        for validator in &self.def.validators {
            if let Err(err) = validator.check(&cleaned) {
                failures.push(err);
            }
        }
        if failures.is_empty() {
            Ok(cleaned)
        } else if failures.len() == 1 {
            Err(failures.into_iter().next().unwrap())
        } else {
            Err(ValidationError::List(failures))
        }
    }
}

/// Derive a display label from an attribute name: underscores become
/// spaces and the first letter is upper-cased.
#[must_use]
pub fn derive_label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlform_core::validators;

    fn column(logical_type: LogicalType) -> ColumnInfo {
        ColumnInfo::new(ColumnDef::new("col", logical_type))
    }

    #[test]
    fn test_default_dispatch() {
        assert_eq!(column(LogicalType::Boolean).kind(), ColumnKind::Boolean);
        assert_eq!(column(LogicalType::Text).kind(), ColumnKind::Text);
        assert_eq!(
            column(LogicalType::String { length: Some(80) }).kind(),
            ColumnKind::String
        );
        assert_eq!(column(LogicalType::SmallInteger).kind(), ColumnKind::Integer);
        assert_eq!(
            column(LogicalType::Enum(EnumDef::values(["a"]))).kind(),
            ColumnKind::Enum
        );
        assert_eq!(column(LogicalType::Json).kind(), ColumnKind::Plain);
    }

    #[test]
    fn test_numeric_dispatch_follows_asdecimal() {
        let fixed = LogicalType::Numeric {
            precision: Some(10),
            scale: Some(2),
            asdecimal: true,
        };
        let floaty = LogicalType::Numeric {
            precision: Some(10),
            scale: Some(2),
            asdecimal: false,
        };
        assert_eq!(column(fixed).kind(), ColumnKind::Decimal);
        assert_eq!(column(floaty).kind(), ColumnKind::Float);
    }

    #[test]
    fn test_prepended_rule_wins() {
        let registry = SpecializationRegistry::with_defaults();
        registry.prepend(SpecializationRule::new(
            "short-string-as-text",
            ColumnKind::Text,
            |t| matches!(t, LogicalType::String { length: None }),
        ));
        let info = ColumnInfo::with_registry(
            ColumnDef::new("notes", LogicalType::String { length: None }),
            &registry,
        );
        assert_eq!(info.kind(), ColumnKind::Text);
        // Bounded strings still hit the stock rule.
        let bounded = ColumnInfo::with_registry(
            ColumnDef::new("name", LogicalType::String { length: Some(10) }),
            &registry,
        );
        assert_eq!(bounded.kind(), ColumnKind::String);
    }

    #[test]
    fn test_required_derivation() {
        let required = ColumnInfo::new(ColumnDef::new("a", LogicalType::Text).nullable(false));
        assert!(required.required());
        let optional = ColumnInfo::new(ColumnDef::new("a", LogicalType::Text).nullable(true));
        assert!(!optional.required());
        let overridden =
            ColumnInfo::new(ColumnDef::new("a", LogicalType::Text).nullable(false).required(false));
        assert!(!overridden.required());
    }

    #[test]
    fn test_label_derivation() {
        let info = ColumnInfo::new(ColumnDef::new("first_name", LogicalType::Text));
        assert_eq!(info.label(), "First name");
        let explicit =
            ColumnInfo::new(ColumnDef::new("first_name", LogicalType::Text).label("Given name"));
        assert_eq!(explicit.label(), "Given name");
    }

    #[test]
    fn test_field_options_for_string() {
        let info = ColumnInfo::new(
            ColumnDef::new("name", LogicalType::String { length: Some(50) })
                .nullable(false)
                .help_text("full name"),
        );
        let options = info.field_options();
        assert_eq!(options.max_length, Some(50));
        assert_eq!(options.required, Some(true));
        assert_eq!(options.help_text.as_deref(), Some("full name"));
        assert_eq!(options.label.as_deref(), Some("Name"));
    }

    #[test]
    fn test_field_options_decimal_guard() {
        let fixed = ColumnInfo::new(ColumnDef::new(
            "price",
            LogicalType::Numeric {
                precision: Some(10),
                scale: Some(2),
                asdecimal: true,
            },
        ));
        let options = fixed.field_options();
        assert_eq!(options.max_digits, Some(10));
        assert_eq!(options.decimal_places, Some(2));

        let floaty = ColumnInfo::new(ColumnDef::new(
            "ratio",
            LogicalType::Numeric {
                precision: Some(10),
                scale: Some(2),
                asdecimal: false,
            },
        ));
        let options = floaty.field_options();
        assert_eq!(options.max_digits, None);
        assert_eq!(options.decimal_places, None);
    }

    #[test]
    fn test_field_options_initial_only_for_literal_defaults() {
        let literal =
            ColumnInfo::new(ColumnDef::new("n", LogicalType::Integer).default_value(Value::Int(5)));
        assert_eq!(literal.field_options().initial, Some(Value::Int(5)));

        let computed = ColumnInfo::new(ColumnDef::new("n", LogicalType::Integer).computed_default());
        assert_eq!(computed.field_options().initial, None);

        let server =
            ColumnInfo::new(ColumnDef::new("n", LogicalType::Integer).server_default("now()"));
        assert_eq!(server.field_options().initial, None);
    }

    #[test]
    fn test_enum_options_expose_choices() {
        let typed = EnumTypeDef::new("VehicleType")
            .variant("Car", "car")
            .variant("Truck", "truck");
        let info = ColumnInfo::new(ColumnDef::new(
            "type",
            LogicalType::Enum(EnumDef::Typed(typed)),
        ));
        let options = info.field_options();
        let choices = options.choices.unwrap();
        assert_eq!(choices.len(), 2);
        assert_eq!(options.enum_type.unwrap().name, "VehicleType");
    }

    #[test]
    fn test_clean_value_runs_all_validators() {
        let info = ColumnInfo::new(
            ColumnDef::new("age", LogicalType::Integer)
                .validator(validators::min_value(18.0))
                .validator(validators::max_value(10.0)),
        );
        // Both validators fail for 15: min wants >= 18, max wants <= 10.
        let err = info.clean_value(&Value::Text("15".to_string())).unwrap_err();
        assert_eq!(err.messages().len(), 2);
    }

    #[test]
    fn test_clean_value_coerces_first() {
        let info = ColumnInfo::new(ColumnDef::new("age", LogicalType::Integer));
        assert_eq!(
            info.clean_value(&Value::Text("21".to_string())).unwrap(),
            Value::Int(21)
        );
        assert!(info.clean_value(&Value::Text("abc".to_string())).is_err());
    }

    #[test]
    fn test_options_merge_caller_wins() {
        let base = FieldOptions {
            label: Some("Name".to_string()),
            required: Some(true),
            ..FieldOptions::default()
        };
        let merged = base.merged_with(FieldOptions {
            required: Some(false),
            help_text: Some("override".to_string()),
            ..FieldOptions::default()
        });
        assert_eq!(merged.label.as_deref(), Some("Name"));
        assert_eq!(merged.required, Some(false));
        assert_eq!(merged.help_text.as_deref(), Some("override"));
    }
}
