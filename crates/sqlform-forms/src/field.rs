//! The concrete form-field set.
//!
//! Every field shares one cleaning pipeline: blank input resolves against
//! the required flag, non-blank input coerces to the field's canonical value,
//! then the declared validators run with every failure accumulated. The
//! specializations only differ in their coercion step and default widget.

use sqlform_core::coerce::coerce;
use sqlform_core::error::ValidationError;
use sqlform_core::types::{EnumDef, LogicalType};
use sqlform_core::value::Value;
use sqlform_core::widget::Widget;
use sqlform_meta::column::FieldOptions;

/// A bound form field synthesized from a column or relationship descriptor.
pub trait FormField {
    /// Field name, matching the model attribute it binds.
    fn name(&self) -> &str;

    /// The resolved configuration this field was built with.
    fn options(&self) -> &FieldOptions;

    /// Widget to render with: the declared override, else the field's
    /// default.
    fn widget(&self) -> Widget {
        self.options().widget.unwrap_or(self.default_widget())
    }

    /// The field's stock widget when none is declared.
    fn default_widget(&self) -> Widget;

    /// Clean one raw input value into the field's canonical form.
    fn clean(&self, raw: &Value) -> Result<Value, ValidationError>;
}

impl std::fmt::Debug for dyn FormField + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormField")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

fn is_required(options: &FieldOptions) -> bool {
    options.required.unwrap_or(true)
}

/// Shared pipeline: blank handling, coercion, then declared validators.
fn clean_pipeline<F>(
    options: &FieldOptions,
    raw: &Value,
    coerce_step: F,
) -> Result<Value, ValidationError>
where
    F: FnOnce(&Value) -> Result<Value, ValidationError>,
{
    if raw.is_blank() {
        return if is_required(options) {
            Err(ValidationError::coded("this field is required", "required"))
        } else {
            Ok(Value::Null)
        };
    }
    let cleaned = coerce_step(raw)?;
    let mut failures = Vec::new();
    for validator in &options.validators {
        if let Err(err) = validator.check(&cleaned) {
            failures.push(err);
        }
    }
    match failures.len() {
        0 => Ok(cleaned),
        1 => Err(failures.into_iter().next().unwrap()),
        _ => Err(ValidationError::List(failures)),
    }
}

macro_rules! field_accessors {
    () => {
        fn name(&self) -> &str {
            &self.name
        }

        fn options(&self) -> &FieldOptions {
            &self.options
        }
    };
}

/// Single-line bounded text input.
#[derive(Debug, Clone)]
pub struct CharField {
    name: String,
    options: FieldOptions,
}

impl CharField {
    /// Create a field from resolved options.
    #[must_use]
    pub fn new(name: impl Into<String>, options: FieldOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl FormField for CharField {
    field_accessors!();

    fn default_widget(&self) -> Widget {
        Widget::TextInput
    }

    fn clean(&self, raw: &Value) -> Result<Value, ValidationError> {
        let max_length = self.options.max_length;
        clean_pipeline(&self.options, raw, |value| {
            let cleaned = coerce(value, &LogicalType::String { length: max_length })?;
            if let (Some(max), Some(s)) = (max_length, cleaned.as_str()) {
                if s.chars().count() > max as usize {
                    return Err(ValidationError::coded(
                        format!("ensure this value has at most {max} characters"),
                        "max_length",
                    ));
                }
            }
            Ok(cleaned)
        })
    }
}

/// Multi-line text input.
#[derive(Debug, Clone)]
pub struct TextField {
    name: String,
    options: FieldOptions,
}

impl TextField {
    /// Create a field from resolved options.
    #[must_use]
    pub fn new(name: impl Into<String>, options: FieldOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl FormField for TextField {
    field_accessors!();

    fn default_widget(&self) -> Widget {
        Widget::Textarea
    }

    fn clean(&self, raw: &Value) -> Result<Value, ValidationError> {
        clean_pipeline(&self.options, raw, |value| coerce(value, &LogicalType::Text))
    }
}

/// Checkbox-style boolean input.
#[derive(Debug, Clone)]
pub struct BooleanField {
    name: String,
    options: FieldOptions,
}

impl BooleanField {
    /// Create a field from resolved options.
    #[must_use]
    pub fn new(name: impl Into<String>, options: FieldOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl FormField for BooleanField {
    field_accessors!();

    fn default_widget(&self) -> Widget {
        Widget::CheckboxInput
    }

    fn clean(&self, raw: &Value) -> Result<Value, ValidationError> {
        clean_pipeline(&self.options, raw, |value| {
            coerce(value, &LogicalType::Boolean)
        })
    }
}

/// Whole-number input.
#[derive(Debug, Clone)]
pub struct IntegerField {
    name: String,
    options: FieldOptions,
}

impl IntegerField {
    /// Create a field from resolved options.
    #[must_use]
    pub fn new(name: impl Into<String>, options: FieldOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl FormField for IntegerField {
    field_accessors!();

    fn default_widget(&self) -> Widget {
        Widget::NumberInput
    }

    fn clean(&self, raw: &Value) -> Result<Value, ValidationError> {
        clean_pipeline(&self.options, raw, |value| {
            coerce(value, &LogicalType::Integer)
        })
    }
}

/// Floating-point input.
#[derive(Debug, Clone)]
pub struct FloatField {
    name: String,
    options: FieldOptions,
}

impl FloatField {
    /// Create a field from resolved options.
    #[must_use]
    pub fn new(name: impl Into<String>, options: FieldOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl FormField for FloatField {
    field_accessors!();

    fn default_widget(&self) -> Widget {
        Widget::NumberInput
    }

    fn clean(&self, raw: &Value) -> Result<Value, ValidationError> {
        clean_pipeline(&self.options, raw, |value| coerce(value, &LogicalType::Float))
    }
}

/// Exact-decimal input with digit bounds.
#[derive(Debug, Clone)]
pub struct DecimalField {
    name: String,
    options: FieldOptions,
}

impl DecimalField {
    /// Create a field from resolved options.
    #[must_use]
    pub fn new(name: impl Into<String>, options: FieldOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    fn check_digits(&self, cleaned: &Value) -> Result<(), ValidationError> {
        let Value::Decimal(s) = cleaned else {
            return Ok(());
        };
        let body = s.trim_start_matches(['-', '+']);
        let (whole, fraction) = match body.split_once('.') {
            Some((w, f)) => (w, f),
            None => (body, ""),
        };
        let whole_digits = whole.trim_start_matches('0').len();
        let mut failures = Vec::new();
        if let Some(places) = self.options.decimal_places {
            if fraction.len() > places as usize {
                failures.push(ValidationError::coded(
                    format!("ensure that there are no more than {places} decimal places"),
                    "max_decimal_places",
                ));
            }
        }
        if let Some(max) = self.options.max_digits {
            if whole_digits + fraction.len() > max as usize {
                failures.push(ValidationError::coded(
                    format!("ensure that there are no more than {max} digits in total"),
                    "max_digits",
                ));
            }
        }
        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.into_iter().next().unwrap()),
            _ => Err(ValidationError::List(failures)),
        }
    }
}

impl FormField for DecimalField {
    field_accessors!();

    fn default_widget(&self) -> Widget {
        Widget::NumberInput
    }

    fn clean(&self, raw: &Value) -> Result<Value, ValidationError> {
        clean_pipeline(&self.options, raw, |value| {
            let cleaned = coerce(
                value,
                &LogicalType::Numeric {
                    precision: self.options.max_digits,
                    scale: self.options.decimal_places,
                    asdecimal: true,
                },
            )?;
            self.check_digits(&cleaned)?;
            Ok(cleaned)
        })
    }
}

/// Calendar date input.
#[derive(Debug, Clone)]
pub struct DateField {
    name: String,
    options: FieldOptions,
}

impl DateField {
    /// Create a field from resolved options.
    #[must_use]
    pub fn new(name: impl Into<String>, options: FieldOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl FormField for DateField {
    field_accessors!();

    fn default_widget(&self) -> Widget {
        Widget::DateInput
    }

    fn clean(&self, raw: &Value) -> Result<Value, ValidationError> {
        clean_pipeline(&self.options, raw, |value| coerce(value, &LogicalType::Date))
    }
}

/// Combined date-and-time input.
#[derive(Debug, Clone)]
pub struct DateTimeField {
    name: String,
    options: FieldOptions,
}

impl DateTimeField {
    /// Create a field from resolved options.
    #[must_use]
    pub fn new(name: impl Into<String>, options: FieldOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl FormField for DateTimeField {
    field_accessors!();

    fn default_widget(&self) -> Widget {
        Widget::DateTimeInput
    }

    fn clean(&self, raw: &Value) -> Result<Value, ValidationError> {
        clean_pipeline(&self.options, raw, |value| {
            coerce(value, &LogicalType::DateTime)
        })
    }
}

/// Time-of-day input.
#[derive(Debug, Clone)]
pub struct TimeField {
    name: String,
    options: FieldOptions,
}

impl TimeField {
    /// Create a field from resolved options.
    #[must_use]
    pub fn new(name: impl Into<String>, options: FieldOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl FormField for TimeField {
    field_accessors!();

    fn default_widget(&self) -> Widget {
        Widget::TimeInput
    }

    fn clean(&self, raw: &Value) -> Result<Value, ValidationError> {
        clean_pipeline(&self.options, raw, |value| coerce(value, &LogicalType::Time))
    }
}

/// Elapsed-time input (`[D ]HH:MM:SS` or seconds).
#[derive(Debug, Clone)]
pub struct DurationField {
    name: String,
    options: FieldOptions,
}

impl DurationField {
    /// Create a field from resolved options.
    #[must_use]
    pub fn new(name: impl Into<String>, options: FieldOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl FormField for DurationField {
    field_accessors!();

    fn default_widget(&self) -> Widget {
        Widget::TextInput
    }

    fn clean(&self, raw: &Value) -> Result<Value, ValidationError> {
        clean_pipeline(&self.options, raw, |value| {
            coerce(value, &LogicalType::Interval)
        })
    }
}

/// Generic choice input over `(stored value, display label)` pairs.
#[derive(Debug, Clone)]
pub struct ChoiceField {
    name: String,
    options: FieldOptions,
}

impl ChoiceField {
    /// Create a field from resolved options.
    #[must_use]
    pub fn new(name: impl Into<String>, options: FieldOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    /// The `(stored, display)` pairs this field accepts.
    #[must_use]
    pub fn choices(&self) -> &[(String, String)] {
        self.options.choices.as_deref().unwrap_or(&[])
    }
}

impl FormField for ChoiceField {
    field_accessors!();

    fn default_widget(&self) -> Widget {
        Widget::Select
    }

    fn clean(&self, raw: &Value) -> Result<Value, ValidationError> {
        clean_pipeline(&self.options, raw, |value| {
            let rendered = value.to_string();
            match self
                .choices()
                .iter()
                .find(|(stored, _)| *stored == rendered)
            {
                Some((stored, _)) => Ok(Value::Text(stored.clone())),
                None => Err(ValidationError::coded(
                    format!("`{rendered}` is not one of the available choices"),
                    "invalid_choice",
                )),
            }
        })
    }
}

/// Enum-aware choice input that coerces member values to variant names.
#[derive(Debug, Clone)]
pub struct EnumField {
    name: String,
    options: FieldOptions,
}

impl EnumField {
    /// Create a field from resolved options.
    #[must_use]
    pub fn new(name: impl Into<String>, options: FieldOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    /// The `(stored, display)` pairs this field accepts.
    #[must_use]
    pub fn choices(&self) -> &[(String, String)] {
        self.options.choices.as_deref().unwrap_or(&[])
    }
}

impl FormField for EnumField {
    field_accessors!();

    fn default_widget(&self) -> Widget {
        Widget::Select
    }

    fn clean(&self, raw: &Value) -> Result<Value, ValidationError> {
        clean_pipeline(&self.options, raw, |value| {
            match &self.options.enum_type {
                // Name/value coercion through the typed enumeration.
                Some(typed) => coerce(value, &LogicalType::Enum(EnumDef::Typed(typed.clone()))),
                None => {
                    let rendered = value.to_string();
                    match self
                        .choices()
                        .iter()
                        .find(|(stored, _)| *stored == rendered)
                    {
                        Some((stored, _)) => Ok(Value::Text(stored.clone())),
                        None => Err(ValidationError::coded(
                            format!("`{rendered}` is not one of the available choices"),
                            "invalid_choice",
                        )),
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlform_core::types::EnumTypeDef;
    use sqlform_core::validators;

    fn optional() -> FieldOptions {
        FieldOptions {
            required: Some(false),
            ..FieldOptions::default()
        }
    }

    #[test]
    fn test_required_blank_fails() {
        let field = CharField::new("name", FieldOptions::default());
        let err = field.clean(&Value::Text("  ".to_string())).unwrap_err();
        assert_eq!(err.messages()[0].code.as_deref(), Some("required"));
    }

    #[test]
    fn test_optional_blank_cleans_to_null() {
        let field = CharField::new("name", optional());
        assert_eq!(field.clean(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_char_max_length() {
        let field = CharField::new(
            "name",
            FieldOptions {
                max_length: Some(3),
                ..FieldOptions::default()
            },
        );
        assert_eq!(
            field.clean(&Value::Text("abc".to_string())).unwrap(),
            Value::Text("abc".to_string())
        );
        let err = field.clean(&Value::Text("abcd".to_string())).unwrap_err();
        assert_eq!(err.messages()[0].code.as_deref(), Some("max_length"));
    }

    #[test]
    fn test_pipeline_accumulates_validator_failures() {
        let field = IntegerField::new(
            "age",
            FieldOptions {
                validators: vec![validators::min_value(18.0), validators::max_value(10.0)],
                ..FieldOptions::default()
            },
        );
        let err = field.clean(&Value::Int(15)).unwrap_err();
        assert_eq!(err.messages().len(), 2);
    }

    #[test]
    fn test_boolean_checkbox_input() {
        let field = BooleanField::new("active", FieldOptions::default());
        assert_eq!(
            field.clean(&Value::Text("on".to_string())).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(field.default_widget(), Widget::CheckboxInput);
    }

    #[test]
    fn test_decimal_digit_bounds() {
        let field = DecimalField::new(
            "price",
            FieldOptions {
                max_digits: Some(5),
                decimal_places: Some(2),
                ..FieldOptions::default()
            },
        );
        assert_eq!(
            field.clean(&Value::Text("123.45".to_string())).unwrap(),
            Value::Decimal("123.45".to_string())
        );
        let err = field.clean(&Value::Text("1234.56".to_string())).unwrap_err();
        assert_eq!(err.messages()[0].code.as_deref(), Some("max_digits"));
        let err = field.clean(&Value::Text("1.234".to_string())).unwrap_err();
        assert_eq!(
            err.messages()[0].code.as_deref(),
            Some("max_decimal_places")
        );
    }

    #[test]
    fn test_temporal_fields_canonicalize() {
        let date = DateField::new("d", FieldOptions::default());
        assert_eq!(
            date.clean(&Value::Text("2024-01-31".to_string())).unwrap(),
            Value::Date("2024-01-31".to_string())
        );
        let datetime = DateTimeField::new("dt", FieldOptions::default());
        assert_eq!(
            datetime
                .clean(&Value::Text("2024-01-31 13:05".to_string()))
                .unwrap(),
            Value::DateTime("2024-01-31T13:05:00".to_string())
        );
        let duration = DurationField::new("span", FieldOptions::default());
        assert_eq!(
            duration.clean(&Value::Text("01:30:00".to_string())).unwrap(),
            Value::Duration(5_400_000_000)
        );
    }

    #[test]
    fn test_choice_field_matches_stored_value() {
        let field = ChoiceField::new(
            "kind",
            FieldOptions {
                choices: Some(vec![
                    ("car".to_string(), "car".to_string()),
                    ("truck".to_string(), "truck".to_string()),
                ]),
                ..FieldOptions::default()
            },
        );
        assert_eq!(
            field.clean(&Value::Text("car".to_string())).unwrap(),
            Value::Text("car".to_string())
        );
        let err = field.clean(&Value::Text("boat".to_string())).unwrap_err();
        assert_eq!(err.messages()[0].code.as_deref(), Some("invalid_choice"));
    }

    #[test]
    fn test_enum_field_coerces_value_to_name() {
        let typed = EnumTypeDef::new("VehicleType")
            .variant("Car", "car")
            .variant("Truck", "truck");
        let field = EnumField::new(
            "type",
            FieldOptions {
                choices: Some(vec![
                    ("Car".to_string(), "car".to_string()),
                    ("Truck".to_string(), "truck".to_string()),
                ]),
                enum_type: Some(typed),
                ..FieldOptions::default()
            },
        );
        // Member value coerces to the canonical variant name.
        assert_eq!(
            field.clean(&Value::Text("car".to_string())).unwrap(),
            Value::Text("Car".to_string())
        );
        assert_eq!(
            field.clean(&Value::Text("Truck".to_string())).unwrap(),
            Value::Text("Truck".to_string())
        );
        assert!(field.clean(&Value::Text("boat".to_string())).is_err());
    }

    #[test]
    fn test_widget_override_wins() {
        let field = CharField::new(
            "secret",
            FieldOptions {
                widget: Some(Widget::PasswordInput),
                ..FieldOptions::default()
            },
        );
        assert_eq!(field.widget(), Widget::PasswordInput);
    }
}
