//! Composite descriptors.
//!
//! A composite is an embedded value object flattened into prefixed columns
//! of the parent table (`_{attr}_{field}`). The descriptor owns field
//! descriptors for the value object and runs its cleaning cascade: fields,
//! then composite-level validators, then the declared clean hook, with every
//! failure accumulated into one nested tree.

use serde::Serialize;

use sqlform_core::error::{ValidationError, ValidationErrors};
use sqlform_core::instance::CompositeValue;
use sqlform_core::mapper::{ColumnDef, CompositeCleanHook, CompositeDef};
use sqlform_core::types::LogicalType;
use sqlform_core::validators::Validator;
use sqlform_core::value::Value;

use crate::column::{ColumnInfo, SpecializationRegistry};

/// Descriptor for one composite attribute.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeInfo {
    name: String,
    type_name: String,
    fields: Vec<ColumnInfo>,
    #[serde(skip)]
    validators: Vec<Validator<CompositeValue>>,
    #[serde(skip)]
    clean: Option<CompositeCleanHook>,
}

impl CompositeInfo {
    /// Build a descriptor from a declaration.
    ///
    /// Declared columns become field descriptors sorted by name. When the
    /// value object declares no columns, its constructor argument names
    /// stand in as untyped text fields in declaration order.
    #[must_use]
    pub fn from_def(def: &CompositeDef, registry: &SpecializationRegistry) -> Self {
        let fields = if def.columns.is_empty() {
            def.ctor_args
                .iter()
                .map(|arg| {
                    ColumnInfo::with_registry(
                        ColumnDef::new(arg.clone(), LogicalType::Text),
                        registry,
                    )
                })
                .collect()
        } else {
            let mut columns = def.columns.clone();
            columns.sort_by(|a, b| a.name.cmp(&b.name));
            columns
                .into_iter()
                .map(|column| ColumnInfo::with_registry(column, registry))
                .collect()
        };
        Self {
            name: def.name.clone(),
            type_name: def.type_name.clone(),
            fields,
            validators: def.validators.clone(),
            clean: def.clean.clone(),
        }
    }

    /// Attribute name on the owning class.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value object type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Field descriptors, in descriptor order.
    #[must_use]
    pub fn fields(&self) -> &[ColumnInfo] {
        &self.fields
    }

    /// Look up a field descriptor by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ColumnInfo> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Backing column names on the parent table, in field order.
    #[must_use]
    pub fn backing_columns(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| format!("_{}_{}", self.name, f.name()))
            .collect()
    }

    /// Clean every field of the value object in place.
    ///
    /// A blank field is skipped (left untouched) when it is nullable, has a
    /// default, or is not required; a blank field that is none of those
    /// fails with a `required` error. Non-blank fields are coerced and
    /// validated, and the cleaned value is written back. All failures
    /// accumulate into one nested error.
    pub fn clean_fields(
        &self,
        value: &mut CompositeValue,
        exclude: &[&str],
    ) -> Result<(), ValidationError> {
        let mut errs = ValidationErrors::new();
        for field in &self.fields {
            if exclude.contains(&field.name()) {
                continue;
            }
            let raw = value.get(field.name()).cloned().unwrap_or(Value::Null);
            if raw.is_blank() {
                if field.nullable() || field.has_default() || !field.required() {
                    continue;
                }
                errs.add(
                    field.name(),
                    ValidationError::coded("this field is required", "required"),
                );
                continue;
            }
            match field.clean_value(&raw) {
                Ok(cleaned) => value.set(field.name(), cleaned),
                Err(err) => errs.add(field.name(), err),
            }
        }
        errs.result()
    }

    /// Run the whole cleaning cascade: fields, then composite validators,
    /// then the clean hook. Every stage runs regardless of earlier
    /// failures; the aggregate raises once.
    pub fn full_clean(
        &self,
        value: &mut CompositeValue,
        exclude: &[&str],
    ) -> Result<(), ValidationError> {
        let mut errs = ValidationErrors::new();
        if let Err(err) = self.clean_fields(value, exclude) {
            errs.extend(err);
        }
        for validator in &self.validators {
            if let Err(err) = validator.check(value) {
                errs.extend(err);
            }
        }
        if let Some(hook) = &self.clean {
            if let Err(err) = hook.call(value) {
                errs.extend(err);
            }
        }
        errs.result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlform_core::error::NON_FIELD_ERRORS;
    use sqlform_core::validators;

    fn address_def() -> CompositeDef {
        CompositeDef::new("address", "Address")
            .column(ColumnDef::new("zip", LogicalType::String { length: Some(10) }).nullable(false))
            .column(ColumnDef::new("city", LogicalType::Text))
            .column(ColumnDef::new("street", LogicalType::Text))
    }

    fn info(def: &CompositeDef) -> CompositeInfo {
        CompositeInfo::from_def(def, &SpecializationRegistry::with_defaults())
    }

    #[test]
    fn test_declared_fields_sort_by_name() {
        let info = info(&address_def());
        let names: Vec<_> = info.fields().iter().map(ColumnInfo::name).collect();
        assert_eq!(names, vec!["city", "street", "zip"]);
    }

    #[test]
    fn test_ctor_args_keep_order() {
        let def = CompositeDef::new("point", "Point").ctor_args(["y", "x"]);
        let info = info(&def);
        let names: Vec<_> = info.fields().iter().map(ColumnInfo::name).collect();
        assert_eq!(names, vec!["y", "x"]);
        assert!(matches!(
            info.field("x").unwrap().logical_type(),
            LogicalType::Text
        ));
    }

    #[test]
    fn test_backing_column_names() {
        let info = info(&address_def());
        assert_eq!(
            info.backing_columns(),
            vec!["_address_city", "_address_street", "_address_zip"]
        );
    }

    #[test]
    fn test_blank_skippable_field_left_untouched() {
        let info = info(&address_def());
        let mut value = CompositeValue::new("Address");
        value.set("zip", Value::Text("12345".to_string()));
        // city is nullable and blank: skipped, not written, no error.
        info.clean_fields(&mut value, &[]).unwrap();
        assert!(!value.has("city"));
        assert_eq!(value.get("zip").unwrap().as_str(), Some("12345"));
    }

    #[test]
    fn test_blank_required_field_fails() {
        let info = info(&address_def());
        let mut value = CompositeValue::new("Address");
        let err = info.clean_fields(&mut value, &[]).unwrap_err();
        let zip = err.field("zip").unwrap();
        assert_eq!(zip.messages()[0].code.as_deref(), Some("required"));
        assert!(err.field("city").is_none());
    }

    #[test]
    fn test_exclude_suppresses_field() {
        let info = info(&address_def());
        let mut value = CompositeValue::new("Address");
        info.clean_fields(&mut value, &["zip"]).unwrap();
    }

    #[test]
    fn test_cleaned_value_written_back() {
        let def = CompositeDef::new("span", "Span")
            .column(ColumnDef::new("count", LogicalType::Integer));
        let info = info(&def);
        let mut value = CompositeValue::new("Span");
        value.set("count", Value::Text(" 7 ".to_string()));
        info.clean_fields(&mut value, &[]).unwrap();
        assert_eq!(value.get("count"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_full_clean_runs_every_stage() {
        let def = CompositeDef::new("address", "Address")
            .column(
                ColumnDef::new("zip", LogicalType::Text)
                    .nullable(false)
                    .validator(validators::min_length(5)),
            )
            .validator(Validator::new("zip-city", |_: &CompositeValue| {
                Err(ValidationError::message("zip and city disagree"))
            }))
            .clean_hook(CompositeCleanHook::new(|_| {
                Err(ValidationError::message("hook failed"))
            }));
        let info = info(&def);
        let mut value = CompositeValue::new("Address");
        value.set("zip", Value::Text("12".to_string()));

        let err = info.full_clean(&mut value, &[]).unwrap_err();
        // Field failure, validator failure, and hook failure all survive.
        assert!(err.field("zip").is_some());
        let non_field = err.field(NON_FIELD_ERRORS).unwrap();
        assert_eq!(non_field.messages().len(), 2);
    }
}
