//! Relationship-backed choice fields.
//!
//! Relationship form fields are the one place this layer needs a way to
//! query rows: the candidate set for a select comes from the host session.
//! [`QueryContext`] is that narrow contract; building a relationship field
//! without one is a configuration error, never a silent default.

use std::rc::Rc;
use std::sync::Arc;

use sqlform_core::error::{Error, Result, ValidationError};
use sqlform_core::instance::EntityRef;
use sqlform_core::mapper::EntityKey;
use sqlform_core::value::Value;
use sqlform_core::widget::Widget;
use sqlform_meta::cache::MetaCache;
use sqlform_meta::column::{FieldOptions, derive_label};
use sqlform_meta::identity::PrimaryKey;
use sqlform_meta::model::ModelInfo;
use sqlform_meta::relation::RelationInfo;

use crate::field::FormField;

/// Session/query contract supplied by the host persistence layer.
///
/// Mandatory for relationship fields; everything else in this crate works
/// without a session.
pub trait QueryContext {
    /// All candidate rows of a mapped class.
    fn query(&self, class: &EntityKey) -> Result<Vec<EntityRef>>;
}

fn candidate_key(info: &ModelInfo, candidate: &EntityRef) -> Option<PrimaryKey> {
    info.primary_keys_from_instance(&candidate.borrow())
}

fn clean_single_pk(info: &ModelInfo, raw: &Value) -> Result<PrimaryKey, ValidationError> {
    let pk_columns = info.primary_keys();
    let invalid = || ValidationError::coded("select a valid choice", "invalid_choice");
    match raw {
        Value::Array(items) => {
            if items.len() != pk_columns.len() {
                return Err(invalid());
            }
            let mut values = Vec::with_capacity(items.len());
            for (item, column) in items.iter().zip(&pk_columns) {
                let column = info.column(column).ok_or_else(invalid)?;
                values.push(column.clean_value(item)?);
            }
            Ok(PrimaryKey::from_values(values))
        }
        scalar => {
            if pk_columns.len() != 1 {
                return Err(invalid());
            }
            let column = info.column(&pk_columns[0]).ok_or_else(invalid)?;
            Ok(PrimaryKey::Scalar(column.clean_value(scalar)?))
        }
    }
}

fn find_candidate(
    info: &ModelInfo,
    candidates: &[EntityRef],
    key: &PrimaryKey,
) -> Option<EntityRef> {
    candidates
        .iter()
        .find(|c| candidate_key(info, c).as_ref() == Some(key))
        .map(Rc::clone)
}

/// Single-select field over the rows of a related class.
pub struct ModelChoiceField {
    name: String,
    options: FieldOptions,
    target: Arc<ModelInfo>,
    candidates: Vec<EntityRef>,
}

impl ModelChoiceField {
    /// Build the field for a to-one relationship, querying the candidate
    /// rows through the supplied context.
    pub fn for_relation(
        relation: &RelationInfo,
        cache: &MetaCache,
        context: &dyn QueryContext,
        options: FieldOptions,
    ) -> Result<Self> {
        let target = cache.get_or_build(relation.target())?;
        let candidates = context.query(relation.target())?;
        Ok(Self {
            name: relation.name().to_string(),
            options,
            target,
            candidates,
        })
    }

    /// The related class's descriptor.
    #[must_use]
    pub fn target(&self) -> &Arc<ModelInfo> {
        &self.target
    }

    /// The candidate rows behind this select.
    #[must_use]
    pub fn candidates(&self) -> &[EntityRef] {
        &self.candidates
    }

    /// Resolve a cleaned primary-key value back to its candidate row.
    #[must_use]
    pub fn instance_for(&self, cleaned: &Value) -> Option<EntityRef> {
        let key = clean_single_pk(&self.target, cleaned).ok()?;
        find_candidate(&self.target, &self.candidates, &key)
    }
}

impl FormField for ModelChoiceField {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn default_widget(&self) -> Widget {
        Widget::Select
    }

    /// Cleans to the selected row's primary-key value (scalar, or an array
    /// for composite keys).
    fn clean(&self, raw: &Value) -> Result<Value, ValidationError> {
        if raw.is_blank() {
            return if self.options.required.unwrap_or(true) {
                Err(ValidationError::coded("this field is required", "required"))
            } else {
                Ok(Value::Null)
            };
        }
        let key = clean_single_pk(&self.target, raw)?;
        if find_candidate(&self.target, &self.candidates, &key).is_none() {
            return Err(ValidationError::coded(
                "select a valid choice",
                "invalid_choice",
            ));
        }
        let mut values = key.into_values();
        Ok(if values.len() == 1 {
            values.remove(0)
        } else {
            Value::Array(values)
        })
    }
}

/// Multi-select field over the rows of a related class.
pub struct ModelMultipleChoiceField {
    name: String,
    options: FieldOptions,
    target: Arc<ModelInfo>,
    candidates: Vec<EntityRef>,
}

impl ModelMultipleChoiceField {
    /// Build the field for a to-many relationship, querying the candidate
    /// rows through the supplied context.
    pub fn for_relation(
        relation: &RelationInfo,
        cache: &MetaCache,
        context: &dyn QueryContext,
        options: FieldOptions,
    ) -> Result<Self> {
        let target = cache.get_or_build(relation.target())?;
        let candidates = context.query(relation.target())?;
        Ok(Self {
            name: relation.name().to_string(),
            options,
            target,
            candidates,
        })
    }

    /// The candidate rows behind this select.
    #[must_use]
    pub fn candidates(&self) -> &[EntityRef] {
        &self.candidates
    }
}

impl FormField for ModelMultipleChoiceField {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn default_widget(&self) -> Widget {
        Widget::SelectMultiple
    }

    /// Cleans a list of primary-key values; every failure accumulates.
    fn clean(&self, raw: &Value) -> Result<Value, ValidationError> {
        if raw.is_blank() {
            return if self.options.required.unwrap_or(true) {
                Err(ValidationError::coded("this field is required", "required"))
            } else {
                Ok(Value::Array(Vec::new()))
            };
        }
        let Value::Array(items) = raw else {
            return Err(ValidationError::coded("enter a list of values", "invalid_list"));
        };
        let mut cleaned = Vec::with_capacity(items.len());
        let mut failures = Vec::new();
        for item in items {
            match clean_single_pk(&self.target, item) {
                Ok(key) if find_candidate(&self.target, &self.candidates, &key).is_some() => {
                    let mut values = key.into_values();
                    cleaned.push(if values.len() == 1 {
                        values.remove(0)
                    } else {
                        Value::Array(values)
                    });
                }
                Ok(_) => failures.push(ValidationError::coded(
                    format!("`{item}` is not one of the available choices"),
                    "invalid_choice",
                )),
                Err(err) => failures.push(err),
            }
        }
        match failures.len() {
            0 => Ok(Value::Array(cleaned)),
            1 => Err(failures.into_iter().next().unwrap()),
            _ => Err(ValidationError::List(failures)),
        }
    }
}

/// Form-field synthesis for relationship descriptors.
pub trait RelationFormFieldExt {
    /// Build the form field for this relationship.
    ///
    /// Fails with a configuration error when no query context is supplied;
    /// candidate rows cannot come from anywhere else.
    fn formfield(
        &self,
        cache: &MetaCache,
        context: Option<&dyn QueryContext>,
        overrides: FieldOptions,
    ) -> Result<Box<dyn FormField>>;
}

impl RelationFormFieldExt for RelationInfo {
    fn formfield(
        &self,
        cache: &MetaCache,
        context: Option<&dyn QueryContext>,
        overrides: FieldOptions,
    ) -> Result<Box<dyn FormField>> {
        let Some(context) = context else {
            return Err(Error::configuration(format!(
                "relationship field `{}` requires a query context",
                self.name()
            )));
        };
        let defaults = FieldOptions {
            label: Some(derive_label(self.name())),
            required: Some(!self.kind().is_to_many()),
            ..FieldOptions::default()
        };
        let options = defaults.merged_with(overrides);
        if self.kind().is_to_many() {
            Ok(Box::new(ModelMultipleChoiceField::for_relation(
                self, cache, context, options,
            )?))
        } else {
            Ok(Box::new(ModelChoiceField::for_relation(
                self, cache, context, options,
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlform_core::instance::Entity;
    use sqlform_core::mapper::{ColumnDef, MapperDef, RelationDef, RelationKind, TableDef};
    use sqlform_core::registry::MapperRegistry;
    use sqlform_core::types::LogicalType;

    struct FixedContext {
        rows: Vec<EntityRef>,
    }

    impl QueryContext for FixedContext {
        fn query(&self, _class: &EntityKey) -> Result<Vec<EntityRef>> {
            Ok(self.rows.iter().map(Rc::clone).collect())
        }
    }

    fn setup() -> (MetaCache, RelationInfo, FixedContext) {
        let registry = Arc::new(MapperRegistry::new());
        registry.register(MapperDef::new(
            "Owner",
            TableDef::new("owners")
                .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                .column(ColumnDef::new("first_name", LogicalType::Text)),
        ));
        registry.register(
            MapperDef::new(
                "Vehicle",
                TableDef::new("vehicles")
                    .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                    .column(ColumnDef::new("owner_id", LogicalType::Integer)),
            )
            .relation(RelationDef::new("owner", "Owner").pair("owner_id", "id")),
        );
        let cache = MetaCache::new(registry);
        let relation = cache
            .get_or_build(&EntityKey::new("Vehicle"))
            .unwrap()
            .relation("owner")
            .unwrap();

        let mut a = Entity::new("Owner");
        a.set("id", Value::Int(1));
        let mut b = Entity::new("Owner");
        b.set("id", Value::Int(2));
        let context = FixedContext {
            rows: vec![a.into_ref(), b.into_ref()],
        };
        (cache, relation, context)
    }

    #[test]
    fn test_missing_context_is_configuration_error() {
        let (cache, relation, _) = setup();
        let err = relation
            .formfield(&cache, None, FieldOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_to_one_cleans_to_candidate_pk() {
        let (cache, relation, context) = setup();
        let field = relation
            .formfield(&cache, Some(&context), FieldOptions::default())
            .unwrap();
        assert_eq!(field.widget(), Widget::Select);
        assert_eq!(
            field.clean(&Value::Text("2".to_string())).unwrap(),
            Value::Int(2)
        );
        let err = field.clean(&Value::Int(99)).unwrap_err();
        assert_eq!(err.messages()[0].code.as_deref(), Some("invalid_choice"));
    }

    #[test]
    fn test_to_one_required_blank() {
        let (cache, relation, context) = setup();
        let field = relation
            .formfield(&cache, Some(&context), FieldOptions::default())
            .unwrap();
        let err = field.clean(&Value::Null).unwrap_err();
        assert_eq!(err.messages()[0].code.as_deref(), Some("required"));
    }

    #[test]
    fn test_relation_label_follows_column_derivation() {
        let (cache, relation, context) = setup();
        let field = relation
            .formfield(&cache, Some(&context), FieldOptions::default())
            .unwrap();
        // One label rule for columns and relations alike.
        assert_eq!(field.options().label.as_deref(), Some("Owner"));
        assert_eq!(field.options().label.as_deref(), Some(derive_label("owner").as_str()));
    }

    #[test]
    fn test_instance_resolution() {
        let (cache, relation, context) = setup();
        let field =
            ModelChoiceField::for_relation(&relation, &cache, &context, FieldOptions::default())
                .unwrap();
        let picked = field.instance_for(&Value::Int(1)).unwrap();
        assert_eq!(picked.borrow().get("id"), Some(&Value::Int(1)));
        assert!(field.instance_for(&Value::Int(9)).is_none());
    }

    #[test]
    fn test_to_many_accumulates_bad_choices() {
        let registry = Arc::new(MapperRegistry::new());
        registry.register(MapperDef::new(
            "Vehicle",
            TableDef::new("vehicles")
                .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                .column(ColumnDef::new("owner_id", LogicalType::Integer)),
        ));
        registry.register(
            MapperDef::new(
                "Owner",
                TableDef::new("owners")
                    .column(ColumnDef::new("id", LogicalType::Integer).primary_key()),
            )
            .relation(
                RelationDef::new("vehicles", "Vehicle")
                    .kind(RelationKind::OneToMany)
                    .pair("id", "owner_id"),
            ),
        );
        let cache = MetaCache::new(registry);
        let relation = cache
            .get_or_build(&EntityKey::new("Owner"))
            .unwrap()
            .relation("vehicles")
            .unwrap();

        let mut v = Entity::new("Vehicle");
        v.set("id", Value::Int(10));
        let context = FixedContext {
            rows: vec![v.into_ref()],
        };
        let field = relation
            .formfield(&cache, Some(&context), FieldOptions::default())
            .unwrap();
        assert_eq!(field.widget(), Widget::SelectMultiple);

        // To-many defaults to not required; blank cleans to an empty list.
        assert_eq!(field.clean(&Value::Null).unwrap(), Value::Array(Vec::new()));

        assert_eq!(
            field.clean(&Value::Array(vec![Value::Int(10)])).unwrap(),
            Value::Array(vec![Value::Int(10)])
        );
        let err = field
            .clean(&Value::Array(vec![Value::Int(10), Value::Int(11), Value::Int(12)]))
            .unwrap_err();
        // Both bad choices are reported.
        assert_eq!(err.messages().len(), 2);
    }
}
