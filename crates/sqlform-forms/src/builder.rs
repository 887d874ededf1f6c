//! Field construction dispatch.
//!
//! The [`FieldBuilder`] maps column specialization kinds (and declared
//! constructor names) to field constructors. Hosts override the process-wide
//! table or inject their own builder; nothing here swaps global state for
//! the duration of a call.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use sqlform_core::error::{Error, Result};
use sqlform_meta::cache::MetaCache;
use sqlform_meta::column::{ColumnInfo, ColumnKind, FieldOptions};
use sqlform_meta::model::{FieldRef, ModelInfo};

use crate::field::{
    BooleanField, CharField, ChoiceField, DateField, DateTimeField, DecimalField, DurationField,
    EnumField, FloatField, FormField, IntegerField, TextField, TimeField,
};
use crate::model_choice::{QueryContext, RelationFormFieldExt};

/// Constructor for one field type.
pub type FieldConstructor = Arc<dyn Fn(&str, FieldOptions) -> Box<dyn FormField> + Send + Sync>;

/// Overridable dispatch from column kind (or declared name) to a field
/// constructor.
pub struct FieldBuilder {
    by_kind: RwLock<HashMap<ColumnKind, FieldConstructor>>,
    by_name: RwLock<HashMap<String, FieldConstructor>>,
}

fn ctor<F, T>(build: F) -> FieldConstructor
where
    F: Fn(&str, FieldOptions) -> T + Send + Sync + 'static,
    T: FormField + 'static,
{
    Arc::new(move |name, options| Box::new(build(name, options)))
}

impl FieldBuilder {
    /// Builder preloaded with the stock constructors.
    #[must_use]
    pub fn with_defaults() -> Self {
        let builder = Self::empty();
        builder.register_kind(ColumnKind::String, ctor(|n, o| CharField::new(n, o)));
        builder.register_kind(ColumnKind::Text, ctor(|n, o| TextField::new(n, o)));
        builder.register_kind(ColumnKind::Integer, ctor(|n, o| IntegerField::new(n, o)));
        builder.register_kind(ColumnKind::Float, ctor(|n, o| FloatField::new(n, o)));
        builder.register_kind(ColumnKind::Decimal, ctor(|n, o| DecimalField::new(n, o)));
        builder.register_kind(ColumnKind::Boolean, ctor(|n, o| BooleanField::new(n, o)));
        builder.register_kind(
            ColumnKind::Enum,
            Arc::new(|name, options: FieldOptions| -> Box<dyn FormField> {
                // Typed enumerations get name/value coercion; plain value
                // lists get the generic choice field.
                if options.enum_type.is_some() {
                    Box::new(EnumField::new(name, options))
                } else {
                    Box::new(ChoiceField::new(name, options))
                }
            }),
        );
        builder.register_kind(ColumnKind::Date, ctor(|n, o| DateField::new(n, o)));
        builder.register_kind(ColumnKind::DateTime, ctor(|n, o| DateTimeField::new(n, o)));
        builder.register_kind(ColumnKind::Time, ctor(|n, o| TimeField::new(n, o)));
        builder.register_kind(ColumnKind::Interval, ctor(|n, o| DurationField::new(n, o)));

        builder.register_named("char", ctor(|n, o| CharField::new(n, o)));
        builder.register_named("text", ctor(|n, o| TextField::new(n, o)));
        builder.register_named("integer", ctor(|n, o| IntegerField::new(n, o)));
        builder.register_named("float", ctor(|n, o| FloatField::new(n, o)));
        builder.register_named("decimal", ctor(|n, o| DecimalField::new(n, o)));
        builder.register_named("boolean", ctor(|n, o| BooleanField::new(n, o)));
        builder.register_named("choice", ctor(|n, o| ChoiceField::new(n, o)));
        builder.register_named("enum", ctor(|n, o| EnumField::new(n, o)));
        builder.register_named("date", ctor(|n, o| DateField::new(n, o)));
        builder.register_named("datetime", ctor(|n, o| DateTimeField::new(n, o)));
        builder.register_named("time", ctor(|n, o| TimeField::new(n, o)));
        builder.register_named("duration", ctor(|n, o| DurationField::new(n, o)));
        builder
    }

    /// Builder with no constructors registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_kind: RwLock::new(HashMap::new()),
            by_name: RwLock::new(HashMap::new()),
        }
    }

    /// Install (or replace) the constructor for a column kind.
    pub fn register_kind(&self, kind: ColumnKind, constructor: FieldConstructor) {
        self.by_kind.write().unwrap().insert(kind, constructor);
    }

    /// Install (or replace) a named constructor, resolvable from a column's
    /// declared field kind.
    pub fn register_named(&self, name: impl Into<String>, constructor: FieldConstructor) {
        self.by_name.write().unwrap().insert(name.into(), constructor);
    }

    /// The constructor for a column kind, if one is registered.
    #[must_use]
    pub fn for_kind(&self, kind: ColumnKind) -> Option<FieldConstructor> {
        self.by_kind.read().unwrap().get(&kind).cloned()
    }

    /// A named constructor, if one is registered.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<FieldConstructor> {
        self.by_name.read().unwrap().get(name).cloned()
    }
}

impl Default for FieldBuilder {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Process-wide field builder.
pub fn field_builder() -> &'static FieldBuilder {
    static BUILDER: OnceLock<FieldBuilder> = OnceLock::new();
    BUILDER.get_or_init(FieldBuilder::with_defaults)
}

/// Form-field synthesis for column descriptors.
pub trait ColumnFormFieldExt {
    /// Build this column's form field with the process-wide builder.
    ///
    /// `None` means the column has no form representation (binary, array,
    /// JSON, and other unmapped kinds), which is a legitimate outcome.
    fn formfield(&self, overrides: FieldOptions) -> Option<Box<dyn FormField>>;

    /// Build with an explicit builder and optional named constructor.
    fn formfield_with(
        &self,
        builder: &FieldBuilder,
        form_class: Option<&str>,
        overrides: FieldOptions,
    ) -> Option<Box<dyn FormField>>;
}

impl ColumnFormFieldExt for ColumnInfo {
    fn formfield(&self, overrides: FieldOptions) -> Option<Box<dyn FormField>> {
        self.formfield_with(field_builder(), None, overrides)
    }

    fn formfield_with(
        &self,
        builder: &FieldBuilder,
        form_class: Option<&str>,
        overrides: FieldOptions,
    ) -> Option<Box<dyn FormField>> {
        let options = self.field_options().merged_with(overrides);
        let named = form_class.or(self.def().form_field_kind.as_deref());
        let constructor = match named {
            Some(name) => builder.named(name),
            None => builder.for_kind(self.kind()),
        };
        let Some(constructor) = constructor else {
            tracing::debug!(
                column = self.name(),
                kind = ?self.kind(),
                "No form field constructor; column is unsupported for forms"
            );
            return None;
        };
        Some(constructor(self.name(), options))
    }
}

/// Synthesize the ordered form fields for a model.
///
/// Exactly one of `fields` (an explicit ordered selection) or `exclude`
/// (everything except the named attributes) must be given; both or neither
/// is a configuration error. Relationship fields require `context`.
/// Database-generated key columns and form-unsupported columns are skipped
/// in exclude mode; an explicitly named unknown field is a lookup error.
pub fn fields_for_model(
    model: &ModelInfo,
    cache: &MetaCache,
    context: Option<&dyn QueryContext>,
    fields: Option<&[&str]>,
    exclude: Option<&[&str]>,
) -> Result<Vec<Box<dyn FormField>>> {
    let mut out: Vec<Box<dyn FormField>> = Vec::new();
    match (fields, exclude) {
        (Some(_), Some(_)) => Err(Error::configuration(
            "pass either a fields list or an exclude list, not both",
        )),
        (None, None) => Err(Error::configuration(
            "pass a fields list or an exclude list",
        )),
        (Some(names), None) => {
            for name in names {
                match model.get_field(name)? {
                    FieldRef::PrimaryKey(column) | FieldRef::Column(column) => {
                        if let Some(field) = column.formfield(FieldOptions::default()) {
                            out.push(field);
                        }
                    }
                    FieldRef::Composite(composite) => {
                        push_composite_fields(&composite, &mut out);
                    }
                    FieldRef::Relation(relation) => {
                        out.push(relation.formfield(cache, context, FieldOptions::default())?);
                    }
                }
            }
            Ok(out)
        }
        (None, Some(excluded)) => {
            for column in model.columns() {
                if excluded.contains(&column.name()) {
                    continue;
                }
                if column.primary_key() && column.def().auto_increment {
                    continue;
                }
                if let Some(field) = column.formfield(FieldOptions::default()) {
                    out.push(field);
                }
            }
            for composite in model.composites() {
                if excluded.contains(&composite.name()) {
                    continue;
                }
                push_composite_fields(&composite, &mut out);
            }
            for relation in model.relations() {
                if excluded.contains(&relation.name()) {
                    continue;
                }
                out.push(relation.formfield(cache, context, FieldOptions::default())?);
            }
            Ok(out)
        }
    }
}

fn push_composite_fields(
    composite: &sqlform_meta::composite::CompositeInfo,
    out: &mut Vec<Box<dyn FormField>>,
) {
    for field in composite.fields() {
        let dotted = format!("{}.{}", composite.name(), field.name());
        if let Some(built) = field
            .formfield_with(field_builder(), None, FieldOptions::default())
            .map(|f| rename_field(f, &dotted))
        {
            out.push(built);
        }
    }
}

/// Wrapper that exposes a field under its composite-scoped name.
struct ScopedField {
    name: String,
    inner: Box<dyn FormField>,
}

impl FormField for ScopedField {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &FieldOptions {
        self.inner.options()
    }

    fn default_widget(&self) -> sqlform_core::widget::Widget {
        self.inner.default_widget()
    }

    fn clean(
        &self,
        raw: &sqlform_core::value::Value,
    ) -> std::result::Result<sqlform_core::value::Value, sqlform_core::error::ValidationError>
    {
        self.inner.clean(raw)
    }
}

fn rename_field(inner: Box<dyn FormField>, name: &str) -> Box<dyn FormField> {
    Box::new(ScopedField {
        name: name.to_string(),
        inner,
    })
}
