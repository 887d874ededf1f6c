//! Mapper definitions.
//!
//! The narrow inspection contract the persistence layer fulfills: tables,
//! columns, foreign keys, composites, and relationships, expressed as plain
//! data. The reflection engine consumes these; it never talks to the mapper
//! machinery itself.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::ValidationError;
use crate::instance::{CompositeValue, EntityRef};
use crate::types::LogicalType;
use crate::validators::Validator;
use crate::value::Value;
use crate::widget::Widget;

/// Stable per-class token identifying a mapped class.
///
/// Cheap to clone and hash; equality is by token text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(Arc<str>);

impl EntityKey {
    /// Create a key from a class name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The class name backing this key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for EntityKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(name: &str) -> Self {
        EntityKey::new(name)
    }
}

/// Declared default for a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DefaultValue {
    /// A literal value, usable as a form initial.
    Scalar(Value),
    /// A host-side callable; computed at flush time, never a form initial.
    Computed,
    /// A server-side SQL expression.
    Expression(String),
}

impl DefaultValue {
    /// The literal value when this is a scalar default.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&Value> {
        match self {
            DefaultValue::Scalar(v) => Some(v),
            _ => None,
        }
    }
}

/// A column of a mapped table.
///
/// Core persistence attributes plus the declared extras that feed form-field
/// synthesis (label, help text, validators, widget).
#[derive(Debug, Clone, Serialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Logical type.
    pub logical_type: LogicalType,
    /// Whether NULL is storable. Defaults to true; `primary_key()` clears it.
    pub nullable: bool,
    /// Whether this column participates in the primary key.
    pub primary_key: bool,
    /// Whether the database generates the value (sequence/identity).
    pub auto_increment: bool,
    /// Declared default, if any.
    pub default: Option<DefaultValue>,
    /// Declared form label override.
    pub label: Option<String>,
    /// Declared help text.
    pub help_text: Option<String>,
    /// Explicit required override for forms. `None` derives from `nullable`.
    pub required: Option<bool>,
    /// Declared validators, run in order during cleaning.
    #[serde(skip)]
    pub validators: Vec<Validator>,
    /// Declared form widget.
    pub widget: Option<Widget>,
    /// Named form-field constructor override, resolved through the form
    /// field registry.
    pub form_field_kind: Option<String>,
}

impl ColumnDef {
    /// Create a column definition. Nullable by default, like the mappers
    /// this contract mirrors.
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
            nullable: true,
            primary_key: false,
            auto_increment: false,
            default: None,
            label: None,
            help_text: None,
            required: None,
            validators: Vec::new(),
            widget: None,
            form_field_kind: None,
        }
    }

    /// Set nullability explicitly.
    #[must_use]
    pub fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Mark as a primary key column. Primary key columns are not nullable.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Mark the value as database-generated.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Set a literal default value.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Scalar(value));
        self
    }

    /// Mark the default as a host-side callable.
    #[must_use]
    pub fn computed_default(mut self) -> Self {
        self.default = Some(DefaultValue::Computed);
        self
    }

    /// Set a server-side default expression.
    #[must_use]
    pub fn server_default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(DefaultValue::Expression(expr.into()));
        self
    }

    /// Set the form label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = Some(text.into());
        self
    }

    /// Override the derived required flag.
    #[must_use]
    pub fn required(mut self, value: bool) -> Self {
        self.required = Some(value);
        self
    }

    /// Append a validator.
    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Declare the form widget.
    #[must_use]
    pub fn widget(mut self, widget: Widget) -> Self {
        self.widget = Some(widget);
        self
    }

    /// Name a registered form-field constructor to use for this column.
    #[must_use]
    pub fn form_field_kind(mut self, kind: impl Into<String>) -> Self {
        self.form_field_kind = Some(kind.into());
        self
    }
}

/// A declared foreign key constraint.
///
/// `columns` and `referred_columns` correspond positionally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKeyDef {
    /// Constrained columns on the owning table.
    pub columns: Vec<String>,
    /// Referred table name.
    pub referred_table: String,
    /// Referred columns, in the same order as `columns`.
    pub referred_columns: Vec<String>,
}

impl ForeignKeyDef {
    /// Create a constraint against the given table.
    pub fn new(referred_table: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            referred_table: referred_table.into(),
            referred_columns: Vec::new(),
        }
    }

    /// Append one constrained/referred column pair.
    #[must_use]
    pub fn pair(mut self, column: impl Into<String>, referred: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self.referred_columns.push(referred.into());
        self
    }
}

/// A mapped table: columns plus declared foreign keys.
#[derive(Debug, Clone, Serialize)]
pub struct TableDef {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDef>,
    /// Declared foreign key constraints.
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl TableDef {
    /// Create an empty table definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Append a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Append a foreign key constraint.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKeyDef) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column_named(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key columns, in declaration order.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&ColumnDef> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }
}

/// Kind and direction of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RelationKind {
    /// Child holds the foreign key; parent side sees one child.
    OneToOne,
    /// This side holds the foreign key to a single parent.
    #[default]
    ManyToOne,
    /// Collection side of a foreign key held by the target.
    OneToMany,
    /// Link-table association, collections on both sides.
    ManyToMany,
}

impl RelationKind {
    /// Whether this side holds a collection.
    #[must_use]
    pub const fn is_to_many(&self) -> bool {
        matches!(self, RelationKind::OneToMany | RelationKind::ManyToMany)
    }
}

/// A declared relationship attribute.
#[derive(Debug, Clone, Serialize)]
pub struct RelationDef {
    /// Attribute name on the owning class.
    pub name: String,
    /// Target mapped class.
    pub target: EntityKey,
    /// Kind and direction.
    pub kind: RelationKind,
    /// `(local column, remote column)` pairs.
    pub pairs: Vec<(String, String)>,
    /// Reverse attribute on the target class, when declared.
    pub back_populates: Option<String>,
}

impl RelationDef {
    /// Create a relationship to `target`. Kind defaults to many-to-one.
    pub fn new(name: impl Into<String>, target: impl Into<EntityKey>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::default(),
            pairs: Vec::new(),
            back_populates: None,
        }
    }

    /// Set the relationship kind.
    #[must_use]
    pub fn kind(mut self, kind: RelationKind) -> Self {
        self.kind = kind;
        self
    }

    /// Append one local/remote column pair.
    #[must_use]
    pub fn pair(mut self, local: impl Into<String>, remote: impl Into<String>) -> Self {
        self.pairs.push((local.into(), remote.into()));
        self
    }

    /// Declare the reverse attribute on the target.
    #[must_use]
    pub fn back_populates(mut self, attr: impl Into<String>) -> Self {
        self.back_populates = Some(attr.into());
        self
    }

    /// Local (owning-side) columns of the declared pairs.
    #[must_use]
    pub fn local_columns(&self) -> Vec<&str> {
        self.pairs.iter().map(|(local, _)| local.as_str()).collect()
    }
}

/// Cleaning hook bound to a composite value object.
#[derive(Clone)]
pub struct CompositeCleanHook(
    Arc<dyn Fn(&mut CompositeValue) -> Result<(), ValidationError> + Send + Sync>,
);

impl CompositeCleanHook {
    /// Wrap a hook closure.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&mut CompositeValue) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        Self(Arc::new(func))
    }

    /// Run the hook.
    pub fn call(&self, value: &mut CompositeValue) -> Result<(), ValidationError> {
        (self.0)(value)
    }
}

impl fmt::Debug for CompositeCleanHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompositeCleanHook")
    }
}

/// Cleaning hook bound to a whole instance.
#[derive(Clone)]
pub struct InstanceCleanHook(
    Arc<dyn Fn(&EntityRef) -> Result<(), ValidationError> + Send + Sync>,
);

impl InstanceCleanHook {
    /// Wrap a hook closure.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&EntityRef) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        Self(Arc::new(func))
    }

    /// Run the hook.
    pub fn call(&self, instance: &EntityRef) -> Result<(), ValidationError> {
        (self.0)(instance)
    }
}

impl fmt::Debug for InstanceCleanHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InstanceCleanHook")
    }
}

/// A declared composite (embedded value object) attribute.
///
/// Field columns are declared unprefixed; the backing parent-table columns
/// use the `_{attr}_{field}` naming scheme. When the value object declares
/// no columns, its constructor argument names stand in as untyped fields.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeDef {
    /// Attribute name on the owning class.
    pub name: String,
    /// Value object type name.
    pub type_name: String,
    /// Declared field columns, unprefixed.
    pub columns: Vec<ColumnDef>,
    /// Constructor argument names, used when `columns` is empty.
    pub ctor_args: Vec<String>,
    /// Composite-level validators.
    #[serde(skip)]
    pub validators: Vec<Validator<CompositeValue>>,
    /// Optional cleaning hook on the value object.
    #[serde(skip)]
    pub clean: Option<CompositeCleanHook>,
}

impl CompositeDef {
    /// Create a composite definition.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            columns: Vec::new(),
            ctor_args: Vec::new(),
            validators: Vec::new(),
            clean: None,
        }
    }

    /// Append a declared field column.
    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Declare constructor argument names.
    #[must_use]
    pub fn ctor_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ctor_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Append a composite-level validator.
    #[must_use]
    pub fn validator(mut self, validator: Validator<CompositeValue>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Set the cleaning hook.
    #[must_use]
    pub fn clean_hook(mut self, hook: CompositeCleanHook) -> Self {
        self.clean = Some(hook);
        self
    }

    /// Backing column name on the parent table for one of this composite's
    /// fields.
    #[must_use]
    pub fn backing_column(&self, field: &str) -> String {
        format!("_{}_{}", self.name, field)
    }
}

/// Everything declared about one mapped class.
#[derive(Debug, Clone, Serialize)]
pub struct MapperDef {
    /// The mapped class.
    pub entity: EntityKey,
    /// The mapped table.
    pub table: TableDef,
    /// Declared composites.
    pub composites: Vec<CompositeDef>,
    /// Declared relationships.
    pub relations: Vec<RelationDef>,
    /// Model-level validators.
    #[serde(skip)]
    pub validators: Vec<Validator<EntityRef>>,
    /// Optional instance cleaning hook.
    #[serde(skip)]
    pub clean: Option<InstanceCleanHook>,
}

impl MapperDef {
    /// Create a mapper for `entity` over `table`.
    pub fn new(entity: impl Into<EntityKey>, table: TableDef) -> Self {
        Self {
            entity: entity.into(),
            table,
            composites: Vec::new(),
            relations: Vec::new(),
            validators: Vec::new(),
            clean: None,
        }
    }

    /// Append a composite.
    #[must_use]
    pub fn composite(mut self, composite: CompositeDef) -> Self {
        self.composites.push(composite);
        self
    }

    /// Append a relationship.
    #[must_use]
    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Append a model-level validator.
    #[must_use]
    pub fn validator(mut self, validator: Validator<EntityRef>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Set the instance cleaning hook.
    #[must_use]
    pub fn clean_hook(mut self, hook: InstanceCleanHook) -> Self {
        self.clean = Some(hook);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_defaults() {
        let col = ColumnDef::new("name", LogicalType::Text);
        assert!(col.nullable);
        assert!(!col.primary_key);
        assert!(col.default.is_none());
    }

    #[test]
    fn test_primary_key_clears_nullable() {
        let col = ColumnDef::new("id", LogicalType::Integer).primary_key();
        assert!(col.primary_key);
        assert!(!col.nullable);
    }

    #[test]
    fn test_table_primary_key_order_follows_declaration() {
        let table = TableDef::new("t")
            .column(ColumnDef::new("b", LogicalType::Integer).primary_key())
            .column(ColumnDef::new("a", LogicalType::Integer).primary_key())
            .column(ColumnDef::new("x", LogicalType::Text));
        let pk: Vec<_> = table
            .primary_key_columns()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(pk, vec!["b", "a"]);
    }

    #[test]
    fn test_foreign_key_pairs_stay_positional() {
        let fk = ForeignKeyDef::new("owners")
            .pair("owner_first", "first_name")
            .pair("owner_last", "last_name");
        assert_eq!(fk.columns, vec!["owner_first", "owner_last"]);
        assert_eq!(fk.referred_columns, vec!["first_name", "last_name"]);
    }

    #[test]
    fn test_composite_backing_column_naming() {
        let comp = CompositeDef::new("address", "Address");
        assert_eq!(comp.backing_column("street"), "_address_street");
    }

    #[test]
    fn test_relation_kind_collections() {
        assert!(RelationKind::OneToMany.is_to_many());
        assert!(RelationKind::ManyToMany.is_to_many());
        assert!(!RelationKind::ManyToOne.is_to_many());
        assert_eq!(RelationKind::default(), RelationKind::ManyToOne);
    }

    #[test]
    fn test_mapper_serializes_without_callables() {
        let mapper = MapperDef::new(
            "Vehicle",
            TableDef::new("vehicles")
                .column(ColumnDef::new("id", LogicalType::Integer).primary_key()),
        )
        .validator(Validator::new("noop", |_: &EntityRef| Ok(())));
        let json = serde_json::to_value(&mapper).unwrap();
        assert_eq!(json["entity"], serde_json::json!("Vehicle"));
        assert!(json.get("validators").is_none());
    }
}
