//! SQLForm Rust: model metadata introspection, validation cascades, form
//! binding, and object-graph plumbing for SQL-mapped entities.
//!
//! The facade re-exports the workspace layers:
//!
//! - `sqlform-core` — mapper definitions, registry, values, validators,
//!   error trees, runtime instances.
//! - `sqlform-meta` — the cached descriptor engine ([`MetaCache`],
//!   [`ModelInfo`] and the per-field descriptors).
//! - `sqlform-forms` — form-field synthesis ([`FieldBuilder`],
//!   [`fields_for_model`], relationship choice fields).
//! - `sqlform-graph` — graph serialize/deserialize/clone.
//!
//! ```
//! use std::sync::Arc;
//! use sqlform::prelude::*;
//!
//! let registry = Arc::new(MapperRegistry::new());
//! registry.register(MapperDef::new(
//!     "Owner",
//!     TableDef::new("owners")
//!         .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
//!         .column(ColumnDef::new("first_name", LogicalType::Text).nullable(false)),
//! ));
//!
//! let cache = MetaCache::new(registry);
//! let info = cache.get_or_build(&EntityKey::new("Owner")).unwrap();
//! assert_eq!(info.primary_keys(), vec!["id"]);
//! ```

pub use sqlform_core::{
    CompositeValue, Entity, EntityRef, Error, ErrorMessage, NON_FIELD_ERRORS, RelationValue,
    Result, ValidationError, ValidationErrors, Value, Widget,
};
pub use sqlform_core::mapper::{
    ColumnDef, CompositeCleanHook, CompositeDef, DefaultValue, EntityKey, ForeignKeyDef,
    InstanceCleanHook, MapperDef, RelationDef, RelationKind, TableDef,
};
pub use sqlform_core::registry::MapperRegistry;
pub use sqlform_core::types::{EnumDef, EnumTypeDef, EnumVariant, LogicalType};
pub use sqlform_core::validators::{self, Validator};

pub use sqlform_meta::{
    ColumnInfo, ColumnKind, CompositeInfo, FieldOptions, FieldRef, IdentityKey, MetaCache,
    MetaTarget, ModelInfo, PrimaryKey, RelationInfo, SpecializationRegistry, SpecializationRule,
    ValidationRunner, specialization_registry,
};

pub use sqlform_forms::{
    ColumnFormFieldExt, FieldBuilder, FormField, ModelChoiceField, ModelMultipleChoiceField,
    QueryContext, RelationFormFieldExt, field_builder, fields_for_model,
};

pub use sqlform_graph::{CloneSpec, RelationSpec, clone_entity, deserialize, serialize};

/// One-stop imports for hosts binding models to forms.
pub mod prelude {
    pub use sqlform_core::error::{
        Error, NON_FIELD_ERRORS, Result, ValidationError, ValidationErrors,
    };
    pub use sqlform_core::instance::{CompositeValue, Entity, EntityRef, RelationValue};
    pub use sqlform_core::mapper::{
        ColumnDef, CompositeDef, EntityKey, ForeignKeyDef, MapperDef, RelationDef, RelationKind,
        TableDef,
    };
    pub use sqlform_core::registry::MapperRegistry;
    pub use sqlform_core::types::{EnumDef, EnumTypeDef, LogicalType};
    pub use sqlform_core::validators::Validator;
    pub use sqlform_core::value::Value;
    pub use sqlform_core::widget::Widget;
    pub use sqlform_forms::{
        ColumnFormFieldExt, FieldBuilder, FormField, QueryContext, RelationFormFieldExt,
        fields_for_model,
    };
    pub use sqlform_graph::{CloneSpec, RelationSpec, clone_entity, deserialize, serialize};
    pub use sqlform_meta::{
        ColumnKind, FieldOptions, FieldRef, MetaCache, ModelInfo, PrimaryKey, ValidationRunner,
    };
}
