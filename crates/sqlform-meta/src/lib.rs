//! Cached model descriptors for SQLForm Rust.
//!
//! `sqlform-meta` is the **reflection engine**: it turns the mapper
//! definitions the host persistence layer registers into cached, shared
//! descriptors that answer every metadata question the form and graph layers
//! ask.
//!
//! # Role In The Architecture
//!
//! - [`MetaCache`] guarantees exactly one [`ModelInfo`] per mapped class and
//!   keeps descriptors current through mapper-configured events.
//! - [`ColumnInfo`], [`CompositeInfo`], and [`RelationInfo`] are the per-field
//!   descriptors: specialization dispatch, label/required derivation, the
//!   composite cleaning cascade, and identity-key column pairing.
//! - [`ModelInfo`] aggregates them and adds identity-key resolution and the
//!   model-wide validation cascade.
//! - [`ValidationRunner`] is the standalone run-everything accumulator.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sqlform_core::{ColumnDef, LogicalType, MapperDef, MapperRegistry, TableDef};
//! use sqlform_meta::{EntityKey, MetaCache};
//!
//! let registry = Arc::new(MapperRegistry::new());
//! registry.register(MapperDef::new(
//!     "Owner",
//!     TableDef::new("owners")
//!         .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
//!         .column(ColumnDef::new("first_name", LogicalType::Text)),
//! ));
//!
//! let cache = MetaCache::new(registry);
//! let info = cache.get_or_build(&EntityKey::new("Owner")).unwrap();
//! assert_eq!(info.primary_keys(), vec!["id"]);
//! assert_eq!(info.column("first_name").unwrap().label(), "First name");
//! ```

pub mod cache;
pub mod column;
pub mod composite;
pub mod identity;
pub mod model;
pub mod relation;
pub mod runner;

pub use cache::{MetaCache, MetaTarget};
pub use column::{
    ColumnInfo, ColumnKind, FieldOptions, SpecializationRegistry, SpecializationRule,
    default_rules, derive_label, specialization_registry,
};
pub use composite::CompositeInfo;
pub use identity::{IdentityKey, PrimaryKey};
pub use model::{FieldRef, ModelInfo};
pub use relation::RelationInfo;
pub use runner::ValidationRunner;

// Re-exported so descriptor consumers rarely need sqlform-core directly.
pub use sqlform_core::mapper::EntityKey;
