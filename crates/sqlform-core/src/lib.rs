//! Core types and contracts for SQLForm Rust.
//!
//! `sqlform-core` is the **foundation layer** for the entire ecosystem. It
//! defines the data types and contracts that the reflection, form, and graph
//! crates build on.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: `MapperDef` and its parts are the narrow inspection
//!   surface the host persistence layer fulfills; `MapperRegistry` delivers
//!   them plus the configuration events the metadata cache subscribes to.
//! - **Data model**: `Value`, `LogicalType`, and the `Entity` instance model
//!   represent runtime attribute state shared across every layer.
//! - **Validation plumbing**: `ValidationError` trees, the accumulating
//!   `ValidationErrors`, validator callables, and logical-type coercion.
//!
//! # Who Uses This Crate
//!
//! - `sqlform-meta` builds cached descriptors over `MapperDef`.
//! - `sqlform-forms` consumes descriptors and `Value` to synthesize fields.
//! - `sqlform-graph` walks `Entity` graphs using coercion and identity keys.
//!
//! Most applications should use the `sqlform` facade; reach for
//! `sqlform-core` directly when adapting a persistence layer.

pub mod coerce;
pub mod error;
pub mod instance;
pub mod mapper;
pub mod registry;
pub mod types;
pub mod validators;
pub mod value;
pub mod widget;

pub use coerce::{coerce, parse_duration};
pub use error::{
    Error, ErrorMessage, NON_FIELD_ERRORS, Result, ValidationError, ValidationErrors,
};
pub use instance::{CompositeValue, Entity, EntityRef, RelationValue};
pub use mapper::{
    ColumnDef, CompositeCleanHook, CompositeDef, DefaultValue, EntityKey, ForeignKeyDef,
    InstanceCleanHook, MapperDef, RelationDef, RelationKind, TableDef,
};
pub use registry::MapperRegistry;
pub use types::{EnumDef, EnumTypeDef, EnumVariant, LogicalType};
pub use validators::{Validator, matches_pattern};
pub use value::Value;
pub use widget::Widget;
