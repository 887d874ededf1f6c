//! Object-graph engine for SQLForm Rust.
//!
//! Three operations over entity graphs, all driven by the cached descriptors
//! of `sqlform-meta`:
//!
//! - [`serialize`]: entity to `serde_json::Value`, traversing only the
//!   relationships named by [`RelationSpec`]s; each traversal spends its
//!   spec, so cyclic graphs terminate.
//! - [`deserialize`]: JSON (one object or an array) to shared instances,
//!   with a per-call identity map so repeated primary keys resolve to the
//!   same `Rc`, plus foreign-key backfill for to-one relationships.
//! - [`clone_entity`]: a new unpersisted copy that never carries primary-key
//!   or foreign-key columns, cloning relationships only on [`CloneSpec`]
//!   request.

pub mod clone;
pub mod deserialize;
pub mod serialize;

pub use clone::{CloneSpec, clone_entity};
pub use deserialize::deserialize;
pub use serialize::{RelationSpec, serialize};
