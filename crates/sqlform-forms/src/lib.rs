//! Form-field synthesis for SQLForm Rust.
//!
//! `sqlform-forms` turns the descriptors of `sqlform-meta` into bound form
//! fields:
//!
//! - [`FormField`] is the field contract; the concrete set in [`field`]
//!   shares one cleaning pipeline (blank handling, coercion, accumulated
//!   validators) and differs only in coercion step and default widget.
//! - [`FieldBuilder`] dispatches column kinds (and declared constructor
//!   names) to field constructors; hosts extend or replace entries.
//! - [`ModelChoiceField`] and [`ModelMultipleChoiceField`] bind relationship
//!   attributes to candidate instances supplied through a [`QueryContext`].
//! - [`fields_for_model`] synthesizes a whole model's fields from an
//!   explicit selection or an exclusion list.

pub mod builder;
pub mod field;
pub mod model_choice;

pub use builder::{
    ColumnFormFieldExt, FieldBuilder, FieldConstructor, field_builder, fields_for_model,
};
pub use field::{
    BooleanField, CharField, ChoiceField, DateField, DateTimeField, DecimalField, DurationField,
    EnumField, FloatField, FormField, IntegerField, TextField, TimeField,
};
pub use model_choice::{
    ModelChoiceField, ModelMultipleChoiceField, QueryContext, RelationFormFieldExt,
};
