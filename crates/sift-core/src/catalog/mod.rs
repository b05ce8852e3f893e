//! Field catalog for filter validation and compilation.
//!
//! The catalog describes which fields of a record type may be filtered, of
//! what kind they are, and which operators each kind accepts.

mod entity;
mod field;
mod types;

pub use entity::{EntitySchema, CREATED_AT_FIELD, UPDATED_AT_FIELD};
pub use field::{FieldMap, FieldTypeConfig};
pub use types::FieldKind;
