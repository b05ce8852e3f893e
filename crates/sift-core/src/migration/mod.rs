//! Filter document migration.
//!
//! Stored filters are written against a versioned schema. This module brings
//! old documents forward:
//!
//! - [`deprecations`] renames operator spellings that are no longer current
//! - [`transforms`] holds the per-version structural rewrites
//! - [`sanitize`] prunes trees that no longer fit the field catalog
//! - [`FilterMigrator`] runs the whole pipeline and reports what changed

pub mod deprecations;
mod error;
mod migrator;
pub mod sanitize;
pub mod transforms;

pub use deprecations::{is_deprecated, replacement, DEPRECATED_OPERATORS};
pub use error::MigrationError;
pub use migrator::{
    ChangeKind, FilterMigrator, MigrateOptions, MigrationChange, MigrationFn, MigrationReport,
};
pub use sanitize::{sanitize_conditions, Removal, SanitizeOptions, SanitizeReport};
pub use transforms::v1_to_v2;
