//! Migration error types.

use thiserror::Error;

/// Errors raised by filter migrations.
///
/// The migrator records these as warnings; they never fail a load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// A version transform could not rewrite the tree.
    #[error("transform from version {from_version} failed: {reason}")]
    TransformFailed {
        /// Version the transform starts from.
        from_version: u32,
        /// Why it failed.
        reason: String,
    },

    /// A stored document could not be read.
    #[error("invalid filter document: {0}")]
    InvalidDocument(String),
}

impl From<serde_json::Error> for MigrationError {
    fn from(err: serde_json::Error) -> Self {
        MigrationError::InvalidDocument(err.to_string())
    }
}
