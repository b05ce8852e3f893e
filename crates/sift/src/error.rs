//! Engine error types.

use sift_core::registry::RegistryError;
use sift_core::validate::ValidationResult;
use thiserror::Error;

/// Errors returned by [`FilterEngine`](crate::FilterEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The filter failed validation.
    #[error("filter is invalid: {} error(s)", .0.errors.len())]
    Invalid(ValidationResult),

    /// The filter passed validation but could not be compiled or executed.
    #[error(transparent)]
    Compile(#[from] sift_core::Error),

    /// Handler registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl EngineError {
    /// Validation result attached to an [`EngineError::Invalid`].
    pub fn validation(&self) -> Option<&ValidationResult> {
        match self {
            EngineError::Invalid(result) => Some(result),
            _ => None,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
