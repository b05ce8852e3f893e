//! Core error types.
//!
//! Validation problems are reported as data through
//! [`ValidationResult`](crate::validate::ValidationResult). The variants here
//! are raised when the compiler is handed input it must refuse to compile.

use thiserror::Error;

use crate::registry::HandlerError;
use crate::store::StoreError;

/// Compiler and execution errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A NOT group did not have exactly one child.
    #[error("NOT operator requires exactly one condition (condition {condition_id}, found {found})")]
    NotRequiresOne {
        /// Offending group.
        condition_id: String,
        /// Number of children that survived compilation.
        found: usize,
    },

    /// Tree nested deeper than the configured limit.
    #[error("condition {condition_id} exceeds maximum nesting depth of {max}")]
    MaxDepthExceeded {
        /// Offending node.
        condition_id: String,
        /// Configured limit.
        max: usize,
    },

    /// Group with more children than allowed.
    #[error("group {condition_id} has {count} conditions, maximum is {max}")]
    TooManyConditions {
        /// Offending group.
        condition_id: String,
        /// Number of children.
        count: usize,
        /// Configured limit.
        max: usize,
    },

    /// Group combinator is not AND, OR or NOT.
    #[error("invalid logic operator '{logic}' on condition {condition_id}")]
    InvalidLogic {
        /// Offending group.
        condition_id: String,
        /// The unrecognized tag.
        logic: String,
    },

    /// Operator tag is missing or not recognized.
    #[error("unknown operator '{operator}' on condition {condition_id}")]
    UnknownOperator {
        /// Offending predicate.
        condition_id: String,
        /// The unrecognized tag.
        operator: String,
    },

    /// Operand does not fit the operator.
    #[error("invalid value for condition {condition_id}: {reason}")]
    InvalidValue {
        /// Offending predicate.
        condition_id: String,
        /// What is wrong with the operand.
        reason: String,
    },

    /// List operand longer than allowed.
    #[error("condition {condition_id} has {count} list values, maximum is {max}")]
    TooManyInValues {
        /// Offending predicate.
        condition_id: String,
        /// Number of values.
        count: usize,
        /// Configured limit.
        max: usize,
    },

    /// String operand longer than allowed.
    #[error("condition {condition_id} has a string of {length} characters, maximum is {max}")]
    StringTooLong {
        /// Offending predicate.
        condition_id: String,
        /// Length of the operand.
        length: usize,
        /// Configured limit.
        max: usize,
    },

    /// Raw passthrough text matched a dangerous pattern.
    #[error("raw SQL on condition {condition_id} contains a dangerous pattern ({pattern})")]
    DangerousSql {
        /// Offending predicate.
        condition_id: String,
        /// Name of the matched pattern.
        pattern: &'static str,
    },

    /// A custom handler failed to build its fragment.
    #[error("custom handler '{handler}' failed: {source}")]
    Handler {
        /// Registry key of the handler.
        handler: String,
        /// Error raised by the handler.
        #[source]
        source: HandlerError,
    },

    /// Persistence adapter error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] sift_proto::Error),
}

impl Error {
    /// Build an [`Error::InvalidValue`].
    pub fn invalid_value(condition_id: &str, reason: impl Into<String>) -> Self {
        Error::InvalidValue {
            condition_id: condition_id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
