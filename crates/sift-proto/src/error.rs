//! Protocol error types.

use thiserror::Error;

/// Errors raised while interpreting wire-level tags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Operator tag is not part of the current vocabulary.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// Group logic tag is not AND, OR or NOT.
    #[error("invalid logic operator: {0}")]
    InvalidLogic(String),

    /// Sort direction tag is not ASC or DESC.
    #[error("invalid sort direction: {0}")]
    InvalidSortDirection(String),
}
