//! Persistence adapter boundary.
//!
//! The engine never executes queries itself. A [`PersistenceAdapter`] turns
//! compiled [`Criteria`] into rows; [`MemoryStore`] is a reference adapter
//! over JSON rows.

pub mod evaluator;
pub mod memory;

use async_trait::async_trait;
use sift_proto::{Criteria, Row, SortSpec};
use thiserror::Error;

pub use evaluator::CriteriaEvaluator;
pub use memory::MemoryStore;

/// Errors raised by persistence adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The adapter cannot express a criteria fragment.
    #[error("unsupported criteria: {0}")]
    Unsupported(String),

    /// A criteria fragment is malformed.
    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    /// The backend failed.
    #[error("backend error: {0}")]
    Backend(String),
}

/// One page fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FindRequest {
    /// Rows must match these criteria.
    pub criteria: Criteria,
    /// Ordering.
    pub sort: SortSpec,
    /// Rows to skip.
    pub offset: u64,
    /// Maximum rows to return.
    pub limit: u64,
}

/// Executes compiled criteria against a storage engine.
///
/// Adapters must apply [`Criteria::InMemory`] fragments to the candidate rows
/// they fetch, and must treat [`Criteria::Raw`] text as opaque.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Count rows matching the criteria.
    async fn count(&self, criteria: &Criteria) -> Result<u64, StoreError>;

    /// Fetch one page of matching rows.
    async fn find(&self, request: &FindRequest) -> Result<Vec<Row>, StoreError>;
}
