//! Sift protocol types.
//!
//! This crate defines the data that crosses the boundaries of the filter
//! engine: the condition tree callers build or persist, the criteria the
//! compiler emits, and the paged query contract.
//!
//! # Modules
//!
//! - [`operator`] - Operator and group-logic vocabularies
//! - [`condition`] - Condition tree nodes and traversal helpers
//! - [`document`] - Versioned persisted filter trees
//! - [`criteria`] - Compiled, backend-neutral criteria
//! - [`query`] - Query parameters and paged results
//! - [`error`] - Protocol error types
//!
//! # Wire format
//!
//! Everything serializes to JSON with camelCase keys:
//!
//! ```
//! use sift_proto::{Condition, Operator};
//!
//! let condition = Condition::field("c1", "age", Operator::Gte, 18);
//! let json = serde_json::to_string(&condition).unwrap();
//! assert_eq!(json, r#"{"id":"c1","field":"age","operator":"gte","value":18}"#);
//! ```

pub mod condition;
pub mod criteria;
pub mod document;
pub mod error;
pub mod operator;
pub mod query;

pub use error::Error;

// Re-export commonly used types at crate root
pub use condition::{Condition, ConditionKind};
pub use criteria::{Constraint, Criteria, InMemoryPredicate, Row};
pub use document::{FilterDocument, CURRENT_FILTER_VERSION, LEGACY_FILTER_VERSION};
pub use operator::{Logic, Operator};
pub use query::{QueryParams, QueryResult, SortDirection, SortSpec};
pub use serde_json::Value;
