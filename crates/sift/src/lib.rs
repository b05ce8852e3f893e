//! Sift - Validated, versioned filter trees compiled to backend-neutral criteria.
//!
//! Applications let their users build filters as JSON condition trees. Sift
//! checks those trees against an entity's field catalog and a set of security
//! limits, compiles them into [`Criteria`](proto::Criteria) that a persistence
//! adapter can execute, and migrates stored trees when the filter schema
//! moves on.
//!
//! # Quick Start
//!
//! ```ignore
//! use sift::{EntitySchema, FieldKind, FilterEngine, MemoryStore};
//! use sift::proto::{Condition, Operator, QueryParams};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = EntitySchema::new("User")
//!         .with_kind("name", FieldKind::String)
//!         .with_kind("age", FieldKind::Integer);
//!     let engine = FilterEngine::new(schema);
//!
//!     let params = QueryParams::new(1, 25)
//!         .with_filters(vec![Condition::field("c1", "age", Operator::Gte, 18)]);
//!     let result = engine.query(&MemoryStore::new(), &params).await?;
//!
//!     println!("{} of {} users match", result.filtered, result.total);
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;

pub use engine::{FilterEngine, PreparedFilter};
pub use error::{EngineError, Result};

pub use sift_core::catalog::{EntitySchema, FieldKind, FieldMap, FieldTypeConfig};
pub use sift_core::config::EngineConfig;
pub use sift_core::dialect::Dialect;
pub use sift_core::migration::{
    FilterMigrator, MigrateOptions, MigrationError, MigrationReport, SanitizeOptions,
    SanitizeReport,
};
pub use sift_core::query::{DisplayFormatter, QueryCompiler};
pub use sift_core::registry::{
    CustomHandler, HandlerError, HandlerOutput, HandlerRegistry, RegistryError,
};
pub use sift_core::security::{
    SecurityEvent, SecurityEventType, SecurityLimits, SecurityLogger, MAX_CONDITIONS_PER_GROUP,
    MAX_DEPTH, MAX_IN_VALUES, MAX_STRING_LENGTH,
};
pub use sift_core::store::{MemoryStore, PersistenceAdapter, StoreError};
pub use sift_core::validate::{ConditionValidator, ErrorCode, ValidationError, ValidationResult};

/// Re-export protocol types.
pub use sift_proto as proto;
