//! Sift Core - Condition validation, criteria compilation, and filter migration.
//!
//! This crate provides the filter engine behind sift: it checks condition
//! trees against a field catalog and security limits, compiles them into
//! backend-neutral criteria, and migrates persisted filters between schema
//! versions.

pub mod catalog;
pub mod config;
pub mod dialect;
pub mod error;
pub mod migration;
pub mod query;
pub mod registry;
pub mod security;
pub mod store;
pub mod validate;

pub use catalog::{EntitySchema, FieldKind, FieldMap, FieldTypeConfig};
pub use config::{EngineConfig, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use migration::{
    FilterMigrator, MigrateOptions, MigrationChange, MigrationError, MigrationReport,
    SanitizeOptions, SanitizeReport,
};
pub use query::{DisplayFormatter, QueryCompiler};
pub use registry::{
    CustomHandler, HandlerError, HandlerOutput, HandlerRegistry, RegistryError, SharedHandler,
};
pub use store::{CriteriaEvaluator, FindRequest, MemoryStore, PersistenceAdapter, StoreError};
pub use validate::{ConditionValidator, ErrorCode, ValidationError, ValidationResult};

// Security exports
pub use security::{
    MemorySecurityLogger, NullSecurityLogger, SecurityEvent, SecurityEventType, SecurityLimits,
    SecurityLogger, TracingSecurityLogger,
};

/// Re-export protocol types.
pub use sift_proto as proto;
