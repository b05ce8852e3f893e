//! Custom handler registry.
//!
//! Handlers compile predicates the core compiler cannot express generically
//! (JSON paths, full-text search, computed fields). They are keyed by an id,
//! conventionally `"Model.field"`.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use sift_proto::{Criteria, InMemoryPredicate};
use thiserror::Error;

use crate::dialect::Dialect;

/// Error raised by a handler while building its fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The handler cannot use the operand.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The handler has no branch for this operator.
    #[error("unsupported operator '{0}'")]
    UnsupportedOperator(String),

    /// The handler has no branch for this dialect.
    #[error("unsupported dialect '{0}'")]
    UnsupportedDialect(String),

    /// Any other failure.
    #[error("{0}")]
    Failed(String),
}

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A handler with this id is already registered.
    #[error("custom handler '{0}' is already registered")]
    AlreadyRegistered(String),
}

/// Fragment built by a custom handler.
#[derive(Debug, Clone)]
pub enum HandlerOutput {
    /// Raw passthrough text for the persistence adapter.
    Raw { sql: String, params: Vec<Value> },
    /// Predicate applied after rows are fetched.
    InMemory(InMemoryPredicate),
    /// Structured criteria spliced in as-is.
    Criteria(Criteria),
    /// Nothing to add.
    Empty,
}

/// Compiles custom predicates.
pub trait CustomHandler: Send + Sync {
    /// Build the fragment for `operator` and `value` on the given dialect.
    fn build_condition(
        &self,
        operator: &str,
        value: &Value,
        dialect: &Dialect,
        params: Option<&Value>,
    ) -> Result<HandlerOutput, HandlerError>;

    /// Check an operand before compilation; the error is shown to the user.
    fn validate(&self, _value: &Value) -> Result<(), String> {
        Ok(())
    }
}

impl<F> CustomHandler for F
where
    F: Fn(&str, &Value, &Dialect, Option<&Value>) -> Result<HandlerOutput, HandlerError>
        + Send
        + Sync,
{
    fn build_condition(
        &self,
        operator: &str,
        value: &Value,
        dialect: &Dialect,
        params: Option<&Value>,
    ) -> Result<HandlerOutput, HandlerError> {
        self(operator, value, dialect, params)
    }
}

/// Shared handle to a registered handler.
pub type SharedHandler = Arc<dyn CustomHandler>;

/// Concurrent map from handler id to handler.
///
/// Reads happen during compiles and never block each other. Writes are
/// administrative and expected at setup or teardown.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<String, SharedHandler>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    ///
    /// Entries never expire; callers own its lifecycle.
    pub fn global() -> Arc<HandlerRegistry> {
        static GLOBAL: OnceLock<Arc<HandlerRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(HandlerRegistry::new())).clone()
    }

    /// Register a handler.
    ///
    /// Fails if `id` is taken unless `force` is set, in which case the
    /// previous handler is replaced.
    pub fn register<H>(&self, id: impl Into<String>, handler: H, force: bool) -> Result<(), RegistryError>
    where
        H: CustomHandler + 'static,
    {
        self.register_shared(id, Arc::new(handler), force)
    }

    /// Register an already shared handler.
    pub fn register_shared(
        &self,
        id: impl Into<String>,
        handler: SharedHandler,
        force: bool,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        match self.handlers.entry(id) {
            Entry::Occupied(mut entry) => {
                if !force {
                    return Err(RegistryError::AlreadyRegistered(entry.key().clone()));
                }
                tracing::debug!(handler = %entry.key(), "replacing custom handler");
                entry.insert(handler);
            }
            Entry::Vacant(entry) => {
                tracing::debug!(handler = %entry.key(), "registering custom handler");
                entry.insert(handler);
            }
        }
        Ok(())
    }

    /// Look up a handler.
    pub fn get(&self, id: &str) -> Option<SharedHandler> {
        self.handlers.get(id).map(|entry| entry.value().clone())
    }

    /// Check whether a handler is registered.
    pub fn has(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    /// Remove a handler, returning whether it existed.
    pub fn unregister(&self, id: &str) -> bool {
        self.handlers.remove(id).is_some()
    }

    /// Remove every handler.
    pub fn clear(&self) {
        self.handlers.clear();
    }

    /// Snapshot of every registered handler, keyed by id.
    pub fn get_all(&self) -> BTreeMap<String, SharedHandler> {
        self.handlers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Snapshot of handlers whose id starts with `"<model>."`.
    pub fn get_for_model(&self, model: &str) -> BTreeMap<String, SharedHandler> {
        let prefix = format!("{model}.");
        self.handlers
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        f.debug_struct("HandlerRegistry").field("handlers", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_handler(sql: &'static str) -> impl CustomHandler {
        move |_op: &str,
              value: &Value,
              _d: &Dialect,
              _p: Option<&Value>|
              -> Result<HandlerOutput, HandlerError> {
            Ok(HandlerOutput::Raw {
                sql: sql.to_string(),
                params: vec![value.clone()],
            })
        }
    }

    fn built_sql(handler: &SharedHandler) -> String {
        match handler.build_condition("custom", &json!(1), &Dialect::generic(), None) {
            Ok(HandlerOutput::Raw { sql, .. }) => sql,
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn test_register_twice_fails_without_force() {
        let registry = HandlerRegistry::new();
        registry.register("User.tags", raw_handler("first"), false).unwrap();
        let err = registry
            .register("User.tags", raw_handler("second"), false)
            .unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered("User.tags".into()));
        assert_eq!(built_sql(&registry.get("User.tags").unwrap()), "first");
    }

    #[test]
    fn test_force_replaces() {
        let registry = HandlerRegistry::new();
        registry.register("User.tags", raw_handler("first"), false).unwrap();
        registry.register("User.tags", raw_handler("second"), true).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(built_sql(&registry.get("User.tags").unwrap()), "second");
    }

    #[test]
    fn test_get_for_model_is_prefix_exact() {
        let registry = HandlerRegistry::new();
        registry.register("User.tags", raw_handler("a"), false).unwrap();
        registry.register("User.meta", raw_handler("b"), false).unwrap();
        registry.register("UserGroup.tags", raw_handler("c"), false).unwrap();
        registry.register("user.tags", raw_handler("d"), false).unwrap();

        let for_user = registry.get_for_model("User");
        assert_eq!(
            for_user.keys().cloned().collect::<Vec<_>>(),
            vec!["User.meta".to_string(), "User.tags".to_string()]
        );
    }

    #[test]
    fn test_get_all_is_snapshot() {
        let registry = HandlerRegistry::new();
        registry.register("A.x", raw_handler("a"), false).unwrap();
        let snapshot = registry.get_all();
        registry.clear();
        assert_eq!(snapshot.len(), 1);
        assert!(registry.is_empty());
        assert!(!registry.has("A.x"));
    }

    #[test]
    fn test_unregister() {
        let registry = HandlerRegistry::new();
        registry.register("A.x", raw_handler("a"), false).unwrap();
        assert!(registry.unregister("A.x"));
        assert!(!registry.unregister("A.x"));
        assert!(registry.get("A.x").is_none());
    }

    #[test]
    fn test_default_validate_accepts() {
        let handler = raw_handler("a");
        assert_eq!(handler.validate(&json!(null)), Ok(()));
    }

    #[test]
    fn test_global_is_shared() {
        let a = HandlerRegistry::global();
        let b = HandlerRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
