//! The filter engine.
//!
//! [`FilterEngine`] owns one entity's validator, compiler and migrator and
//! runs a stored filter through them in order: migrate, validate, compile.

use std::fmt;
use std::sync::Arc;

use sift_core::catalog::EntitySchema;
use sift_core::config::EngineConfig;
use sift_core::migration::{
    FilterMigrator, MigrateOptions, MigrationReport, SanitizeOptions, SanitizeReport,
};
use sift_core::query::{DisplayFormatter, QueryCompiler};
use sift_core::registry::{CustomHandler, HandlerRegistry};
use sift_core::security::SecurityLogger;
use sift_core::store::PersistenceAdapter;
use sift_core::validate::{ConditionValidator, ValidationResult};
use sift_proto::{Condition, Criteria, FilterDocument, Logic, QueryParams, QueryResult};

use crate::error::{EngineError, Result};

/// A stored filter that has been migrated, validated and compiled.
#[derive(Debug, Clone)]
pub struct PreparedFilter {
    /// Compiled criteria, ready for a persistence adapter.
    pub criteria: Criteria,
    /// What migration changed; `report.document` is the tree that was compiled.
    pub report: MigrationReport,
    /// Validation outcome of the migrated tree.
    pub validation: ValidationResult,
}

impl PreparedFilter {
    /// The migrated document, for writing back to storage.
    pub fn document(&self) -> &FilterDocument {
        &self.report.document
    }

    /// Warnings collected while migrating.
    pub fn warnings(&self) -> &[String] {
        &self.report.warnings
    }
}

/// Validation, compilation and migration of filters for one entity.
///
/// # Example
///
/// ```ignore
/// use sift::{EntitySchema, FieldKind, FilterEngine};
/// use sift::proto::{Condition, FilterDocument, Operator};
///
/// let schema = EntitySchema::new("User").with_kind("age", FieldKind::Integer);
/// let engine = FilterEngine::new(schema);
///
/// let document = FilterDocument::new(vec![
///     Condition::field("c1", "age", Operator::Gte, 18),
/// ]);
/// let prepared = engine.prepare(document)?;
/// println!("{:?}", prepared.criteria);
/// ```
pub struct FilterEngine {
    compiler: QueryCompiler,
    validator: ConditionValidator,
    migrator: FilterMigrator,
    registry: Arc<HandlerRegistry>,
    logger: Option<Arc<dyn SecurityLogger>>,
}

impl FilterEngine {
    /// Create an engine with default configuration and the process-wide
    /// handler registry.
    pub fn new(schema: EntitySchema) -> Self {
        let registry = HandlerRegistry::global();
        let config = EngineConfig::default();
        let validator = build_validator(&schema, &config, &registry);
        Self {
            compiler: QueryCompiler::new(schema).with_registry(registry.clone()),
            validator,
            migrator: FilterMigrator::new().with_registry(registry.clone()),
            registry,
            logger: None,
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.validator = build_validator(self.compiler.schema(), &config, &self.registry);
        if let Some(logger) = &self.logger {
            self.validator = self.validator.with_logger(logger.clone());
        }
        self.compiler = self.compiler.with_config(config);
        self
    }

    /// Use a specific handler registry.
    pub fn with_registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.compiler = self.compiler.with_registry(registry.clone());
        self.validator = self.validator.with_registry(registry.clone());
        self.migrator = self.migrator.with_registry(registry.clone());
        self.registry = registry;
        self
    }

    /// Forward security events to a logger.
    pub fn with_logger(mut self, logger: Arc<dyn SecurityLogger>) -> Self {
        self.logger = Some(logger.clone());
        self.validator = self.validator.with_logger(logger.clone());
        self.migrator = self.migrator.with_logger(logger);
        self
    }

    /// Install a display formatter for row mapping.
    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: DisplayFormatter + 'static,
    {
        self.compiler = self.compiler.with_formatter(formatter);
        self
    }

    /// The entity schema.
    pub fn schema(&self) -> &EntitySchema {
        self.compiler.schema()
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        self.compiler.config()
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    pub fn validator(&self) -> &ConditionValidator {
        &self.validator
    }

    /// The migrator, for registering additional version transforms.
    pub fn migrator(&self) -> &FilterMigrator {
        &self.migrator
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Register a custom handler in this engine's registry.
    pub fn register_handler<H>(&self, id: impl Into<String>, handler: H, force: bool) -> Result<()>
    where
        H: CustomHandler + 'static,
    {
        self.registry.register(id, handler, force)?;
        Ok(())
    }

    /// Validate a tree without compiling it.
    pub fn validate(&self, conditions: &[Condition]) -> ValidationResult {
        self.validator.validate(conditions)
    }

    /// Check whether a stored document should be migrated before use.
    pub fn needs_migration(&self, document: &FilterDocument) -> bool {
        self.migrator.needs_migration(document)
    }

    /// Migrate a stored document and validate it against the schema.
    pub fn migrate(&self, document: FilterDocument) -> MigrationReport {
        let options = MigrateOptions::from(self.config());
        self.migrator
            .validate_and_migrate(document, Some(&self.schema().fields), &options)
    }

    /// Prune a tree down to what the schema still supports.
    pub fn sanitize(&self, conditions: &[Condition], options: &SanitizeOptions) -> SanitizeReport {
        self.migrator
            .sanitize_conditions(conditions, &self.schema().fields, options)
    }

    /// Migrate, validate and compile a stored document.
    pub fn prepare(&self, document: FilterDocument) -> Result<PreparedFilter> {
        let mut report = self.migrate(document);
        let validation = report
            .validation
            .take()
            .unwrap_or_else(|| self.validate(&report.document.conditions));
        if !validation.valid {
            tracing::debug!(
                entity = %self.schema().name,
                errors = validation.errors.len(),
                "rejecting invalid filter"
            );
            return Err(EngineError::Invalid(validation));
        }

        let criteria = self
            .compiler
            .compile_condition_group(&report.document.conditions, Logic::And)?;
        Ok(PreparedFilter {
            criteria,
            report,
            validation,
        })
    }

    /// Validate and compile the filters and search of a request.
    pub fn compile(&self, params: &QueryParams) -> Result<Criteria> {
        self.check(&params.filters)?;
        Ok(self.compiler.compile_where(params)?)
    }

    /// Validate a request and run it against a persistence adapter.
    pub async fn query(
        &self,
        adapter: &dyn PersistenceAdapter,
        params: &QueryParams,
    ) -> Result<QueryResult> {
        self.check(&params.filters)?;
        Ok(self.compiler.execute(adapter, params).await?)
    }

    fn check(&self, conditions: &[Condition]) -> Result<()> {
        let validation = self.validate(conditions);
        if validation.valid {
            Ok(())
        } else {
            Err(EngineError::Invalid(validation))
        }
    }
}

fn build_validator(
    schema: &EntitySchema,
    config: &EngineConfig,
    registry: &Arc<HandlerRegistry>,
) -> ConditionValidator {
    let validator = ConditionValidator::new(schema.fields.clone())
        .with_limits(config.limits)
        .with_registry(registry.clone());
    match &config.allowed_fields {
        Some(allowed) => validator.with_allowed_fields(allowed.iter().cloned()),
        None => validator,
    }
}

impl fmt::Debug for FilterEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterEngine")
            .field("compiler", &self.compiler)
            .field("migrator", &self.migrator)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sift_core::catalog::FieldKind;
    use sift_core::registry::{HandlerError, HandlerOutput};
    use sift_core::security::{MemorySecurityLogger, SecurityEventType};
    use sift_core::store::MemoryStore;
    use sift_core::validate::ErrorCode;
    use sift_core::Dialect;
    use sift_proto::{Constraint, Operator, Value};

    fn schema() -> EntitySchema {
        EntitySchema::new("Order")
            .with_kind("status", FieldKind::Select)
            .with_kind("total", FieldKind::Float)
            .with_kind("note", FieldKind::Text)
    }

    fn engine() -> FilterEngine {
        FilterEngine::new(schema()).with_registry(Arc::new(HandlerRegistry::new()))
    }

    #[test]
    fn test_prepare_legacy_document() {
        let document: FilterDocument = serde_json::from_value(json!({
            "conditions": [
                { "id": "a", "field": "status", "operator": "nin", "value": "void,refunded" },
                { "id": "b", "field": "total", "operator": "greaterThan", "value": 100 }
            ]
        }))
        .unwrap();

        let prepared = engine().prepare(document).unwrap();
        assert!(prepared.report.migrated);
        assert!(prepared.validation.valid);
        assert_eq!(prepared.document().version, sift_proto::CURRENT_FILTER_VERSION);
        assert_eq!(
            prepared.criteria,
            Criteria::And(vec![
                Criteria::field(
                    "status",
                    Constraint::NotIn(vec![json!("void"), json!("refunded")])
                ),
                Criteria::field("total", Constraint::Gt(json!(100))),
            ])
        );
    }

    #[test]
    fn test_prepare_rejects_invalid() {
        let document = FilterDocument::new(vec![Condition::field(
            "a",
            "note",
            Operator::In,
            json!(["x"]),
        )]);
        let err = engine().prepare(document).unwrap_err();
        let validation = err.validation().unwrap();
        assert!(!validation.valid);
        assert_eq!(validation.errors[0].code, ErrorCode::InvalidOperator);
    }

    #[test]
    fn test_prepare_lenient_about_removed_fields() {
        let document = FilterDocument::new(vec![Condition::field(
            "a",
            "legacy_flag",
            Operator::Eq,
            true,
        )]);
        let prepared = engine().prepare(document.clone()).unwrap();
        assert_eq!(
            prepared.warnings(),
            &[
                "Unknown field 'legacy_flag'".to_string(),
                "Field 'legacy_flag' no longer exists in the schema".to_string()
            ]
        );

        let strict = engine().with_config(EngineConfig::default().with_strict_validation(true));
        let err = strict.prepare(document).unwrap_err();
        assert!(err.validation().unwrap().has_code(ErrorCode::UnknownField));
    }

    #[test]
    fn test_logger_receives_events() {
        let logger = MemorySecurityLogger::new();
        let engine = engine().with_logger(Arc::new(logger.clone()));
        let result = engine.validate(&[Condition::raw("r", "1=1 UNION SELECT * FROM users", None)]);
        assert!(result.has_code(ErrorCode::DangerousSql));
        assert_eq!(logger.events()[0].event_type, SecurityEventType::DangerousSql);
    }

    #[test]
    fn test_allowed_fields_from_config() {
        let engine = engine().with_config(EngineConfig::default().with_allowed_fields(["status"]));
        let params = QueryParams::new(1, 10).with_filters(vec![Condition::field(
            "a",
            "total",
            Operator::Gt,
            1,
        )]);
        let err = engine.compile(&params).unwrap_err();
        assert!(err.validation().unwrap().has_code(ErrorCode::FieldNotAllowed));
    }

    #[test]
    fn test_register_handler() {
        let engine = engine();
        engine
            .register_handler(
                "Order.big",
                |_op: &str,
                 _value: &Value,
                 _dialect: &Dialect,
                 _params: Option<&Value>|
                 -> std::result::Result<HandlerOutput, HandlerError> {
                    Ok(HandlerOutput::Criteria(Criteria::field(
                        "total",
                        Constraint::Gte(json!(1000)),
                    )))
                },
                false,
            )
            .unwrap();
        let duplicate = engine.register_handler(
            "Order.big",
            |_op: &str,
             _value: &Value,
             _dialect: &Dialect,
             _params: Option<&Value>|
             -> std::result::Result<HandlerOutput, HandlerError> { Ok(HandlerOutput::Empty) },
            false,
        );
        assert!(matches!(duplicate, Err(EngineError::Registry(_))));

        let params = QueryParams::new(1, 10).with_filters(vec![Condition::custom(
            "c",
            "Order.big",
            Operator::Custom,
            true,
        )]);
        assert_eq!(
            engine.compile(&params).unwrap(),
            Criteria::field("total", Constraint::Gte(json!(1000)))
        );
    }

    #[tokio::test]
    async fn test_query_runs_against_store() {
        let store = MemoryStore::from_json(vec![
            json!({ "id": 1, "status": "paid", "total": 250.0, "note": "gift" }),
            json!({ "id": 2, "status": "void", "total": 80.0, "note": null }),
            json!({ "id": 3, "status": "paid", "total": 40.0, "note": "gift wrap" }),
        ])
        .unwrap();
        let params = QueryParams::new(1, 10)
            .with_filters(vec![Condition::field("a", "status", Operator::Eq, "paid")])
            .with_search("wrap");

        let result = engine().query(&store, &params).await.unwrap();
        assert_eq!(result.total, 3);
        assert_eq!(result.filtered, 1);
        assert_eq!(result.data[0].get("id"), Some(&json!(3)));
    }
}
