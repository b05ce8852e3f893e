//! Carries stored filter documents to the current schema version.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sift_proto::condition::{referenced_fields, referenced_operators, walk_mut};
use sift_proto::{Condition, FilterDocument, Operator, CURRENT_FILTER_VERSION};

use super::deprecations::{is_deprecated, replacement};
use super::error::MigrationError;
use super::sanitize::{sanitize_conditions, SanitizeOptions, SanitizeReport};
use super::transforms::v1_to_v2;
use crate::catalog::FieldMap;
use crate::config::EngineConfig;
use crate::registry::HandlerRegistry;
use crate::security::{SecurityLimits, SecurityLogger};
use crate::validate::{ConditionValidator, ErrorCode, ValidationResult};

/// Rewrites a tree from one version to the next.
pub type MigrationFn =
    Arc<dyn Fn(Vec<Condition>) -> Result<Vec<Condition>, MigrationError> + Send + Sync>;

/// Options for [`FilterMigrator::validate_and_migrate`].
#[derive(Debug, Clone, PartialEq)]
pub struct MigrateOptions {
    /// Run version transforms.
    pub auto_migrate: bool,
    /// Keep unknown-field errors as errors.
    pub strict_validation: bool,
    /// Fields predicates may reference.
    pub allowed_fields: Option<Vec<String>>,
    /// Limits used by the validation step.
    pub limits: SecurityLimits,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            auto_migrate: true,
            strict_validation: false,
            allowed_fields: None,
            limits: SecurityLimits::default(),
        }
    }
}

impl From<&EngineConfig> for MigrateOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            auto_migrate: config.auto_migrate,
            strict_validation: config.strict_validation,
            allowed_fields: config.allowed_fields.clone(),
            limits: config.limits,
        }
    }
}

/// Kind of change made while migrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A deprecated operator spelling was replaced.
    OperatorRenamed,
    /// A version transform rewrote the tree.
    StructureChanged,
}

/// One change made while migrating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationChange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<String>,
    pub description: String,
}

/// Outcome of [`FilterMigrator::validate_and_migrate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// The migrated document, stamped with the version it now conforms to.
    pub document: FilterDocument,
    /// Whether anything changed.
    pub migrated: bool,
    pub from_version: u32,
    pub to_version: u32,
    pub changes: Vec<MigrationChange>,
    pub warnings: Vec<String>,
    /// Present when a field map was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
}

/// Migrates stored filter documents.
///
/// Migration is best-effort: failed transforms and unknown operators become
/// warnings, never errors.
pub struct FilterMigrator {
    migrations: RwLock<BTreeMap<u32, MigrationFn>>,
    registry: Option<Arc<HandlerRegistry>>,
    logger: Option<Arc<dyn SecurityLogger>>,
}

impl Default for FilterMigrator {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterMigrator {
    /// Create a migrator with the built-in transforms registered.
    pub fn new() -> Self {
        let migrator = Self::empty();
        migrator.register_migration(1, v1_to_v2);
        migrator
    }

    /// Create a migrator with no transforms.
    pub fn empty() -> Self {
        Self {
            migrations: RwLock::new(BTreeMap::new()),
            registry: None,
            logger: None,
        }
    }

    /// Let the validation step consult custom handlers.
    pub fn with_registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Forward security events raised by the validation step.
    pub fn with_logger(mut self, logger: Arc<dyn SecurityLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Register the transform from `from_version` to `from_version + 1`,
    /// replacing any previous one.
    pub fn register_migration<F>(&self, from_version: u32, transform: F)
    where
        F: Fn(Vec<Condition>) -> Result<Vec<Condition>, MigrationError> + Send + Sync + 'static,
    {
        self.migrations
            .write()
            .insert(from_version, Arc::new(transform));
    }

    /// Check whether a transform starts at `from_version`.
    pub fn has_migration(&self, from_version: u32) -> bool {
        self.migrations.read().contains_key(&from_version)
    }

    /// Check whether a document is behind the current version or still uses
    /// deprecated operator spellings.
    pub fn needs_migration(&self, document: &FilterDocument) -> bool {
        if document.is_outdated() {
            return true;
        }
        referenced_operators(&document.conditions)
            .iter()
            .any(|tag| is_deprecated(tag))
    }

    /// Bring a document to the current version and validate it.
    pub fn validate_and_migrate(
        &self,
        document: FilterDocument,
        fields: Option<&FieldMap>,
        options: &MigrateOptions,
    ) -> MigrationReport {
        let from_version = document.version;
        let mut conditions = document.conditions;
        let mut changes = Vec::new();
        let mut warnings = Vec::new();

        rename_operators(&mut conditions, &mut changes, &mut warnings);

        let to_version = CURRENT_FILTER_VERSION;
        if from_version > CURRENT_FILTER_VERSION {
            warnings.push(format!(
                "Filter version {from_version} is newer than supported version {CURRENT_FILTER_VERSION}"
            ));
        } else if from_version < CURRENT_FILTER_VERSION {
            if options.auto_migrate {
                conditions = self.run_transforms(from_version, conditions, &mut changes, &mut warnings);
            } else {
                warnings.push(format!(
                    "Automatic migration disabled; version {from_version} transforms skipped"
                ));
            }
        }

        let document = FilterDocument::with_version(to_version, conditions);

        let validation = fields.map(|fields| {
            let mut validator = ConditionValidator::new(fields.clone()).with_limits(options.limits);
            if let Some(allowed) = &options.allowed_fields {
                validator = validator.with_allowed_fields(allowed.iter().cloned());
            }
            if let Some(registry) = &self.registry {
                validator = validator.with_registry(registry.clone());
            }
            if let Some(logger) = &self.logger {
                validator = validator.with_logger(logger.clone());
            }
            let mut result = validator.validate(&document.conditions);
            if !options.strict_validation {
                let (demoted, kept): (Vec<_>, Vec<_>) = result
                    .errors
                    .into_iter()
                    .partition(|e| e.code == ErrorCode::UnknownField);
                warnings.extend(demoted.into_iter().map(|e| e.message));
                result = ValidationResult::from_parts(kept, result.security_events);
            }
            result
        });

        if let Some(fields) = fields {
            for field in referenced_fields(&document.conditions) {
                if !fields.contains(&field) {
                    warnings.push(format!("Field '{field}' no longer exists in the schema"));
                }
            }
        }

        let migrated = !changes.is_empty() || from_version != to_version;
        if migrated {
            tracing::info!(
                from_version,
                to_version,
                changes = changes.len(),
                warnings = warnings.len(),
                "migrated filter document"
            );
        }

        MigrationReport {
            document,
            migrated,
            from_version,
            to_version,
            changes,
            warnings,
            validation,
        }
    }

    /// Produce a pruned copy of a tree; see [`sanitize_conditions`].
    pub fn sanitize_conditions(
        &self,
        conditions: &[Condition],
        fields: &FieldMap,
        options: &SanitizeOptions,
    ) -> SanitizeReport {
        sanitize_conditions(conditions, fields, options)
    }

    fn run_transforms(
        &self,
        from_version: u32,
        mut conditions: Vec<Condition>,
        changes: &mut Vec<MigrationChange>,
        warnings: &mut Vec<String>,
    ) -> Vec<Condition> {
        let migrations = self.migrations.read();
        for version in from_version..CURRENT_FILTER_VERSION {
            let Some(transform) = migrations.get(&version) else {
                continue;
            };
            match transform(conditions.clone()) {
                Ok(next) => {
                    conditions = next;
                    changes.push(MigrationChange {
                        kind: ChangeKind::StructureChanged,
                        condition_id: None,
                        description: format!(
                            "Applied migration from version {version} to {}",
                            version + 1
                        ),
                    });
                }
                Err(err) => {
                    tracing::warn!(version, error = %err, "filter migration step failed, skipping");
                    warnings.push(format!("Migration from version {version} skipped: {err}"));
                }
            }
        }
        conditions
    }
}

impl fmt::Debug for FilterMigrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let versions: Vec<u32> = self.migrations.read().keys().copied().collect();
        f.debug_struct("FilterMigrator")
            .field("migrations", &versions)
            .field("registry", &self.registry.is_some())
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

fn rename_operators(
    conditions: &mut [Condition],
    changes: &mut Vec<MigrationChange>,
    warnings: &mut Vec<String>,
) {
    walk_mut(conditions, |node| {
        let Some(tag) = node.operator.as_deref() else {
            return;
        };
        if Operator::is_known(tag) {
            return;
        }
        match replacement(tag) {
            Some(current) => {
                changes.push(MigrationChange {
                    kind: ChangeKind::OperatorRenamed,
                    condition_id: Some(node.id.clone()),
                    description: format!("Renamed operator '{tag}' to '{current}'"),
                });
                node.operator = Some(current.as_str().to_string());
            }
            None => warnings.push(format!(
                "Unknown operator '{tag}' on condition {}",
                node.id
            )),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldKind;
    use serde_json::json;
    use sift_proto::{Logic, LEGACY_FILTER_VERSION};

    fn fields() -> FieldMap {
        FieldMap::new()
            .with_kind("status", FieldKind::Select)
            .with_kind("age", FieldKind::Integer)
    }

    fn legacy() -> FilterDocument {
        serde_json::from_value(json!({
            "conditions": [
                { "id": "a", "field": "status", "operator": "nin", "value": "archived,deleted" },
                { "id": "b", "logic": "OR", "children": [
                    { "id": "c", "field": "age", "operator": "between", "value": { "from": 18, "to": 65 } },
                    { "id": "d", "field": "age", "operator": "greaterThan", "value": 99 }
                ]}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_full_migration() {
        let migrator = FilterMigrator::new();
        assert!(migrator.has_migration(1));
        assert!(!FilterMigrator::empty().has_migration(1));
        let doc = legacy();
        assert_eq!(doc.version, LEGACY_FILTER_VERSION);
        assert!(migrator.needs_migration(&doc));

        let report = migrator.validate_and_migrate(doc, Some(&fields()), &MigrateOptions::default());
        assert!(report.migrated);
        assert_eq!(report.from_version, 1);
        assert_eq!(report.to_version, CURRENT_FILTER_VERSION);
        assert_eq!(report.document.version, CURRENT_FILTER_VERSION);

        let kinds: Vec<ChangeKind> = report.changes.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::OperatorRenamed,
                ChangeKind::OperatorRenamed,
                ChangeKind::StructureChanged
            ]
        );

        let first = &report.document.conditions[0];
        assert_eq!(first.operator.as_deref(), Some("notIn"));
        assert_eq!(first.value, Some(json!(["archived", "deleted"])));
        let nested = report.document.conditions[1].children.as_ref().unwrap();
        assert_eq!(nested[0].value, Some(json!([18, 65])));
        assert_eq!(nested[1].operator.as_deref(), Some("gt"));

        let validation = report.validation.unwrap();
        assert!(validation.valid, "{:?}", validation.errors);
    }

    #[test]
    fn test_migration_converges() {
        let migrator = FilterMigrator::new();
        let report = migrator.validate_and_migrate(legacy(), None, &MigrateOptions::default());
        assert!(report.validation.is_none());
        assert!(!migrator.needs_migration(&report.document));

        let again = migrator.validate_and_migrate(report.document.clone(), None, &MigrateOptions::default());
        assert!(!again.migrated);
        assert!(again.changes.is_empty());
        assert_eq!(again.document, report.document);
    }

    #[test]
    fn test_failing_transform_is_a_warning() {
        let migrator = FilterMigrator::empty();
        migrator.register_migration(1, |_| {
            Err(MigrationError::TransformFailed {
                from_version: 1,
                reason: "boom".into(),
            })
        });
        let doc = FilterDocument::with_version(1, vec![Condition::field("a", "age", Operator::Eq, 1)]);
        let report = migrator.validate_and_migrate(doc, None, &MigrateOptions::default());
        assert!(report.migrated);
        assert!(report.changes.is_empty());
        assert_eq!(report.document.version, CURRENT_FILTER_VERSION);
        assert!(report.warnings[0].contains("boom"));
    }

    #[test]
    fn test_unknown_field_demoted_unless_strict() {
        let migrator = FilterMigrator::new();
        let doc = FilterDocument::new(vec![
            Condition::field("a", "dropped", Operator::Eq, 1),
            Condition::field("b", "age", Operator::Eq, 1),
        ]);

        let lenient = migrator.validate_and_migrate(doc.clone(), Some(&fields()), &MigrateOptions::default());
        let validation = lenient.validation.unwrap();
        assert!(validation.valid);
        assert_eq!(
            lenient.warnings,
            vec![
                "Unknown field 'dropped'".to_string(),
                "Field 'dropped' no longer exists in the schema".to_string()
            ]
        );

        let strict_options = MigrateOptions {
            strict_validation: true,
            ..Default::default()
        };
        let strict = migrator.validate_and_migrate(doc, Some(&fields()), &strict_options);
        let validation = strict.validation.unwrap();
        assert!(!validation.valid);
        assert_eq!(validation.errors[0].code, ErrorCode::UnknownField);
        assert_eq!(strict.warnings, vec!["Field 'dropped' no longer exists in the schema".to_string()]);
    }

    #[test]
    fn test_unknown_operator_recorded() {
        let mut node = Condition::field("a", "age", Operator::Eq, 1);
        node.operator = Some("approx".into());
        let report = FilterMigrator::new().validate_and_migrate(
            FilterDocument::new(vec![node]),
            None,
            &MigrateOptions::default(),
        );
        assert!(!report.migrated);
        assert_eq!(report.warnings, vec!["Unknown operator 'approx' on condition a".to_string()]);
        assert_eq!(report.document.conditions[0].operator.as_deref(), Some("approx"));
    }

    #[test]
    fn test_auto_migrate_disabled() {
        let options = MigrateOptions {
            auto_migrate: false,
            ..Default::default()
        };
        let report = FilterMigrator::new().validate_and_migrate(legacy(), None, &options);
        assert_eq!(report.changes.len(), 2);
        let first = &report.document.conditions[0];
        assert_eq!(first.operator.as_deref(), Some("notIn"));
        assert_eq!(first.value, Some(json!("archived,deleted")));
        assert_eq!(report.document.version, CURRENT_FILTER_VERSION);
        assert_eq!(report.to_version, CURRENT_FILTER_VERSION);
        assert!(report.migrated);
        assert!(report.warnings[0].starts_with("Automatic migration disabled"));
        assert!(!FilterMigrator::new().needs_migration(&report.document));
    }

    #[test]
    fn test_sanitize_through_migrator() {
        let tree = vec![
            Condition::raw("r", "1 = 1", None),
            Condition::group("g", Logic::And, vec![Condition::field("a", "age", Operator::Eq, 1)]),
        ];
        let report = FilterMigrator::new().sanitize_conditions(&tree, &fields(), &SanitizeOptions::default());
        assert_eq!(report.conditions.len(), 1);
        assert_eq!(report.removed[0].condition_id, "r");
    }
}
