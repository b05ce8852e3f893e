//! Condition tree to criteria compilation.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use sift_proto::{Condition, ConditionKind, Criteria, Logic, Operator, QueryParams, Row, SortDirection, SortSpec};

use super::operator::map_operator;
use super::rows::{map_row, DisplayFormatter};
use super::search::build_global_search;
use super::sort::resolve_sort;
use crate::catalog::EntitySchema;
use crate::config::EngineConfig;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::registry::{HandlerOutput, HandlerRegistry};
use crate::security::{find_dangerous_pattern, SecurityLimits};

/// Condition id used for the implicit group around top-level filters.
pub const ROOT_CONDITION_ID: &str = "root";

/// Compiles condition trees for one entity schema.
///
/// The compiler never assumes the tree was validated: bounds, operands and
/// raw text are checked again, and violations are returned as errors.
#[derive(Clone)]
pub struct QueryCompiler {
    schema: EntitySchema,
    config: EngineConfig,
    registry: Arc<HandlerRegistry>,
    formatter: Option<Arc<dyn DisplayFormatter>>,
}

impl QueryCompiler {
    /// Create a compiler using the process-wide handler registry.
    pub fn new(schema: EntitySchema) -> Self {
        Self {
            schema,
            config: EngineConfig::default(),
            registry: HandlerRegistry::global(),
            formatter: None,
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the backend dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.config.dialect = dialect;
        self
    }

    /// Set the security limits.
    pub fn with_limits(mut self, limits: SecurityLimits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Use a specific handler registry.
    pub fn with_registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Install a display formatter for row mapping.
    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: DisplayFormatter + 'static,
    {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Compile the filters and global search of a request.
    ///
    /// Top-level filters are AND-ed together with the search fragment.
    pub fn compile_where(&self, params: &QueryParams) -> Result<Criteria> {
        let mut parts = vec![self.compile_condition_group(&params.filters, Logic::And)?];
        if let Some(search) = params.global_search.as_deref() {
            if let Some(fragment) = build_global_search(
                &self.schema,
                search,
                params.search_fields.as_deref(),
                &self.config.limits,
            )? {
                parts.push(fragment);
            }
        }
        Ok(Criteria::and(parts))
    }

    /// Compile a list of conditions under one combinator.
    pub fn compile_condition_group(&self, conditions: &[Condition], logic: Logic) -> Result<Criteria> {
        self.compile_group(ROOT_CONDITION_ID, logic, conditions, 0)
    }

    /// Compile one condition (group or predicate).
    pub fn compile_single_condition(&self, condition: &Condition) -> Result<Criteria> {
        self.compile_node(condition, 0)
    }

    /// Resolve the ordering of a request.
    pub fn resolve_sort(&self, field: Option<&str>, direction: SortDirection) -> SortSpec {
        resolve_sort(&self.schema, field, direction)
    }

    /// Shape a fetched row for output.
    pub fn map_row(&self, row: &Row, select: Option<&[String]>) -> Row {
        map_row(&self.schema, row, select, self.formatter.as_deref())
    }

    /// `depth` is the depth of the group's children.
    fn compile_group(
        &self,
        id: &str,
        logic: Logic,
        children: &[Condition],
        depth: usize,
    ) -> Result<Criteria> {
        let limits = &self.config.limits;
        if children.len() > limits.max_conditions_per_group {
            return Err(Error::TooManyConditions {
                condition_id: id.to_string(),
                count: children.len(),
                max: limits.max_conditions_per_group,
            });
        }

        let mut parts = Vec::with_capacity(children.len());
        for child in children {
            let compiled = self.compile_node(child, depth)?;
            if !compiled.is_empty() {
                parts.push(compiled);
            }
        }

        match logic {
            Logic::And => Ok(Criteria::and(parts)),
            Logic::Or => Ok(Criteria::or(parts)),
            Logic::Not => match parts.len() {
                0 => Ok(Criteria::Empty),
                1 => Ok(Criteria::negate(parts.remove(0))),
                found => Err(Error::NotRequiresOne {
                    condition_id: id.to_string(),
                    found,
                }),
            },
        }
    }

    fn compile_node(&self, node: &Condition, depth: usize) -> Result<Criteria> {
        let limits = &self.config.limits;
        if depth > limits.max_depth {
            return Err(Error::MaxDepthExceeded {
                condition_id: node.id.clone(),
                max: limits.max_depth,
            });
        }

        match node.kind() {
            ConditionKind::Group { logic, children } => {
                let logic = match logic {
                    None => Logic::And,
                    Some(tag) => tag.parse::<Logic>().map_err(|_| Error::InvalidLogic {
                        condition_id: node.id.clone(),
                        logic: tag.to_string(),
                    })?,
                };
                self.compile_group(&node.id, logic, children, depth + 1)
            }
            ConditionKind::Raw { sql, params } => {
                if let Some(pattern) = find_dangerous_pattern(sql) {
                    return Err(Error::DangerousSql {
                        condition_id: node.id.clone(),
                        pattern,
                    });
                }
                Ok(Criteria::Raw {
                    sql: sql.to_string(),
                    params: params.map(<[Value]>::to_vec).unwrap_or_default(),
                })
            }
            ConditionKind::Custom {
                handler,
                operator,
                value,
                params,
            } => self.compile_custom(node, handler, operator, value, params),
            ConditionKind::Relation {
                relation,
                field,
                operator,
                value,
            } => {
                let field = field.filter(|f| !f.is_empty()).ok_or_else(|| {
                    Error::invalid_value(&node.id, "relation predicate requires a relation field")
                })?;
                let operator = self.parse_operator(node, operator)?;
                let constraint = map_operator(
                    &node.id,
                    operator,
                    value,
                    &self.config.dialect,
                    &self.config.limits,
                )?;
                Ok(Criteria::Relation {
                    relation: relation.to_string(),
                    field: field.to_string(),
                    constraint,
                })
            }
            ConditionKind::Field {
                field,
                operator,
                value,
            } => {
                let field = field
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| Error::invalid_value(&node.id, "predicate requires a field"))?;
                let operator = self.parse_operator(node, operator)?;
                let constraint = map_operator(
                    &node.id,
                    operator,
                    value,
                    &self.config.dialect,
                    &self.config.limits,
                )?;
                tracing::trace!(condition_id = %node.id, field = %field, operator = %operator, "compiled predicate");
                Ok(Criteria::field(field, constraint))
            }
        }
    }

    fn compile_custom(
        &self,
        node: &Condition,
        handler_id: &str,
        operator: Option<&str>,
        value: Option<&Value>,
        params: Option<&Value>,
    ) -> Result<Criteria> {
        let Some(handler) = self.registry.get(handler_id) else {
            tracing::warn!(
                condition_id = %node.id,
                handler = %handler_id,
                "custom handler not registered, dropping condition"
            );
            return Ok(Criteria::Empty);
        };

        let operator = operator.unwrap_or(Operator::Custom.as_str());
        let value = value.cloned().unwrap_or(Value::Null);
        let output = handler
            .build_condition(operator, &value, &self.config.dialect, params)
            .map_err(|source| Error::Handler {
                handler: handler_id.to_string(),
                source,
            })?;
        tracing::debug!(condition_id = %node.id, handler = %handler_id, "compiled custom condition");

        Ok(match output {
            HandlerOutput::Raw { sql, params } => Criteria::Raw { sql, params },
            HandlerOutput::InMemory(predicate) => Criteria::InMemory(predicate),
            HandlerOutput::Criteria(criteria) => criteria,
            HandlerOutput::Empty => Criteria::Empty,
        })
    }

    fn parse_operator(&self, node: &Condition, operator: Option<&str>) -> Result<Operator> {
        let tag = operator.unwrap_or_default();
        tag.parse::<Operator>().map_err(|_| Error::UnknownOperator {
            condition_id: node.id.clone(),
            operator: tag.to_string(),
        })
    }
}

impl fmt::Debug for QueryCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCompiler")
            .field("schema", &self.schema.name)
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}
