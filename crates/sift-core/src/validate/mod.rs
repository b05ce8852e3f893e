//! Structural and semantic validation of condition trees.
//!
//! The validator walks a tree against a [`FieldMap`], the operator legality
//! matrix and the [`SecurityLimits`]. Problems are returned as data; nothing
//! here fails with `Err`.

pub mod value;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sift_proto::{Condition, ConditionKind, Logic, Operator};

use crate::catalog::{FieldMap, FieldTypeConfig};
use crate::registry::HandlerRegistry;
use crate::security::{
    count_placeholders, find_dangerous_pattern, SecurityEvent, SecurityEventType, SecurityLimits,
    SecurityLogger, TracingSecurityLogger,
};

pub use value::{as_number, check_value, is_empty_value, ValueIssue};

/// Stable validation error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MaxDepthExceeded,
    TooManyConditions,
    InvalidLogic,
    NotRequiresOne,
    DangerousSql,
    ParamMismatch,
    FieldRequired,
    FieldNotAllowed,
    UnknownField,
    OperatorRequired,
    InvalidOperator,
    InvalidValue,
}

impl ErrorCode {
    /// Stable tag of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MaxDepthExceeded => "MAX_DEPTH_EXCEEDED",
            ErrorCode::TooManyConditions => "TOO_MANY_CONDITIONS",
            ErrorCode::InvalidLogic => "INVALID_LOGIC",
            ErrorCode::NotRequiresOne => "NOT_REQUIRES_ONE",
            ErrorCode::DangerousSql => "DANGEROUS_SQL",
            ErrorCode::ParamMismatch => "PARAM_MISMATCH",
            ErrorCode::FieldRequired => "FIELD_REQUIRED",
            ErrorCode::FieldNotAllowed => "FIELD_NOT_ALLOWED",
            ErrorCode::UnknownField => "UNKNOWN_FIELD",
            ErrorCode::OperatorRequired => "OPERATOR_REQUIRED",
            ErrorCode::InvalidOperator => "INVALID_OPERATOR",
            ErrorCode::InvalidValue => "INVALID_VALUE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reason a filter is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// Node the error is about.
    pub condition_id: String,
    /// Field the node tests, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Stable code.
    pub code: ErrorCode,
}

impl ValidationError {
    pub fn new(
        condition_id: impl Into<String>,
        field: Option<&str>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            condition_id: condition_id.into(),
            field: field.map(str::to_string),
            message: message.into(),
            code,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.condition_id, self.message)
    }
}

/// Outcome of validating a tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Whether the tree has no errors.
    pub valid: bool,
    /// Errors in document order.
    pub errors: Vec<ValidationError>,
    /// Security events raised while validating.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_events: Vec<SecurityEvent>,
}

impl ValidationResult {
    /// Build a result from its errors and events.
    pub fn from_parts(errors: Vec<ValidationError>, security_events: Vec<SecurityEvent>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            security_events,
        }
    }

    /// Check whether any error carries `code`.
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Check whether any security event has `event_type`.
    pub fn has_event(&self, event_type: SecurityEventType) -> bool {
        self.security_events.iter().any(|e| e.event_type == event_type)
    }
}

/// Validates condition trees against a field map.
#[derive(Clone)]
pub struct ConditionValidator {
    fields: FieldMap,
    limits: SecurityLimits,
    allowed_fields: Option<BTreeSet<String>>,
    registry: Option<Arc<HandlerRegistry>>,
    logger: Option<Arc<dyn SecurityLogger>>,
}

impl ConditionValidator {
    /// Create a validator with default limits.
    pub fn new(fields: FieldMap) -> Self {
        Self {
            fields,
            limits: SecurityLimits::default(),
            allowed_fields: None,
            registry: None,
            logger: None,
        }
    }

    /// Set the security limits.
    pub fn with_limits(mut self, limits: SecurityLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Restrict predicates to the given fields.
    pub fn with_allowed_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Consult registered handlers' own operand checks.
    pub fn with_registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Forward security events to a logger instead of `tracing`.
    pub fn with_logger(mut self, logger: Arc<dyn SecurityLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The field map.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// The security limits.
    pub fn limits(&self) -> &SecurityLimits {
        &self.limits
    }

    /// Validate a forest of conditions.
    pub fn validate(&self, conditions: &[Condition]) -> ValidationResult {
        let mut run = Run::new(self);
        let mut stack: Vec<(&Condition, usize)> =
            conditions.iter().rev().map(|c| (c, 0)).collect();

        while let Some((node, depth)) = stack.pop() {
            if depth > self.limits.max_depth {
                run.security(
                    node,
                    None,
                    ErrorCode::MaxDepthExceeded,
                    SecurityEventType::MaxDepthExceeded,
                    format!("Maximum nesting depth of {} exceeded", self.limits.max_depth),
                    None,
                );
                continue;
            }

            match node.kind() {
                ConditionKind::Group { logic, children } => {
                    if !self.check_group(&mut run, node, logic, children) {
                        continue;
                    }
                    stack.extend(children.iter().rev().map(|c| (c, depth + 1)));
                }
                ConditionKind::Raw { sql, params } => self.check_raw(&mut run, node, sql, params),
                ConditionKind::Custom { handler, value, .. } => {
                    self.check_custom(&mut run, node, handler, value)
                }
                ConditionKind::Relation {
                    relation,
                    field,
                    operator,
                    value,
                } => self.check_relation(&mut run, node, relation, field, operator, value),
                ConditionKind::Field {
                    field,
                    operator,
                    value,
                } => self.check_field(&mut run, node, field, operator, value),
            }
        }

        run.finish()
    }

    /// Returns whether the children should be visited.
    fn check_group(
        &self,
        run: &mut Run<'_>,
        node: &Condition,
        logic: Option<&str>,
        children: &[Condition],
    ) -> bool {
        if children.len() > self.limits.max_conditions_per_group {
            run.security(
                node,
                None,
                ErrorCode::TooManyConditions,
                SecurityEventType::TooManyConditions,
                format!(
                    "Too many conditions in group ({}), maximum is {}",
                    children.len(),
                    self.limits.max_conditions_per_group
                ),
                None,
            );
            return false;
        }

        match logic.map(str::parse::<Logic>) {
            Some(Err(_)) => run.error(
                node,
                None,
                ErrorCode::InvalidLogic,
                format!("Invalid logic operator '{}'", logic.unwrap_or_default()),
            ),
            Some(Ok(Logic::Not)) if children.len() != 1 => run.error(
                node,
                None,
                ErrorCode::NotRequiresOne,
                "NOT operator requires exactly one condition",
            ),
            _ => {}
        }
        true
    }

    fn check_raw(&self, run: &mut Run<'_>, node: &Condition, sql: &str, params: Option<&[Value]>) {
        if let Some(pattern) = find_dangerous_pattern(sql) {
            run.security(
                node,
                None,
                ErrorCode::DangerousSql,
                SecurityEventType::DangerousSql,
                format!("Raw SQL contains a dangerous pattern ({pattern})"),
                Some(&Value::String(sql.to_string())),
            );
            return;
        }
        if let Some(params) = params {
            let expected = count_placeholders(sql);
            if expected != params.len() {
                run.error(
                    node,
                    None,
                    ErrorCode::ParamMismatch,
                    format!(
                        "Raw SQL expects {expected} parameters but {} were given",
                        params.len()
                    ),
                );
            }
        }
    }

    fn check_custom(&self, run: &mut Run<'_>, node: &Condition, handler: &str, value: Option<&Value>) {
        let Some(registry) = &self.registry else {
            return;
        };
        let Some(custom) = registry.get(handler) else {
            return;
        };
        let value = value.cloned().unwrap_or(Value::Null);
        if let Err(message) = custom.validate(&value) {
            run.error(node, None, ErrorCode::InvalidValue, message);
        }
    }

    fn check_relation(
        &self,
        run: &mut Run<'_>,
        node: &Condition,
        relation: &str,
        field: Option<&str>,
        operator: Option<&str>,
        value: Option<&Value>,
    ) {
        let Some(field) = field.filter(|f| !f.is_empty()) else {
            run.error(node, Some(relation), ErrorCode::FieldRequired, "Relation field is required");
            return;
        };
        if !self.is_allowed(relation) {
            run.error(
                node,
                Some(relation),
                ErrorCode::FieldNotAllowed,
                format!("Field '{relation}' is not allowed"),
            );
            return;
        }
        match self.fields.get(relation) {
            Some(config) if config.kind.is_association() => {}
            _ => {
                run.error(
                    node,
                    Some(relation),
                    ErrorCode::UnknownField,
                    format!("Unknown relation '{relation}'"),
                );
                return;
            }
        }
        let Some(op) = self.check_operator(run, node, field, operator, None) else {
            return;
        };
        self.check_operand(run, node, field, op, value, None);
    }

    fn check_field(
        &self,
        run: &mut Run<'_>,
        node: &Condition,
        field: Option<&str>,
        operator: Option<&str>,
        value: Option<&Value>,
    ) {
        let Some(field) = field.filter(|f| !f.is_empty()) else {
            run.error(node, None, ErrorCode::FieldRequired, "Field is required");
            return;
        };
        if !self.is_allowed(field) {
            run.error(
                node,
                Some(field),
                ErrorCode::FieldNotAllowed,
                format!("Field '{field}' is not allowed"),
            );
            return;
        }
        let Some(config) = self.fields.get(field) else {
            run.error(
                node,
                Some(field),
                ErrorCode::UnknownField,
                format!("Unknown field '{field}'"),
            );
            return;
        };
        let Some(op) = self.check_operator(run, node, field, operator, Some(config)) else {
            return;
        };
        self.check_operand(run, node, field, op, value, Some(config));
    }

    fn check_operator(
        &self,
        run: &mut Run<'_>,
        node: &Condition,
        field: &str,
        operator: Option<&str>,
        config: Option<&FieldTypeConfig>,
    ) -> Option<Operator> {
        let Some(tag) = operator.filter(|o| !o.is_empty()) else {
            run.error(node, Some(field), ErrorCode::OperatorRequired, "Operator is required");
            return None;
        };
        let legal = tag
            .parse::<Operator>()
            .ok()
            .filter(|op| config.map_or(true, |c| c.kind.allows(*op)));
        if legal.is_none() {
            let kind = config.map_or("relation", |c| c.kind.as_str());
            run.error(
                node,
                Some(field),
                ErrorCode::InvalidOperator,
                format!("Operator '{tag}' is not valid for {kind} fields"),
            );
        }
        legal
    }

    fn check_operand(
        &self,
        run: &mut Run<'_>,
        node: &Condition,
        field: &str,
        operator: Operator,
        value: Option<&Value>,
        config: Option<&FieldTypeConfig>,
    ) {
        let Err(issue) = check_value(operator, value, config, &self.limits) else {
            return;
        };
        match issue.event {
            Some(event_type) => run.security(
                node,
                Some(field),
                ErrorCode::InvalidValue,
                event_type,
                issue.message,
                value,
            ),
            None => run.error(node, Some(field), ErrorCode::InvalidValue, issue.message),
        }
    }

    fn is_allowed(&self, field: &str) -> bool {
        self.allowed_fields
            .as_ref()
            .map_or(true, |allowed| allowed.contains(field))
    }
}

impl fmt::Debug for ConditionValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionValidator")
            .field("fields", &self.fields)
            .field("limits", &self.limits)
            .field("allowed_fields", &self.allowed_fields)
            .field("registry", &self.registry.is_some())
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// Accumulator for a single validation pass.
struct Run<'a> {
    validator: &'a ConditionValidator,
    errors: Vec<ValidationError>,
    events: Vec<SecurityEvent>,
}

impl<'a> Run<'a> {
    fn new(validator: &'a ConditionValidator) -> Self {
        Self {
            validator,
            errors: Vec::new(),
            events: Vec::new(),
        }
    }

    fn error(
        &mut self,
        node: &Condition,
        field: Option<&str>,
        code: ErrorCode,
        message: impl Into<String>,
    ) {
        self.errors
            .push(ValidationError::new(&node.id, field, code, message));
    }

    fn security(
        &mut self,
        node: &Condition,
        field: Option<&str>,
        code: ErrorCode,
        event_type: SecurityEventType,
        message: String,
        value: Option<&Value>,
    ) {
        let mut event = SecurityEvent::new(event_type, &node.id, message.clone());
        if let Some(value) = value {
            event = event.with_value(value);
        }
        match &self.validator.logger {
            Some(logger) => logger.log(&event),
            None => TracingSecurityLogger.log(&event),
        }
        self.events.push(event);
        self.error(node, field, code, message);
    }

    fn finish(self) -> ValidationResult {
        ValidationResult::from_parts(self.errors, self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldKind;
    use crate::registry::{HandlerError, HandlerOutput};
    use crate::security::MemorySecurityLogger;
    use crate::dialect::Dialect;
    use serde_json::json;

    fn fields() -> FieldMap {
        FieldMap::new()
            .with_kind("name", FieldKind::String)
            .with_kind("age", FieldKind::Integer)
            .with_kind("active", FieldKind::Boolean)
            .with_kind("meta", FieldKind::Json)
            .with_kind("author", FieldKind::Association)
    }

    fn validator() -> ConditionValidator {
        ConditionValidator::new(fields())
    }

    fn nested(depth: usize) -> Condition {
        let mut node = Condition::field("leaf", "age", Operator::Gt, 1);
        for level in 0..depth {
            node = Condition::group(format!("g{level}"), Logic::And, vec![node]);
        }
        node
    }

    #[test]
    fn test_valid_tree() {
        let tree = vec![Condition::group(
            "root",
            Logic::Or,
            vec![
                Condition::field("a", "name", Operator::Ilike, "ali"),
                Condition::field("b", "age", Operator::Between, json!([18, 65])),
                Condition::unary("c", "active", Operator::IsNull),
            ],
        )];
        let result = validator().validate(&tree);
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.security_events.is_empty());
    }

    #[test]
    fn test_depth_ten_passes_eleven_fails() {
        assert!(validator().validate(&[nested(10)]).valid);

        let logger = MemorySecurityLogger::new();
        let result = validator()
            .with_logger(Arc::new(logger.clone()))
            .validate(&[nested(11)]);
        assert!(!result.valid);
        assert!(result.has_code(ErrorCode::MaxDepthExceeded));
        assert!(result.has_event(SecurityEventType::MaxDepthExceeded));
        assert_eq!(logger.len(), 1);
    }

    #[test]
    fn test_too_many_conditions() {
        let children: Vec<Condition> = (0..101)
            .map(|i| Condition::field(format!("c{i}"), "age", Operator::Eq, i))
            .collect();
        let result = validator().validate(&[Condition::group("g", Logic::And, children)]);
        assert!(result.has_code(ErrorCode::TooManyConditions));
        assert!(result.has_event(SecurityEventType::TooManyConditions));
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_invalid_logic_and_not() {
        let mut bad = Condition::group("g", Logic::And, vec![nested(0)]);
        bad.logic = Some("XOR".into());
        let not = Condition::group("n", Logic::Not, vec![nested(0), nested(0)]);
        let result = validator().validate(&[bad, not]);
        assert_eq!(result.errors[0].code, ErrorCode::InvalidLogic);
        assert_eq!(result.errors[1].code, ErrorCode::NotRequiresOne);
        assert_eq!(
            result.errors[1].message,
            "NOT operator requires exactly one condition"
        );
    }

    #[test]
    fn test_errors_accumulate_across_siblings() {
        let tree = vec![
            Condition::field("a", "missing", Operator::Eq, "x"),
            Condition::field("b", "age", Operator::Like, "x"),
            Condition::field("c", "name", Operator::Eq, "ok"),
            Condition::field("d", "active", Operator::Eq, "maybe"),
        ];
        let result = validator().validate(&tree);
        let codes: Vec<(&str, ErrorCode)> = result
            .errors
            .iter()
            .map(|e| (e.condition_id.as_str(), e.code))
            .collect();
        assert_eq!(
            codes,
            vec![
                ("a", ErrorCode::UnknownField),
                ("b", ErrorCode::InvalidOperator),
                ("d", ErrorCode::InvalidValue),
            ]
        );
    }

    #[test]
    fn test_required_field_and_operator() {
        let mut no_field = Condition::field("a", "name", Operator::Eq, "x");
        no_field.field = None;
        let mut no_op = Condition::field("b", "name", Operator::Eq, "x");
        no_op.operator = None;
        let mut bogus_op = Condition::field("c", "name", Operator::Eq, "x");
        bogus_op.operator = Some("approx".into());
        let result = validator().validate(&[no_field, no_op, bogus_op]);
        let codes: Vec<ErrorCode> = result.errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                ErrorCode::FieldRequired,
                ErrorCode::OperatorRequired,
                ErrorCode::InvalidOperator
            ]
        );
    }

    #[test]
    fn test_allow_list() {
        let result = validator()
            .with_allowed_fields(["name"])
            .validate(&[Condition::field("a", "age", Operator::Eq, 3)]);
        assert_eq!(result.errors[0].code, ErrorCode::FieldNotAllowed);
    }

    #[test]
    fn test_dangerous_sql_regardless_of_siblings() {
        let tree = vec![
            Condition::field("ok", "name", Operator::Eq, "Alice"),
            Condition::raw("bad", "1 = 1; DROP TABLE x;", None),
            Condition::raw("union", "id = 1 UNION SELECT secret FROM t", None),
        ];
        let result = validator().validate(&tree);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().all(|e| e.code == ErrorCode::DangerousSql));
        assert_eq!(result.security_events.len(), 2);
        assert_eq!(result.security_events[0].condition_id, "bad");
    }

    #[test]
    fn test_param_mismatch() {
        let ok = Condition::raw("ok", "age > $1", Some(vec![json!(18)]));
        let bad = Condition::raw("bad", "age > ? AND age < ?", Some(vec![json!(18)]));
        let result = validator().validate(&[ok, bad]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::ParamMismatch);
    }

    #[test]
    fn test_too_many_in_values_event() {
        let values: Vec<u32> = (0..1001).collect();
        let result = validator().validate(&[Condition::field("a", "age", Operator::In, json!(values))]);
        assert!(result.has_code(ErrorCode::InvalidValue));
        assert!(result.has_event(SecurityEventType::TooManyInValues));
        assert_eq!(
            result.security_events[0].value,
            Some(json!("[1001 values]"))
        );
    }

    #[test]
    fn test_custom_handler_validation() {
        let registry = Arc::new(HandlerRegistry::new());
        struct Tags;
        impl crate::registry::CustomHandler for Tags {
            fn build_condition(
                &self,
                _operator: &str,
                _value: &Value,
                _dialect: &Dialect,
                _params: Option<&Value>,
            ) -> Result<HandlerOutput, HandlerError> {
                Ok(HandlerOutput::Empty)
            }

            fn validate(&self, value: &Value) -> Result<(), String> {
                if value.is_array() {
                    Ok(())
                } else {
                    Err("tags must be a list".into())
                }
            }
        }
        registry.register("User.tags", Tags, false).unwrap();

        let tree = vec![
            Condition::custom("a", "User.tags", Operator::Custom, json!(["x"])),
            Condition::custom("b", "User.tags", Operator::Custom, "x"),
            Condition::custom("c", "User.unknown", Operator::Custom, "x"),
        ];
        let result = validator().with_registry(registry).validate(&tree);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].condition_id, "b");
        assert_eq!(result.errors[0].message, "tags must be a list");
    }

    #[test]
    fn test_relation_predicates() {
        let tree = vec![
            Condition::relation("a", "author", "name", Operator::Eq, "Bob"),
            Condition::relation("b", "ghost", "name", Operator::Eq, "Bob"),
            Condition::relation("c", "author", "name", Operator::In, "Bob"),
        ];
        let result = validator().validate(&tree);
        let codes: Vec<ErrorCode> = result.errors.iter().map(|e| e.code).collect();
        assert_eq!(codes, vec![ErrorCode::UnknownField, ErrorCode::InvalidValue]);
    }

    #[test]
    fn test_result_serializes_codes() {
        let result = validator().validate(&[Condition::field("a", "nope", Operator::Eq, 1)]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["valid"], json!(false));
        assert_eq!(json["errors"][0]["code"], json!("UNKNOWN_FIELD"));
        assert_eq!(json["errors"][0]["conditionId"], json!("a"));
        assert!(json.get("securityEvents").is_none());
    }
}
