//! Condition tree nodes.
//!
//! A [`Condition`] is the flat, JSON-compatible record that is persisted and
//! transmitted. Tags such as `logic` and `operator` are kept as strings so
//! that stale or hostile input survives deserialization and can be reported
//! by the validator instead of being rejected wholesale by serde. Use
//! [`Condition::kind`] for a typed view of the node.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::operator::{Logic, Operator};

/// A node in a filter condition tree.
///
/// A node is a group when `children` is present, otherwise it is a predicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Stable node identifier, echoed in validation errors.
    #[serde(default)]
    pub id: String,
    /// Group combinator (`AND`, `OR`, `NOT`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<String>,
    /// Child nodes of a group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Condition>>,
    /// Field tested by a field predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Operator tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Operand (shape depends on the operator).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Association tested by a relation predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    /// Field on the associated record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_field: Option<String>,
    /// Registry key of the custom handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_handler: Option<String>,
    /// Extra parameters passed to the custom handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_handler_params: Option<Value>,
    /// Raw passthrough text.
    #[serde(default, rename = "rawSQL", skip_serializing_if = "Option::is_none")]
    pub raw_sql: Option<String>,
    /// Positional parameters for the raw passthrough text.
    #[serde(default, rename = "rawSQLParams", skip_serializing_if = "Option::is_none")]
    pub raw_sql_params: Option<Vec<Value>>,
}

/// Typed view over a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConditionKind<'a> {
    /// Boolean combination of child nodes.
    Group {
        logic: Option<&'a str>,
        children: &'a [Condition],
    },
    /// Raw passthrough predicate.
    Raw {
        sql: &'a str,
        params: Option<&'a [Value]>,
    },
    /// Predicate delegated to a registered handler.
    Custom {
        handler: &'a str,
        operator: Option<&'a str>,
        value: Option<&'a Value>,
        params: Option<&'a Value>,
    },
    /// Predicate on a field of an associated record.
    Relation {
        relation: &'a str,
        field: Option<&'a str>,
        operator: Option<&'a str>,
        value: Option<&'a Value>,
    },
    /// Predicate on a field of the record itself.
    Field {
        field: Option<&'a str>,
        operator: Option<&'a str>,
        value: Option<&'a Value>,
    },
}

impl Condition {
    /// Create a field predicate.
    pub fn field(
        id: impl Into<String>,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        let value = value.into();
        Self {
            id: id.into(),
            field: Some(field.into()),
            operator: Some(operator.as_str().to_string()),
            value: (!value.is_null()).then_some(value),
            ..Default::default()
        }
    }

    /// Create a predicate without an operand (`isNull`, `isNotNull`).
    pub fn unary(id: impl Into<String>, field: impl Into<String>, operator: Operator) -> Self {
        Self {
            id: id.into(),
            field: Some(field.into()),
            operator: Some(operator.as_str().to_string()),
            ..Default::default()
        }
    }

    /// Create a group node.
    pub fn group(id: impl Into<String>, logic: Logic, children: Vec<Condition>) -> Self {
        Self {
            id: id.into(),
            logic: Some(logic.as_str().to_string()),
            children: Some(children),
            ..Default::default()
        }
    }

    /// Create a raw passthrough predicate.
    pub fn raw(id: impl Into<String>, sql: impl Into<String>, params: Option<Vec<Value>>) -> Self {
        Self {
            id: id.into(),
            raw_sql: Some(sql.into()),
            raw_sql_params: params,
            ..Default::default()
        }
    }

    /// Create a custom-handler predicate.
    pub fn custom(
        id: impl Into<String>,
        handler: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            id: id.into(),
            custom_handler: Some(handler.into()),
            operator: Some(operator.as_str().to_string()),
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// Create a relation predicate.
    pub fn relation(
        id: impl Into<String>,
        relation: impl Into<String>,
        relation_field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        let value = value.into();
        Self {
            id: id.into(),
            relation: Some(relation.into()),
            relation_field: Some(relation_field.into()),
            operator: Some(operator.as_str().to_string()),
            value: (!value.is_null()).then_some(value),
            ..Default::default()
        }
    }

    /// Attach custom handler parameters.
    pub fn with_handler_params(mut self, params: impl Into<Value>) -> Self {
        self.custom_handler_params = Some(params.into());
        self
    }

    /// Typed view of this node.
    pub fn kind(&self) -> ConditionKind<'_> {
        if let Some(children) = &self.children {
            return ConditionKind::Group {
                logic: self.logic.as_deref(),
                children,
            };
        }
        if let Some(sql) = &self.raw_sql {
            return ConditionKind::Raw {
                sql,
                params: self.raw_sql_params.as_deref(),
            };
        }
        if let Some(handler) = &self.custom_handler {
            return ConditionKind::Custom {
                handler,
                operator: self.operator.as_deref(),
                value: self.value.as_ref(),
                params: self.custom_handler_params.as_ref(),
            };
        }
        if let Some(relation) = &self.relation {
            return ConditionKind::Relation {
                relation,
                field: self.relation_field.as_deref(),
                operator: self.operator.as_deref(),
                value: self.value.as_ref(),
            };
        }
        ConditionKind::Field {
            field: self.field.as_deref(),
            operator: self.operator.as_deref(),
            value: self.value.as_ref(),
        }
    }
}

/// Visit every node of a forest in document order.
///
/// Uses an explicit stack so arbitrarily deep input cannot exhaust the call
/// stack.
pub fn walk<'a, F>(conditions: &'a [Condition], mut visit: F)
where
    F: FnMut(&'a Condition),
{
    let mut stack: Vec<&'a Condition> = conditions.iter().rev().collect();
    while let Some(node) = stack.pop() {
        visit(node);
        if let Some(children) = &node.children {
            stack.extend(children.iter().rev());
        }
    }
}

/// Visit every node of a forest mutably, parents before children.
pub fn walk_mut<F>(conditions: &mut [Condition], mut visit: F)
where
    F: FnMut(&mut Condition),
{
    let mut stack: Vec<&mut Condition> = conditions.iter_mut().rev().collect();
    while let Some(node) = stack.pop() {
        visit(&mut *node);
        let Condition { children, .. } = node;
        if let Some(children) = children {
            stack.extend(children.iter_mut().rev());
        }
    }
}

/// Collect field names referenced by field predicates, first occurrence first.
pub fn referenced_fields(conditions: &[Condition]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    walk(conditions, |node| {
        if let ConditionKind::Field {
            field: Some(field), ..
        } = node.kind()
        {
            if !fields.iter().any(|f| f == field) {
                fields.push(field.to_string());
            }
        }
    });
    fields
}

/// Collect operator tags used anywhere in a forest, first occurrence first.
pub fn referenced_operators(conditions: &[Condition]) -> Vec<String> {
    let mut operators: Vec<String> = Vec::new();
    walk(conditions, |node| {
        if let Some(tag) = node.operator.as_deref() {
            if !operators.iter().any(|o| o == tag) {
                operators.push(tag.to_string());
            }
        }
    });
    operators
}

/// Depth of the deepest node (a flat list has depth 0).
pub fn max_depth(conditions: &[Condition]) -> usize {
    let mut deepest = 0;
    let mut stack: Vec<(&Condition, usize)> = conditions.iter().map(|c| (c, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        if let Some(children) = &node.children {
            stack.extend(children.iter().map(|c| (c, depth + 1)));
        }
    }
    deepest
}
