//! Pruning of stored condition trees.

use serde::{Deserialize, Serialize};
use sift_proto::{Condition, ConditionKind, Operator};

use crate::catalog::FieldMap;
use crate::security::MAX_DEPTH;

/// What [`sanitize_conditions`] removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SanitizeOptions {
    /// Drop predicates on unknown fields or with unknown operators.
    pub remove_invalid: bool,
    /// Drop raw passthrough predicates.
    pub remove_raw_sql: bool,
    /// Drop nodes nested deeper than this.
    pub max_depth: usize,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            remove_invalid: true,
            remove_raw_sql: true,
            max_depth: MAX_DEPTH,
        }
    }
}

/// One removed node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Removal {
    pub condition_id: String,
    pub reason: String,
}

/// Pruned tree and what was taken out of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeReport {
    pub conditions: Vec<Condition>,
    pub removed: Vec<Removal>,
}

/// Produce a pruned copy of a tree.
///
/// Custom-handler predicates are kept. Groups left without children are
/// removed too, so a second pass over the output removes nothing.
pub fn sanitize_conditions(
    conditions: &[Condition],
    fields: &FieldMap,
    options: &SanitizeOptions,
) -> SanitizeReport {
    let mut removed = Vec::new();
    let conditions = prune(conditions, fields, options, 0, &mut removed);
    SanitizeReport {
        conditions,
        removed,
    }
}

fn prune(
    conditions: &[Condition],
    fields: &FieldMap,
    options: &SanitizeOptions,
    depth: usize,
    removed: &mut Vec<Removal>,
) -> Vec<Condition> {
    let mut kept = Vec::with_capacity(conditions.len());
    for node in conditions {
        if depth > options.max_depth {
            removed.push(removal(node, format!("nested deeper than {}", options.max_depth)));
            continue;
        }
        if let Some(children) = &node.children {
            let pruned = prune(children, fields, options, depth + 1, removed);
            if pruned.is_empty() {
                removed.push(removal(node, "group has no remaining conditions"));
                continue;
            }
            let mut group = node.clone();
            group.children = Some(pruned);
            kept.push(group);
            continue;
        }
        match reject_reason(node, fields, options) {
            Some(reason) => removed.push(removal(node, reason)),
            None => kept.push(node.clone()),
        }
    }
    kept
}

fn reject_reason(node: &Condition, fields: &FieldMap, options: &SanitizeOptions) -> Option<String> {
    match node.kind() {
        ConditionKind::Group { .. } | ConditionKind::Custom { .. } => None,
        ConditionKind::Raw { .. } => options
            .remove_raw_sql
            .then(|| "raw SQL conditions are not allowed".to_string()),
        ConditionKind::Relation {
            relation,
            field,
            operator,
            ..
        } => {
            if !options.remove_invalid {
                return None;
            }
            match fields.get(relation) {
                Some(config) if config.kind.is_association() => {}
                _ => return Some(format!("unknown relation '{relation}'")),
            }
            if matches!(field, None | Some("")) {
                return Some("missing relation field".to_string());
            }
            unknown_operator(operator)
        }
        ConditionKind::Field { field, operator, .. } => {
            if !options.remove_invalid {
                return None;
            }
            match field {
                None | Some("") => return Some("missing field".to_string()),
                Some(field) if !fields.contains(field) => {
                    return Some(format!("unknown field '{field}'"))
                }
                Some(_) => {}
            }
            unknown_operator(operator)
        }
    }
}

fn unknown_operator(operator: Option<&str>) -> Option<String> {
    match operator {
        Some(tag) if Operator::is_known(tag) => None,
        Some(tag) => Some(format!("unknown operator '{tag}'")),
        None => Some("missing operator".to_string()),
    }
}

fn removal(node: &Condition, reason: impl Into<String>) -> Removal {
    Removal {
        condition_id: node.id.clone(),
        reason: reason.into(),
    }
}
