//! Built-in version transforms.

use serde_json::Value;
use sift_proto::condition::walk_mut;
use sift_proto::{Condition, Operator};

use super::error::MigrationError;

/// Version 1 to 2.
///
/// Version 1 stored `in`/`notIn` lists as comma-separated strings and
/// `between` ranges as `{ "from": a, "to": b }` objects.
pub fn v1_to_v2(mut conditions: Vec<Condition>) -> Result<Vec<Condition>, MigrationError> {
    let mut failure = None;
    walk_mut(&mut conditions, |node| {
        let Some(op) = node.operator.as_deref().and_then(|tag| tag.parse::<Operator>().ok()) else {
            return;
        };
        match (op, node.value.take()) {
            (Operator::In | Operator::NotIn, Some(Value::String(list))) => {
                let items: Vec<Value> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_string()))
                    .collect();
                node.value = Some(Value::Array(items));
            }
            (Operator::Between, Some(Value::Object(mut range))) => {
                match (range.remove("from"), range.remove("to")) {
                    (Some(from), Some(to)) => node.value = Some(Value::Array(vec![from, to])),
                    (from, to) => {
                        if failure.is_none() {
                            failure = Some(format!(
                                "condition {} has an incomplete between range",
                                node.id
                            ));
                        }
                        if let Some(from) = from {
                            range.insert("from".into(), from);
                        }
                        if let Some(to) = to {
                            range.insert("to".into(), to);
                        }
                        node.value = Some(Value::Object(range));
                    }
                }
            }
            (_, value) => node.value = value,
        }
    });
    match failure {
        Some(reason) => Err(MigrationError::TransformFailed {
            from_version: 1,
            reason,
        }),
        None => Ok(conditions),
    }
}
