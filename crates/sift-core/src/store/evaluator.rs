//! Evaluation of compiled criteria against fetched rows.

use std::cmp::Ordering;

use serde_json::Value;
use sift_proto::{Constraint, Criteria, Row};

use super::StoreError;

/// Evaluates [`Criteria`] against JSON rows.
pub struct CriteriaEvaluator;

impl CriteriaEvaluator {
    /// Evaluate criteria against a row.
    ///
    /// Returns `true` if the row matches. Raw passthrough fragments cannot be
    /// evaluated outside the backend and fail with [`StoreError::Unsupported`].
    pub fn evaluate(criteria: &Criteria, row: &Row) -> Result<bool, StoreError> {
        match criteria {
            Criteria::Empty => Ok(true),
            Criteria::Field { field, constraint } => Self::matches(constraint, row.get(field)),
            Criteria::And(parts) => {
                for part in parts {
                    if !Self::evaluate(part, row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Criteria::Or(parts) => {
                for part in parts {
                    if Self::evaluate(part, row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Criteria::Not(inner) => Ok(!Self::evaluate(inner, row)?),
            Criteria::Raw { sql, .. } => Err(StoreError::Unsupported(format!(
                "raw SQL cannot be evaluated in memory: {sql}"
            ))),
            Criteria::Relation {
                relation,
                field,
                constraint,
            } => match row.get(relation) {
                Some(Value::Object(related)) => Self::matches(constraint, related.get(field)),
                Some(Value::Array(related)) => {
                    for record in related {
                        if let Value::Object(record) = record {
                            if Self::matches(constraint, record.get(field))? {
                                return Ok(true);
                            }
                        }
                    }
                    Ok(false)
                }
                _ => Self::matches(constraint, None),
            },
            Criteria::InMemory(predicate) => Ok(predicate.evaluate(row)),
        }
    }

    /// Test a single field value against a constraint.
    pub fn matches(constraint: &Constraint, value: Option<&Value>) -> Result<bool, StoreError> {
        let value = value.map(Self::scalar_of);
        let present = value.filter(|v| !v.is_null());
        let matched = match constraint {
            Constraint::IsNull => present.is_none(),
            Constraint::IsNotNull => present.is_some(),
            Constraint::Eq(expected) => match present {
                Some(actual) => Self::values_equal(actual, expected),
                None => expected.is_null(),
            },
            Constraint::Ne(expected) => match present {
                Some(actual) => !Self::values_equal(actual, expected),
                None => !expected.is_null(),
            },
            Constraint::Gt(bound) => Self::ordered(present, bound, Ordering::is_gt),
            Constraint::Gte(bound) => Self::ordered(present, bound, Ordering::is_ge),
            Constraint::Lt(bound) => Self::ordered(present, bound, Ordering::is_lt),
            Constraint::Lte(bound) => Self::ordered(present, bound, Ordering::is_le),
            Constraint::Range { gte, lte } => {
                Self::ordered(present, gte, Ordering::is_ge)
                    && Self::ordered(present, lte, Ordering::is_le)
            }
            Constraint::Contains(needle) => Self::text(present).is_some_and(|s| s.contains(needle.as_str())),
            Constraint::IContains(needle) | Constraint::LowerContains(needle) => {
                let needle = needle.to_lowercase();
                Self::text(present).is_some_and(|s| s.to_lowercase().contains(&needle))
            }
            Constraint::StartsWith(prefix) => {
                Self::text(present).is_some_and(|s| s.starts_with(prefix.as_str()))
            }
            Constraint::EndsWith(suffix) => {
                Self::text(present).is_some_and(|s| s.ends_with(suffix.as_str()))
            }
            Constraint::Regexp(pattern) => {
                let re = regex::Regex::new(pattern)
                    .map_err(|e| StoreError::InvalidCriteria(format!("regex '{pattern}': {e}")))?;
                Self::text(present).is_some_and(|s| re.is_match(&s))
            }
            Constraint::In(values) => present.is_some_and(|actual| Self::any_member(actual, values)),
            Constraint::NotIn(values) => {
                present.map_or(true, |actual| !Self::any_member(actual, values))
            }
        };
        Ok(matched)
    }

    /// Check if two values are equal, coercing numeric and boolean strings.
    pub fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Number(_), _) | (_, Value::Number(_)) => {
                match (Self::number(a), Self::number(b)) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                }
            }
            (Value::Bool(x), Value::String(y)) | (Value::String(y), Value::Bool(x)) => {
                y.parse::<bool>().map_or(false, |y| *x == y)
            }
            _ => a == b,
        }
    }

    /// Compare two values, returning their ordering if comparable.
    pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            _ => match (Self::number(a), Self::number(b)) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    fn ordered(value: Option<&Value>, bound: &Value, test: fn(Ordering) -> bool) -> bool {
        value
            .and_then(|v| Self::compare_values(v, bound))
            .is_some_and(test)
    }

    fn any_member(actual: &Value, values: &[Value]) -> bool {
        match actual {
            Value::Array(items) => items
                .iter()
                .map(Self::scalar_of)
                .any(|item| values.iter().any(|v| Self::values_equal(item, v))),
            _ => values.iter().any(|v| Self::values_equal(actual, v)),
        }
    }

    /// Associated records compare by their `id`.
    fn scalar_of(value: &Value) -> &Value {
        match value {
            Value::Object(record) => record.get("id").unwrap_or(value),
            _ => value,
        }
    }

    fn number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    fn text(value: Option<&Value>) -> Option<String> {
        match value? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}
