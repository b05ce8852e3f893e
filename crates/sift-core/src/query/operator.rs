//! Operator to constraint mapping.

use serde_json::Value;
use sift_proto::{Constraint, Operator};

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::security::SecurityLimits;

/// Map an operator and operand to a constraint.
///
/// The operand is re-checked first; a combination the validator would have
/// rejected fails here instead of being compiled into something weaker.
pub fn map_operator(
    condition_id: &str,
    operator: Operator,
    value: Option<&Value>,
    dialect: &Dialect,
    limits: &SecurityLimits,
) -> Result<Constraint> {
    match operator {
        Operator::IsNull => return Ok(Constraint::IsNull),
        Operator::IsNotNull => return Ok(Constraint::IsNotNull),
        _ => {}
    }

    let value = match value {
        Some(value) if !value.is_null() => value,
        _ => {
            return Err(Error::invalid_value(
                condition_id,
                format!("operator '{operator}' requires a value"),
            ))
        }
    };
    check_string_lengths(condition_id, value, limits)?;

    let constraint = match operator {
        Operator::Eq | Operator::Custom => Constraint::Eq(value.clone()),
        Operator::Neq => Constraint::Ne(value.clone()),
        Operator::Gt => Constraint::Gt(value.clone()),
        Operator::Gte => Constraint::Gte(value.clone()),
        Operator::Lt => Constraint::Lt(value.clone()),
        Operator::Lte => Constraint::Lte(value.clone()),
        Operator::Like => Constraint::Contains(text(condition_id, operator, value)?),
        Operator::Ilike => {
            let needle = text(condition_id, operator, value)?;
            if dialect.supports_native_ilike() {
                Constraint::IContains(needle)
            } else {
                Constraint::LowerContains(needle.to_lowercase())
            }
        }
        Operator::StartsWith => Constraint::StartsWith(text(condition_id, operator, value)?),
        Operator::EndsWith => Constraint::EndsWith(text(condition_id, operator, value)?),
        Operator::Regex => {
            let Value::String(pattern) = value else {
                return Err(Error::invalid_value(condition_id, "regex requires a string pattern"));
            };
            if let Err(err) = regex::Regex::new(pattern) {
                return Err(Error::invalid_value(
                    condition_id,
                    format!("invalid regular expression: {err}"),
                ));
            }
            Constraint::Regexp(pattern.clone())
        }
        Operator::In => Constraint::In(list(condition_id, operator, value, limits)?),
        Operator::NotIn => Constraint::NotIn(list(condition_id, operator, value, limits)?),
        Operator::Between => match value {
            Value::Array(pair) if pair.len() == 2 => Constraint::Range {
                gte: pair[0].clone(),
                lte: pair[1].clone(),
            },
            _ => {
                return Err(Error::invalid_value(
                    condition_id,
                    "between requires an array of exactly two values",
                ))
            }
        },
        Operator::IsNull => Constraint::IsNull,
        Operator::IsNotNull => Constraint::IsNotNull,
    };
    Ok(constraint)
}

fn check_string_lengths(condition_id: &str, value: &Value, limits: &SecurityLimits) -> Result<()> {
    let longest = match value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0),
        _ => 0,
    };
    if longest > limits.max_string_length {
        return Err(Error::StringTooLong {
            condition_id: condition_id.to_string(),
            length: longest,
            max: limits.max_string_length,
        });
    }
    Ok(())
}

fn text(condition_id: &str, operator: Operator, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::invalid_value(
            condition_id,
            format!("operator '{operator}' requires a text value"),
        )),
    }
}

/// Scalars are wrapped into a single-element list.
fn list(
    condition_id: &str,
    operator: Operator,
    value: &Value,
    limits: &SecurityLimits,
) -> Result<Vec<Value>> {
    let values = match value {
        Value::Array(items) => items.clone(),
        scalar => vec![scalar.clone()],
    };
    if values.is_empty() {
        return Err(Error::invalid_value(
            condition_id,
            format!("operator '{operator}' requires at least one value"),
        ));
    }
    if values.len() > limits.max_in_values {
        return Err(Error::TooManyInValues {
            condition_id: condition_id.to_string(),
            count: values.len(),
            max: limits.max_in_values,
        });
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(op: Operator, value: Value) -> Result<Constraint> {
        let value = (!value.is_null()).then_some(value);
        map_operator("c", op, value.as_ref(), &Dialect::generic(), &SecurityLimits::default())
    }

    #[test]
    fn test_basic_mapping() {
        assert_eq!(map(Operator::Eq, json!(1)).unwrap(), Constraint::Eq(json!(1)));
        assert_eq!(map(Operator::Neq, json!("a")).unwrap(), Constraint::Ne(json!("a")));
        assert_eq!(map(Operator::Gte, json!(3)).unwrap(), Constraint::Gte(json!(3)));
        assert_eq!(
            map(Operator::Like, json!("ali")).unwrap(),
            Constraint::Contains("ali".into())
        );
        assert_eq!(
            map(Operator::StartsWith, json!("A")).unwrap(),
            Constraint::StartsWith("A".into())
        );
        assert_eq!(map(Operator::IsNull, Value::Null).unwrap(), Constraint::IsNull);
        assert_eq!(map(Operator::IsNotNull, json!("ignored")).unwrap(), Constraint::IsNotNull);
        assert_eq!(map(Operator::Custom, json!({"a": 1})).unwrap(), Constraint::Eq(json!({"a": 1})));
    }

    #[test]
    fn test_ilike_by_dialect() {
        let limits = SecurityLimits::default();
        let value = json!("ALIce");
        assert_eq!(
            map_operator("c", Operator::Ilike, Some(&value), &Dialect::postgres(), &limits).unwrap(),
            Constraint::IContains("ALIce".into())
        );
        assert_eq!(
            map_operator("c", Operator::Ilike, Some(&value), &Dialect::mysql(), &limits).unwrap(),
            Constraint::LowerContains("alice".into())
        );
    }

    #[test]
    fn test_between() {
        assert_eq!(
            map(Operator::Between, json!([18, 65])).unwrap(),
            Constraint::Range {
                gte: json!(18),
                lte: json!(65)
            }
        );
        assert!(matches!(
            map(Operator::Between, json!([18])),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_in_wraps_scalar_and_caps() {
        assert_eq!(map(Operator::In, json!("a")).unwrap(), Constraint::In(vec![json!("a")]));
        assert_eq!(
            map(Operator::NotIn, json!([1, 2])).unwrap(),
            Constraint::NotIn(vec![json!(1), json!(2)])
        );
        let values: Vec<u32> = (0..1001).collect();
        assert!(matches!(
            map(Operator::In, json!(values)),
            Err(Error::TooManyInValues { count: 1001, .. })
        ));
        assert!(map(Operator::In, json!([])).is_err());
    }

    #[test]
    fn test_regex_and_lengths() {
        assert_eq!(map(Operator::Regex, json!("^a")).unwrap(), Constraint::Regexp("^a".into()));
        assert!(map(Operator::Regex, json!("(")).is_err());
        assert!(matches!(
            map(Operator::Eq, json!("x".repeat(10_001))),
            Err(Error::StringTooLong { .. })
        ));
        assert!(matches!(map(Operator::Eq, Value::Null), Err(Error::InvalidValue { .. })));
    }
}
