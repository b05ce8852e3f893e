//! Operand rules shared by the validator and the compiler.

use serde_json::Value;
use sift_proto::Operator;

use crate::catalog::{FieldKind, FieldTypeConfig};
use crate::security::{SecurityEventType, SecurityLimits};

/// Why an operand was rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueIssue {
    /// Message shown to the user.
    pub message: String,
    /// Security event the rejection raises, if any.
    pub event: Option<SecurityEventType>,
}

impl ValueIssue {
    fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            event: None,
        }
    }

    fn security(event: SecurityEventType, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            event: Some(event),
        }
    }
}

/// Check whether an operand counts as absent.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Read a number or a numeric string.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Length of the longest string in an operand, in characters.
fn longest_string(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.iter().map(longest_string).max().unwrap_or(0),
        _ => 0,
    }
}

/// Check an operand against its operator, the field configuration and the
/// security limits.
///
/// `config` is `None` when the field kind is unknown (relation targets); only
/// the kind-independent rules apply then.
pub fn check_value(
    operator: Operator,
    value: Option<&Value>,
    config: Option<&FieldTypeConfig>,
    limits: &SecurityLimits,
) -> Result<(), ValueIssue> {
    if !operator.requires_value() {
        return Ok(());
    }
    let value = match value {
        Some(value) if !is_empty_value(Some(value)) => value,
        _ => {
            return Err(ValueIssue::plain(format!(
                "Operator '{operator}' requires a value"
            )))
        }
    };

    if let Value::Array(items) = value {
        if matches!(operator, Operator::In | Operator::NotIn) && items.len() > limits.max_in_values
        {
            return Err(ValueIssue::security(
                SecurityEventType::TooManyInValues,
                format!(
                    "Too many values ({}), maximum is {}",
                    items.len(),
                    limits.max_in_values
                ),
            ));
        }
    }

    let longest = longest_string(value);
    if longest > limits.max_string_length {
        return Err(ValueIssue::security(
            SecurityEventType::StringTooLong,
            format!(
                "String value too long ({longest} characters), maximum is {}",
                limits.max_string_length
            ),
        ));
    }
    if let Some(max_length) = config.and_then(|c| c.max_length) {
        if longest > max_length {
            return Err(ValueIssue::plain(format!(
                "Value exceeds maximum length of {max_length}"
            )));
        }
    }

    let scalars: Vec<&Value> = match operator {
        Operator::In | Operator::NotIn => match value {
            Value::Array(items) => items.iter().collect(),
            _ => return Err(ValueIssue::plain(format!("Operator '{operator}' requires an array"))),
        },
        Operator::Between => match value {
            Value::Array(items) if items.len() == 2 => items.iter().collect(),
            _ => {
                return Err(ValueIssue::plain(
                    "Operator 'between' requires an array of exactly two values",
                ))
            }
        },
        Operator::Regex => match value {
            Value::String(pattern) => {
                if let Err(err) = regex::Regex::new(pattern) {
                    return Err(ValueIssue::plain(format!("Invalid regular expression: {err}")));
                }
                vec![value]
            }
            _ => return Err(ValueIssue::plain("Operator 'regex' requires a string pattern")),
        },
        Operator::Custom => return Ok(()),
        _ => match value {
            Value::Array(_) | Value::Object(_) => {
                return Err(ValueIssue::plain(format!(
                    "Operator '{operator}' requires a single value"
                )))
            }
            _ => vec![value],
        },
    };

    let Some(config) = config else {
        return Ok(());
    };

    if config.kind.is_numeric() {
        let mut numbers = Vec::with_capacity(scalars.len());
        for scalar in &scalars {
            let Some(number) = as_number(scalar) else {
                return Err(ValueIssue::plain(format!(
                    "Value {scalar} is not a valid number"
                )));
            };
            if config.kind == FieldKind::Integer && number.fract() != 0.0 {
                return Err(ValueIssue::plain(format!("Value {scalar} is not an integer")));
            }
            if let Some(min) = config.min {
                if number < min {
                    return Err(ValueIssue::plain(format!(
                        "Value {scalar} is below the minimum of {min}"
                    )));
                }
            }
            if let Some(max) = config.max {
                if number > max {
                    return Err(ValueIssue::plain(format!(
                        "Value {scalar} is above the maximum of {max}"
                    )));
                }
            }
            numbers.push(number);
        }
        if operator == Operator::Between && numbers.len() == 2 && numbers[0] > numbers[1] {
            return Err(ValueIssue::plain(
                "Operator 'between' requires the lower bound first",
            ));
        }
    }

    if config.kind == FieldKind::Boolean {
        for scalar in &scalars {
            let ok = match scalar {
                Value::Bool(_) => true,
                Value::String(s) => s == "true" || s == "false",
                _ => false,
            };
            if !ok {
                return Err(ValueIssue::plain(format!(
                    "Value {scalar} is not a valid boolean"
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(op: Operator, value: Value, kind: FieldKind) -> Result<(), ValueIssue> {
        let config = FieldTypeConfig::new(kind);
        let value = (!value.is_null()).then_some(value);
        check_value(op, value.as_ref(), Some(&config), &SecurityLimits::default())
    }

    #[test]
    fn test_null_operators_ignore_value() {
        assert!(check(Operator::IsNull, Value::Null, FieldKind::String).is_ok());
        assert!(check(Operator::IsNotNull, json!("x"), FieldKind::String).is_ok());
    }

    #[test]
    fn test_empty_values_rejected() {
        assert!(check(Operator::Eq, Value::Null, FieldKind::String).is_err());
        assert!(check(Operator::Eq, json!(""), FieldKind::String).is_err());
        assert!(check(Operator::In, json!([]), FieldKind::String).is_err());
        assert!(check(Operator::Eq, json!(0), FieldKind::Number).is_ok());
        assert!(check(Operator::Eq, json!(false), FieldKind::Boolean).is_ok());
    }

    #[test]
    fn test_between_shape() {
        assert!(check(Operator::Between, json!([18, 65]), FieldKind::Integer).is_ok());
        assert!(check(Operator::Between, json!([18]), FieldKind::Integer).is_err());
        assert!(check(Operator::Between, json!([1, 2, 3]), FieldKind::Integer).is_err());
        assert!(check(Operator::Between, json!(5), FieldKind::Integer).is_err());
        assert!(check(Operator::Between, json!([65, 18]), FieldKind::Integer).is_err());
        assert!(check(
            Operator::Between,
            json!(["2024-01-01", "2024-12-31"]),
            FieldKind::Date
        )
        .is_ok());
    }

    #[test]
    fn test_in_requires_array_and_limit() {
        assert!(check(Operator::In, json!("a"), FieldKind::String).is_err());
        let values: Vec<u32> = (0..1001).collect();
        let issue = check(Operator::In, json!(values), FieldKind::Integer).unwrap_err();
        assert_eq!(issue.event, Some(SecurityEventType::TooManyInValues));

        let values: Vec<u32> = (0..1000).collect();
        assert!(check(Operator::NotIn, json!(values), FieldKind::Integer).is_ok());
    }

    #[test]
    fn test_regex_must_compile() {
        assert!(check(Operator::Regex, json!("^a.*z$"), FieldKind::String).is_ok());
        assert!(check(Operator::Regex, json!("(unclosed"), FieldKind::String).is_err());
        assert!(check(Operator::Regex, json!(5), FieldKind::String).is_err());
    }

    #[test]
    fn test_string_ceiling_raises_event() {
        let long = "a".repeat(10_001);
        let issue = check(Operator::Eq, json!(long), FieldKind::String).unwrap_err();
        assert_eq!(issue.event, Some(SecurityEventType::StringTooLong));

        let issue = check(Operator::In, json!(["a", "b".repeat(10_001)]), FieldKind::String)
            .unwrap_err();
        assert_eq!(issue.event, Some(SecurityEventType::StringTooLong));
    }

    #[test]
    fn test_field_max_length() {
        let config = FieldTypeConfig::new(FieldKind::String).with_max_length(3);
        let limits = SecurityLimits::default();
        let issue = check_value(Operator::Eq, Some(&json!("abcd")), Some(&config), &limits)
            .unwrap_err();
        assert_eq!(issue.event, None);
        assert!(check_value(Operator::Eq, Some(&json!("abc")), Some(&config), &limits).is_ok());
    }

    #[test]
    fn test_numeric_rules() {
        assert!(check(Operator::Gt, json!("12.5"), FieldKind::Float).is_ok());
        assert!(check(Operator::Gt, json!("abc"), FieldKind::Number).is_err());
        assert!(check(Operator::Eq, json!(1.5), FieldKind::Integer).is_err());
        assert!(check(Operator::Eq, json!([1]), FieldKind::Integer).is_err());

        let config = FieldTypeConfig::new(FieldKind::Integer).with_range(Some(0.0), Some(150.0));
        let limits = SecurityLimits::default();
        assert!(check_value(Operator::Eq, Some(&json!(-1)), Some(&config), &limits).is_err());
        assert!(check_value(Operator::Eq, Some(&json!(151)), Some(&config), &limits).is_err());
        assert!(check_value(Operator::In, Some(&json!([0, 150])), Some(&config), &limits).is_ok());
    }

    #[test]
    fn test_boolean_literals() {
        assert!(check(Operator::Eq, json!(true), FieldKind::Boolean).is_ok());
        assert!(check(Operator::Eq, json!("false"), FieldKind::Boolean).is_ok());
        assert!(check(Operator::Eq, json!("yes"), FieldKind::Boolean).is_err());
        assert!(check(Operator::Eq, json!(1), FieldKind::Boolean).is_err());
    }

    #[test]
    fn test_unknown_kind_only_shape_rules() {
        let limits = SecurityLimits::default();
        assert!(check_value(Operator::Eq, Some(&json!("x")), None, &limits).is_ok());
        assert!(check_value(Operator::In, Some(&json!("x")), None, &limits).is_err());
    }
}
