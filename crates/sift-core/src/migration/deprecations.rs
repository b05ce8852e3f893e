//! Renamed operator spellings.

use sift_proto::Operator;

/// Old operator tags and their current replacements.
pub const DEPRECATED_OPERATORS: &[(&str, Operator)] = &[
    ("equals", Operator::Eq),
    ("notEquals", Operator::Neq),
    ("ne", Operator::Neq),
    ("contains", Operator::Like),
    ("icontains", Operator::Ilike),
    ("greaterThan", Operator::Gt),
    ("greaterThanOrEqual", Operator::Gte),
    ("lessThan", Operator::Lt),
    ("lessThanOrEqual", Operator::Lte),
    ("starts_with", Operator::StartsWith),
    ("ends_with", Operator::EndsWith),
    ("not_in", Operator::NotIn),
    ("nin", Operator::NotIn),
    ("is_null", Operator::IsNull),
    ("is_not_null", Operator::IsNotNull),
];

/// Current replacement for a deprecated tag.
pub fn replacement(tag: &str) -> Option<Operator> {
    DEPRECATED_OPERATORS
        .iter()
        .find(|(old, _)| *old == tag)
        .map(|(_, op)| *op)
}

/// Check whether a tag is a deprecated spelling.
pub fn is_deprecated(tag: &str) -> bool {
    replacement(tag).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_deprecated_tag_is_current() {
        for (old, _) in DEPRECATED_OPERATORS {
            assert!(!Operator::is_known(old), "{old} is still a current operator");
        }
    }

    #[test]
    fn test_replacement() {
        assert_eq!(replacement("nin"), Some(Operator::NotIn));
        assert_eq!(replacement("greaterThanOrEqual"), Some(Operator::Gte));
        assert_eq!(replacement("eq"), None);
        assert!(!is_deprecated("approx"));
    }
}
