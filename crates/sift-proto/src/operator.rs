//! Operator and group-logic vocabularies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Comparison operator applied by a predicate.
///
/// The wire spelling is camelCase (`startsWith`, `notIn`, `isNull`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    /// Equal to value.
    Eq,
    /// Not equal to value.
    Neq,
    /// Greater than value.
    Gt,
    /// Greater than or equal to value.
    Gte,
    /// Less than value.
    Lt,
    /// Less than or equal to value.
    Lte,
    /// Case-sensitive substring match.
    Like,
    /// Case-insensitive substring match.
    Ilike,
    /// Prefix match.
    StartsWith,
    /// Suffix match.
    EndsWith,
    /// Member of a list.
    In,
    /// Not a member of a list.
    NotIn,
    /// Inclusive range given as a `[low, high]` pair.
    Between,
    /// Value is null.
    IsNull,
    /// Value is not null.
    IsNotNull,
    /// Regular expression match.
    Regex,
    /// Delegated to a custom handler.
    Custom,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: [Operator; 17] = [
        Operator::Eq,
        Operator::Neq,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Like,
        Operator::Ilike,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::In,
        Operator::NotIn,
        Operator::Between,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::Regex,
        Operator::Custom,
    ];

    /// Wire spelling of this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::Ilike => "ilike",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::Between => "between",
            Operator::IsNull => "isNull",
            Operator::IsNotNull => "isNotNull",
            Operator::Regex => "regex",
            Operator::Custom => "custom",
        }
    }

    /// Whether the operator needs an operand.
    pub fn requires_value(&self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// Check whether a tag names a current operator.
    pub fn is_known(tag: &str) -> bool {
        tag.parse::<Operator>().is_ok()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| Error::UnknownOperator(s.to_string()))
    }
}

/// Boolean combinator of a group node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    /// Every child must match.
    #[default]
    And,
    /// At least one child must match.
    Or,
    /// The single child must not match.
    Not,
}

impl Logic {
    /// Wire spelling of this logic tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
            Logic::Not => "NOT",
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Logic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(Logic::And),
            "OR" => Ok(Logic::Or),
            "NOT" => Ok(Logic::Not),
            other => Err(Error::InvalidLogic(other.to_string())),
        }
    }
}
