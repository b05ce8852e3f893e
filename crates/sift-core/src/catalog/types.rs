//! Field kinds and the operator legality matrix.

use serde::{Deserialize, Serialize};
use sift_proto::Operator;

/// Kind of a filterable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    /// Short text.
    #[default]
    String,
    /// Long text.
    Text,
    /// Generic number.
    Number,
    /// Whole number.
    Integer,
    /// Floating point number.
    Float,
    /// Boolean flag.
    Boolean,
    /// Calendar date.
    Date,
    /// Date and time.
    Datetime,
    /// One value out of a fixed set.
    Select,
    /// Structured JSON document.
    Json,
    /// To-one association.
    Association,
    /// To-many association.
    AssociationMany,
    /// A kind this release does not know; treated like `String`.
    #[serde(other)]
    Other,
}

const STRING_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Neq,
    Operator::Like,
    Operator::Ilike,
    Operator::StartsWith,
    Operator::EndsWith,
    Operator::In,
    Operator::NotIn,
    Operator::IsNull,
    Operator::IsNotNull,
    Operator::Regex,
];

const TEXT_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Neq,
    Operator::Like,
    Operator::Ilike,
    Operator::StartsWith,
    Operator::EndsWith,
    Operator::IsNull,
    Operator::IsNotNull,
];

const NUMBER_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Neq,
    Operator::Gt,
    Operator::Gte,
    Operator::Lt,
    Operator::Lte,
    Operator::Between,
    Operator::In,
    Operator::NotIn,
    Operator::IsNull,
    Operator::IsNotNull,
];

const BOOLEAN_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Neq,
    Operator::IsNull,
    Operator::IsNotNull,
];

const DATE_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Neq,
    Operator::Gt,
    Operator::Gte,
    Operator::Lt,
    Operator::Lte,
    Operator::Between,
    Operator::IsNull,
    Operator::IsNotNull,
];

const SELECT_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Neq,
    Operator::In,
    Operator::NotIn,
    Operator::IsNull,
    Operator::IsNotNull,
];

const JSON_OPERATORS: &[Operator] = &[Operator::IsNull, Operator::IsNotNull, Operator::Custom];

const ASSOCIATION_MANY_OPERATORS: &[Operator] = &[
    Operator::In,
    Operator::NotIn,
    Operator::IsNull,
    Operator::IsNotNull,
];

impl FieldKind {
    /// Operators legal on a field of this kind.
    pub fn allowed_operators(&self) -> &'static [Operator] {
        match self {
            FieldKind::String | FieldKind::Other => STRING_OPERATORS,
            FieldKind::Text => TEXT_OPERATORS,
            FieldKind::Number | FieldKind::Integer | FieldKind::Float => NUMBER_OPERATORS,
            FieldKind::Boolean => BOOLEAN_OPERATORS,
            FieldKind::Date | FieldKind::Datetime => DATE_OPERATORS,
            FieldKind::Select | FieldKind::Association => SELECT_OPERATORS,
            FieldKind::Json => JSON_OPERATORS,
            FieldKind::AssociationMany => ASSOCIATION_MANY_OPERATORS,
        }
    }

    /// Check whether an operator is legal on this kind.
    pub fn allows(&self, operator: Operator) -> bool {
        self.allowed_operators().contains(&operator)
    }

    /// Check if this kind holds numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Number | FieldKind::Integer | FieldKind::Float)
    }

    /// Check if this kind holds free text.
    pub fn is_text_like(&self) -> bool {
        matches!(self, FieldKind::String | FieldKind::Text | FieldKind::Other)
    }

    /// Check if this kind references other records.
    pub fn is_association(&self) -> bool {
        matches!(self, FieldKind::Association | FieldKind::AssociationMany)
    }

    /// Wire spelling of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Datetime => "datetime",
            FieldKind::Select => "select",
            FieldKind::Json => "json",
            FieldKind::Association => "association",
            FieldKind::AssociationMany => "association-many",
            FieldKind::Other => "other",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_rows() {
        assert!(FieldKind::String.allows(Operator::Regex));
        assert!(!FieldKind::Text.allows(Operator::In));
        assert!(FieldKind::Integer.allows(Operator::Between));
        assert!(!FieldKind::Float.allows(Operator::Like));
        assert!(!FieldKind::Boolean.allows(Operator::Gt));
        assert!(FieldKind::Datetime.allows(Operator::Lte));
        assert!(!FieldKind::Date.allows(Operator::In));
        assert!(FieldKind::Select.allows(Operator::NotIn));
        assert!(FieldKind::Json.allows(Operator::Custom));
        assert!(!FieldKind::Json.allows(Operator::Eq));
        assert!(FieldKind::Association.allows(Operator::Eq));
        assert!(!FieldKind::AssociationMany.allows(Operator::Eq));
    }

    #[test]
    fn test_unknown_kind_falls_back_to_string() {
        let kind: FieldKind = serde_json::from_str("\"geo-point\"").unwrap();
        assert_eq!(kind, FieldKind::Other);
        assert_eq!(kind.allowed_operators(), FieldKind::String.allowed_operators());
    }

    #[test]
    fn test_kind_spelling() {
        let kind: FieldKind = serde_json::from_str("\"association-many\"").unwrap();
        assert_eq!(kind, FieldKind::AssociationMany);
        assert_eq!(serde_json::to_string(&FieldKind::Datetime).unwrap(), "\"datetime\"");
    }

    #[test]
    fn test_custom_only_on_json() {
        let kinds = [
            FieldKind::String,
            FieldKind::Text,
            FieldKind::Number,
            FieldKind::Boolean,
            FieldKind::Date,
            FieldKind::Select,
            FieldKind::Association,
            FieldKind::AssociationMany,
        ];
        for kind in kinds {
            assert!(!kind.allows(Operator::Custom), "{kind} allows custom");
        }
    }
}
