//! Backend-neutral compiled criteria.
//!
//! The compiler turns a condition tree into a [`Criteria`] value. Persistence
//! adapters match on it exhaustively; passthrough and post-fetch fragments are
//! separate variants so an adapter cannot mistake them for structured
//! constraints.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A fetched record, keyed by field name.
pub type Row = Map<String, Value>;

/// Compiled filter criteria.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Criteria {
    /// No constraint; matches every row.
    Empty,
    /// Constraint on a field of the record.
    Field { field: String, constraint: Constraint },
    /// Every child must match.
    And(Vec<Criteria>),
    /// At least one child must match.
    Or(Vec<Criteria>),
    /// The child must not match.
    Not(Box<Criteria>),
    /// Opaque passthrough text interpreted only by the adapter.
    Raw { sql: String, params: Vec<Value> },
    /// Constraint on a field of an associated record.
    Relation {
        relation: String,
        field: String,
        constraint: Constraint,
    },
    /// Predicate applied to rows after the store returns candidates.
    InMemory(InMemoryPredicate),
}

/// Constraint applied to a single value.
///
/// Negation is always spelled `Ne` / `NotIn`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Constraint {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    /// Case-sensitive substring.
    Contains(String),
    /// Case-insensitive substring, handled natively by the backend.
    IContains(String),
    /// Case-insensitive substring emulated by lower-casing both sides; the
    /// operand is already lower-cased.
    LowerContains(String),
    StartsWith(String),
    EndsWith(String),
    Regexp(String),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    /// Inclusive range.
    Range { gte: Value, lte: Value },
    IsNull,
    IsNotNull,
}

impl Criteria {
    /// Constraint on a record field.
    pub fn field(field: impl Into<String>, constraint: Constraint) -> Self {
        Criteria::Field {
            field: field.into(),
            constraint,
        }
    }

    /// Combine with AND, dropping empty parts and unwrapping a single part.
    pub fn and(parts: Vec<Criteria>) -> Self {
        Self::combine(parts, Criteria::And)
    }

    /// Combine with OR, dropping empty parts and unwrapping a single part.
    pub fn or(parts: Vec<Criteria>) -> Self {
        Self::combine(parts, Criteria::Or)
    }

    /// Negate; negating nothing is still nothing.
    pub fn negate(inner: Criteria) -> Self {
        if inner.is_empty() {
            Criteria::Empty
        } else {
            Criteria::Not(Box::new(inner))
        }
    }

    fn combine(parts: Vec<Criteria>, wrap: fn(Vec<Criteria>) -> Criteria) -> Self {
        let mut parts: Vec<Criteria> = parts.into_iter().filter(|c| !c.is_empty()).collect();
        match parts.len() {
            0 => Criteria::Empty,
            1 => parts.remove(0),
            _ => wrap(parts),
        }
    }

    /// Check whether this criteria constrains nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, Criteria::Empty)
    }

    /// Check whether any fragment must be applied after fetching.
    pub fn has_in_memory(&self) -> bool {
        match self {
            Criteria::InMemory(_) => true,
            Criteria::And(parts) | Criteria::Or(parts) => parts.iter().any(Criteria::has_in_memory),
            Criteria::Not(inner) => inner.has_in_memory(),
            _ => false,
        }
    }

    /// Check whether any fragment is a raw passthrough.
    pub fn has_raw(&self) -> bool {
        match self {
            Criteria::Raw { .. } => true,
            Criteria::And(parts) | Criteria::Or(parts) => parts.iter().any(Criteria::has_raw),
            Criteria::Not(inner) => inner.has_raw(),
            _ => false,
        }
    }
}

impl Default for Criteria {
    fn default() -> Self {
        Criteria::Empty
    }
}

/// Row predicate evaluated after the backend returns candidate rows.
#[derive(Clone)]
pub struct InMemoryPredicate {
    label: String,
    predicate: Arc<dyn Fn(&Row) -> bool + Send + Sync>,
}

impl InMemoryPredicate {
    /// Wrap a row predicate under a descriptive label.
    pub fn new<F>(label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Descriptive label used in logs and dry-run output.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Apply the predicate to a row.
    pub fn evaluate(&self, row: &Row) -> bool {
        (self.predicate)(row)
    }
}

impl fmt::Debug for InMemoryPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryPredicate")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl PartialEq for InMemoryPredicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.predicate, &other.predicate)
    }
}

impl Serialize for InMemoryPredicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label)
    }
}
