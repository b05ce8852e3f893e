//! Global free-text search.

use serde_json::{Number, Value};
use sift_proto::{Constraint, Criteria};

use crate::catalog::{EntitySchema, FieldKind};
use crate::error::{Error, Result};
use crate::security::SecurityLimits;

/// Condition id reported for errors raised by global search.
pub const GLOBAL_SEARCH_ID: &str = "globalSearch";

/// Build the OR of per-field fragments for a free-text search.
///
/// Text-like fields get a substring match; numeric fields an exact match when
/// the text parses as a number of the right shape. Other kinds are skipped.
/// `fields` restricts the search to a subset of the schema's fields.
/// Returns `None` when nothing is searchable.
pub fn build_global_search(
    schema: &EntitySchema,
    search: &str,
    fields: Option<&[String]>,
    limits: &SecurityLimits,
) -> Result<Option<Criteria>> {
    let search = search.trim();
    if search.is_empty() {
        return Ok(None);
    }
    let length = search.chars().count();
    if length > limits.max_string_length {
        return Err(Error::StringTooLong {
            condition_id: GLOBAL_SEARCH_ID.to_string(),
            length,
            max: limits.max_string_length,
        });
    }

    let number = search.parse::<f64>().ok().filter(|n| n.is_finite());
    let candidates: Vec<(&str, FieldKind)> = match fields {
        Some(names) => names
            .iter()
            .filter_map(|name| schema.field(name).map(|c| (name.as_str(), c.kind)))
            .collect(),
        None => schema.fields.iter().map(|(name, c)| (name, c.kind)).collect(),
    };

    let mut parts = Vec::new();
    for (name, kind) in candidates {
        if kind.is_text_like() {
            parts.push(Criteria::field(name, Constraint::Contains(search.to_string())));
        } else if kind.is_numeric() {
            if let Some(value) = number.and_then(|n| numeric_value(n, kind)) {
                parts.push(Criteria::field(name, Constraint::Eq(value)));
            }
        }
    }

    let criteria = Criteria::or(parts);
    Ok((!criteria.is_empty()).then_some(criteria))
}

fn numeric_value(n: f64, kind: FieldKind) -> Option<Value> {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Some(Value::Number(Number::from(n as i64)));
    }
    if kind == FieldKind::Integer {
        return None;
    }
    Number::from_f64(n).map(Value::Number)
}
