//! Sort resolution.

use sift_proto::{SortDirection, SortSpec};

use crate::catalog::EntitySchema;

/// Resolve a requested ordering against the schema.
///
/// A missing or unknown sort field falls back to the primary key,
/// descending.
pub fn resolve_sort(schema: &EntitySchema, field: Option<&str>, direction: SortDirection) -> SortSpec {
    match field.filter(|f| !f.is_empty()) {
        Some(field) if schema.is_sortable(field) => SortSpec {
            field: field.to_string(),
            direction,
        },
        Some(field) => {
            tracing::debug!(
                entity = %schema.name,
                sort = %field,
                fallback = %schema.primary_key,
                "unknown sort field, using default ordering"
            );
            SortSpec::desc(&schema.primary_key)
        }
        None => SortSpec::desc(&schema.primary_key),
    }
}
