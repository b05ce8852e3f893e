//! Entity schema seen by the compiler.

use serde::{Deserialize, Serialize};

use super::field::{FieldMap, FieldTypeConfig};
use super::types::FieldKind;

/// Implicit creation timestamp, always sortable.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Implicit modification timestamp, always sortable.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

fn default_primary_key() -> String {
    "id".to_string()
}

/// Filterable view of a record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySchema {
    /// Record type name (also the prefix of its custom handler ids).
    pub name: String,
    /// Primary key field.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Filterable fields.
    #[serde(default)]
    pub fields: FieldMap,
}

impl EntitySchema {
    /// Create a schema with an `id` primary key.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: default_primary_key(),
            fields: FieldMap::new(),
        }
    }

    /// Set the primary key field.
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Add a field.
    pub fn with_field(mut self, name: impl Into<String>, config: FieldTypeConfig) -> Self {
        self.fields.insert(name, config);
        self
    }

    /// Add a field with only a kind.
    pub fn with_kind(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.with_field(name, FieldTypeConfig::new(kind))
    }

    /// Look up a field.
    pub fn field(&self, name: &str) -> Option<&FieldTypeConfig> {
        self.fields.get(name)
    }

    /// Check whether a field may be used for ordering.
    pub fn is_sortable(&self, field: &str) -> bool {
        field == self.primary_key
            || field == CREATED_AT_FIELD
            || field == UPDATED_AT_FIELD
            || self.fields.contains(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sortable_fields() {
        let schema = EntitySchema::new("User").with_kind("name", FieldKind::String);
        assert!(schema.is_sortable("id"));
        assert!(schema.is_sortable("name"));
        assert!(schema.is_sortable("createdAt"));
        assert!(schema.is_sortable("updatedAt"));
        assert!(!schema.is_sortable("password"));
    }

    #[test]
    fn test_deserialize_defaults_primary_key() {
        let schema: EntitySchema = serde_json::from_value(json!({
            "name": "Post",
            "fields": { "title": { "type": "string" } }
        }))
        .unwrap();
        assert_eq!(schema.primary_key, "id");
        assert_eq!(schema.field("title").unwrap().kind, FieldKind::String);
    }
}
