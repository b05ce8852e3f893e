//! Per-field filter configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::FieldKind;

/// Filter configuration of one field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTypeConfig {
    /// Field kind.
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Maximum accepted string length for operands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Minimum accepted numeric operand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum accepted numeric operand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Whether the record schema marks the field as required.
    #[serde(default)]
    pub required: bool,
    /// Field of the associated record shown in output rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_field: Option<String>,
}

impl FieldTypeConfig {
    /// Create a configuration for a field kind.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Set the maximum operand length.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Set the accepted numeric range.
    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the display field used for associations.
    pub fn with_display_field(mut self, field: impl Into<String>) -> Self {
        self.display_field = Some(field.into());
        self
    }
}

/// Filterable fields of a record type, keyed by field name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, FieldTypeConfig>);

impl FieldMap {
    /// Create an empty field map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field.
    pub fn with_field(mut self, name: impl Into<String>, config: FieldTypeConfig) -> Self {
        self.0.insert(name.into(), config);
        self
    }

    /// Add a field with only a kind.
    pub fn with_kind(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.with_field(name, FieldTypeConfig::new(kind))
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, name: impl Into<String>, config: FieldTypeConfig) {
        self.0.insert(name.into(), config);
    }

    /// Look up a field.
    pub fn get(&self, name: &str) -> Option<&FieldTypeConfig> {
        self.0.get(name)
    }

    /// Check whether a field exists.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldTypeConfig)> {
        self.0.iter().map(|(name, config)| (name.as_str(), config))
    }

    /// Field names in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldTypeConfig)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, FieldTypeConfig)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
