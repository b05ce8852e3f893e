//! Resource limits applied to filter trees.
//!
//! Limits bound the size of client-supplied filters so a single request
//! cannot exhaust memory or stack.

use serde::{Deserialize, Serialize};

/// Maximum group nesting depth.
pub const MAX_DEPTH: usize = 10;

/// Maximum number of values in an `in` / `notIn` list.
pub const MAX_IN_VALUES: usize = 1000;

/// Maximum number of children in one group.
pub const MAX_CONDITIONS_PER_GROUP: usize = 100;

/// Maximum length, in characters, of any string operand.
pub const MAX_STRING_LENGTH: usize = 10_000;

/// Security limits for validation and compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityLimits {
    /// Maximum group nesting depth.
    pub max_depth: usize,
    /// Maximum list operand size.
    pub max_in_values: usize,
    /// Maximum children per group.
    pub max_conditions_per_group: usize,
    /// Maximum string operand length.
    pub max_string_length: usize,
}

impl Default for SecurityLimits {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_in_values: MAX_IN_VALUES,
            max_conditions_per_group: MAX_CONDITIONS_PER_GROUP,
            max_string_length: MAX_STRING_LENGTH,
        }
    }
}

impl SecurityLimits {
    /// Create limits with custom values.
    pub fn custom(
        max_depth: usize,
        max_in_values: usize,
        max_conditions_per_group: usize,
        max_string_length: usize,
    ) -> Self {
        Self {
            max_depth,
            max_in_values,
            max_conditions_per_group,
            max_string_length,
        }
    }

    /// Set the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the maximum list operand size.
    pub fn with_max_in_values(mut self, max_in_values: usize) -> Self {
        self.max_in_values = max_in_values;
        self
    }

    /// Set the maximum children per group.
    pub fn with_max_conditions_per_group(mut self, max: usize) -> Self {
        self.max_conditions_per_group = max;
        self
    }

    /// Set the maximum string operand length.
    pub fn with_max_string_length(mut self, max_string_length: usize) -> Self {
        self.max_string_length = max_string_length;
        self
    }
}
