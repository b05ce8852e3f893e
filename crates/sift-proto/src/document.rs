//! Versioned, persisted filter trees.

use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Schema version stamped on filters written by this release.
pub const CURRENT_FILTER_VERSION: u32 = 2;

/// Version assumed for filters persisted before versioning existed.
pub const LEGACY_FILTER_VERSION: u32 = 1;

fn legacy_version() -> u32 {
    LEGACY_FILTER_VERSION
}

/// A filter tree as stored by the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDocument {
    /// Filter schema version the tree was written with.
    #[serde(default = "legacy_version")]
    pub version: u32,
    /// Top-level conditions, implicitly AND-ed.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl FilterDocument {
    /// Create a document at the current schema version.
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self {
            version: CURRENT_FILTER_VERSION,
            conditions,
        }
    }

    /// Create a document stamped with an explicit version.
    pub fn with_version(version: u32, conditions: Vec<Condition>) -> Self {
        Self {
            version,
            conditions,
        }
    }

    /// Check whether the document predates the current schema version.
    pub fn is_outdated(&self) -> bool {
        self.version < CURRENT_FILTER_VERSION
    }
}

impl Default for FilterDocument {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
