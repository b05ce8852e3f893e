//! Backend dialect tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies which persistence backend's emulation rules apply.
///
/// The tag is opaque to the compiler except for [`supports_native_ilike`];
/// custom handlers may branch on it freely.
///
/// [`supports_native_ilike`]: Dialect::supports_native_ilike
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dialect(String);

impl Dialect {
    /// Wrap an arbitrary backend tag (normalized to lower case).
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().to_ascii_lowercase())
    }

    pub fn postgres() -> Self {
        Self::new("postgres")
    }

    pub fn mysql() -> Self {
        Self::new("mysql")
    }

    pub fn sqlite() -> Self {
        Self::new("sqlite")
    }

    pub fn mssql() -> Self {
        Self::new("mssql")
    }

    pub fn mongo() -> Self {
        Self::new("mongo")
    }

    /// Document-store fallback with no native extensions.
    pub fn generic() -> Self {
        Self::new("generic")
    }

    /// The backend tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the backend has a native case-insensitive LIKE.
    pub fn supports_native_ilike(&self) -> bool {
        matches!(self.0.as_str(), "postgres" | "postgresql" | "cockroachdb")
    }

    /// Whether the backend speaks SQL.
    pub fn is_sql(&self) -> bool {
        matches!(
            self.0.as_str(),
            "postgres" | "postgresql" | "cockroachdb" | "mysql" | "mariadb" | "sqlite" | "mssql"
        )
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::generic()
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Dialect {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}
