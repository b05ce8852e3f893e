//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::security::SecurityLimits;

/// Page size used when a request asks for `limit = 0`.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Largest page a request may ask for.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 1000;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Resource limits applied to filter trees.
    pub limits: SecurityLimits,

    /// Backend dialect.
    pub dialect: Dialect,

    /// Fields predicates may reference; `None` allows every known field.
    pub allowed_fields: Option<Vec<String>>,

    /// Page size used when a request does not set one.
    pub default_page_size: u32,

    /// Upper bound on the page size.
    pub max_page_size: u32,

    /// Treat references to fields missing from the schema as errors when
    /// loading stored filters.
    pub strict_validation: bool,

    /// Run version transforms on stored filters.
    pub auto_migrate: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limits: SecurityLimits::default(),
            dialect: Dialect::default(),
            allowed_fields: None,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            strict_validation: false,
            auto_migrate: true,
        }
    }
}

impl EngineConfig {
    /// Create a configuration for a dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    /// Set the security limits.
    pub fn with_limits(mut self, limits: SecurityLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Restrict predicates to the given fields.
    pub fn with_allowed_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Set the default and maximum page sizes.
    pub fn with_page_sizes(mut self, default_page_size: u32, max_page_size: u32) -> Self {
        self.default_page_size = default_page_size;
        self.max_page_size = max_page_size;
        self
    }

    /// Enable or disable strict validation of stored filters.
    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }

    /// Enable or disable version transforms on stored filters.
    pub fn with_auto_migrate(mut self, auto_migrate: bool) -> Self {
        self.auto_migrate = auto_migrate;
        self
    }

    /// Clamp a requested page window.
    ///
    /// Returns `(page, limit, offset)`: the page is at least 1, a zero limit
    /// uses the default page size, and the limit never exceeds the maximum.
    pub fn page_window(&self, page: u32, limit: u32) -> (u32, u32, u64) {
        let max = self.max_page_size.max(1);
        let page = page.max(1);
        let limit = match limit {
            0 => self.default_page_size,
            n => n,
        }
        .clamp(1, max);
        let offset = u64::from(page - 1).saturating_mul(u64::from(limit));
        (page, limit, offset)
    }
}
