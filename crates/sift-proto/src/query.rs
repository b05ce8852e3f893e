//! Query request/response contract.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::criteria::Row;
use crate::error::Error;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("ASC"),
            SortDirection::Desc => f.write_str("DESC"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(Error::InvalidSortDirection(s.to_string())),
        }
    }
}

/// Resolved ordering handed to the persistence adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to order by.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

impl SortSpec {
    /// Ascending order on a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Descending order on a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

fn first_page() -> u32 {
    1
}

/// Paged, filtered, sorted query request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    /// 1-based page number.
    #[serde(default = "first_page")]
    pub page: u32,
    /// Page size; 0 selects the configured default.
    #[serde(default)]
    pub limit: u32,
    /// Requested sort field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Requested sort direction.
    #[serde(default)]
    pub sort_direction: SortDirection,
    /// Filter conditions, implicitly AND-ed.
    #[serde(default)]
    pub filters: Vec<Condition>,
    /// Free-text search across searchable fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_search: Option<String>,
    /// Restrict global search to these fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_fields: Option<Vec<String>>,
    /// Restrict output columns to these fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_fields: Option<Vec<String>>,
}

impl QueryParams {
    /// Request a page of the given size.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            sort: None,
            sort_direction: SortDirection::Asc,
            filters: Vec::new(),
            global_search: None,
            search_fields: None,
            select_fields: None,
        }
    }

    /// Set the filter conditions.
    pub fn with_filters(mut self, filters: Vec<Condition>) -> Self {
        self.filters = filters;
        self
    }

    /// Set the sort field and direction.
    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(field.into());
        self.sort_direction = direction;
        self
    }

    /// Set the global search text.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.global_search = Some(search.into());
        self
    }

    /// Restrict the fields global search looks at.
    pub fn with_search_fields(mut self, fields: Vec<String>) -> Self {
        self.search_fields = Some(fields);
        self
    }

    /// Restrict the selected fields.
    pub fn with_select(mut self, fields: Vec<String>) -> Self {
        self.select_fields = Some(fields);
        self
    }
}

impl Default for QueryParams {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Display-ready rows.
    pub data: Vec<Row>,
    /// Row count without filters.
    pub total: u64,
    /// Row count with filters.
    pub filtered: u64,
    /// Page number served.
    pub page: u32,
    /// Page size served.
    pub limit: u32,
    /// Number of pages, `ceil(filtered / limit)`.
    pub pages: u64,
}

impl QueryResult {
    /// Assemble a result, deriving the page count.
    pub fn new(data: Vec<Row>, total: u64, filtered: u64, page: u32, limit: u32) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            filtered.div_ceil(u64::from(limit))
        };
        Self {
            data,
            total,
            filtered,
            page,
            limit,
            pages,
        }
    }
}
