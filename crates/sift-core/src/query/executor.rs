//! Paged query execution against a persistence adapter.

use sift_proto::{Criteria, QueryParams, QueryResult};

use super::compiler::QueryCompiler;
use crate::error::Result;
use crate::store::{FindRequest, PersistenceAdapter};

impl QueryCompiler {
    /// Compile a request and run it.
    ///
    /// The unfiltered count, the filtered count and the page fetch are issued
    /// concurrently; the first failure aborts the whole call.
    pub async fn execute(
        &self,
        adapter: &dyn PersistenceAdapter,
        params: &QueryParams,
    ) -> Result<QueryResult> {
        let criteria = self.compile_where(params)?;
        let sort = self.resolve_sort(params.sort.as_deref(), params.sort_direction);
        let (page, limit, offset) = self.config().page_window(params.page, params.limit);

        let request = FindRequest {
            criteria: criteria.clone(),
            sort,
            offset,
            limit: u64::from(limit),
        };
        let unfiltered = Criteria::Empty;

        tracing::debug!(
            entity = %self.schema().name,
            page,
            limit,
            sort = %request.sort.field,
            raw = criteria.has_raw(),
            in_memory = criteria.has_in_memory(),
            "executing query"
        );

        let (total, filtered, rows) = tokio::try_join!(
            adapter.count(&unfiltered),
            adapter.count(&criteria),
            adapter.find(&request),
        )?;

        let select = params.select_fields.as_deref();
        let data = rows.iter().map(|row| self.map_row(row, select)).collect();
        Ok(QueryResult::new(data, total, filtered, page, limit))
    }
}
