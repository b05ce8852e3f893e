//! In-memory persistence adapter.

use std::cmp::Ordering;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use sift_proto::{Criteria, Row, SortDirection, SortSpec};

use super::evaluator::CriteriaEvaluator;
use super::{FindRequest, PersistenceAdapter, StoreError};

/// Reference [`PersistenceAdapter`] over a vector of JSON rows.
///
/// Every criteria variant except raw passthrough text is evaluated in
/// memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<Row>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given rows.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Build a store from JSON objects; non-object values are rejected.
    pub fn from_json(values: Vec<Value>) -> Result<Self, StoreError> {
        let rows = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| match value {
                Value::Object(row) => Ok(row),
                other => Err(StoreError::Backend(format!(
                    "row {i} is not an object: {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_rows(rows))
    }

    /// Append a row.
    pub fn insert(&self, row: Row) {
        self.rows.write().push(row);
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn matching(&self, criteria: &Criteria) -> Result<Vec<Row>, StoreError> {
        let rows = self.rows.read();
        let mut matched = Vec::new();
        for row in rows.iter() {
            if CriteriaEvaluator::evaluate(criteria, row)? {
                matched.push(row.clone());
            }
        }
        Ok(matched)
    }
}

/// Nulls sort last in ascending order.
fn compare_rows(a: &Row, b: &Row, sort: &SortSpec) -> Ordering {
    let left = a.get(&sort.field).filter(|v| !v.is_null());
    let right = b.get(&sort.field).filter(|v| !v.is_null());
    let ordering = match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => CriteriaEvaluator::compare_values(x, y).unwrap_or(Ordering::Equal),
    };
    match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryStore {
    async fn count(&self, criteria: &Criteria) -> Result<u64, StoreError> {
        if criteria.is_empty() {
            return Ok(self.len() as u64);
        }
        Ok(self.matching(criteria)?.len() as u64)
    }

    async fn find(&self, request: &FindRequest) -> Result<Vec<Row>, StoreError> {
        let mut rows = self.matching(&request.criteria)?;
        rows.sort_by(|a, b| compare_rows(a, b, &request.sort));
        let offset = usize::try_from(request.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sift_proto::Constraint;

    fn store() -> MemoryStore {
        MemoryStore::from_json(vec![
            json!({ "id": 1, "name": "Alice", "age": 30 }),
            json!({ "id": 2, "name": "Bob", "age": null }),
            json!({ "id": 3, "name": "Carol", "age": 25 }),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_count() {
        let store = store();
        assert_eq!(store.count(&Criteria::Empty).await.unwrap(), 3);
        let adults = Criteria::field("age", Constraint::Gte(json!(26)));
        assert_eq!(store.count(&adults).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_sorts_and_pages() {
        let store = store();
        let request = FindRequest {
            criteria: Criteria::Empty,
            sort: SortSpec::asc("age"),
            offset: 0,
            limit: 10,
        };
        let ids: Vec<Value> = store
            .find(&request)
            .await
            .unwrap()
            .into_iter()
            .map(|row| row["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!(3), json!(1), json!(2)]);

        let request = FindRequest {
            criteria: Criteria::Empty,
            sort: SortSpec::desc("id"),
            offset: 1,
            limit: 1,
        };
        let page = store.find(&request).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["id"], json!(2));
    }

    #[tokio::test]
    async fn test_raw_is_unsupported() {
        let raw = Criteria::Raw {
            sql: "1 = 1".into(),
            params: vec![],
        };
        assert!(matches!(
            store().count(&raw).await,
            Err(StoreError::Unsupported(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(MemoryStore::from_json(vec![json!([1])]).is_err());
        let store = MemoryStore::new();
        store.insert(Row::new());
        assert_eq!(store.len(), 1);
    }
}
