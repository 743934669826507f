//! In-memory implementation of RequestStore for testing and development

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::core::error::{EngineResult, StorageError};
use crate::core::model::OutOfStockRequest;
use crate::core::query::{FilterCriteria, StatusCounts};
use crate::core::store::RequestStore;

/// In-memory request store.
///
/// Uses RwLock for thread-safe access. Filtering, sorting, and pagination
/// happen over a snapshot of the map, so reads never block each other.
#[derive(Clone, Default)]
pub struct InMemoryRequestStore {
    records: Arc<RwLock<HashMap<Uuid, OutOfStockRequest>>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, filters aside
    pub fn len(&self) -> usize {
        self.records.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matching(&self, criteria: &FilterCriteria) -> EngineResult<Vec<OutOfStockRequest>> {
        let records = self.records.read().map_err(|e| StorageError::Unavailable {
            message: format!("failed to acquire read lock: {}", e),
        })?;

        let mut matched: Vec<OutOfStockRequest> = records
            .values()
            .filter(|record| criteria.matches(record))
            .cloned()
            .collect();

        // stable view order: newest first, id breaks ties
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(matched)
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn query(
        &self,
        criteria: &FilterCriteria,
        page_index: usize,
    ) -> EngineResult<(Vec<OutOfStockRequest>, bool)> {
        let matched = self.matching(criteria)?;
        let total = matched.len();
        let start = page_index.saturating_mul(criteria.page_size);

        let items: Vec<OutOfStockRequest> = matched
            .into_iter()
            .skip(start)
            .take(criteria.page_size)
            .collect();
        let has_more = start + items.len() < total;
        Ok((items, has_more))
    }

    async fn count_by_status(&self, criteria: &FilterCriteria) -> EngineResult<StatusCounts> {
        let matched = self.matching(criteria)?;
        let mut counts = StatusCounts::default();
        for record in &matched {
            counts.increment(record.status);
        }
        Ok(counts)
    }

    async fn get(&self, id: Uuid) -> EngineResult<Option<OutOfStockRequest>> {
        let records = self.records.read().map_err(|e| StorageError::Unavailable {
            message: format!("failed to acquire read lock: {}", e),
        })?;
        Ok(records.get(&id).cloned())
    }

    async fn save(&self, record: OutOfStockRequest) -> EngineResult<OutOfStockRequest> {
        let mut records = self.records.write().map_err(|e| StorageError::Unavailable {
            message: format!("failed to acquire write lock: {}", e),
        })?;
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> EngineResult<()> {
        let mut records = self.records.write().map_err(|e| StorageError::Unavailable {
            message: format!("failed to acquire write lock: {}", e),
        })?;
        records.remove(&id);
        Ok(())
    }
}
