//! Storage collaborator trait for out-of-stock requests

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::EngineResult;
use crate::core::model::OutOfStockRequest;
use crate::core::query::{FilterCriteria, StatusCounts};

/// Durable storage for out-of-stock requests.
///
/// The engine is agnostic to the backend; implementations provide filtered,
/// paginated reads plus transactional single-record writes. `save` is an
/// upsert by id and must be atomic per record: on failure the stored state
/// is unchanged.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Query one page of the view described by `criteria`.
    ///
    /// Returns the page items in stable order (creation time descending,
    /// ties by id) and whether further pages exist.
    async fn query(
        &self,
        criteria: &FilterCriteria,
        page_index: usize,
    ) -> EngineResult<(Vec<OutOfStockRequest>, bool)>;

    /// Count records per status within the view, ignoring pagination
    async fn count_by_status(&self, criteria: &FilterCriteria) -> EngineResult<StatusCounts>;

    /// Fetch a single record by id
    async fn get(&self, id: Uuid) -> EngineResult<Option<OutOfStockRequest>>;

    /// Upsert a record by id
    async fn save(&self, record: OutOfStockRequest) -> EngineResult<OutOfStockRequest>;

    /// Hard delete a record; absent ids are not an error
    async fn delete(&self, id: Uuid) -> EngineResult<()>;
}
