//! Shared helpers for integration tests: instrumented store wrappers and
//! a service builder wiring isolated collaborator instances.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use backorder::prelude::*;
use tokio::sync::Semaphore;

/// Wraps a store and counts collaborator invocations, so tests can assert
/// that cache hits really avoid the store.
pub struct CountingStore {
    inner: InMemoryRequestStore,
    query_calls: AtomicUsize,
    count_calls: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryRequestStore::new(),
            query_calls: AtomicUsize::new(0),
            count_calls: AtomicUsize::new(0),
        }
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestStore for CountingStore {
    async fn query(
        &self,
        criteria: &FilterCriteria,
        page_index: usize,
    ) -> EngineResult<(Vec<OutOfStockRequest>, bool)> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.query(criteria, page_index).await
    }

    async fn count_by_status(&self, criteria: &FilterCriteria) -> EngineResult<StatusCounts> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.count_by_status(criteria).await
    }

    async fn get(&self, id: Uuid) -> EngineResult<Option<OutOfStockRequest>> {
        self.inner.get(id).await
    }

    async fn save(&self, record: OutOfStockRequest) -> EngineResult<OutOfStockRequest> {
        self.inner.save(record).await
    }

    async fn delete(&self, id: Uuid) -> EngineResult<()> {
        self.inner.delete(id).await
    }
}

/// Fails the first `failures` read calls with a transient storage error,
/// then behaves normally. Exercises the retry-once read policy.
pub struct FlakyStore {
    inner: InMemoryRequestStore,
    remaining_failures: AtomicUsize,
}

impl FlakyStore {
    pub fn failing(failures: usize) -> Self {
        Self {
            inner: InMemoryRequestStore::new(),
            remaining_failures: AtomicUsize::new(failures),
        }
    }

    pub fn seed(&self) -> &InMemoryRequestStore {
        &self.inner
    }

    fn should_fail(&self) -> bool {
        self.remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RequestStore for FlakyStore {
    async fn query(
        &self,
        criteria: &FilterCriteria,
        page_index: usize,
    ) -> EngineResult<(Vec<OutOfStockRequest>, bool)> {
        if self.should_fail() {
            return Err(StorageError::QueryFailed {
                message: "simulated transient failure".to_string(),
            }
            .into());
        }
        self.inner.query(criteria, page_index).await
    }

    async fn count_by_status(&self, criteria: &FilterCriteria) -> EngineResult<StatusCounts> {
        if self.should_fail() {
            return Err(StorageError::QueryFailed {
                message: "simulated transient failure".to_string(),
            }
            .into());
        }
        self.inner.count_by_status(criteria).await
    }

    async fn get(&self, id: Uuid) -> EngineResult<Option<OutOfStockRequest>> {
        self.inner.get(id).await
    }

    async fn save(&self, record: OutOfStockRequest) -> EngineResult<OutOfStockRequest> {
        self.inner.save(record).await
    }

    async fn delete(&self, id: Uuid) -> EngineResult<()> {
        self.inner.delete(id).await
    }
}

/// Computes its first query result, then parks until the test calls
/// `release`, so a mutation can land between the store round-trip and the
/// reader's cache write.
pub struct GatedStore {
    inner: InMemoryRequestStore,
    gated: AtomicBool,
    entered: Semaphore,
    release: Semaphore,
}

impl GatedStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryRequestStore::new(),
            gated: AtomicBool::new(true),
            entered: Semaphore::new(0),
            release: Semaphore::new(0),
        }
    }

    /// Wait until the gated query has computed its result and parked
    pub async fn entered(&self) {
        self.entered.acquire().await.unwrap().forget();
    }

    /// Let the parked query return
    pub fn release(&self) {
        self.release.add_permits(1);
    }
}

#[async_trait]
impl RequestStore for GatedStore {
    async fn query(
        &self,
        criteria: &FilterCriteria,
        page_index: usize,
    ) -> EngineResult<(Vec<OutOfStockRequest>, bool)> {
        let result = self.inner.query(criteria, page_index).await;
        if self.gated.swap(false, Ordering::SeqCst) {
            self.entered.add_permits(1);
            self.release.acquire().await.unwrap().forget();
        }
        result
    }

    async fn count_by_status(&self, criteria: &FilterCriteria) -> EngineResult<StatusCounts> {
        self.inner.count_by_status(criteria).await
    }

    async fn get(&self, id: Uuid) -> EngineResult<Option<OutOfStockRequest>> {
        self.inner.get(id).await
    }

    async fn save(&self, record: OutOfStockRequest) -> EngineResult<OutOfStockRequest> {
        self.inner.save(record).await
    }

    async fn delete(&self, id: Uuid) -> EngineResult<()> {
        self.inner.delete(id).await
    }
}

/// Fails the Nth delete call (1-based) with a write error; everything else
/// delegates. Exercises partial-failure handling in batch deletes.
pub struct DeleteFailStore {
    inner: InMemoryRequestStore,
    delete_calls: AtomicUsize,
    fail_call: usize,
}

impl DeleteFailStore {
    pub fn failing_on(fail_call: usize) -> Self {
        Self {
            inner: InMemoryRequestStore::new(),
            delete_calls: AtomicUsize::new(0),
            fail_call,
        }
    }
}

#[async_trait]
impl RequestStore for DeleteFailStore {
    async fn query(
        &self,
        criteria: &FilterCriteria,
        page_index: usize,
    ) -> EngineResult<(Vec<OutOfStockRequest>, bool)> {
        self.inner.query(criteria, page_index).await
    }

    async fn count_by_status(&self, criteria: &FilterCriteria) -> EngineResult<StatusCounts> {
        self.inner.count_by_status(criteria).await
    }

    async fn get(&self, id: Uuid) -> EngineResult<Option<OutOfStockRequest>> {
        self.inner.get(id).await
    }

    async fn save(&self, record: OutOfStockRequest) -> EngineResult<OutOfStockRequest> {
        self.inner.save(record).await
    }

    async fn delete(&self, id: Uuid) -> EngineResult<()> {
        let call = self.delete_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_call {
            return Err(StorageError::WriteFailed {
                message: "simulated write failure".to_string(),
            }
            .into());
        }
        self.inner.delete(id).await
    }
}

/// Build a service over the given store with its own cache and audit sink
pub fn build_service(
    store: Arc<dyn RequestStore>,
    config: EngineConfig,
) -> (QueryService, Arc<MemoryAuditSink>) {
    let audit = Arc::new(MemoryAuditSink::new());
    let service = QueryService::new(
        store,
        Arc::new(ViewCache::from_config(&config)),
        audit.clone(),
        Arc::new(FixedIdentityProvider::new(Actor::new("integration-tester"))),
        config,
    );
    (service, audit)
}

pub fn new_request(quantity: u32) -> NewRequest {
    NewRequest {
        customer_id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        variant_id: None,
        product_name: "Trail runner".to_string(),
        product_category: Some("footwear".to_string()),
        variant_label: Some("43 / moss".to_string()),
        quantity,
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
