//! Query and mutation orchestration over store, cache, and lifecycle
//!
//! `QueryService` is the caller-facing surface: reads go criteria → cache →
//! store, mutations go lifecycle → store → cache invalidation → audit.
//! Every collaborator is injected at construction, so tests run against
//! isolated instances with no shared state.

use std::sync::Arc;
use uuid::Uuid;

use crate::cache::ViewCache;
use crate::config::EngineConfig;
use crate::core::audit::{AuditAction, AuditEvent, AuditSink};
use crate::core::error::{EngineError, EngineResult, ValidationError};
use crate::core::identity::{Actor, IdentityProvider};
use crate::core::lifecycle::LifecycleEngine;
use crate::core::model::{NewRequest, OutOfStockRequest};
use crate::core::query::{normalize_text, FilterCriteria, PageResult, StatusCounts};
use crate::core::store::RequestStore;

/// Exact case-insensitive product-name match
const RANK_EXACT_NAME: u8 = 3;
/// Query is a substring of the product name
const RANK_NAME_SUBSTRING: u8 = 2;
/// Query is a substring of the category or variant label
const RANK_SECONDARY: u8 = 1;

/// Relevance ranking over an in-memory candidate set.
///
/// Deterministic: the same query and candidates produce the same ordering
/// on every invocation. Non-matching candidates are dropped; ties within a
/// relevance tier are broken by creation time descending, then id.
pub fn rank_candidates(query: &str, candidates: &[OutOfStockRequest]) -> Vec<OutOfStockRequest> {
    let query = normalize_text(query);
    if query.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(u8, &OutOfStockRequest)> = candidates
        .iter()
        .filter_map(|record| relevance(&query, record).map(|score| (score, record)))
        .collect();

    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .cmp(score_a)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    scored.into_iter().map(|(_, record)| record.clone()).collect()
}

fn relevance(query: &str, record: &OutOfStockRequest) -> Option<u8> {
    let name = record.product_name.to_lowercase();
    if name == query {
        return Some(RANK_EXACT_NAME);
    }
    if name.contains(query) {
        return Some(RANK_NAME_SUBSTRING);
    }
    let in_category = record
        .product_category
        .as_deref()
        .is_some_and(|c| c.to_lowercase().contains(query));
    let in_variant = record
        .variant_label
        .as_deref()
        .is_some_and(|v| v.to_lowercase().contains(query));
    if in_category || in_variant {
        return Some(RANK_SECONDARY);
    }
    None
}

/// Orchestrates filtered reads and lifecycle mutations.
///
/// Reads check the cache first and fall back to the store, retrying once
/// on a transient storage failure. Mutations read authoritative state from
/// the store (never the cache), apply the lifecycle transition under the
/// per-record lock, persist, conservatively invalidate the cache, and emit
/// one audit event. Audit delivery is best-effort and never rolls back a
/// persisted mutation.
pub struct QueryService {
    store: Arc<dyn RequestStore>,
    cache: Arc<ViewCache>,
    lifecycle: LifecycleEngine,
    audit: Arc<dyn AuditSink>,
    identity: Arc<dyn IdentityProvider>,
    config: EngineConfig,
}

impl QueryService {
    pub fn new(
        store: Arc<dyn RequestStore>,
        cache: Arc<ViewCache>,
        audit: Arc<dyn AuditSink>,
        identity: Arc<dyn IdentityProvider>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            cache,
            lifecycle: LifecycleEngine::new(),
            audit,
            identity,
            config,
        }
    }

    /// Load one page of the filtered view.
    ///
    /// A cache hit within the TTL returns immediately without touching the
    /// store; expiry is re-checked at read time by the cache itself.
    pub async fn load_page(
        &self,
        criteria: &FilterCriteria,
        page_index: usize,
    ) -> EngineResult<PageResult> {
        self.check_page_size(criteria)?;

        let fingerprint = criteria.fingerprint(page_index);
        if let Some(page) = self.cache.get_page(fingerprint) {
            tracing::debug!(page_index, "serving view page from cache");
            return Ok(page);
        }

        // snapshot before the store round-trip: if a mutation invalidates
        // the cache while the query is in flight, this page is not cached
        let generation = self.cache.generation();
        let (items, has_more) = self.query_with_retry(criteria, page_index).await?;
        let page = PageResult::new(items, has_more);
        self.cache.put_page(fingerprint, page.clone(), generation);
        Ok(page)
    }

    /// Load the page after `current_page_index`.
    ///
    /// Fails with `NoMorePages` when the current page reports no further
    /// pages. Idempotent when retried with the same index.
    pub async fn load_next_page(
        &self,
        criteria: &FilterCriteria,
        current_page_index: usize,
    ) -> EngineResult<PageResult> {
        let current = self.load_page(criteria, current_page_index).await?;
        if !current.has_more {
            return Err(EngineError::NoMorePages {
                last_page: current_page_index,
            });
        }
        self.load_page(criteria, current_page_index + 1).await
    }

    /// Status-count aggregate for the view, via the narrow count cache
    pub async fn status_counts(&self, criteria: &FilterCriteria) -> EngineResult<StatusCounts> {
        let fingerprint = criteria.count_fingerprint();
        if let Some(counts) = self.cache.get_counts(fingerprint) {
            return Ok(counts);
        }

        let generation = self.cache.generation();
        let counts = match self.store.count_by_status(criteria).await {
            Ok(counts) => counts,
            Err(err) if err.is_transient() => {
                tracing::warn!(error = %err, "status count query failed, retrying once");
                self.store.count_by_status(criteria).await?
            }
            Err(err) => return Err(err),
        };
        self.cache.put_counts(fingerprint, counts.clone(), generation);
        Ok(counts)
    }

    /// Create a new out-of-stock request.
    ///
    /// Requires an acting identity; validates input; persists; invalidates
    /// every cached view; emits one audit event.
    pub async fn create_request(&self, input: NewRequest) -> EngineResult<OutOfStockRequest> {
        let actor = self.current_actor()?;
        validate_new_request(&input)?;

        let record = self.lifecycle.create(&input, &actor, chrono::Utc::now());
        let saved = self.store.save(record).await?;

        self.cache.invalidate_all();
        self.audit.record(AuditEvent::created(&saved, &actor));
        tracing::info!(
            request_id = %saved.id,
            quantity = saved.requested_quantity,
            "created out-of-stock request"
        );
        Ok(saved)
    }

    /// Apply a return against a request's open quantity.
    ///
    /// Reads the authoritative record from the store under the per-record
    /// lock; on persistence failure no state is advanced.
    pub async fn process_return(
        &self,
        request_id: Uuid,
        quantity: u32,
    ) -> EngineResult<OutOfStockRequest> {
        let actor = self.current_actor()?;

        let lock = self.lifecycle.guard(request_id);
        let _guard = lock.lock().await;

        let current = self
            .store
            .get(request_id)
            .await?
            .ok_or(EngineError::NotFound { id: request_id })?;
        let updated = self
            .lifecycle
            .process_return(&current, quantity, &actor, chrono::Utc::now())?;
        let saved = self.store.save(updated).await?;

        self.cache.invalidate_all();
        self.audit.record(AuditEvent::transition(
            AuditAction::Returned,
            &current,
            &saved,
            &actor,
        ));
        tracing::info!(
            request_id = %saved.id,
            returned = quantity,
            open = saved.requested_quantity,
            status = %saved.status,
            "processed return"
        );
        Ok(saved)
    }

    /// Close a pending request out as fully fulfilled
    pub async fn fulfill_request(&self, request_id: Uuid) -> EngineResult<OutOfStockRequest> {
        let actor = self.current_actor()?;

        let lock = self.lifecycle.guard(request_id);
        let _guard = lock.lock().await;

        let current = self
            .store
            .get(request_id)
            .await?
            .ok_or(EngineError::NotFound { id: request_id })?;
        let updated = self
            .lifecycle
            .fulfill_all(&current, &actor, chrono::Utc::now())?;
        let saved = self.store.save(updated).await?;

        self.cache.invalidate_all();
        self.audit.record(AuditEvent::transition(
            AuditAction::Fulfilled,
            &current,
            &saved,
            &actor,
        ));
        tracing::info!(request_id = %saved.id, "fulfilled out-of-stock request");
        Ok(saved)
    }

    /// Relevance-ranked free-text search within a filtered view.
    ///
    /// The candidate set is the view described by `within` with its own
    /// free text cleared, capped at the configured maximum page size.
    pub async fn search(
        &self,
        query: &str,
        within: &FilterCriteria,
    ) -> EngineResult<Vec<OutOfStockRequest>> {
        let candidate_criteria = within
            .without_text()
            .with_page_size(self.config.max_page_size);
        let (candidates, _) = self.query_with_retry(&candidate_criteria, 0).await?;
        Ok(rank_candidates(query, &candidates))
    }

    /// Hard batch delete, bypassing lifecycle rules.
    ///
    /// Entry point only; elevated authorization is enforced by the caller.
    /// Absent ids are skipped. Returns the number of records removed. A
    /// storage failure mid-batch stops the loop, but the cache is still
    /// invalidated for the records already removed before the error
    /// propagates.
    pub async fn delete_requests(&self, ids: &[Uuid]) -> EngineResult<usize> {
        let actor = self.current_actor()?;

        let mut deleted = 0usize;
        let mut failure = None;
        for &id in ids {
            let found = match self.store.get(id).await {
                Ok(record) => record.is_some(),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            };
            if !found {
                continue;
            }
            if let Err(err) = self.store.delete(id).await {
                failure = Some(err);
                break;
            }
            self.audit.record(AuditEvent::deleted(id, &actor));
            deleted += 1;
        }
        if deleted > 0 {
            self.cache.invalidate_all();
            tracing::info!(deleted, "hard-deleted out-of-stock requests");
        }
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(deleted)
    }

    fn current_actor(&self) -> EngineResult<Actor> {
        self.identity
            .current_actor()
            .ok_or(EngineError::AuthenticationRequired)
    }

    fn check_page_size(&self, criteria: &FilterCriteria) -> EngineResult<()> {
        if criteria.page_size == 0 || criteria.page_size > self.config.max_page_size {
            return Err(ValidationError::PageSizeOutOfBounds {
                requested: criteria.page_size,
                max: self.config.max_page_size,
            }
            .into());
        }
        Ok(())
    }

    async fn query_with_retry(
        &self,
        criteria: &FilterCriteria,
        page_index: usize,
    ) -> EngineResult<(Vec<OutOfStockRequest>, bool)> {
        match self.store.query(criteria, page_index).await {
            Ok(result) => Ok(result),
            Err(err) if err.is_transient() => {
                tracing::warn!(error = %err, page_index, "store query failed, retrying once");
                self.store.query(criteria, page_index).await
            }
            Err(err) => Err(err),
        }
    }
}

fn validate_new_request(input: &NewRequest) -> EngineResult<()> {
    if input.customer_id.is_nil() {
        return Err(ValidationError::MissingReference {
            field: "customer_id",
        }
        .into());
    }
    if input.product_id.is_nil() {
        return Err(ValidationError::MissingReference {
            field: "product_id",
        }
        .into());
    }
    if input.product_name.trim().is_empty() {
        return Err(ValidationError::EmptyField {
            field: "product_name",
        }
        .into());
    }
    if input.quantity == 0 {
        return Err(ValidationError::NonPositiveQuantity {
            quantity: input.quantity,
        }
        .into());
    }
    Ok(())
}
