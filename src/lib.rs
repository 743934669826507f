//! # Backorder
//!
//! Lifecycle and query-caching engine for customer out-of-stock
//! (backorder) requests.
//!
//! ## Features
//!
//! - **Lifecycle state machine**: pending → completed/returned with
//!   quantity conservation enforced in one place
//! - **Filtered, paginated views**: immutable criteria values with
//!   canonical fingerprints as cache keys
//! - **Write-invalidated cache**: TTL'd page and status-count caches,
//!   conservatively cleared on every mutation
//! - **Relevance-ranked search**: deterministic free-text ranking over a
//!   filtered candidate set
//! - **Audit trail**: one immutable event per mutation, fanned out over a
//!   broadcast channel
//! - **Pluggable collaborators**: storage, identity, and audit sinks are
//!   traits injected at construction
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use backorder::prelude::*;
//! use std::sync::Arc;
//!
//! let config = EngineConfig::default();
//! let service = QueryService::new(
//!     Arc::new(InMemoryRequestStore::new()),
//!     Arc::new(ViewCache::from_config(&config)),
//!     Arc::new(BroadcastAuditSink::new(config.audit_capacity)),
//!     Arc::new(FixedIdentityProvider::new(Actor::new("salesperson"))),
//!     config,
//! );
//!
//! let created = service.create_request(input).await?;
//! let after_return = service.process_return(created.id, 30).await?;
//!
//! let criteria = FilterCriteria::new().with_status(RequestStatus::Completed);
//! let page = service.load_page(&criteria, 0).await?;
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod service;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        audit::{AuditAction, AuditEvent, AuditSink, BroadcastAuditSink, MemoryAuditSink},
        error::{EngineError, EngineResult, InvalidTransition, StorageError, ValidationError},
        identity::{Actor, FixedIdentityProvider, IdentityProvider, NoIdentityProvider},
        lifecycle::LifecycleEngine,
        model::{NewRequest, OutOfStockRequest, RequestStatus},
        query::{FilterCriteria, Fingerprint, PageResult, StatusCounts},
        store::RequestStore,
    };

    // === Cache & Service ===
    pub use crate::cache::ViewCache;
    pub use crate::service::{rank_candidates, QueryService};

    // === Storage ===
    pub use crate::storage::InMemoryRequestStore;

    // === Config ===
    pub use crate::config::EngineConfig;

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, NaiveDate, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
