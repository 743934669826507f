//! Core types: model, criteria, errors, lifecycle, and collaborator traits

pub mod audit;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod model;
pub mod query;
pub mod store;

pub use audit::{AuditAction, AuditEvent, AuditSink, BroadcastAuditSink, MemoryAuditSink};
pub use error::{EngineError, EngineResult, InvalidTransition, StorageError, ValidationError};
pub use identity::{Actor, FixedIdentityProvider, IdentityProvider, NoIdentityProvider};
pub use lifecycle::{LifecycleEngine, RecordLocks};
pub use model::{NewRequest, OutOfStockRequest, RequestStatus};
pub use query::{FilterCriteria, Fingerprint, PageResult, StatusCounts};
pub use store::RequestStore;
