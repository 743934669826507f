//! Lifecycle state machine and quantity accounting
//!
//! The engine is the single enforcement point for the transition table and
//! the quantity-conservation invariant: at every point,
//! `returned_quantity + open_quantity == originally requested quantity`.
//!
//! Transition table:
//!
//! | From      | Event              | Guard                  | To                              |
//! |-----------|--------------------|------------------------|---------------------------------|
//! | (none)    | create             | quantity >= 1          | pending                         |
//! | pending   | fulfill_all        | (none)                 | completed                       |
//! | pending   | process_return(q)  | 0 < q <= open          | returned if open hits 0, else completed |
//! | completed | process_return(q)  | 0 < q <= open          | returned if open hits 0, else completed |
//!
//! A return that leaves open quantity positive closes the remainder out as
//! fulfilled, so the record lands in `completed`; only a return that zeroes
//! the open quantity lands in `returned`. `returned` accepts no transition.
//!
//! Transitions produce an updated copy; the caller persists it and only the
//! persisted value replaces the old state. Persistence failure therefore
//! never leaves a partially applied transition.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::core::error::{EngineResult, InvalidTransition, ValidationError};
use crate::core::identity::Actor;
use crate::core::model::{NewRequest, OutOfStockRequest, RequestStatus};

/// Per-record-id async locks.
///
/// At most one transition is in flight per record id, so two concurrent
/// returns cannot double-count against the same open quantity. Locks for
/// different ids are independent; the registry mutex is held only for the
/// map lookup, never across a transition.
#[derive(Debug, Default)]
pub struct RecordLocks {
    inner: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding transitions on `id`.
    ///
    /// Entries nobody holds anymore (strong count of 1, the map's own
    /// reference) are pruned on the way in, so the registry does not grow
    /// with every record id ever transitioned.
    pub fn lock_for(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        map.entry(id).or_default().clone()
    }
}

/// Owns the state machine and quantity accounting for request records
#[derive(Debug, Default)]
pub struct LifecycleEngine {
    locks: RecordLocks,
}

impl LifecycleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The per-record transition lock; callers hold it across
    /// load-transition-persist for that record
    pub fn guard(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.lock_for(id)
    }

    /// Build a fresh `pending` record from validated input
    pub fn create(&self, input: &NewRequest, actor: &Actor, now: DateTime<Utc>) -> OutOfStockRequest {
        OutOfStockRequest {
            id: Uuid::new_v4(),
            customer_id: input.customer_id,
            product_id: input.product_id,
            variant_id: input.variant_id,
            product_name: input.product_name.clone(),
            product_category: input.product_category.clone(),
            variant_label: input.variant_label.clone(),
            requested_quantity: input.quantity,
            returned_quantity: 0,
            status: RequestStatus::Pending,
            created_at: now,
            created_by: actor.id,
            updated_at: now,
            updated_by: actor.id,
        }
    }

    /// Close a pending request out as fully fulfilled. No quantity change.
    pub fn fulfill_all(
        &self,
        record: &OutOfStockRequest,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> EngineResult<OutOfStockRequest> {
        if record.status != RequestStatus::Pending {
            return Err(InvalidTransition::TerminalState {
                status: record.status,
            }
            .into());
        }

        let mut updated = record.clone();
        updated.status = RequestStatus::Completed;
        updated.updated_at = now;
        updated.updated_by = actor.id;
        Ok(updated)
    }

    /// Apply a return of `quantity` units against the open quantity.
    ///
    /// Rejects zero quantities, anything above the open quantity, and any
    /// record already `returned`. The rejected record is untouched.
    pub fn process_return(
        &self,
        record: &OutOfStockRequest,
        quantity: u32,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> EngineResult<OutOfStockRequest> {
        if quantity == 0 {
            return Err(ValidationError::NonPositiveQuantity { quantity }.into());
        }
        if record.status == RequestStatus::Returned {
            return Err(InvalidTransition::TerminalState {
                status: record.status,
            }
            .into());
        }
        let open = record.open_quantity();
        if quantity > open {
            return Err(InvalidTransition::QuantityExceedsOpen {
                requested: quantity,
                open,
            }
            .into());
        }

        let mut updated = record.clone();
        updated.returned_quantity += quantity;
        updated.requested_quantity -= quantity;
        updated.status = if updated.requested_quantity == 0 {
            RequestStatus::Returned
        } else {
            RequestStatus::Completed
        };
        updated.updated_at = now;
        updated.updated_by = actor.id;
        Ok(updated)
    }
}
