//! Audit event records for every mutation
//!
//! Each lifecycle mutation emits exactly one immutable [`AuditEvent`].
//! Recording is fire-and-forget: a sink that drops or fails to deliver an
//! event never rolls back the mutation that produced it.
//!
//! The default sink fans events out over `tokio::sync::broadcast`, which
//! decouples mutations from whatever consumes the trail (log shipper,
//! inspection tooling, tests). Slow consumers lag; they never block writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::core::identity::Actor;
use crate::core::model::{OutOfStockRequest, RequestStatus};

/// What happened to the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Fulfilled,
    Returned,
    Deleted,
}

/// Immutable record of one mutation: actor, before/after state, quantities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event id
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor_id: Uuid,
    pub actor_name: String,
    pub action: AuditAction,
    pub request_id: Uuid,
    pub before_status: Option<RequestStatus>,
    pub after_status: Option<RequestStatus>,
    pub open_before: Option<u32>,
    pub open_after: Option<u32>,
    pub returned_before: Option<u32>,
    pub returned_after: Option<u32>,
}

impl AuditEvent {
    /// Event for a freshly created record (no before-state)
    pub fn created(record: &OutOfStockRequest, actor: &Actor) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id: actor.id,
            actor_name: actor.name.clone(),
            action: AuditAction::Created,
            request_id: record.id,
            before_status: None,
            after_status: Some(record.status),
            open_before: None,
            open_after: Some(record.open_quantity()),
            returned_before: None,
            returned_after: Some(record.returned_quantity),
        }
    }

    /// Event for a lifecycle transition, capturing both sides
    pub fn transition(
        action: AuditAction,
        before: &OutOfStockRequest,
        after: &OutOfStockRequest,
        actor: &Actor,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id: actor.id,
            actor_name: actor.name.clone(),
            action,
            request_id: after.id,
            before_status: Some(before.status),
            after_status: Some(after.status),
            open_before: Some(before.open_quantity()),
            open_after: Some(after.open_quantity()),
            returned_before: Some(before.returned_quantity),
            returned_after: Some(after.returned_quantity),
        }
    }

    /// Event for a hard delete (no after-state)
    pub fn deleted(request_id: Uuid, actor: &Actor) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id: actor.id,
            actor_name: actor.name.clone(),
            action: AuditAction::Deleted,
            request_id,
            before_status: None,
            after_status: None,
            open_before: None,
            open_after: None,
            returned_before: None,
            returned_after: None,
        }
    }
}

/// Receives one event per mutation. Best-effort, not transactional.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Broadcast-based audit sink.
///
/// Cheap to clone and share; `record` never blocks and never fails. With no
/// subscribers the event is simply dropped.
#[derive(Debug, Clone)]
pub struct BroadcastAuditSink {
    sender: broadcast::Sender<AuditEvent>,
}

impl BroadcastAuditSink {
    /// `capacity` bounds how many events a slow subscriber may lag behind
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to all future audit events
    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastAuditSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl AuditSink for BroadcastAuditSink {
    fn record(&self, event: AuditEvent) {
        // send() errs only when no receiver exists, which is fine
        let _ = self.sender.send(event);
    }
}

/// Collects events in memory. Test and inspection sink.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(open: u32, returned: u32, status: RequestStatus) -> OutOfStockRequest {
        let now = Utc::now();
        let actor = Uuid::new_v4();
        OutOfStockRequest {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            variant_id: None,
            product_name: "Wool coat".to_string(),
            product_category: None,
            variant_label: None,
            requested_quantity: open,
            returned_quantity: returned,
            status,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        }
    }

    #[test]
    fn test_created_event_shape() {
        let record = sample_record(100, 0, RequestStatus::Pending);
        let actor = Actor::new("salesperson");
        let event = AuditEvent::created(&record, &actor);

        assert_eq!(event.action, AuditAction::Created);
        assert_eq!(event.request_id, record.id);
        assert_eq!(event.before_status, None);
        assert_eq!(event.after_status, Some(RequestStatus::Pending));
        assert_eq!(event.open_after, Some(100));
    }

    #[test]
    fn test_transition_event_captures_both_sides() {
        let before = sample_record(100, 0, RequestStatus::Pending);
        let mut after = before.clone();
        after.requested_quantity = 70;
        after.returned_quantity = 30;
        after.status = RequestStatus::Completed;

        let actor = Actor::new("warehouse-keeper");
        let event = AuditEvent::transition(AuditAction::Returned, &before, &after, &actor);

        assert_eq!(event.before_status, Some(RequestStatus::Pending));
        assert_eq!(event.after_status, Some(RequestStatus::Completed));
        assert_eq!(event.open_before, Some(100));
        assert_eq!(event.open_after, Some(70));
        assert_eq!(event.returned_after, Some(30));
    }

    #[test]
    fn test_event_serialization() {
        let record = sample_record(5, 0, RequestStatus::Pending);
        let event = AuditEvent::created(&record, &Actor::new("tester"));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "created");
        assert_eq!(json["after_status"], "pending");
    }

    #[tokio::test]
    async fn test_broadcast_sink_delivers_to_subscribers() {
        let sink = BroadcastAuditSink::new(16);
        let mut rx = sink.subscribe();

        let record = sample_record(3, 0, RequestStatus::Pending);
        sink.record(AuditEvent::created(&record, &Actor::new("tester")));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.request_id, record.id);
    }

    #[test]
    fn test_broadcast_sink_without_subscribers_does_not_panic() {
        let sink = BroadcastAuditSink::new(16);
        let record = sample_record(3, 0, RequestStatus::Pending);
        sink.record(AuditEvent::created(&record, &Actor::new("tester")));
        assert_eq!(sink.receiver_count(), 0);
    }

    #[test]
    fn test_memory_sink_collects_in_order() {
        let sink = MemoryAuditSink::new();
        let actor = Actor::new("tester");
        sink.record(AuditEvent::deleted(Uuid::new_v4(), &actor));
        sink.record(AuditEvent::deleted(Uuid::new_v4(), &actor));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.action == AuditAction::Deleted));
    }
}
