//! Out-of-stock request records and their lifecycle status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of an out-of-stock request.
///
/// A closed set with exhaustive matching in the transition table; invalid
/// string states cannot be represented. `completed` and `returned` are
/// terminal for fulfillment, but a `completed` record still accepts further
/// returns against its open quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for fulfillment
    Pending,
    /// Closed out as fulfilled (possibly after a partial return)
    Completed,
    /// Fully returned; open quantity is zero
    Returned,
}

impl RequestStatus {
    /// Whether fulfillment transitions may leave this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Returned)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Completed => "completed",
            RequestStatus::Returned => "returned",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer out-of-stock (backorder) request.
///
/// Relation keys (`customer_id`, `product_id`, `variant_id`) are opaque;
/// the engine never dereferences them. Product display fields are
/// denormalized onto the record so free-text filtering and relevance
/// ranking work without joining other entities.
///
/// Quantity invariant: `requested_quantity` is the remaining open quantity,
/// so `returned_quantity + requested_quantity` equals the originally
/// requested amount at every point in the lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutOfStockRequest {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,

    pub product_name: String,
    pub product_category: Option<String>,
    /// Size/color label of the requested variant (e.g. "XL / navy")
    pub variant_label: Option<String>,

    /// Remaining open quantity, monotonically non-increasing
    pub requested_quantity: u32,
    /// Returned so far, monotonically non-decreasing
    pub returned_quantity: u32,
    pub status: RequestStatus,

    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Uuid,
}

impl OutOfStockRequest {
    /// Remaining open quantity
    pub fn open_quantity(&self) -> u32 {
        self.requested_quantity
    }

    /// The quantity originally requested when the record was created
    pub fn original_quantity(&self) -> u32 {
        self.requested_quantity + self.returned_quantity
    }
}

/// Input for creating a new out-of-stock request.
///
/// Validated by the service before it reaches the lifecycle engine:
/// customer and product references must be non-nil, the product name
/// non-empty, and the quantity at least 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequest {
    pub customer_id: Uuid,
    pub product_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    pub product_name: String,
    #[serde(default)]
    pub product_category: Option<String>,
    #[serde(default)]
    pub variant_label: Option<String>,
    pub quantity: u32,
}
