//! Filter criteria, cache fingerprints, and result pages

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::core::model::{OutOfStockRequest, RequestStatus};

/// Default page size when callers do not pick one
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Normalize free text for filtering, ranking, and fingerprinting.
///
/// Trim plus Unicode lowercase, so queries differing only in whitespace or
/// case hit the same cache entry and match the same records.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Immutable description of a filtered view over out-of-stock requests.
///
/// Equality and hashing cover every field, which is what makes a criteria
/// value usable as a cache key. Free text is normalized at construction so
/// two semantically identical criteria compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Restrict to records created on this calendar date (UTC)
    pub date: Option<NaiveDate>,
    pub status: Option<RequestStatus>,
    pub customer_id: Option<uuid::Uuid>,
    pub product_id: Option<uuid::Uuid>,
    /// Normalized free-text query matched against name/category/variant
    text: Option<String>,
    pub page_size: usize,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            ..Self::default()
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_customer(mut self, customer_id: uuid::Uuid) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_product(mut self, product_id: uuid::Uuid) -> Self {
        self.product_id = Some(product_id);
        self
    }

    /// Set the free-text query; empty text after trimming clears it
    pub fn with_text(mut self, text: &str) -> Self {
        let normalized = normalize_text(text);
        self.text = if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        };
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// The normalized free-text query, if any
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Same criteria with the free-text query cleared
    pub fn without_text(&self) -> Self {
        let mut cleared = self.clone();
        cleared.text = None;
        cleared
    }

    /// Whether a record belongs to the view this criteria describes.
    ///
    /// Single enforcement point for membership so store backends and the
    /// ranking path agree on what matches.
    pub fn matches(&self, record: &OutOfStockRequest) -> bool {
        if let Some(date) = self.date {
            if record.created_at.date_naive() != date {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(customer_id) = self.customer_id {
            if record.customer_id != customer_id {
                return false;
            }
        }
        if let Some(product_id) = self.product_id {
            if record.product_id != product_id {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let in_name = record.product_name.to_lowercase().contains(text.as_str());
            let in_category = record
                .product_category
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(text.as_str()));
            let in_variant = record
                .variant_label
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(text.as_str()));
            if !(in_name || in_category || in_variant) {
                return false;
            }
        }
        true
    }

    /// Canonical cache key for this criteria at a given page index.
    ///
    /// Fields are hashed in declaration order; `None` hashes like any other
    /// value, so criteria with identical fields fingerprint identically
    /// regardless of how they were built.
    pub fn fingerprint(&self, page_index: usize) -> Fingerprint {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash_fields(&mut hasher);
        self.page_size.hash(&mut hasher);
        page_index.hash(&mut hasher);
        Fingerprint(hasher.finish())
    }

    /// Cache key for the status-count aggregate: pagination excluded
    pub fn count_fingerprint(&self) -> Fingerprint {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash_fields(&mut hasher);
        Fingerprint(hasher.finish())
    }

    fn hash_fields<H: Hasher>(&self, hasher: &mut H) {
        self.date.hash(hasher);
        self.status.hash(hasher);
        self.customer_id.hash(hasher);
        self.product_id.hash(hasher);
        self.text.hash(hasher);
    }
}

/// Canonical hash of a criteria + page pair, used as a cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub u64);

/// One page of a filtered view.
///
/// Items are ordered by creation time descending, ties broken by id, so
/// repeated queries over an unchanged store return bit-identical pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub items: Vec<OutOfStockRequest>,
    pub has_more: bool,
    /// When this page was computed; drives TTL evaluation
    pub fetched_at: DateTime<Utc>,
}

impl PageResult {
    pub fn new(items: Vec<OutOfStockRequest>, has_more: bool) -> Self {
        Self {
            items,
            has_more,
            fetched_at: Utc::now(),
        }
    }
}

/// Aggregate counts per lifecycle status for a filtered view
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub counts: HashMap<RequestStatus, usize>,
}

impl StatusCounts {
    pub fn get(&self, status: RequestStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, status: RequestStatus) {
        *self.counts.entry(status).or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn record_named(name: &str) -> OutOfStockRequest {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let actor = Uuid::new_v4();
        OutOfStockRequest {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            variant_id: None,
            product_name: name.to_string(),
            product_category: Some("footwear".to_string()),
            variant_label: Some("39 / black".to_string()),
            requested_quantity: 5,
            returned_quantity: 0,
            status: RequestStatus::Pending,
            created_at: now,
            created_by: actor,
            updated_at: now,
            updated_by: actor,
        }
    }

    #[test]
    fn test_text_normalization_at_construction() {
        let a = FilterCriteria::new().with_text("  Canvas Sneaker ");
        let b = FilterCriteria::new().with_text("canvas sneaker");
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(0), b.fingerprint(0));
    }

    #[test]
    fn test_empty_text_clears_query() {
        let criteria = FilterCriteria::new().with_text("   ");
        assert_eq!(criteria.text(), None);
        assert_eq!(criteria, FilterCriteria::new());
    }

    #[test]
    fn test_fingerprint_field_order_independent_of_construction() {
        let customer = Uuid::new_v4();
        let a = FilterCriteria::new()
            .with_status(RequestStatus::Pending)
            .with_customer(customer);
        let b = FilterCriteria::new()
            .with_customer(customer)
            .with_status(RequestStatus::Pending);
        assert_eq!(a.fingerprint(3), b.fingerprint(3));
    }

    #[test]
    fn test_fingerprint_differs_per_page() {
        let criteria = FilterCriteria::new();
        assert_ne!(criteria.fingerprint(0), criteria.fingerprint(1));
    }

    #[test]
    fn test_count_fingerprint_ignores_pagination() {
        let a = FilterCriteria::new().with_page_size(20);
        let b = FilterCriteria::new().with_page_size(50);
        assert_ne!(a.fingerprint(0), b.fingerprint(0));
        assert_eq!(a.count_fingerprint(), b.count_fingerprint());
    }

    #[test]
    fn test_matches_text_over_name_category_variant() {
        let record = record_named("Canvas Sneaker");

        assert!(FilterCriteria::new().with_text("canvas").matches(&record));
        assert!(FilterCriteria::new().with_text("FOOTWEAR").matches(&record));
        assert!(FilterCriteria::new().with_text("black").matches(&record));
        assert!(!FilterCriteria::new().with_text("jacket").matches(&record));
    }

    #[test]
    fn test_matches_status_and_date() {
        let record = record_named("Canvas Sneaker");

        let same_day = FilterCriteria::new()
            .with_date(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
            .with_status(RequestStatus::Pending);
        assert!(same_day.matches(&record));

        let other_day =
            FilterCriteria::new().with_date(NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());
        assert!(!other_day.matches(&record));

        let completed = FilterCriteria::new().with_status(RequestStatus::Completed);
        assert!(!completed.matches(&record));
    }

    #[test]
    fn test_without_text_keeps_other_fields() {
        let customer = Uuid::new_v4();
        let criteria = FilterCriteria::new()
            .with_customer(customer)
            .with_text("sneaker");
        let cleared = criteria.without_text();
        assert_eq!(cleared.text(), None);
        assert_eq!(cleared.customer_id, Some(customer));
    }

    #[test]
    fn test_status_counts() {
        let mut counts = StatusCounts::default();
        counts.increment(RequestStatus::Pending);
        counts.increment(RequestStatus::Pending);
        counts.increment(RequestStatus::Returned);

        assert_eq!(counts.get(RequestStatus::Pending), 2);
        assert_eq!(counts.get(RequestStatus::Completed), 0);
        assert_eq!(counts.total(), 3);
    }
}
