//! TTL'd cache over filtered view pages and status-count aggregates
//!
//! Page entries are keyed by the criteria+page fingerprint; status counts
//! live in a separate map keyed by the pagination-free fingerprint and
//! carry their own TTL. Invalidation is conservative: any mutation clears
//! everything, because the engine does not track which cached pages a
//! given record could affect. The TTL is a safety net against a missed
//! invalidation, not the primary consistency mechanism.
//!
//! Locks guard only the in-memory maps and are never held across a store
//! round-trip. Entries are replaced whole on refresh, never mutated in
//! place.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::config::EngineConfig;
use crate::core::query::{Fingerprint, PageResult, StatusCounts};

#[derive(Debug, Clone)]
struct PageEntry {
    page: PageResult,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CountsEntry {
    counts: StatusCounts,
    expires_at: DateTime<Utc>,
}

/// Cache over filtered pages and status counts
#[derive(Debug)]
pub struct ViewCache {
    pages: RwLock<HashMap<Fingerprint, PageEntry>>,
    counts: RwLock<HashMap<Fingerprint, CountsEntry>>,
    page_ttl: Duration,
    counts_ttl: Duration,
    /// Bumped on every invalidation; writes stamped with an older value
    /// are dropped instead of resurrecting pre-invalidation data
    generation: AtomicU64,
}

impl ViewCache {
    pub fn new(page_ttl: Duration, counts_ttl: Duration) -> Self {
        Self {
            pages: RwLock::new(HashMap::new()),
            counts: RwLock::new(HashMap::new()),
            page_ttl,
            counts_ttl,
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.page_ttl(), config.counts_ttl())
    }

    /// Current invalidation generation.
    ///
    /// Callers snapshot this before a store round-trip and pass it back to
    /// the `put_*` methods, so a result computed before an invalidation can
    /// never be cached after it.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Cached page, or `None` when absent or expired.
    ///
    /// Expiry is evaluated here, at read time, so a stale entry is never
    /// served even if it was fresh when written.
    pub fn get_page(&self, fingerprint: Fingerprint) -> Option<PageResult> {
        let pages = match self.pages.read() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("page cache lock poisoned, treating as miss");
                return None;
            }
        };
        let entry = pages.get(&fingerprint)?;
        if Utc::now() >= entry.expires_at {
            return None;
        }
        Some(entry.page.clone())
    }

    /// Store a page, overwriting any previous entry.
    ///
    /// `generation` is the value of [`ViewCache::generation`] taken before
    /// the page was computed; if an invalidation ran in between, the entry
    /// is dropped. The check happens under the map write lock, so a stale
    /// insert cannot slip in behind a concurrent `invalidate_all`.
    pub fn put_page(&self, fingerprint: Fingerprint, page: PageResult, generation: u64) {
        let entry = PageEntry {
            page,
            expires_at: Utc::now() + self.page_ttl,
        };
        match self.pages.write() {
            Ok(mut guard) => {
                if self.generation.load(Ordering::SeqCst) != generation {
                    tracing::debug!("dropping page computed before an invalidation");
                    return;
                }
                guard.insert(fingerprint, entry);
            }
            Err(_) => tracing::warn!("page cache lock poisoned, dropping entry"),
        }
    }

    /// Cached status counts, or `None` when absent or expired
    pub fn get_counts(&self, fingerprint: Fingerprint) -> Option<StatusCounts> {
        let counts = match self.counts.read() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("count cache lock poisoned, treating as miss");
                return None;
            }
        };
        let entry = counts.get(&fingerprint)?;
        if Utc::now() >= entry.expires_at {
            return None;
        }
        Some(entry.counts.clone())
    }

    /// Store counts; stale generations are dropped, as with `put_page`
    pub fn put_counts(&self, fingerprint: Fingerprint, counts: StatusCounts, generation: u64) {
        let entry = CountsEntry {
            counts,
            expires_at: Utc::now() + self.counts_ttl,
        };
        match self.counts.write() {
            Ok(mut guard) => {
                if self.generation.load(Ordering::SeqCst) != generation {
                    tracing::debug!("dropping counts computed before an invalidation");
                    return;
                }
                guard.insert(fingerprint, entry);
            }
            Err(_) => tracing::warn!("count cache lock poisoned, dropping entry"),
        }
    }

    /// Clear every entry, pages and counts.
    ///
    /// Invoked after any mutation that could change membership or ordering
    /// of any filtered view. The generation bump happens before the maps
    /// are cleared: an in-flight writer either inserts first and is cleared
    /// here, or checks the generation afterwards and drops its entry. Once
    /// this returns, no reader observes an entry computed before the call.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut pages) = self.pages.write() {
            pages.clear();
        }
        if let Ok(mut counts) = self.counts.write() {
            counts.clear();
        }
    }

    /// Clear only the status-count aggregates
    pub fn invalidate_status_counts(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut counts) = self.counts.write() {
            counts.clear();
        }
    }

    /// Number of live page entries (expired entries included until replaced)
    pub fn page_entry_count(&self) -> usize {
        self.pages.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn counts_entry_count(&self) -> usize {
        self.counts.read().map(|g| g.len()).unwrap_or(0)
    }
}
