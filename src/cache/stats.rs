//! Cache Statistics Module
//!
//! Point-in-time snapshot of the cache: occupancy, per-entry ages and
//! hit/miss/eviction/coalescing counters.

use serde::Serialize;

// == Entry Stats ==
/// Introspection record for a single stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryStats {
    pub key: String,
    /// Milliseconds since the entry was stored, computed at snapshot time
    pub age_ms: u64,
    pub ttl_ms: u64,
}

// == Counters ==
/// Running counters kept by the entry store and in-flight table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Reads answered from a fresh entry
    pub hits: u64,
    /// Reads that found nothing or only a stale entry
    pub misses: u64,
    /// Entries dropped to make room for a new key
    pub evictions: u64,
    /// Callers that joined a fetch already in flight
    pub coalesced: u64,
    /// Fetches that settled with an error
    pub fetch_failures: u64,
}

// == Cache Stats ==
/// Snapshot returned by `stats()`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of stored entries, stale ones included
    pub size: usize,
    pub max_size: usize,
    /// Fetches currently in flight
    pub pending: usize,
    /// Stored entries that are already stale
    pub expired: usize,
    #[serde(flatten)]
    pub counters: Counters,
    /// Stored entries, oldest first
    pub entries: Vec<EntryStats>,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.counters.hits + self.counters.misses;
        if total == 0 {
            0.0
        } else {
            self.counters.hits as f64 / total as f64
        }
    }
}

impl Counters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    pub fn record_fetch_failure(&mut self) {
        self.fetch_failures += 1;
    }
}
