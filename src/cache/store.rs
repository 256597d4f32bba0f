//! Entry Store Module
//!
//! Bounded key→entry map with TTL staleness and oldest-first eviction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, Clock, Counters, EntryStats, InsertionOrder};
use crate::error::{CacheError, Result};

// == Entry Store ==
/// Bounded storage for cached responses.
///
/// Staleness only gates what `get` returns; a stale entry keeps its slot
/// until it is overwritten, evicted, invalidated or purged.
#[derive(Debug)]
pub struct EntryStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Write order, oldest first
    order: InsertionOrder,
    counters: Counters,
    /// Maximum number of entries allowed
    max_size: usize,
    /// TTL applied when `set` is called without one
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> EntryStore<V> {
    // == Constructor ==
    /// Creates a new EntryStore.
    ///
    /// # Arguments
    /// * `max_size` - Maximum number of entries, must be at least 1
    /// * `default_ttl` - TTL for entries stored without an explicit one
    /// * `clock` - Time source for timestamps and staleness checks
    pub fn new(max_size: usize, default_ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        if max_size == 0 {
            return Err(CacheError::InvalidCapacity(max_size));
        }

        Ok(Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            counters: Counters::default(),
            max_size,
            default_ttl,
            clock,
        })
    }

    // == Get ==
    /// Retrieves a fresh value by key.
    ///
    /// Missing and stale entries both report `None` and count as misses.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        match self.entries.get(key) {
            Some(entry) if !entry.is_stale(now) => {
                self.counters.record_hit();
                Some(entry.value.clone())
            }
            _ => {
                self.counters.record_miss();
                None
            }
        }
    }

    // == Contains ==
    /// Returns true if a fresh entry exists for `key`. Does not touch counters.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_stale(now))
    }

    // == Set ==
    /// Stores a value, overwriting any previous entry for the key.
    ///
    /// If the key is new and the store is full, the oldest entry is evicted
    /// first. An overwrite resets the entry's timestamp and makes it the newest.
    ///
    /// # Arguments
    /// * `key` - The key to store, must not be empty
    /// * `value` - The value to store
    /// * `ttl` - Freshness window (uses default_ttl if None)
    pub fn set(&mut self, key: String, value: V, ttl: Option<Duration>) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }

        let is_overwrite = self.entries.contains_key(&key);

        if !is_overwrite && self.entries.len() >= self.max_size {
            if let Some(evicted) = self.order.pop_oldest() {
                self.entries.remove(&evicted);
                self.counters.record_eviction();
                debug!(key = %evicted, "evicted oldest cache entry");
            }
        }

        let entry = CacheEntry::new(
            value,
            self.clock.now_ms(),
            ttl.unwrap_or(self.default_ttl),
        );
        self.order.record(&key);
        self.entries.insert(key, entry);

        Ok(())
    }

    // == Delete ==
    /// Removes an entry by key. Returns true if it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.remove(key);
            true
        } else {
            false
        }
    }

    // == Invalidate ==
    /// Removes every entry whose key starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&mut self, prefix: &str) -> usize {
        self.invalidate_where(|key| key.starts_with(prefix))
    }

    // == Invalidate Where ==
    /// Removes every entry whose key matches `predicate`.
    pub fn invalidate_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        self.remove_matching(|key, _| predicate(key))
    }

    // == Clear ==
    /// Removes all entries. Returns how many there were.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.order.clear();
        removed
    }

    // == Purge Expired ==
    /// Removes all stale entries from the store.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        self.remove_matching(|_, entry| entry.is_stale(now))
    }

    fn remove_matching<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&str, &CacheEntry<V>) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|key, entry| !predicate(key.as_str(), &*entry));
        let entries = &self.entries;
        self.order.retain(|key| entries.contains_key(key));
        before - self.entries.len()
    }

    // == Stats ==
    /// Returns a snapshot of occupancy, per-entry ages and counters.
    ///
    /// Entries are listed oldest first. `pending` is left at zero; the
    /// in-flight table fills it in.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_ms();
        let entries: Vec<EntryStats> = self
            .order
            .iter()
            .filter_map(|key| {
                self.entries.get(key).map(|entry| EntryStats {
                    key: key.to_string(),
                    age_ms: entry.age_ms(now),
                    ttl_ms: entry.ttl_ms,
                })
            })
            .collect();
        let expired = self
            .entries
            .values()
            .filter(|entry| entry.is_stale(now))
            .count();

        CacheStats {
            size: self.entries.len(),
            max_size: self.max_size,
            pending: 0,
            expired,
            counters: self.counters,
            entries,
        }
    }

    /// Mutable access to the counters, for the in-flight table's bookkeeping.
    pub(crate) fn counters_mut(&mut self) -> &mut Counters {
        &mut self.counters
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Length ==
    /// Returns the current number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
