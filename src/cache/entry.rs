//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and their staleness policy.

use std::time::Duration;

use super::clock::duration_ms;

// == Cache Entry ==
/// A cached response together with the time it was stored and its TTL.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached payload
    pub value: V,
    /// Insertion timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Time to live in milliseconds
    pub ttl_ms: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stored at `stored_at`.
    ///
    /// # Arguments
    /// * `value` - The payload to cache
    /// * `stored_at` - Insertion time in Unix milliseconds
    /// * `ttl` - How long the entry stays fresh
    pub fn new(value: V, stored_at: u64, ttl: Duration) -> Self {
        Self {
            value,
            stored_at,
            ttl_ms: duration_ms(ttl),
        }
    }

    // == Age ==
    /// Milliseconds elapsed since the entry was stored.
    ///
    /// A clock that moved backwards reports an age of zero.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.stored_at)
    }

    // == Is Stale ==
    /// Checks whether the entry has outlived its TTL.
    ///
    /// Boundary condition: an entry whose age equals its TTL is still fresh.
    /// It turns stale only once `now - stored_at > ttl`.
    pub fn is_stale(&self, now: u64) -> bool {
        self.age_ms(now) > self.ttl_ms
    }
}
