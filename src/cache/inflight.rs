//! In-Flight Table Module
//!
//! Tracks fetches that have started but not settled, so concurrent callers
//! for the same key can share one outbound call.

use std::collections::HashMap;
use std::fmt;

use futures::future::{BoxFuture, Shared};

use crate::error::Result;

/// A fetch that any number of callers can await; all of them see one outcome.
pub type SharedFetch<V> = Shared<BoxFuture<'static, Result<V>>>;

struct PendingFetch<V> {
    id: u64,
    fetch: SharedFetch<V>,
    /// Cleared when the key is invalidated mid-flight
    cacheable: bool,
}

// == In-Flight Table ==
/// At most one pending fetch per key.
pub struct InFlightTable<V> {
    pending: HashMap<String, PendingFetch<V>>,
    next_id: u64,
}

impl<V: Clone> InFlightTable<V> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            next_id: 0,
        }
    }

    // == Join ==
    /// Returns the pending fetch for `key`, if one is in flight.
    pub fn join(&self, key: &str) -> Option<SharedFetch<V>> {
        self.pending.get(key).map(|p| p.fetch.clone())
    }

    // == Allocate Id ==
    /// Hands out the id the next registered fetch will settle with.
    pub fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // == Register ==
    /// Records `fetch` as the pending fetch for `key`.
    ///
    /// Callers must check `join` first, under the same lock, so that a key
    /// never carries two pending fetches.
    pub fn register(&mut self, key: String, id: u64, fetch: SharedFetch<V>) {
        debug_assert!(!self.pending.contains_key(&key), "key already in flight");
        self.pending.insert(
            key,
            PendingFetch {
                id,
                fetch,
                cacheable: true,
            },
        );
    }

    // == Complete ==
    /// Removes the pending marker for a settled fetch.
    ///
    /// Returns whether the fetch's result may be stored: false if the key was
    /// invalidated while the fetch was in flight, or if the marker no longer
    /// belongs to fetch `id`.
    pub fn complete(&mut self, key: &str, id: u64) -> bool {
        match self.pending.get(key) {
            Some(p) if p.id == id => self.pending.remove(key).is_some_and(|p| p.cacheable),
            _ => false,
        }
    }

    // == Mark Uncacheable ==
    /// Flags every pending fetch whose key matches `predicate` so its result
    /// is handed to waiters but not stored. Returns how many were flagged.
    pub fn mark_uncacheable<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let mut flagged = 0;
        for (key, pending) in self.pending.iter_mut() {
            if pending.cacheable && predicate(key.as_str()) {
                pending.cacheable = false;
                flagged += 1;
            }
        }
        flagged
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<V: Clone> Default for InFlightTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for InFlightTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightTable")
            .field("pending", &self.pending.keys().collect::<Vec<_>>())
            .field("next_id", &self.next_id)
            .finish()
    }
}
