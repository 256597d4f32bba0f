//! Insertion Order Module
//!
//! Tracks the order keys were stored in, for oldest-first eviction.

use std::collections::{BTreeMap, HashMap};

// == Insertion Order ==
/// Tracks keys by the time they were last written.
///
/// Every write takes the next sequence number, so the smallest sequence is
/// the oldest write. `record`, `remove` and `pop_oldest` are O(log n).
///
/// Reads never reorder keys; only `record` (a write) does.
#[derive(Debug, Default)]
pub struct InsertionOrder {
    /// Sequence number -> key, oldest first
    by_seq: BTreeMap<u64, String>,
    /// Key -> its current sequence number
    seq_of: HashMap<String, u64>,
    next_seq: u64,
}

impl InsertionOrder {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record ==
    /// Marks a key as just written (moves it to the newest position).
    pub fn record(&mut self, key: &str) {
        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some(old) = self.seq_of.insert(key.to_string(), seq) {
            self.by_seq.remove(&old);
        }
        self.by_seq.insert(seq, key.to_string());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        if let Some(seq) = self.seq_of.remove(key) {
            self.by_seq.remove(&seq);
        }
    }

    // == Pop Oldest ==
    /// Returns and removes the oldest key.
    ///
    /// Returns None if tracker is empty.
    pub fn pop_oldest(&mut self) -> Option<String> {
        let (_, key) = self.by_seq.pop_first()?;
        self.seq_of.remove(&key);
        Some(key)
    }

    // == Retain ==
    /// Keeps only the keys for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        let seq_of = &mut self.seq_of;
        self.by_seq.retain(|_, key| {
            let kept = keep(key.as_str());
            if !kept {
                seq_of.remove(key.as_str());
            }
            kept
        });
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.by_seq.clear();
        self.seq_of.clear();
    }

    // == Iter ==
    /// Iterates keys from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.by_seq.values().map(String::as_str)
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.by_seq.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.by_seq.is_empty()
    }
}
