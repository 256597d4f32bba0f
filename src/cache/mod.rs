//! Cache Module
//!
//! Request cache with TTL staleness, oldest-first eviction and coalescing of
//! concurrent fetches for the same key.

mod clock;
mod entry;
mod fingerprint;
mod inflight;
mod order;
mod request_cache;
mod stats;
mod store;


// Re-export public types
pub use clock::{duration_ms, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use fingerprint::{cache_key, fingerprint, namespace_of};
pub use inflight::{InFlightTable, SharedFetch};
pub use order::InsertionOrder;
pub use request_cache::RequestCache;
pub use stats::{CacheStats, Counters, EntryStats};
pub use store::EntryStore;

// == Public Constants ==
/// Default freshness window for cached responses (5 minutes)
pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;
