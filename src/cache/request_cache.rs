//! Request Cache Module
//!
//! Public cache API: a fresh-entry lookup, then either joining the fetch
//! already in flight for the key or starting one, all under one lock.

use std::fmt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::cache::{CacheStats, Clock, EntryStore, InFlightTable, SharedFetch, SystemClock};
use crate::error::{CacheError, Result};

struct Inner<V> {
    store: EntryStore<V>,
    inflight: InFlightTable<V>,
}

// == Request Cache ==
/// Response cache with TTL staleness, oldest-first eviction and coalescing of
/// concurrent fetches for the same key.
///
/// Cloning is cheap and yields a handle to the same cache. The entry store and
/// the in-flight table live behind one mutex that is never held across an
/// `.await`, so checking for a pending fetch and registering a new one is a
/// single atomic step.
pub struct RequestCache<V> {
    inner: Arc<Mutex<Inner<V>>>,
}

impl<V> Clone for RequestCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for RequestCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCache").finish_non_exhaustive()
    }
}

impl<V> RequestCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache on the system clock.
    ///
    /// Fails with `InvalidCapacity` when `max_size` is zero.
    pub fn new(max_size: usize, default_ttl: Duration) -> Result<Self> {
        Self::with_clock(max_size, default_ttl, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`.
    pub fn with_clock(
        max_size: usize,
        default_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let store = EntryStore::new(max_size, default_ttl, clock)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                store,
                inflight: InFlightTable::new(),
            })),
        })
    }

    // == Fetch Cached ==
    /// Returns the fresh cached value for `key`, or fetches it.
    ///
    /// If a fetch for `key` is already in flight the caller waits for it
    /// instead of calling `fetcher`, so N concurrent callers cause exactly one
    /// fetch and all of them receive the same value or the same error.
    /// A successful value is stored with `ttl`; an error is never stored.
    ///
    /// # Errors
    /// - `InvalidKey` for an empty key
    /// - `Fetch` when the fetch this caller started or joined failed
    pub async fn fetch_cached<F, Fut>(
        &self,
        key: impl Into<String>,
        ttl: Duration,
        fetcher: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let key = key.into();
        if key.is_empty() {
            return Err(CacheError::InvalidKey);
        }

        let fetch = {
            let mut inner = self.lock();
            if let Some(value) = inner.store.get(&key) {
                debug!(key = %key, "cache hit");
                return Ok(value);
            }

            match inner.inflight.join(&key) {
                Some(fetch) => {
                    inner.store.counters_mut().record_coalesced();
                    debug!(key = %key, "joined in-flight fetch");
                    fetch
                }
                None => {
                    let id = inner.inflight.allocate_id();
                    let fetch = self.start_fetch(key.clone(), id, ttl, fetcher);
                    inner.inflight.register(key.clone(), id, fetch.clone());
                    debug!(key = %key, "cache miss, fetching");
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Builds the shared fetch for `key`. The fetcher runs on first poll,
    /// outside the lock. A panicking fetcher settles as a `Fetch` error.
    fn start_fetch<F, Fut>(&self, key: String, id: u64, ttl: Duration, fetcher: F) -> SharedFetch<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        async move {
            let outcome = AssertUnwindSafe(async move { fetcher().await })
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(anyhow::anyhow!("fetcher panicked: {}", panic_message(&*panic)))
                });
            settle(&inner, key, id, ttl, outcome)
        }
        .boxed()
        .shared()
    }

    // == Get ==
    /// Returns the value for `key` if a fresh entry exists.
    pub fn get(&self, key: &str) -> Option<V> {
        self.lock().store.get(key)
    }

    // == Set ==
    /// Stores `value` under `key`, using the default TTL when `ttl` is None.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> Result<()> {
        self.lock().store.set(key.into(), value, ttl)
    }

    // == Contains ==
    pub fn contains(&self, key: &str) -> bool {
        self.lock().store.contains(key)
    }

    // == Delete ==
    /// Removes one entry. A fetch in flight for `key` will not store its result.
    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.lock();
        inner.inflight.mark_uncacheable(|k| k == key);
        inner.store.delete(key)
    }

    // == Invalidate ==
    /// Removes every entry whose key starts with `prefix`.
    ///
    /// Fetches already in flight under the prefix still answer their waiters
    /// but their results are not stored. Returns the number of entries removed.
    pub fn invalidate(&self, prefix: &str) -> usize {
        self.invalidate_where(|key| key.starts_with(prefix))
    }

    // == Invalidate Where ==
    /// Removes every entry whose key matches `predicate`.
    pub fn invalidate_where<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&str) -> bool,
    {
        let mut inner = self.lock();
        inner.inflight.mark_uncacheable(&mut predicate);
        let removed = inner.store.invalidate_where(predicate);
        debug!(removed, "invalidated cache entries");
        removed
    }

    // == Clear ==
    /// Removes all entries. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        inner.inflight.mark_uncacheable(|_| true);
        inner.store.clear()
    }

    // == Purge Expired ==
    /// Drops stale entries so they stop occupying capacity.
    pub fn purge_expired(&self) -> usize {
        self.lock().store.purge_expired()
    }

    // == Stats ==
    /// Returns a snapshot of the cache.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let mut stats = inner.store.stats();
        stats.pending = inner.inflight.len();
        stats
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().store.is_empty()
    }

    pub fn default_ttl(&self) -> Duration {
        self.lock().store.default_ttl()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        lock_inner(&self.inner)
    }
}

/// Records the outcome of fetch `id` and hands it back for every waiter.
fn settle<V: Clone>(
    inner: &Mutex<Inner<V>>,
    key: String,
    id: u64,
    ttl: Duration,
    outcome: anyhow::Result<V>,
) -> Result<V> {
    let mut inner = lock_inner(inner);
    let cacheable = inner.inflight.complete(&key, id);

    match outcome {
        Ok(value) => {
            if cacheable {
                inner.store.set(key, value.clone(), Some(ttl))?;
            } else {
                debug!(key = %key, "discarding result invalidated while in flight");
            }
            Ok(value)
        }
        Err(cause) => {
            inner.store.counters_mut().record_fetch_failure();
            warn!(key = %key, error = %format!("{cause:#}"), "fetch failed");
            Err(CacheError::Fetch {
                key,
                cause: Arc::new(cause),
            })
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

// A panic while holding the lock leaves the maps consistent: every mutation
// is a single map operation, so the poisoned state is still usable.
fn lock_inner<V>(inner: &Mutex<Inner<V>>) -> MutexGuard<'_, Inner<V>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
