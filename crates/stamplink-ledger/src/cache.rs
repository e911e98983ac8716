//! Single-flight read cache with stale-while-revalidate.
//!
//! Concurrent reads of the same logical key share one in-flight fetch. A read
//! that finds an expired entry gets the stale value back immediately while a
//! background fetch refreshes it.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

type Flight<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

struct Inner<K, V, E> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    pending: Mutex<HashMap<K, (u64, Flight<V, E>)>>,
    fetches: AtomicUsize,
    next_flight: AtomicU64,
}

/// Result of a stale-while-revalidate read.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<V> {
    /// Cached value, or the caller's default on a cold cache.
    pub value: V,
    /// True if `value` is older than the TTL or is the default.
    pub is_stale: bool,
}

/// Keyed cache that collapses concurrent fetches.
///
/// Errors are never cached. Fetches run on spawned tasks, so a flight
/// completes and updates the cache even if every caller stops waiting.
/// Methods that start a fetch must be called inside a Tokio runtime.
pub struct SingleFlightCache<K, V, E> {
    inner: Arc<Inner<K, V, E>>,
}

impl<K, V, E> Clone for SingleFlightCache<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, E> Default for SingleFlightCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, E> SingleFlightCache<K, V, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
                fetches: AtomicUsize::new(0),
                next_flight: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the cached value without fetching.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.entries.lock().get(key).map(|e| e.value.clone())
    }

    /// Stores `value` as freshly fetched.
    pub fn prime(&self, key: K, value: V) {
        self.inner.entries.lock().insert(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drops the cached entry and forgets any in-flight fetch for `key`.
    ///
    /// A flight that was already running when this is called does not write
    /// its result back.
    pub fn invalidate(&self, key: &K) {
        // Pending first: a flight writes back only while it is still registered.
        self.inner.pending.lock().remove(key);
        self.inner.entries.lock().remove(key);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Number of fetches actually started.
    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    /// Returns whether a fetch for `key` is in flight.
    pub fn is_pending(&self, key: &K) -> bool {
        self.inner.pending.lock().contains_key(key)
    }

    /// Fetches `key`, joining the in-flight fetch if there is one.
    ///
    /// `fetch` is only invoked when no flight for `key` is running. A
    /// successful result replaces the cached entry.
    pub async fn fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.join_or_start(key, fetch, true).await
    }

    /// Like [`fetch`](Self::fetch), but the result is only handed to the
    /// waiters and never stored.
    pub async fn share<F, Fut>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.join_or_start(key, fetch, false).await
    }

    /// Stale-while-revalidate read.
    ///
    /// A fresh entry is returned as is. An expired entry is returned with
    /// `is_stale` set and a background refresh is started. On a cold cache
    /// `default` is returned, also marked stale, while the first fetch runs.
    pub fn get<F, Fut>(&self, key: K, ttl: Duration, default: V, fetch: F) -> Lookup<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let cached = self
            .inner
            .entries
            .lock()
            .get(&key)
            .map(|e| (e.value.clone(), e.fetched_at.elapsed() < ttl));

        match cached {
            Some((value, true)) => Lookup {
                value,
                is_stale: false,
            },
            Some((value, false)) => {
                trace!("serving stale entry, revalidating");
                drop(self.join_or_start(key, fetch, true));
                Lookup {
                    value,
                    is_stale: true,
                }
            }
            None => {
                drop(self.join_or_start(key, fetch, true));
                Lookup {
                    value: default,
                    is_stale: true,
                }
            }
        }
    }

    fn join_or_start<F, Fut>(&self, key: K, fetch: F, store: bool) -> Flight<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let mut pending = self.inner.pending.lock();
        if let Some((_, flight)) = pending.get(&key) {
            trace!("joining in-flight fetch");
            return flight.clone();
        }

        self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        let flight_id = self.inner.next_flight.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let flight_key = key.clone();
        let work = fetch();

        let flight: Flight<V, E> = async move {
            let result = work.await;
            let mut pending = inner.pending.lock();
            if !matches!(pending.get(&flight_key), Some((id, _)) if *id == flight_id) {
                trace!("flight was invalidated, result not stored");
                return result;
            }
            pending.remove(&flight_key);
            if let (true, Ok(value)) = (store, &result) {
                inner.entries.lock().insert(
                    flight_key,
                    Entry {
                        value: value.clone(),
                        fetched_at: Instant::now(),
                    },
                );
            }
            result
        }
        .boxed()
        .shared();

        pending.insert(key, (flight_id, flight.clone()));
        drop(pending);

        let driver = flight.clone();
        tokio::spawn(async move {
            let _ = driver.await;
        });
        flight
    }
}
