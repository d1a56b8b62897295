//! Tile resolution: disk cache, then in-flight fetch, then upstream.
//!
//! # Flow
//!
//! ```text
//! resolve(key)
//!   │
//!   ├─ store.read(key) ── hit ──────────────────────────────► bytes
//!   │
//!   └─ miss ─► registry.get_or_create(key)
//!                 │
//!                 ├─ created ─► spawn fill task ─┐
//!                 │                              │
//!                 └─ attached ───────────────────┤
//!                                                ▼
//!                                   subscription.wait() ────► bytes | NotFound
//!
//! fill task: re-check store → fetch → write-through → registry.complete
//! ```
//!
//! # Ordering
//!
//! The fill task writes the tile to disk before it removes the registry entry,
//! and removes the entry before it settles the future. A request that finds
//! neither an entry nor a file can therefore only arrive after a failed fetch,
//! never in a window where a successful fetch is not yet persisted.
//!
//! The fill task is detached from the request that started it. If that
//! request is dropped (client disconnect), the fetch and the write-through
//! still complete for everyone else.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::stats::{ResolverCounters, ResolverStats};
use crate::cache::TileStore;
use crate::coalesce::{BroadcastFuture, CoalescingRegistry, TileOutcome, WaitError};
use crate::coord::TileKey;
use crate::provider::{FetchError, TileFetcher};

/// The only error a resolution surfaces to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No tile is available for this key.
    #[error("Tile {key} not found: {source}")]
    NotFound { key: TileKey, source: FetchError },
}

/// Resolves tile keys to payloads through the disk cache and the upstream.
///
/// Cloning is cheap and shares the store, fetcher, registry and counters.
pub struct TileResolver<S, F> {
    store: Arc<S>,
    fetcher: Arc<F>,
    registry: Arc<CoalescingRegistry>,
    counters: Arc<ResolverCounters>,
}

impl<S, F> Clone for TileResolver<S, F> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            fetcher: Arc::clone(&self.fetcher),
            registry: Arc::clone(&self.registry),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<S, F> TileResolver<S, F>
where
    S: TileStore + 'static,
    F: TileFetcher + 'static,
{
    /// Creates a resolver with its own empty registry.
    pub fn new(store: S, fetcher: F) -> Self {
        Self::with_registry(
            Arc::new(store),
            Arc::new(fetcher),
            Arc::new(CoalescingRegistry::new()),
        )
    }

    /// Creates a resolver from shared components.
    pub fn with_registry(store: Arc<S>, fetcher: Arc<F>, registry: Arc<CoalescingRegistry>) -> Self {
        Self {
            store,
            fetcher,
            registry,
            counters: Arc::new(ResolverCounters::default()),
        }
    }

    /// Resolves `key` to its payload.
    ///
    /// Serves from disk when possible, otherwise attaches to (or starts) the
    /// single upstream fetch for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] if the upstream fetch failed.
    /// Storage errors are logged and never returned.
    #[instrument(level = "debug", skip_all, fields(tile = %key))]
    pub async fn resolve(&self, key: TileKey) -> Result<Bytes, ResolveError> {
        self.counters.request();

        if let Some(data) = read_cached(self.store.as_ref(), &key).await {
            self.counters.disk_hit();
            return Ok(data);
        }

        let subscription = {
            let (future, created) = self.registry.get_or_create(key);
            let subscription = future.subscribe();
            if created {
                self.spawn_fill(key, future);
            }
            subscription
        };

        match subscription.wait().await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(source)) => Err(ResolveError::NotFound { key, source }),
            Err(WaitError::Abandoned) => Err(ResolveError::NotFound {
                key,
                source: FetchError::Abandoned,
            }),
        }
    }

    /// Spawns the detached task that produces the outcome for `key`.
    fn spawn_fill(&self, key: TileKey, future: BroadcastFuture<TileOutcome>) {
        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        let counters = Arc::clone(&self.counters);
        let guard = FillGuard::new(Arc::clone(&self.registry), key, future);

        tokio::spawn(async move {
            let outcome = fill(store.as_ref(), fetcher.as_ref(), &counters, &key).await;
            guard.complete(outcome);
        });
    }

    /// The in-flight registry.
    pub fn registry(&self) -> &Arc<CoalescingRegistry> {
        &self.registry
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Number of fetches currently outstanding.
    pub fn in_flight_count(&self) -> usize {
        self.registry.in_flight_count()
    }

    /// Returns a snapshot of the resolver counters.
    pub fn stats(&self) -> ResolverStats {
        self.counters.snapshot()
    }

    /// Logs resolver and coalescing statistics.
    pub fn log_stats(&self) {
        let stats = self.stats();
        tracing::info!(
            requests = stats.requests,
            disk_hits = stats.disk_hits,
            fetches = stats.fetches,
            fetch_failures = stats.fetch_failures,
            write_failures = stats.write_failures,
            hit_ratio = format!("{:.1}%", stats.hit_ratio() * 100.0),
            "Tile resolver statistics"
        );
        self.registry.log_stats();
    }
}

/// Reads `key` from the store, treating read errors as a miss.
async fn read_cached<S: TileStore>(store: &S, key: &TileKey) -> Option<Bytes> {
    match store.read(key).await {
        Ok(data) => data,
        Err(e) => {
            warn!(tile = %key, error = %e, "Disk cache read failed; falling back to upstream");
            None
        }
    }
}

/// Body of the fill task: everything up to, not including, settlement.
async fn fill<S: TileStore, F: TileFetcher>(
    store: &S,
    fetcher: &F,
    counters: &ResolverCounters,
    key: &TileKey,
) -> TileOutcome {
    // A previous fill may have persisted and deregistered between our read and registration
    if let Some(data) = read_cached(store, key).await {
        counters.disk_hit();
        debug!(tile = %key, "Tile appeared on disk before fetch");
        return Ok(data);
    }

    counters.fetch_started();
    match fetcher.fetch(key).await {
        Ok(data) => {
            if let Err(e) = store.write(key, data.clone()).await {
                counters.write_failed();
                warn!(tile = %key, error = %e, "Failed to cache tile; serving it anyway");
            }
            Ok(data)
        }
        Err(e) => {
            counters.fetch_failed();
            debug!(tile = %key, error = %e, "Upstream fetch failed");
            Err(e)
        }
    }
}

/// Guarantees that a registered fetch is always settled and deregistered.
///
/// If the fill task unwinds or is dropped by a shutting-down runtime before
/// calling [`complete`](Self::complete), waiters are failed with
/// [`FetchError::Abandoned`] instead of waiting forever.
struct FillGuard {
    registry: Arc<CoalescingRegistry>,
    key: TileKey,
    future: Option<BroadcastFuture<TileOutcome>>,
}

impl FillGuard {
    fn new(
        registry: Arc<CoalescingRegistry>,
        key: TileKey,
        future: BroadcastFuture<TileOutcome>,
    ) -> Self {
        Self {
            registry,
            key,
            future: Some(future),
        }
    }

    fn complete(mut self, outcome: TileOutcome) {
        if let Some(future) = self.future.take() {
            // Only fails if already settled, which the guard rules out
            let _ = self.registry.complete(&self.key, &future, outcome);
        }
    }
}

impl Drop for FillGuard {
    fn drop(&mut self) {
        if let Some(future) = self.future.take() {
            warn!(tile = %self.key, "Fill task ended without an outcome");
            let _ = self
                .registry
                .complete(&self.key, &future, Err(FetchError::Abandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheError;
    use std::collections::HashMap;
    use std::io;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// In-memory store with switchable failures.
    #[derive(Default)]
    struct MemoryStore {
        tiles: Mutex<HashMap<TileKey, Bytes>>,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl MemoryStore {
        fn with_tile(key: TileKey, data: &'static [u8]) -> Self {
            let store = Self::default();
            store
                .tiles
                .lock()
                .unwrap()
                .insert(key, Bytes::from_static(data));
            store
        }

        fn get(&self, key: &TileKey) -> Option<Bytes> {
            self.tiles.lock().unwrap().get(key).cloned()
        }
    }

    impl TileStore for MemoryStore {
        async fn read(&self, key: &TileKey) -> Result<Option<Bytes>, CacheError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(CacheError::Read {
                    path: PathBuf::from(key.to_string()),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
                });
            }
            Ok(self.get(key))
        }

        async fn write(&self, key: &TileKey, data: Bytes) -> Result<(), CacheError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(CacheError::Write {
                    path: PathBuf::from(key.to_string()),
                    source: io::Error::new(io::ErrorKind::Other, "disk full"),
                });
            }
            self.tiles.lock().unwrap().insert(*key, data);
            Ok(())
        }
    }

    /// Fetcher returning a fixed payload after a delay, counting invocations.
    struct CountingFetcher {
        calls: AtomicUsize,
        delay: Duration,
        response: Result<Bytes, FetchError>,
    }

    impl CountingFetcher {
        fn ok(data: &'static [u8]) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(20),
                response: Ok(Bytes::from_static(data)),
            }
        }

        fn failing(error: FetchError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(20),
                response: Err(error),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TileFetcher for CountingFetcher {
        async fn fetch(&self, _key: &TileKey) -> Result<Bytes, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.response.clone()
        }
    }

    fn resolver<F: TileFetcher + 'static>(
        store: MemoryStore,
        fetcher: F,
    ) -> (TileResolver<MemoryStore, F>, Arc<MemoryStore>, Arc<F>) {
        let store = Arc::new(store);
        let fetcher = Arc::new(fetcher);
        let resolver = TileResolver::with_registry(
            Arc::clone(&store),
            Arc::clone(&fetcher),
            Arc::new(CoalescingRegistry::new()),
        );
        (resolver, store, fetcher)
    }

    #[tokio::test]
    async fn test_cache_hit_skips_registry_and_fetcher() {
        let key = TileKey::new(1, 1, 1);
        let (resolver, _store, fetcher) =
            resolver(MemoryStore::with_tile(key, b"cached"), CountingFetcher::ok(b"web"));

        let data = resolver.resolve(key).await.unwrap();

        assert_eq!(data, Bytes::from_static(b"cached"));
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(resolver.registry().stats().total_requests, 0);
        assert_eq!(resolver.stats().disk_hits, 1);
    }

    #[tokio::test]
    async fn test_miss_fetches_and_writes_through() {
        let key = TileKey::new(3, 4, 1);
        let (resolver, store, fetcher) =
            resolver(MemoryStore::default(), CountingFetcher::ok(b"fresh"));

        let data = resolver.resolve(key).await.unwrap();

        assert_eq!(data, Bytes::from_static(b"fresh"));
        assert_eq!(store.get(&key), Some(Bytes::from_static(b"fresh")));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(resolver.in_flight_count(), 0);

        // Second call is served from the store
        resolver.resolve(key).await.unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_share_one_fetch() {
        let key = TileKey::new(12, 1, 1);
        let (resolver, _store, fetcher) =
            resolver(MemoryStore::default(), CountingFetcher::ok(b"shared"));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let r = resolver.clone();
                tokio::spawn(async move { r.resolve(key).await })
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            assert_eq!(result.unwrap(), Ok(Bytes::from_static(b"shared")));
        }
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(resolver.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_found_and_not_cached() {
        let key = TileKey::new(9, 9, 9);
        let error = FetchError::Status {
            status: 404,
            url: "https://tiles.example/9/9/9.png".to_string(),
        };
        let (resolver, store, _fetcher) =
            resolver(MemoryStore::default(), CountingFetcher::failing(error.clone()));

        let result = resolver.resolve(key).await;

        assert_eq!(result, Err(ResolveError::NotFound { key, source: error }));
        assert!(store.get(&key).is_none());
        assert_eq!(resolver.stats().fetch_failures, 1);
        assert_eq!(resolver.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_still_returns_payload() {
        let key = TileKey::new(5, 5, 5);
        let store = MemoryStore::default();
        store.fail_writes.store(true, Ordering::SeqCst);
        let (resolver, store, _fetcher) = resolver(store, CountingFetcher::ok(b"unsaved"));

        let data = resolver.resolve(key).await.unwrap();

        assert_eq!(data, Bytes::from_static(b"unsaved"));
        assert!(store.get(&key).is_none());
        assert_eq!(resolver.stats().write_failures, 1);
    }

    #[tokio::test]
    async fn test_read_failure_degrades_to_fetch() {
        let key = TileKey::new(6, 1, 2);
        let store = MemoryStore::with_tile(key, b"unreadable");
        store.fail_reads.store(true, Ordering::SeqCst);
        let (resolver, _store, fetcher) = resolver(store, CountingFetcher::ok(b"refetched"));

        let data = resolver.resolve(key).await.unwrap();

        assert_eq!(data, Bytes::from_static(b"refetched"));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_fill_rechecks_disk_before_fetching() {
        let key = TileKey::new(7, 7, 7);
        let (resolver, store, fetcher) =
            resolver(MemoryStore::default(), CountingFetcher::ok(b"web"));

        // Simulate a fill that completed after this caller's read but before registration
        let future = {
            let (future, created) = resolver.registry().get_or_create(key);
            assert!(created);
            future
        };
        store.write(&key, Bytes::from_static(b"disk")).await.unwrap();
        let waiter = future.subscribe();
        resolver.spawn_fill(key, future);

        assert_eq!(waiter.wait().await, Ok(Ok(Bytes::from_static(b"disk"))));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_distinct_keys_do_not_block_each_other() {
        struct GatedFetcher {
            gate: Notify,
            slow_key: TileKey,
        }

        impl TileFetcher for GatedFetcher {
            async fn fetch(&self, key: &TileKey) -> Result<Bytes, FetchError> {
                if *key == self.slow_key {
                    self.gate.notified().await;
                }
                Ok(Bytes::from(key.to_string()))
            }
        }

        let slow = TileKey::new(4, 0, 0);
        let fast = TileKey::new(4, 0, 1);
        let (resolver, _store, fetcher) = resolver(
            MemoryStore::default(),
            GatedFetcher {
                gate: Notify::new(),
                slow_key: slow,
            },
        );

        let slow_resolver = resolver.clone();
        let slow_handle = tokio::spawn(async move { slow_resolver.resolve(slow).await });

        let fast_result = tokio::time::timeout(Duration::from_secs(1), resolver.resolve(fast))
            .await
            .expect("fast key must not wait on slow key");
        assert_eq!(fast_result, Ok(Bytes::from_static(b"/4/0/1")));
        assert!(!slow_handle.is_finished());

        fetcher.gate.notify_one();
        assert_eq!(
            slow_handle.await.unwrap(),
            Ok(Bytes::from_static(b"/4/0/0"))
        );
    }

    #[tokio::test]
    async fn test_panicking_fetch_abandons_waiters() {
        struct PanickingFetcher;

        impl TileFetcher for PanickingFetcher {
            async fn fetch(&self, _key: &TileKey) -> Result<Bytes, FetchError> {
                panic!("fetcher exploded");
            }
        }

        let key = TileKey::new(2, 2, 2);
        let (resolver, _store, _fetcher) = resolver(MemoryStore::default(), PanickingFetcher);

        let result = resolver.resolve(key).await;

        assert_eq!(
            result,
            Err(ResolveError::NotFound {
                key,
                source: FetchError::Abandoned
            })
        );
        assert_eq!(resolver.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_cancel_fill() {
        let key = TileKey::new(8, 3, 3);
        let (resolver, store, fetcher) =
            resolver(MemoryStore::default(), CountingFetcher::ok(b"persisted"));

        // Caller gives up long before the fetch completes
        let abandoned =
            tokio::time::timeout(Duration::from_millis(1), resolver.resolve(key)).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.get(&key), Some(Bytes::from_static(b"persisted")));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(resolver.in_flight_count(), 0);
    }
}
