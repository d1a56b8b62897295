//! In-flight fetch registry.
//!
//! Maps each tile key with an outstanding upstream fetch to the
//! [`BroadcastFuture`] that will carry its outcome.
//!
//! # Atomicity
//!
//! [`get_or_create`](CoalescingRegistry::get_or_create) goes through the
//! `DashMap` entry API: the shard holding the key stays write-locked between
//! the lookup and the insert. Two callers racing on the same key therefore
//! cannot both observe `created = true`, regardless of scheduling.
//!
//! # Completion Order
//!
//! [`complete`](CoalescingRegistry::complete) removes the entry *before*
//! settling the future. By the time any waiter sees the outcome the key is
//! already gone, so "all resolutions finished" implies "registry empty".

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::broadcast::{BroadcastFuture, SettleError};
use crate::coord::TileKey;
use crate::provider::FetchError;

/// Terminal value of a tile fetch, shared by all coalesced waiters.
pub type TileOutcome = Result<Bytes, FetchError>;

/// Statistics for monitoring coalescing effectiveness.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CoalescerStats {
    /// Total registrations
    pub total_requests: u64,
    /// Registrations that attached to an existing fetch
    pub coalesced_requests: u64,
    /// Registrations that created a new entry
    pub new_requests: u64,
}

impl CoalescerStats {
    /// Returns the coalescing ratio (0.0 to 1.0)
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.coalesced_requests as f64 / self.total_requests as f64
        }
    }
}

/// Tracks tiles whose upstream fetch is in progress.
///
/// This is the only state shared between concurrent requests. Construct one
/// per process and hand it to the resolver.
pub struct CoalescingRegistry {
    in_flight: DashMap<TileKey, BroadcastFuture<TileOutcome>>,
    total_requests: AtomicU64,
    coalesced_requests: AtomicU64,
    new_requests: AtomicU64,
}

impl CoalescingRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
            total_requests: AtomicU64::new(0),
            coalesced_requests: AtomicU64::new(0),
            new_requests: AtomicU64::new(0),
        }
    }

    /// Returns the in-flight future for `key`, creating it if absent.
    ///
    /// The boolean is `true` only for the caller that inserted the entry;
    /// that caller is responsible for running the fetch and calling
    /// [`complete`](Self::complete).
    pub fn get_or_create(&self, key: TileKey) -> (BroadcastFuture<TileOutcome>, bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        match self.in_flight.entry(key) {
            Entry::Occupied(entry) => {
                self.coalesced_requests.fetch_add(1, Ordering::Relaxed);
                debug!(tile = %key, "Coalescing request onto in-flight fetch");
                (entry.get().clone(), false)
            }
            Entry::Vacant(entry) => {
                let future = BroadcastFuture::new();
                entry.insert(future.clone());
                self.new_requests.fetch_add(1, Ordering::Relaxed);
                debug!(tile = %key, "New in-flight fetch registered");
                (future, true)
            }
        }
    }

    /// Removes the entry for `key`. Removing an absent key is a no-op.
    ///
    /// Returns true if an entry was removed.
    pub fn remove(&self, key: &TileKey) -> bool {
        self.in_flight.remove(key).is_some()
    }

    /// Removes `future`'s entry and settles it with `outcome`.
    ///
    /// The entry is only removed if it still refers to `future`, so a stale
    /// completion can never evict a newer fetch for the same key.
    pub fn complete(
        &self,
        key: &TileKey,
        future: &BroadcastFuture<TileOutcome>,
        outcome: TileOutcome,
    ) -> Result<(), SettleError> {
        self.in_flight
            .remove_if(key, |_, registered| registered.ptr_eq(future));

        let waiters = future.waiter_count();
        let ok = outcome.is_ok();
        let result = future.settle(outcome);

        match result {
            Ok(()) => debug!(tile = %key, waiters, ok, "In-flight fetch settled"),
            Err(_) => warn!(tile = %key, "In-flight fetch settled twice; keeping first outcome"),
        }
        result
    }

    /// Returns true if a fetch for `key` is outstanding.
    pub fn contains(&self, key: &TileKey) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Returns the number of outstanding fetches.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> CoalescerStats {
        CoalescerStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            coalesced_requests: self.coalesced_requests.load(Ordering::Relaxed),
            new_requests: self.new_requests.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics.
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            total_requests = stats.total_requests,
            coalesced = stats.coalesced_requests,
            new_requests = stats.new_requests,
            in_flight = self.in_flight_count(),
            coalescing_ratio = format!("{:.1}%", stats.coalescing_ratio() * 100.0),
            "Request coalescing statistics"
        );
    }
}

impl Default for CoalescingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
