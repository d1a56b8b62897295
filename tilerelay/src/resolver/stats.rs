//! Resolver counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated by the resolver and its fill tasks.
#[derive(Debug, Default)]
pub(crate) struct ResolverCounters {
    requests: AtomicU64,
    disk_hits: AtomicU64,
    fetches: AtomicU64,
    fetch_failures: AtomicU64,
    write_failures: AtomicU64,
}

impl ResolverCounters {
    pub(crate) fn request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn disk_hit(&self) {
        self.disk_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fetch_started(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fetch_failed(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn write_failed(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ResolverStats {
        ResolverStats {
            requests: self.requests.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of resolver activity.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolverStats {
    /// Calls to `resolve`
    pub requests: u64,
    /// Tiles served from the disk cache (including re-checks by fill tasks)
    pub disk_hits: u64,
    /// Upstream fetches started
    pub fetches: u64,
    /// Upstream fetches that failed
    pub fetch_failures: u64,
    /// Fetched tiles that could not be persisted
    pub write_failures: u64,
}

impl ResolverStats {
    /// Fraction of requests answered straight from disk (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.disk_hits as f64 / self.requests as f64
        }
    }
}
