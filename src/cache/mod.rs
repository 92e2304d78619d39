//! Dual-layer render cache
//!
//! - [`FileContentCache`]: raw bytes per path, validated against the file's
//!   modification time, evicted by lowest access count
//! - [`TemplateCache`]: compiled templates per path, idle TTL plus LRU
//! - [`CacheSweeper`]: background thread removing idle entries
//!
//! Each cache holds one `RwLock` around its map, taken only for lookup and
//! insert. Per-entry counters are atomics so hits only need the read lock.

mod file_cache;
mod sweeper;
mod template_cache;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

pub use file_cache::FileContentCache;
pub use sweeper::CacheSweeper;
pub use template_cache::TemplateCache;

/// Default number of entries per cache
pub const DEFAULT_CAPACITY: usize = 100;

/// Default idle time before an entry expires
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Anything with idle entries to drop periodically
pub trait Sweep: Send + Sync {
    /// Remove idle-expired entries, returning how many were removed
    fn sweep_expired(&self) -> usize;
}

/// Point-in-time cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn evicted(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entries: usize, capacity: usize) -> CacheStats {
        CacheStats {
            entries,
            capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Monotonic clock with timestamps that fit in an `AtomicU64`
#[derive(Debug, Clone, Copy)]
pub(crate) struct Clock {
    epoch: Instant,
}

impl Clock {
    pub(crate) fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Nanoseconds since the clock was created
    pub(crate) fn now(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    pub(crate) fn idle_for(&self, stamp: &AtomicU64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(stamp.load(Ordering::Relaxed)))
    }
}

/// Path-keyed map behind a lock that recovers from poisoning
pub(crate) struct Store<V> {
    map: RwLock<HashMap<PathBuf, V>>,
}

impl<V> Store<V> {
    pub(crate) fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, HashMap<PathBuf, V>> {
        self.map.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, HashMap<PathBuf, V>> {
        self.map.write().unwrap_or_else(PoisonError::into_inner)
    }
}
