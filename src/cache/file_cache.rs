//! Raw file content cache

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::error::{TemplaterError, TemplaterResult};
use crate::fs::FileSystem;

use super::{CacheStats, Clock, Counters, Store, Sweep, DEFAULT_CAPACITY, DEFAULT_TTL};

struct FileEntry {
    content: Arc<[u8]>,
    modified: SystemTime,
    access_count: AtomicU64,
    last_used: AtomicU64,
}

/// Per-path cache of file bytes keyed on modification time
pub struct FileContentCache {
    fs: Arc<dyn FileSystem>,
    entries: Store<FileEntry>,
    capacity: usize,
    ttl: Duration,
    clock: Clock,
    counters: Counters,
}

impl FileContentCache {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self::with_limits(fs, DEFAULT_CAPACITY, DEFAULT_TTL)
    }

    /// `capacity` is raised to at least one entry
    pub fn with_limits(fs: Arc<dyn FileSystem>, capacity: usize, ttl: Duration) -> Self {
        Self {
            fs,
            entries: Store::new(),
            capacity: capacity.max(1),
            ttl,
            clock: Clock::new(),
            counters: Counters::default(),
        }
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Content of `path`, read from disk only when missing or stale
    pub fn get(&self, path: &Path) -> TemplaterResult<Arc<[u8]>> {
        self.get_entry(path).map(|(content, _)| content)
    }

    /// Content of `path` together with the modification time it is cached under
    pub fn get_entry(&self, path: &Path) -> TemplaterResult<(Arc<[u8]>, SystemTime)> {
        let modified = self
            .fs
            .modified(path)
            .map_err(|e| TemplaterError::io(path, e))?;

        if let Some(entry) = self.entries.read().get(path) {
            if entry.modified == modified {
                entry.access_count.fetch_add(1, Ordering::Relaxed);
                entry.last_used.store(self.clock.now(), Ordering::Relaxed);
                self.counters.hit();
                return Ok((Arc::clone(&entry.content), modified));
            }
        }

        self.counters.miss();
        debug!(path = %path.display(), "file cache miss");
        let content: Arc<[u8]> = self
            .fs
            .read(path)
            .map_err(|e| TemplaterError::io(path, e))?
            .into();

        let entry = FileEntry {
            content: Arc::clone(&content),
            modified,
            access_count: AtomicU64::new(1),
            last_used: AtomicU64::new(self.clock.now()),
        };

        let mut entries = self.entries.write();
        if !entries.contains_key(path) && entries.len() >= self.capacity {
            let victim = entries
                .iter()
                .min_by_key(|(_, e)| e.access_count.load(Ordering::Relaxed))
                .map(|(p, _)| p.clone());
            if let Some(victim) = victim {
                entries.remove(&victim);
                self.counters.evicted();
                debug!(path = %victim.display(), "file cache evicted least accessed entry");
            }
        }
        entries.insert(path.to_path_buf(), entry);

        Ok((content, modified))
    }

    pub fn invalidate(&self, path: &Path) -> bool {
        self.entries.write().remove(path).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently held
    pub fn total_bytes(&self) -> u64 {
        self.entries
            .read()
            .values()
            .map(|e| e.content.len() as u64)
            .sum()
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len(), self.capacity)
    }

    /// Cached paths, in no particular order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.read().keys().cloned().collect()
    }
}

impl Sweep for FileContentCache {
    fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| self.clock.idle_for(&e.last_used) < self.ttl);
        before - entries.len()
    }
}
