//! Compiled template cache

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::error::{TemplaterError, TemplaterResult};
use crate::security::validate_template_content;
use crate::template::{FunctionRegistry, SharedTemplate, Template};

use super::{
    CacheStats, Clock, Counters, FileContentCache, Store, Sweep, DEFAULT_CAPACITY, DEFAULT_TTL,
};

struct TemplateEntry {
    template: SharedTemplate,
    modified: SystemTime,
    last_used: AtomicU64,
}

/// Per-path cache of compiled templates with idle TTL and LRU eviction
pub struct TemplateCache {
    files: Arc<FileContentCache>,
    registry: Arc<FunctionRegistry>,
    entries: Store<TemplateEntry>,
    capacity: usize,
    ttl: Duration,
    clock: Clock,
    counters: Counters,
}

impl TemplateCache {
    pub fn new(files: Arc<FileContentCache>, registry: Arc<FunctionRegistry>) -> Self {
        Self::with_limits(files, registry, DEFAULT_CAPACITY, DEFAULT_TTL)
    }

    pub fn with_limits(
        files: Arc<FileContentCache>,
        registry: Arc<FunctionRegistry>,
        capacity: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            files,
            registry,
            entries: Store::new(),
            capacity: capacity.max(1),
            ttl,
            clock: Clock::new(),
            counters: Counters::default(),
        }
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// Compiled template for `path`
    ///
    /// Served from cache while the entry has been used within the TTL and
    /// the file's modification time is unchanged; otherwise recompiled from
    /// the file content cache. The security gate runs on exactly the bytes
    /// being compiled, so no cached template was built from unchecked source.
    pub fn get(&self, path: &Path) -> TemplaterResult<SharedTemplate> {
        let modified = self
            .files
            .fs()
            .modified(path)
            .map_err(|e| TemplaterError::io(path, e))?;

        if let Some(entry) = self.entries.read().get(path) {
            if entry.modified == modified && self.clock.idle_for(&entry.last_used) < self.ttl {
                entry.last_used.store(self.clock.now(), Ordering::Relaxed);
                self.counters.hit();
                return Ok(Arc::clone(&entry.template));
            }
        }

        self.counters.miss();
        let (bytes, modified) = self.files.get_entry(path)?;
        let name = path.display().to_string();
        let source = std::str::from_utf8(&bytes).map_err(|e| TemplaterError::TemplateSyntax {
            name: name.clone(),
            line: 1,
            message: format!("template is not valid UTF-8: {}", e),
        })?;
        validate_template_content(source)?;
        let template = Arc::new(Template::compile(&name, source, &self.registry)?);
        debug!(path = %path.display(), "compiled template");

        let entry = TemplateEntry {
            template: Arc::clone(&template),
            modified,
            last_used: AtomicU64::new(self.clock.now()),
        };

        let mut entries = self.entries.write();
        if !entries.contains_key(path) && entries.len() >= self.capacity {
            let victim = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used.load(Ordering::Relaxed))
                .map(|(p, _)| p.clone());
            if let Some(victim) = victim {
                entries.remove(&victim);
                self.counters.evicted();
                debug!(path = %victim.display(), "template cache evicted least recently used entry");
            }
        }
        entries.insert(path.to_path_buf(), entry);

        Ok(template)
    }

    pub fn invalidate(&self, path: &Path) -> bool {
        self.entries.write().remove(path).is_some()
    }

    /// Drop every compiled template at once
    pub fn invalidate_all(&self) {
        let old = std::mem::take(&mut *self.entries.write());
        debug!(dropped = old.len(), "template cache invalidated");
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

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len(), self.capacity)
    }
}

impl Sweep for TemplateCache {
    fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| self.clock.idle_for(&e.last_used) < self.ttl);
        before - entries.len()
    }
}
