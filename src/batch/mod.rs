//! Concurrent batch processor
//!
//! Every path takes one of `worker_count` slots before its render starts, so
//! submission blocks while all workers are busy. A slot is a message in a
//! bounded channel: sending acquires it, receiving releases it.

mod stats;
#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, info};

use crate::engine::Renderer;
use crate::error::TemplaterError;
use crate::models::{DataMap, RenderJob};

pub use stats::ProcessingStats;

/// Upper bound for [`BatchProcessor::set_worker_count`]
pub const MAX_WORKERS: usize = 16;

/// min(available parallelism, 8)
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(8)
}

/// One path that failed to render
#[derive(Debug)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub error: TemplaterError,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

/// Every failure of one batch run
#[derive(Debug, Error)]
#[error("{} template(s) failed:\n{}", .failures.len(), list_failures(.failures))]
pub struct BatchError {
    pub failures: Vec<ItemFailure>,
}

fn list_failures(failures: &[ItemFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("  {}", f))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rendered outputs plus the aggregate error, if anything failed
#[derive(Debug, Default)]
pub struct BatchOutput {
    pub results: BTreeMap<PathBuf, String>,
    pub error: Option<BatchError>,
}

impl BatchOutput {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<BTreeMap<PathBuf, String>, BatchError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.results),
        }
    }
}

/// Releases its slot when dropped, even if the render panicked
struct SlotGuard<'a>(&'a Receiver<()>);

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let _ = self.0.try_recv();
    }
}

pub struct BatchProcessor<R: Renderer> {
    renderer: R,
    worker_count: AtomicUsize,
    stopped: AtomicBool,
    stop_tx: Mutex<Option<Sender<()>>>,
    stop_rx: Receiver<()>,
    stats: Mutex<ProcessingStats>,
}

impl<R: Renderer> BatchProcessor<R> {
    pub fn new(renderer: R) -> Self {
        let (stop_tx, stop_rx) = bounded(0);
        Self {
            renderer,
            worker_count: AtomicUsize::new(default_worker_count()),
            stopped: AtomicBool::new(false),
            stop_tx: Mutex::new(Some(stop_tx)),
            stop_rx,
            stats: Mutex::new(ProcessingStats::default()),
        }
    }

    pub fn with_worker_count(self, n: usize) -> Self {
        self.set_worker_count(n);
        self
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count.load(Ordering::SeqCst)
    }

    /// Clamped into `1..=16`; applies to the next run
    pub fn set_worker_count(&self, n: usize) {
        self.worker_count
            .store(n.clamp(1, MAX_WORKERS), Ordering::SeqCst);
    }

    /// Refuse further submissions; renders already running finish normally
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        info!("batch processor stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Snapshot of the most recent run
    pub fn stats(&self) -> ProcessingStats {
        self.lock_stats().clone()
    }

    /// Render every path with the same data
    pub fn process_all(&self, paths: &[PathBuf], data: &DataMap) -> BatchOutput {
        let items: Vec<(&Path, &DataMap)> = paths.iter().map(|p| (p.as_path(), data)).collect();
        self.run(&items)
    }

    /// Render each job with its own data
    pub fn process_jobs(&self, jobs: &[RenderJob]) -> BatchOutput {
        let items: Vec<(&Path, &DataMap)> =
            jobs.iter().map(|j| (j.path.as_path(), &j.data)).collect();
        self.run(&items)
    }

    fn lock_stats(&self) -> std::sync::MutexGuard<'_, ProcessingStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self, items: &[(&Path, &DataMap)]) -> BatchOutput {
        let workers = self.worker_count();
        let before = self.renderer.cache_stats();
        *self.lock_stats() = ProcessingStats::begin(workers);
        info!(items = items.len(), workers, "batch started");

        let (slot_tx, slot_rx) = bounded::<()>(workers);
        let results = Mutex::new(BTreeMap::new());
        let failures = Mutex::new(Vec::new());

        thread::scope(|s| {
            for &(path, data) in items {
                if !self.acquire(&slot_tx) {
                    self.record_failure(&failures, path, TemplaterError::Stopped, false);
                    continue;
                }

                let slot_rx = &slot_rx;
                let results = &results;
                let failures = &failures;
                s.spawn(move || {
                    let _slot = SlotGuard(slot_rx);
                    match self.renderer.render(path, data) {
                        Ok(text) => {
                            self.lock_stats().template_count += 1;
                            results
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .insert(path.to_path_buf(), text);
                        }
                        Err(error) => {
                            debug!(path = %path.display(), %error, "render failed");
                            self.record_failure(failures, path, error, true);
                        }
                    }
                });
            }
        });

        let results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
        let failures = failures.into_inner().unwrap_or_else(PoisonError::into_inner);

        {
            let after = self.renderer.cache_stats();
            let mut stats = self.lock_stats();
            if let (Some(before), Some(after)) = (before, after) {
                stats.cache_hits = after.templates.hits.saturating_sub(before.templates.hits);
                stats.cache_misses = after
                    .templates
                    .misses
                    .saturating_sub(before.templates.misses);
                stats.memory_usage = after.file_bytes;
            }
            stats.finish();
            info!(
                rendered = results.len(),
                failed = failures.len(),
                elapsed_ms = stats.processing_time_ms,
                "batch finished"
            );
        }

        BatchOutput {
            results,
            error: (!failures.is_empty()).then_some(BatchError { failures }),
        }
    }

    /// Block for a free slot; false once the processor is stopped
    fn acquire(&self, slot_tx: &Sender<()>) -> bool {
        if self.is_stopped() {
            return false;
        }
        select! {
            send(slot_tx, ()) -> res => res.is_ok() && !self.is_stopped(),
            recv(self.stop_rx) -> _ => false,
        }
    }

    fn record_failure(
        &self,
        failures: &Mutex<Vec<ItemFailure>>,
        path: &Path,
        error: TemplaterError,
        attempted: bool,
    ) {
        {
            let mut stats = self.lock_stats();
            stats.error_count += 1;
            if attempted {
                stats.template_count += 1;
            }
        }
        failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ItemFailure {
                path: path.to_path_buf(),
                error,
            });
    }
}
