//! Tests for the batch processor

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::engine::RenderEngine;
use crate::error::TemplaterResult;
use crate::fs::MemoryFs;

/// Renderer that sleeps and records how many renders overlap
#[derive(Default)]
struct SlowRenderer {
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    delay: Duration,
}

impl SlowRenderer {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

impl Renderer for SlowRenderer {
    fn render(&self, path: &Path, data: &DataMap) -> TemplaterResult<String> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.active.fetch_sub(1, Ordering::SeqCst);

        let name = path.to_string_lossy();
        if name.starts_with("bad") {
            return Err(TemplaterError::Render {
                name: name.into_owned(),
                message: "line 1: missing key 'x'".to_string(),
            });
        }
        Ok(format!("{}:{}", name, data.get("who").map_or("", String::as_str)))
    }
}

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

fn who(name: &str) -> DataMap {
    DataMap::from([("who".to_string(), name.to_string())])
}

#[test]
fn test_never_exceeds_worker_count() {
    let processor =
        BatchProcessor::new(SlowRenderer::with_delay(Duration::from_millis(30))).with_worker_count(2);
    let inputs = paths(&["a", "b", "c", "d", "e", "f"]);

    let output = processor.process_all(&inputs, &who("ada"));

    assert!(output.is_success());
    assert_eq!(output.results.len(), 6);
    assert_eq!(processor.renderer().peak.load(Ordering::SeqCst), 2);
    assert_eq!(output.results[Path::new("c")], "c:ada");
}

#[test]
fn test_partial_failure_keeps_successes() {
    let processor = BatchProcessor::new(SlowRenderer::default()).with_worker_count(4);
    let mut inputs = paths(&["a", "b", "c", "d", "e", "f", "g", "h"]);
    inputs.extend(paths(&["bad1", "bad2"]));

    let output = processor.process_all(&inputs, &DataMap::new());

    assert_eq!(output.results.len(), 8);
    let err = output.error.expect("two failures");
    let mut failed: Vec<_> = err.failures.iter().map(|f| f.path.clone()).collect();
    failed.sort();
    assert_eq!(failed, paths(&["bad1", "bad2"]));
    assert!(err.to_string().starts_with("2 template(s) failed:"));

    let stats = processor.stats();
    assert_eq!(stats.template_count, 10);
    assert_eq!(stats.error_count, 2);
}

#[test]
fn test_jobs_carry_their_own_data() {
    let processor = BatchProcessor::new(SlowRenderer::default());
    let jobs = vec![
        RenderJob::new("one", who("ada")),
        RenderJob::new("two", who("grace")),
    ];

    let results = processor.process_jobs(&jobs).into_result().unwrap();

    assert_eq!(results[Path::new("one")], "one:ada");
    assert_eq!(results[Path::new("two")], "two:grace");
}

#[test]
fn test_stop_before_processing_rejects_everything() {
    let processor = BatchProcessor::new(SlowRenderer::default());
    processor.stop();

    let output = processor.process_all(&paths(&["a", "b"]), &DataMap::new());

    assert!(output.results.is_empty());
    let err = output.error.unwrap();
    assert_eq!(err.failures.len(), 2);
    assert!(err
        .failures
        .iter()
        .all(|f| matches!(f.error, TemplaterError::Stopped)));
    assert_eq!(processor.renderer().calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_stop_during_processing_skips_unsubmitted() {
    let processor = Arc::new(
        BatchProcessor::new(SlowRenderer::with_delay(Duration::from_millis(100))).with_worker_count(1),
    );
    let inputs = paths(&["a", "b", "c", "d", "e"]);

    let stopper = {
        let processor = Arc::clone(&processor);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            processor.stop();
        })
    };
    let output = processor.process_all(&inputs, &DataMap::new());
    stopper.join().unwrap();

    let calls = processor.renderer().calls.load(Ordering::SeqCst);
    assert!(calls >= 1 && calls < inputs.len(), "calls = {calls}");
    assert_eq!(output.results.len(), calls);
    let err = output.error.unwrap();
    assert_eq!(err.failures.len(), inputs.len() - calls);
    assert!(err
        .failures
        .iter()
        .all(|f| matches!(f.error, TemplaterError::Stopped)));
}

#[test]
fn test_worker_count_is_clamped() {
    let processor = BatchProcessor::new(SlowRenderer::default());
    assert!((1..=8).contains(&processor.worker_count()));

    processor.set_worker_count(0);
    assert_eq!(processor.worker_count(), 1);
    processor.set_worker_count(100);
    assert_eq!(processor.worker_count(), MAX_WORKERS);
    processor.set_worker_count(3);
    assert_eq!(processor.worker_count(), 3);
}

#[test]
fn test_stats_snapshot_is_independent() {
    let processor = BatchProcessor::new(SlowRenderer::default()).with_worker_count(3);
    processor.process_all(&paths(&["a"]), &DataMap::new());

    let mut snapshot = processor.stats();
    assert_eq!(snapshot.worker_count, 3);
    assert!(snapshot.start_time.is_some() && snapshot.end_time.is_some());
    assert!(snapshot.start_time <= snapshot.end_time);

    snapshot.template_count = 99;
    assert_eq!(processor.stats().template_count, 1);
}

#[test]
fn test_engine_batch_reports_cache_counters() {
    let fs = MemoryFs::new();
    fs.insert("a.tmpl", "A {{.who}}");
    fs.insert("b.tmpl", "B {{.who}}");
    let engine = RenderEngine::builder().with_fs(Arc::new(fs)).build();
    let processor = BatchProcessor::new(engine).with_worker_count(2);
    let inputs = paths(&["a.tmpl", "b.tmpl"]);

    let first = processor.process_all(&inputs, &who("ada")).into_result().unwrap();
    assert_eq!(first[Path::new("a.tmpl")], "A ada");
    let stats = processor.stats();
    assert_eq!(stats.cache_misses, 2);
    assert_eq!(stats.cache_hits, 0);
    assert_eq!(stats.memory_usage, 20);

    processor.process_all(&inputs, &who("ada"));
    let stats = processor.stats();
    assert_eq!(stats.cache_hits, 2);
    assert_eq!(stats.cache_misses, 0);
}
