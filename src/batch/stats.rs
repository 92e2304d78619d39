//! Batch processing statistics

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for the most recent batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingStats {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Templates a render was attempted for
    pub template_count: usize,
    /// Failed items, including ones skipped after a stop
    pub error_count: usize,
    /// Bytes held by the file content cache when the batch ended
    pub memory_usage: u64,
    pub worker_count: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub processing_time_ms: u64,
}

impl ProcessingStats {
    pub(crate) fn begin(worker_count: usize) -> Self {
        Self {
            start_time: Some(Utc::now()),
            worker_count,
            ..Self::default()
        }
    }

    pub(crate) fn finish(&mut self) {
        let end = Utc::now();
        if let Some(start) = self.start_time {
            self.processing_time_ms = u64::try_from((end - start).num_milliseconds()).unwrap_or(0);
        }
        self.end_time = Some(end);
    }
}
