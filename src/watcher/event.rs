//! Watch options, published events and debounce state

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::Serialize;

/// Quiet period a burst of changes must settle for before a render
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// What to watch and where to write
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub template: PathBuf,
    /// Optional data file, reloaded on every cycle
    pub data: Option<PathBuf>,
    pub output: PathBuf,
    pub debounce: Duration,
    /// Render once before waiting for the first change
    pub initial_render: bool,
}

impl WatchOptions {
    pub fn new(template: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            template: template.into(),
            data: None,
            output: output.into(),
            debounce: DEFAULT_DEBOUNCE,
            initial_render: false,
        }
    }

    pub fn with_data(mut self, data: impl Into<PathBuf>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_initial_render(mut self, initial_render: bool) -> Self {
        self.initial_render = initial_render;
        self
    }
}

/// Where the watch loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchPhase {
    Idle,
    Watching,
    Debouncing,
    Rendering,
    Stopped,
}

/// Published after every successful render and write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchStatus {
    /// 1-based count of cycles run so far, failed ones included
    pub cycle: u64,
    pub template: PathBuf,
    pub data: Option<PathBuf>,
    pub output: PathBuf,
    pub bytes: usize,
    pub backup: Option<PathBuf>,
    /// Watched paths whose changes triggered this cycle; empty for the initial render
    pub changed: Vec<PathBuf>,
    pub rendered_at: DateTime<Utc>,
    /// False once the loop has stopped
    pub is_watching: bool,
}

/// NDJSON events printed by `templater watch --json`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WatchEvent {
    WatchStarted { template: String, output: String },
    Rendered { cycle: u64, output: String, bytes: usize },
    Error { message: String },
    Shutdown,
}

impl WatchEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl From<&WatchStatus> for WatchEvent {
    fn from(status: &WatchStatus) -> Self {
        WatchEvent::Rendered {
            cycle: status.cycle,
            output: status.output.display().to_string(),
            bytes: status.bytes,
        }
    }
}

/// Single-slot channel where a new value replaces an unread one
pub(crate) struct LatestSlot<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> LatestSlot<T> {
    pub(crate) fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    pub(crate) fn receiver(&self) -> Receiver<T> {
        self.rx.clone()
    }

    pub(crate) fn publish(&self, mut value: T) {
        loop {
            match self.tx.try_send(value) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(back)) => {
                    let _ = self.rx.try_recv();
                    value = back;
                }
            }
        }
    }
}

/// Pending changes and the time of the most recent one
///
/// Strict reset: every change pushes the deadline out by a full interval.
pub(crate) struct Debouncer {
    interval: Duration,
    pending: BTreeSet<PathBuf>,
    last_change: Option<Instant>,
}

impl Debouncer {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: BTreeSet::new(),
            last_change: None,
        }
    }

    pub(crate) fn add_change(&mut self, path: PathBuf, now: Instant) {
        self.pending.insert(path);
        self.last_change = Some(now);
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.last_change.is_some()
    }

    /// Time left until the burst settles, if one is pending
    pub(crate) fn remaining(&self, now: Instant) -> Option<Duration> {
        self.last_change
            .map(|last| (last + self.interval).saturating_duration_since(now))
    }

    pub(crate) fn should_fire(&self, now: Instant) -> bool {
        self.remaining(now).is_some_and(|left| left.is_zero())
    }

    pub(crate) fn take_changes(&mut self) -> Vec<PathBuf> {
        self.last_change = None;
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}
