//! Watch loop
//!
//! A `notify` subscription on the containing directories forwards relevant
//! paths into a channel. One background thread owns the debounce state and
//! runs render+write cycles, so at most one cycle is in flight.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use chrono::Utc;
use crossbeam_channel::{after, bounded, never, select, unbounded, Receiver, Sender};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use tracing::{debug, info, warn};

use crate::engine::Renderer;
use crate::error::{TemplaterError, TemplaterResult};
use crate::models::DataMap;
use crate::reliability::{ReliableWriter, WriteOutcome};

use super::event::{Debouncer, LatestSlot, WatchOptions, WatchPhase, WatchStatus};

/// Handle to a running watch loop
pub struct Watcher {
    subscription: Option<RecommendedWatcher>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    phase: Arc<Mutex<WatchPhase>>,
    status: Receiver<WatchStatus>,
    errors: Receiver<TemplaterError>,
}

impl Watcher {
    /// Subscribe to the template's and data file's directories and start the loop
    pub fn start<R>(
        renderer: Arc<R>,
        writer: ReliableWriter,
        mut options: WatchOptions,
    ) -> TemplaterResult<Self>
    where
        R: Renderer + ?Sized + 'static,
    {
        options.template = canonical(&options.template)?;
        if let Some(data) = options.data.take() {
            options.data = Some(canonical(&data)?);
        }

        let targets: BTreeSet<PathBuf> = std::iter::once(options.template.clone())
            .chain(options.data.clone())
            .collect();
        let dirs: BTreeSet<PathBuf> = targets
            .iter()
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect();

        let (event_tx, event_rx) = unbounded();
        let mut subscription = notify::recommended_watcher(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_relevant(&event.kind) => {
                    for path in event.paths.into_iter().filter(|p| targets.contains(p)) {
                        let _ = event_tx.send(path);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "file notification error"),
            },
        )
        .map_err(|e| TemplaterError::Watch(e.to_string()))?;

        for dir in &dirs {
            subscription
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|e| TemplaterError::Watch(format!("{}: {}", dir.display(), e)))?;
            debug!(dir = %dir.display(), "watching directory");
        }

        let mut watcher = Self::spawn(renderer, writer, options, event_rx);
        watcher.subscription = Some(subscription);
        Ok(watcher)
    }

    /// Run the loop over an arbitrary stream of changed paths
    pub(crate) fn spawn<R>(
        renderer: Arc<R>,
        writer: ReliableWriter,
        options: WatchOptions,
        events: Receiver<PathBuf>,
    ) -> Self
    where
        R: Renderer + ?Sized + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let phase = Arc::new(Mutex::new(WatchPhase::Idle));
        let status = LatestSlot::new();
        let errors = LatestSlot::new();
        let status_rx = status.receiver();
        let errors_rx = errors.receiver();

        let mut watch_loop = WatchLoop {
            renderer,
            writer,
            options,
            phase: Arc::clone(&phase),
            status,
            errors,
            cycles: 0,
        };
        let handle = thread::spawn(move || watch_loop.run(events, stop_rx));

        Self {
            subscription: None,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            phase,
            status: status_rx,
            errors: errors_rx,
        }
    }

    /// Latest successful cycle; a newer one replaces an unread older one
    pub fn status(&self) -> &Receiver<WatchStatus> {
        &self.status
    }

    /// Latest failed cycle; failures never stop the loop
    pub fn errors(&self) -> &Receiver<TemplaterError> {
        &self.errors
    }

    pub fn phase(&self) -> WatchPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn phase_handle(&self) -> Arc<Mutex<WatchPhase>> {
        Arc::clone(&self.phase)
    }

    /// Tear down the subscription and join the loop
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.subscription.take();
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("watch loop panicked");
            }
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn canonical(path: &Path) -> TemplaterResult<PathBuf> {
    path.canonicalize().map_err(|e| TemplaterError::io(path, e))
}

/// Writes and creations count; access and metadata-only events do not
fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any)
    )
}

struct WatchLoop<R: Renderer + ?Sized> {
    renderer: Arc<R>,
    writer: ReliableWriter,
    options: WatchOptions,
    phase: Arc<Mutex<WatchPhase>>,
    status: LatestSlot<WatchStatus>,
    errors: LatestSlot<TemplaterError>,
    cycles: u64,
}

impl<R: Renderer + ?Sized> WatchLoop<R> {
    fn run(&mut self, events: Receiver<PathBuf>, stop: Receiver<()>) {
        info!(
            template = %self.options.template.display(),
            output = %self.options.output.display(),
            "watch started"
        );
        if self.options.initial_render {
            self.cycle(Vec::new());
        }
        self.set_phase(WatchPhase::Watching);

        let mut debouncer = Debouncer::new(self.options.debounce);
        let mut events_open = true;
        loop {
            let source = if events_open { events.clone() } else { never() };
            let timer = match debouncer.remaining(Instant::now()) {
                Some(left) => after(left),
                None => never(),
            };
            let stopped = select! {
                recv(stop) -> _ => true,
                recv(source) -> msg => {
                    match msg {
                        Ok(path) => {
                            debug!(path = %path.display(), "change detected");
                            debouncer.add_change(path, Instant::now());
                            self.set_phase(WatchPhase::Debouncing);
                        }
                        Err(_) => events_open = false,
                    }
                    false
                },
                recv(timer) -> _ => false,
            };
            if stopped {
                break;
            }

            if debouncer.should_fire(Instant::now()) {
                let changed = debouncer.take_changes();
                self.cycle(changed);
                self.set_phase(WatchPhase::Watching);
            } else if !debouncer.is_pending() {
                self.set_phase(WatchPhase::Watching);
            }
        }

        self.set_phase(WatchPhase::Stopped);
        info!(cycles = self.cycles, "watch stopped");
    }

    fn cycle(&mut self, changed: Vec<PathBuf>) {
        self.set_phase(WatchPhase::Rendering);
        self.cycles += 1;

        match self.render_and_write() {
            Ok(outcome) => {
                info!(
                    cycle = self.cycles,
                    output = %outcome.path.display(),
                    bytes = outcome.bytes,
                    "watch cycle complete"
                );
                self.status.publish(WatchStatus {
                    cycle: self.cycles,
                    template: self.options.template.clone(),
                    data: self.options.data.clone(),
                    output: outcome.path,
                    bytes: outcome.bytes,
                    backup: outcome.backup,
                    changed,
                    rendered_at: Utc::now(),
                    is_watching: true,
                });
            }
            Err(error) => {
                warn!(cycle = self.cycles, %error, "watch cycle failed");
                self.errors.publish(error);
            }
        }
    }

    fn render_and_write(&self) -> TemplaterResult<WriteOutcome> {
        let data = match &self.options.data {
            Some(path) => self.renderer.load_data(path)?,
            None => DataMap::new(),
        };
        let text = self.renderer.render(&self.options.template, &data)?;
        self.writer
            .write_reliably(&self.options.output, text.as_bytes())
    }

    fn set_phase(&self, phase: WatchPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }
}
