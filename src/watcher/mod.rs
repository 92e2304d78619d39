//! Debounced watcher
//!
//! Re-renders a template into its output whenever the template or its data
//! file changes. Phases run `Idle -> Watching -> Debouncing -> Rendering`
//! and back to `Watching`; a failed cycle publishes an error and keeps going.

mod event;
mod runner;

pub use event::{WatchEvent, WatchOptions, WatchPhase, WatchStatus, DEFAULT_DEBOUNCE};
pub use runner::Watcher;
