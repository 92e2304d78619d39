//! Templater - cached template rendering with batch, watch and crash-safe writes
//!
//! Templates are checked by a security gate, compiled once and cached, and
//! rendered against string data. Outputs go through a reliability layer that
//! backs up, writes, verifies and restores on failure.

pub mod batch;
pub mod cache;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod fs;
pub mod models;
pub mod plugin;
pub mod reliability;
pub mod security;
pub mod template;
pub mod watcher;

// Re-exports for convenience
pub use batch::{BatchError, BatchOutput, BatchProcessor, ProcessingStats};
pub use cache::{CacheSweeper, FileContentCache, TemplateCache};
pub use config::Config;
pub use engine::{load_data, RenderEngine, Renderer};
pub use error::{TemplaterError, TemplaterResult};
pub use fs::{FileSystem, LocalFs};
pub use models::{DataMap, RenderJob};
pub use plugin::TemplatePlugin;
pub use reliability::{ReliableWriter, WriteOptions, WriteOutcome};
pub use watcher::{WatchOptions, WatchStatus, Watcher};
