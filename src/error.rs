//! Error types for templater
//!
//! One library error enum built with `thiserror`; the binary wraps it in
//! `anyhow` at the top level.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for templater operations
pub type TemplaterResult<T> = Result<T, TemplaterError>;

/// Main error type for templater operations
#[derive(Error, Debug)]
pub enum TemplaterError {
    /// Reading or stating a file failed
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Template source could not be compiled
    #[error("syntax error in {name} at line {line}: {message}")]
    TemplateSyntax {
        name: String,
        line: usize,
        message: String,
    },

    /// Executing a compiled template failed
    #[error("render error in {name}: {message}")]
    Render { name: String, message: String },

    /// Template source matched the content denylist
    #[error("unsafe template content: {reason}")]
    UnsafeContent { reason: String },

    /// Output path rejected by the path policy
    #[error("unsafe output path '{path}': {reason}")]
    UnsafePath { path: PathBuf, reason: String },

    /// Reliable write failed; any restore failure is appended, never substituted
    #[error("write to {path} failed: {reason}{}", restore_suffix(.restored, .restore_error))]
    Write {
        path: PathBuf,
        reason: String,
        restored: bool,
        restore_error: Option<String>,
    },

    /// Data is missing keys the template references
    #[error("missing required data keys: {}", .keys.join(", "))]
    MissingKeys { keys: Vec<String> },

    /// Data file could not be parsed
    #[error("invalid data file {path}: {message}")]
    Data { path: PathBuf, message: String },

    /// Configuration file could not be parsed
    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Document template could not be processed
    #[error("document error: {0}")]
    Document(String),

    /// Missing template dependency declared in metadata
    #[error("missing template dependency: {path}")]
    MissingDependency { path: PathBuf },

    /// File watcher subscription failed
    #[error("watcher error: {0}")]
    Watch(String),

    /// Work was not started because the processor was stopped
    #[error("processing stopped")]
    Stopped,
}

fn restore_suffix(restored: &bool, restore_error: &Option<String>) -> String {
    match (restored, restore_error) {
        (_, Some(err)) => format!(" (restore failed: {})", err),
        (true, None) => " (restored from backup)".to_string(),
        (false, None) => String::new(),
    }
}

impl TemplaterError {
    /// Wrap an IO error with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TemplaterError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors raised by the security gate
    pub fn is_security(&self) -> bool {
        matches!(
            self,
            TemplaterError::UnsafeContent { .. } | TemplaterError::UnsafePath { .. }
        )
    }
}
