//! Configuration type definitions

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::default_worker_count;
use crate::reliability::WriteOptions;

/// Settings shared by every command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Where `batch` writes when `-o` is not given
    pub output_dir: Option<PathBuf>,
    pub watch_interval_ms: u64,
    /// Keep backups after verified writes; a failed write is restored either way
    pub backup: bool,
    pub language: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            watch_interval_ms: 1000,
            backup: true,
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
    /// 0 disables the background sweeper
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: crate::cache::DEFAULT_CAPACITY,
            ttl_secs: crate::cache::DEFAULT_TTL.as_secs(),
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Defaults to min(CPU count, 8)
    pub workers: Option<usize>,
    /// File extensions picked up when a directory is given to `batch`
    pub extensions: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: None,
            extensions: ["tmpl", "tpl", "txt", "md"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    /// Shared backup directory; next to each output when unset
    pub backup_dir: Option<PathBuf>,
    pub retention_days: u64,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            backup_dir: None,
            retention_days: crate::reliability::DEFAULT_RETENTION.as_secs() / 86_400,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Directories outputs may be written under; empty means the output's own parent
    pub allowed_dirs: Vec<PathBuf>,
}

/// Complete templater configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub defaults: DefaultsConfig,
    pub cache: CacheConfig,
    pub batch: BatchConfig,
    pub reliability: ReliabilityConfig,
    pub security: SecurityConfig,
}

impl Config {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.cache.sweep_interval_secs > 0)
            .then(|| Duration::from_secs(self.cache.sweep_interval_secs))
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.defaults.watch_interval_ms)
    }

    pub fn workers(&self) -> usize {
        self.batch.workers.unwrap_or_else(default_worker_count)
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            backup: self.defaults.backup,
            retention: Duration::from_secs(self.reliability.retention_days * 86_400),
            allowed_dirs: self.security.allowed_dirs.clone(),
            backup_dir: self.reliability.backup_dir.clone(),
        }
    }

    /// Whether `path` has one of the batch template extensions
    pub fn is_template_file(&self, path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.batch
                    .extensions
                    .iter()
                    .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }
}
