//! Backup, write, verify, restore

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fs2::FileExt;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{TemplaterError, TemplaterResult};
use crate::fs::{FileSystem, LocalFs};
use crate::security::{screen_output_path, validate_output_path};

use super::{BackupStore, DEFAULT_RETENTION};

/// Options for [`ReliableWriter`]
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Keep the backup of an existing destination after a verified write
    ///
    /// An existing destination is always backed up before it is replaced so
    /// a failed write can be undone; when false that backup is discarded
    /// once the new content has been verified.
    pub backup: bool,
    /// Backups older than this are pruned after a successful write
    pub retention: Duration,
    /// Directories writes may land in; empty means the destination's own
    pub allowed_dirs: Vec<PathBuf>,
    /// Shared backup directory instead of one next to each destination
    pub backup_dir: Option<PathBuf>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            backup: true,
            retention: DEFAULT_RETENTION,
            allowed_dirs: Vec::new(),
            backup_dir: None,
        }
    }
}

/// Result of a successful reliable write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub path: PathBuf,
    pub bytes: usize,
    pub backup: Option<PathBuf>,
    pub pruned: usize,
    /// `sha256:<hex>` of the verified content
    pub digest: String,
}

/// Crash-safe writer
///
/// A write to an existing destination is preceded by a backup and followed
/// by a byte-exact verification; any failure after the backup restores it.
/// Writes to the same destination are serialized by an exclusive lock file
/// in the backup directory.
pub struct ReliableWriter {
    fs: Arc<dyn FileSystem>,
    store: BackupStore,
    options: WriteOptions,
}

impl Default for ReliableWriter {
    fn default() -> Self {
        Self::new(Arc::new(LocalFs::new()), WriteOptions::default())
    }
}

/// Holds an exclusive advisory lock until dropped
struct PathLock {
    file: File,
}

impl Drop for PathLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl ReliableWriter {
    pub fn new(fs: Arc<dyn FileSystem>, options: WriteOptions) -> Self {
        let mut store = BackupStore::new(Arc::clone(&fs));
        if let Some(dir) = &options.backup_dir {
            store = store.with_backup_dir(dir);
        }
        Self { fs, store, options }
    }

    pub fn backups(&self) -> &BackupStore {
        &self.store
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Persist `content` at `path` or leave the previous content in place
    pub fn write_reliably(&self, path: &Path, content: &[u8]) -> TemplaterResult<WriteOutcome> {
        screen_output_path(path)?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        self.fs
            .create_dir_all(&parent)
            .map_err(|e| TemplaterError::io(&parent, e))?;

        let allowed = if self.options.allowed_dirs.is_empty() {
            vec![parent]
        } else {
            self.options.allowed_dirs.clone()
        };
        validate_output_path(path, &allowed)?;

        let _lock = self.lock(path)?;
        let existed = self.fs.exists(path);

        let mut backup = self.store.backup(path).map_err(|e| TemplaterError::Write {
            path: path.to_path_buf(),
            reason: format!("backup failed: {}", e),
            restored: false,
            restore_error: None,
        })?;

        let written = self
            .fs
            .write(path, content)
            .map_err(|e| e.to_string())
            .and_then(|()| self.store.verify(path, content).map_err(|e| reason_of(&e)));
        if let Err(reason) = written {
            return Err(self.fail(path, reason, backup.as_deref(), existed));
        }

        if !self.options.backup {
            if let Some(discarded) = backup.take() {
                if let Err(e) = self.fs.remove(&discarded) {
                    warn!(backup = %discarded.display(), error = %e, "failed to discard backup");
                }
            }
        }

        let pruned = match self.store.prune_backups(path, self.options.retention) {
            Ok(n) => n,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to prune old backups");
                0
            }
        };

        info!(path = %path.display(), bytes = content.len(), "wrote output");
        Ok(WriteOutcome {
            path: path.to_path_buf(),
            bytes: content.len(),
            backup,
            pruned,
            digest: content_digest(content),
        })
    }

    /// Undo a failed write and build the error describing it
    fn fail(&self, path: &Path, reason: String, backup: Option<&Path>, existed: bool) -> TemplaterError {
        let restore = match backup {
            Some(backup) => self.store.restore_from(path, backup).map(|()| true),
            // new file: nothing to restore, drop the partial output
            None if !existed => match self.fs.remove(path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
                Err(e) => Err(TemplaterError::io(path, e)),
            },
            None => Ok(false),
        };

        let (restored, restore_error) = match restore {
            Ok(restored) => (restored, None),
            Err(e) => (false, Some(e.to_string())),
        };
        warn!(path = %path.display(), %reason, restored, "write failed");

        TemplaterError::Write {
            path: path.to_path_buf(),
            reason,
            restored,
            restore_error,
        }
    }

    fn lock(&self, path: &Path) -> TemplaterResult<PathLock> {
        let dir = self.store.backup_dir_for(path);
        std::fs::create_dir_all(&dir).map_err(|e| TemplaterError::io(&dir, e))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let lock_path = dir.join(format!(".{}.lock", name));
        let file = File::create(&lock_path).map_err(|e| TemplaterError::io(&lock_path, e))?;
        file.lock_exclusive()
            .map_err(|e| TemplaterError::io(&lock_path, e))?;
        Ok(PathLock { file })
    }
}

fn content_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("sha256:{:x}", hasher.finalize())
}

fn reason_of(err: &TemplaterError) -> String {
    match err {
        TemplaterError::Write { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}
