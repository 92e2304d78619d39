//! Timestamped backups in a sibling directory

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{Local, NaiveDateTime};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{TemplaterError, TemplaterResult};
use crate::fs::FileSystem;

use super::BACKUP_DIR_NAME;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TIMESTAMP_LEN: usize = 15;
const DIRECTORY_KEY_LEN: usize = 12;

/// Creates, lists, restores and prunes backups of destination files
///
/// Backups of `dir/name` live in `dir/.templater_backups/` (or under a
/// per-directory subfolder of a configured directory) as
/// `name_<YYYYmmdd_HHMMSS>.bak`.
#[derive(Clone)]
pub struct BackupStore {
    fs: Arc<dyn FileSystem>,
    backup_dir: Option<PathBuf>,
}

impl BackupStore {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            backup_dir: None,
        }
    }

    /// Keep every backup in `dir` instead of next to the destination
    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    /// Directory holding the backups and lock file of `path`
    ///
    /// A shared backup directory gets one subdirectory per destination
    /// directory, so same-named outputs in different places never mix.
    pub fn backup_dir_for(&self, path: &Path) -> PathBuf {
        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        match &self.backup_dir {
            Some(dir) => dir.join(directory_key(parent)),
            None => parent.join(BACKUP_DIR_NAME),
        }
    }

    /// Copy the current content of `path`; `None` when the file does not exist
    pub fn backup(&self, path: &Path) -> TemplaterResult<Option<PathBuf>> {
        if !self.fs.exists(path) {
            return Ok(None);
        }

        let dir = self.backup_dir_for(path);
        self.fs
            .create_dir_all(&dir)
            .map_err(|e| TemplaterError::io(&dir, e))?;

        let content = self.fs.read(path).map_err(|e| TemplaterError::io(path, e))?;
        let stem = format!(
            "{}_{}",
            base_name(path),
            Local::now().format(TIMESTAMP_FORMAT)
        );
        let mut backup_path = dir.join(format!("{}.bak", stem));
        let mut n = 1;
        while self.fs.exists(&backup_path) {
            backup_path = dir.join(format!("{}_{}.bak", stem, n));
            n += 1;
        }

        self.fs
            .write(&backup_path, &content)
            .map_err(|e| TemplaterError::io(&backup_path, e))?;
        debug!(path = %path.display(), backup = %backup_path.display(), "created backup");
        Ok(Some(backup_path))
    }

    /// Backups of `path`, oldest first
    pub fn list_backups(&self, path: &Path) -> TemplaterResult<Vec<PathBuf>> {
        let dir = self.backup_dir_for(path);
        let entries = match self.fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(TemplaterError::io(&dir, e)),
        };

        let base = base_name(path);
        let mut backups: Vec<(SystemTime, PathBuf)> = entries
            .into_iter()
            .filter(|entry| is_backup_of(entry, &base))
            .filter_map(|entry| {
                let modified = self.fs.modified(&entry).ok()?;
                Some((modified, entry))
            })
            .collect();
        backups.sort();
        Ok(backups.into_iter().map(|(_, p)| p).collect())
    }

    /// Restore the most recently modified backup of `path`
    pub fn restore_latest(&self, path: &Path) -> TemplaterResult<PathBuf> {
        let latest = self
            .list_backups(path)?
            .pop()
            .ok_or_else(|| TemplaterError::io(path, not_found("no backups found")))?;
        self.restore_from(path, &latest)?;
        Ok(latest)
    }

    /// Replace `path` with the content of `backup`
    pub fn restore_from(&self, path: &Path, backup: &Path) -> TemplaterResult<()> {
        let content = self
            .fs
            .read(backup)
            .map_err(|e| TemplaterError::io(backup, e))?;
        self.fs
            .write(path, &content)
            .map_err(|e| TemplaterError::io(path, e))?;
        debug!(path = %path.display(), backup = %backup.display(), "restored from backup");
        Ok(())
    }

    /// Remove backups of `path` older than `max_age`, returning the count
    pub fn prune_backups(&self, path: &Path, max_age: Duration) -> TemplaterResult<usize> {
        let now = SystemTime::now();
        let mut removed = 0;
        for backup in self.list_backups(path)? {
            let modified = self
                .fs
                .modified(&backup)
                .map_err(|e| TemplaterError::io(&backup, e))?;
            let age = now.duration_since(modified).unwrap_or_default();
            if age > max_age {
                self.fs
                    .remove(&backup)
                    .map_err(|e| TemplaterError::io(&backup, e))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Byte-for-byte comparison of `path` against `expected`
    pub fn verify(&self, path: &Path, expected: &[u8]) -> TemplaterResult<()> {
        let actual = self.fs.read(path).map_err(|e| TemplaterError::io(path, e))?;
        if actual != expected {
            return Err(TemplaterError::Write {
                path: path.to_path_buf(),
                reason: "integrity check failed: content mismatch".to_string(),
                restored: false,
                restore_error: None,
            });
        }
        Ok(())
    }
}

/// Short stable hash of a directory's absolute form
fn directory_key(dir: &Path) -> String {
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    let abs = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(abs.to_string_lossy().as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..DIRECTORY_KEY_LEN].to_string()
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn not_found(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, message.to_string())
}

/// `<base>_<YYYYmmdd_HHMMSS>.bak`, optionally with a `_<n>` collision suffix
fn is_backup_of(entry: &Path, base: &str) -> bool {
    let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(rest) = name
        .strip_prefix(base)
        .and_then(|r| r.strip_prefix('_'))
        .and_then(|r| r.strip_suffix(".bak"))
    else {
        return false;
    };
    if rest.len() < TIMESTAMP_LEN || !rest.is_char_boundary(TIMESTAMP_LEN) {
        return false;
    }
    let (stamp, suffix) = rest.split_at(TIMESTAMP_LEN);
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok()
        && (suffix.is_empty()
            || suffix
                .strip_prefix('_')
                .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit())))
}
