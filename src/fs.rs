//! File system port
//!
//! Every component that touches the disk (caches, the reliability layer, the
//! engine's key scan) goes through [`FileSystem`], so tests can count reads or
//! inject failing writes without touching real files.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Abstract file system interface
///
/// Implementations:
/// - [`LocalFs`] - standard file I/O with atomic writes
/// - `MemoryFs` - in-memory double for unit tests
pub trait FileSystem: Send + Sync {
    /// Read file content as raw bytes
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Modification time of the file
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Replace file content atomically
    fn write(&self, path: &Path, content: &[u8]) -> io::Result<()>;

    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and parents
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// List the entries of a directory
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Remove a file
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Local file system implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    /// Create a new LocalFs instance
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    fn write(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        // tempfile + rename so readers never observe a half-written file
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(content)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            entries.push(entry?.path());
        }
        Ok(entries)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// In-memory file system for unit tests
///
/// Modification times come from a logical clock that advances on every
/// write, so two writes never share a timestamp.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MemoryFs {
    inner: std::sync::Arc<std::sync::Mutex<MemoryFsState>>,
}

#[cfg(test)]
#[derive(Default)]
struct MemoryFsState {
    files: std::collections::HashMap<PathBuf, (Vec<u8>, SystemTime)>,
    reads: std::collections::HashMap<PathBuf, usize>,
    tick: u64,
}

#[cfg(test)]
impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a file, advancing its modification time
    pub fn insert(&self, path: impl Into<PathBuf>, content: &str) {
        self.write(&path.into(), content.as_bytes()).unwrap();
    }

    /// Bump a file's modification time without touching its bytes
    pub fn touch(&self, path: &Path) {
        let mut state = self.inner.lock().unwrap();
        state.tick += 1;
        let stamp = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(state.tick);
        if let Some(entry) = state.files.get_mut(path) {
            entry.1 = stamp;
        }
    }

    /// Number of `read` calls made for a path
    pub fn reads(&self, path: &Path) -> usize {
        let state = self.inner.lock().unwrap();
        state.reads.get(path).copied().unwrap_or(0)
    }
}

#[cfg(test)]
fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found", path.display()),
    )
}

#[cfg(test)]
impl FileSystem for MemoryFs {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut state = self.inner.lock().unwrap();
        *state.reads.entry(path.to_path_buf()).or_insert(0) += 1;
        state
            .files
            .get(path)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| not_found(path))
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        let state = self.inner.lock().unwrap();
        state
            .files
            .get(path)
            .map(|(_, mtime)| *mtime)
            .ok_or_else(|| not_found(path))
    }

    fn write(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.tick += 1;
        let stamp = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(state.tick);
        state
            .files
            .insert(path.to_path_buf(), (content.to_vec(), stamp));
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.lock().unwrap().files.contains_key(path)
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .files
            .keys()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let mut state = self.inner.lock().unwrap();
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn local_fs_write_and_read() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.txt");
        let fs = LocalFs::new();

        fs.write(&file, b"hello world").unwrap();

        assert_eq!(fs.read(&file).unwrap(), b"hello world");
    }

    #[test]
    fn local_fs_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("nested").join("dir").join("test.txt");
        let fs = LocalFs::new();

        fs.write(&file, b"content").unwrap();

        assert!(file.exists());
    }

    #[test]
    fn local_fs_write_overwrites() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.txt");
        std::fs::write(&file, "Original").unwrap();

        LocalFs::new().write(&file, b"Replaced").unwrap();

        assert_eq!(std::fs::read_to_string(&file).unwrap(), "Replaced");
    }

    #[test]
    fn local_fs_read_dir_and_remove() {
        let dir = tempdir().unwrap();
        let fs = LocalFs::new();
        fs.write(&dir.path().join("a.txt"), b"a").unwrap();
        fs.write(&dir.path().join("b.txt"), b"b").unwrap();

        let mut entries = fs.read_dir(dir.path()).unwrap();
        entries.sort();
        assert_eq!(entries.len(), 2);

        fs.remove(&entries[0]).unwrap();
        assert!(!fs.exists(&entries[0]));
    }

    #[test]
    fn memory_fs_counts_reads_and_advances_mtime() {
        let fs = MemoryFs::new();
        let path = PathBuf::from("/mem/a.tmpl");
        fs.insert(&path, "x");
        let first = fs.modified(&path).unwrap();

        fs.read(&path).unwrap();
        fs.touch(&path);

        assert_eq!(fs.reads(&path), 1);
        assert!(fs.modified(&path).unwrap() > first);
    }
}
