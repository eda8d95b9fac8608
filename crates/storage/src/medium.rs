//! Backing media for store checkpoints.
//!
//! A `Medium` holds the last checkpointed snapshot of a store as an opaque
//! byte blob. The store never reads the medium outside `open` and never
//! writes it outside `checkpoint`.

use quiver_core::{Error, Result};
use std::cell::{Cell, RefCell};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Durable storage for store snapshots.
pub trait Medium {
    /// Reads the last stored snapshot, `None` if nothing was stored yet.
    fn load(&self) -> Result<Option<Vec<u8>>>;

    /// Replaces the stored snapshot.
    fn store(&mut self, bytes: &[u8]) -> Result<()>;

    /// Human-readable location, used in log output.
    fn describe(&self) -> String;
}

/// A medium backed by a single file, replaced atomically on every store.
#[derive(Clone, Debug)]
pub struct FileMedium {
    path: PathBuf,
}

impl FileMedium {
    /// Creates a file medium at the given path. The file is not touched until
    /// the first load or store.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_atomically(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let temp = self.temp_path();
        let written = fs::File::create(&temp).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });
        let result = written.and_then(|()| fs::rename(&temp, &self.path));
        if result.is_err() {
            // A partial temp file must not outlive the failed store.
            let _ = fs::remove_file(&temp);
        }
        result
    }
}

impl Medium for FileMedium {
    fn load(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::persistence(format!(
                "failed to read {}: {}",
                self.path.display(),
                err
            ))),
        }
    }

    fn store(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_atomically(bytes).map_err(|err| {
            Error::persistence(format!("failed to write {}: {}", self.path.display(), err))
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// An in-memory medium.
///
/// Clones share the same contents, so a test can keep one handle, give the
/// other to a store, and reopen a second store from it later. `set_failing`
/// makes every subsequent load and store fail.
#[derive(Clone, Debug, Default)]
pub struct MemoryMedium {
    data: Rc<RefCell<Option<Vec<u8>>>>,
    failing: Rc<Cell<bool>>,
    writes: Rc<Cell<usize>>,
}

impl MemoryMedium {
    /// Creates an empty in-memory medium.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches simulated I/O failure on or off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    /// Returns a copy of the stored snapshot.
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.data.borrow().clone()
    }

    /// Overwrites the stored snapshot directly.
    pub fn set_contents(&self, bytes: Vec<u8>) {
        *self.data.borrow_mut() = Some(bytes);
    }

    /// Returns how many snapshots were successfully stored.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl Medium for MemoryMedium {
    fn load(&self) -> Result<Option<Vec<u8>>> {
        if self.failing.get() {
            return Err(Error::persistence("simulated read failure"));
        }
        Ok(self.data.borrow().clone())
    }

    fn store(&mut self, bytes: &[u8]) -> Result<()> {
        if self.failing.get() {
            return Err(Error::persistence("simulated write failure"));
        }
        *self.data.borrow_mut() = Some(bytes.to_vec());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_medium_shares_contents() {
        let medium = MemoryMedium::new();
        let mut handle = medium.clone();
        assert_eq!(medium.load().unwrap(), None);
        handle.store(b"snapshot").unwrap();
        assert_eq!(medium.load().unwrap(), Some(b"snapshot".to_vec()));
        assert_eq!(medium.write_count(), 1);
    }

    #[test]
    fn test_memory_medium_failure() {
        let mut medium = MemoryMedium::new();
        medium.set_failing(true);
        assert!(matches!(medium.store(b"x"), Err(Error::Persistence { .. })));
        assert!(medium.load().is_err());
        medium.set_failing(false);
        assert!(medium.store(b"x").is_ok());
    }

    #[test]
    fn test_file_medium_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut medium = FileMedium::new(dir.path().join("nested").join("items.json"));
        assert_eq!(medium.load().unwrap(), None);
        medium.store(b"{}").unwrap();
        assert_eq!(medium.load().unwrap(), Some(b"{}".to_vec()));
        assert!(!medium.temp_path().exists());
    }

    #[test]
    fn test_file_medium_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let mut medium = FileMedium::new(blocker.join("items.json"));
        assert!(matches!(medium.store(b"{}"), Err(Error::Persistence { .. })));
    }

    #[test]
    fn test_file_medium_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("items.json");
        // A non-empty directory at the target path makes the rename fail
        // after the temp file was written and synced.
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();
        let mut medium = FileMedium::new(target.clone());
        assert!(matches!(medium.store(b"{}"), Err(Error::Persistence { .. })));
        assert!(!medium.temp_path().exists());
        assert!(target.join("keep").exists());
    }
}
