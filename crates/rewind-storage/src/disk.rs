//! Local filesystem backend.
//!
//! Each checkpoint is one file, `ckpt_{event_id}.bin`, under a configured
//! directory. Writes go to a sibling `.tmp` file first and are renamed into
//! place, so a reader never observes a half-written payload.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::backend::StorageBackend;
use crate::error::StorageError;

/// Checkpoint payloads stored as files in one directory.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Open (and create if needed) a checkpoint directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            StorageError::Config(format!(
                "cannot create checkpoint directory {}: {e}",
                root.display()
            ))
        })?;
        tracing::debug!(path = %root.display(), "Opened disk checkpoint store");
        Ok(Self { root })
    }

    /// The directory holding checkpoint files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, event_id: u64) -> PathBuf {
        self.root.join(format!("ckpt_{event_id}.bin"))
    }
}

impl StorageBackend for DiskStorage {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn put(&self, event_id: u64, payload: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(event_id);
        let tmp = path.with_extension("bin.tmp");
        fs::write(&tmp, payload).map_err(|e| StorageError::write(event_id, e))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::write(event_id, e))?;
        Ok(())
    }

    fn get(&self, event_id: u64) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.path_for(event_id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::read(event_id, e)),
        }
    }

    fn remove(&self, event_id: u64) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(event_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::write(event_id, e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStorage::open(dir.path()).unwrap();

        store.put(42, b"payload").unwrap();
        assert!(dir.path().join("ckpt_42.bin").exists());
        assert_eq!(store.get(42).unwrap().as_deref(), Some(&b"payload"[..]));
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStorage::open(dir.path()).unwrap();
        assert_eq!(store.get(9).unwrap(), None);
    }

    #[test]
    fn remove_missing_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStorage::open(dir.path()).unwrap();
        store.put(5, b"x").unwrap();
        store.remove(5).unwrap();
        store.remove(5).unwrap();
        assert_eq!(store.get(5).unwrap(), None);
    }

    #[test]
    fn open_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = DiskStorage::open(&nested).unwrap();
        assert!(store.root().is_dir());
    }
}
