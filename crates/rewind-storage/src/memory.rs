//! In-process memory backend.
//!
//! The fastest tier. Payloads live in a map guarded by an [`RwLock`]; a
//! poisoned lock surfaces as a storage error rather than a panic.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::backend::StorageBackend;
use crate::error::StorageError;

/// Checkpoint payloads held in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<u64, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create an empty memory store.
    pub const fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of payloads currently held. Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    /// Whether the store holds no payloads.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a payload is stored under `event_id`.
    pub fn contains(&self, event_id: u64) -> bool {
        self.entries
            .read()
            .is_ok_and(|entries| entries.contains_key(&event_id))
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn put(&self, event_id: u64, payload: &[u8]) -> Result<(), StorageError> {
        let Ok(mut entries) = self.entries.write() else {
            return Err(StorageError::write(event_id, "memory store lock poisoned"));
        };
        entries.insert(event_id, payload.to_vec());
        Ok(())
    }

    fn get(&self, event_id: u64) -> Result<Option<Vec<u8>>, StorageError> {
        let Ok(entries) = self.entries.read() else {
            return Err(StorageError::read(event_id, "memory store lock poisoned"));
        };
        Ok(entries.get(&event_id).cloned())
    }

    fn remove(&self, event_id: u64) -> Result<(), StorageError> {
        let Ok(mut entries) = self.entries.write() else {
            return Err(StorageError::write(event_id, "memory store lock poisoned"));
        };
        entries.remove(&event_id);
        Ok(())
    }
}
