//! The storage backend contract.
//!
//! A backend is a flat `event id -> bytes` map over some medium. Calls are
//! synchronous from the caller's point of view; remote backends hide their
//! async clients behind a private runtime.

use std::sync::Arc;

use crate::error::StorageError;

/// A medium that can hold checkpoint payloads keyed by event id.
///
/// Implementations must be idempotent: writing the same key twice leaves the
/// latest value, and removing an absent key succeeds.
pub trait StorageBackend: Send + Sync {
    /// Short human-readable name used in log fields.
    fn name(&self) -> &'static str;

    /// Store `payload` under `event_id`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] on a medium failure.
    fn put(&self, event_id: u64, payload: &[u8]) -> Result<(), StorageError>;

    /// Fetch the payload stored under `event_id`.
    ///
    /// Returns `Ok(None)` when the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] only on a medium failure.
    fn get(&self, event_id: u64) -> Result<Option<Vec<u8>>, StorageError>;

    /// Delete the payload stored under `event_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] on a medium failure.
    fn remove(&self, event_id: u64) -> Result<(), StorageError>;
}

impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn put(&self, event_id: u64, payload: &[u8]) -> Result<(), StorageError> {
        (**self).put(event_id, payload)
    }

    fn get(&self, event_id: u64) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(event_id)
    }

    fn remove(&self, event_id: u64) -> Result<(), StorageError> {
        (**self).remove(event_id)
    }
}

impl<T: StorageBackend + ?Sized> StorageBackend for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn put(&self, event_id: u64, payload: &[u8]) -> Result<(), StorageError> {
        (**self).put(event_id, payload)
    }

    fn get(&self, event_id: u64) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(event_id)
    }

    fn remove(&self, event_id: u64) -> Result<(), StorageError> {
        (**self).remove(event_id)
    }
}
