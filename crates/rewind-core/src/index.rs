//! Sorted checkpoint index with floor lookup and pruning.
//!
//! The index holds the ids that have a persisted checkpoint, sorted and
//! duplicate-free. Payload bytes live in the storage backend; the index only
//! knows which ids should be there. When the two disagree (an indexed id
//! whose payload has gone missing) the lookup reports
//! [`IndexError::CheckpointCorrupted`] and forgets the stale id.

use rewind_storage::{StorageBackend, StorageError, TieredRouter};
use tracing::{debug, info, warn};

/// A checkpoint payload and the event id it was taken at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// Event id of the snapshot.
    pub event_id: u64,
    /// Encoded state.
    pub payload: Vec<u8>,
}

/// Errors raised by the checkpoint index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The storage backend failed.
    #[error(transparent)]
    Storage {
        /// The backend error.
        #[from]
        source: StorageError,
    },

    /// A checkpoint payload was empty; storage layers treat empty values as
    /// absent, so it could never be read back.
    #[error("checkpoint {event_id} has an empty payload")]
    EmptyPayload {
        /// The id that was rejected.
        event_id: u64,
    },

    /// An indexed checkpoint has no payload in any storage layer.
    #[error("checkpoint {event_id} is indexed but missing from storage")]
    CheckpointCorrupted {
        /// The id that was dropped from the index.
        event_id: u64,
    },
}

/// Sorted set of checkpointed event ids over a storage backend.
#[derive(Debug)]
pub struct CheckpointIndex<S = TieredRouter> {
    storage: S,
    entries: Vec<u64>,
}

impl<S: StorageBackend> CheckpointIndex<S> {
    /// Create an empty index over `storage`.
    pub const fn new(storage: S) -> Self {
        Self {
            storage,
            entries: Vec::new(),
        }
    }

    /// Persist `payload` under `event_id` and index it.
    ///
    /// Saving an id again overwrites its payload; the index keeps a single
    /// entry. The id is only indexed once the write has succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::EmptyPayload`] for an empty `payload`, leaving
    /// storage and the index untouched, or [`IndexError::Storage`] if the
    /// backend write fails.
    pub fn save(&mut self, event_id: u64, payload: &[u8]) -> Result<(), IndexError> {
        if payload.is_empty() {
            return Err(IndexError::EmptyPayload { event_id });
        }
        self.storage.put(event_id, payload)?;

        // Ids usually arrive in increasing order.
        if self.entries.last().is_none_or(|&last| last < event_id) {
            self.entries.push(event_id);
        } else if let Err(position) = self.entries.binary_search(&event_id) {
            self.entries.insert(position, event_id);
        }
        debug!(event_id, bytes = payload.len(), "Checkpoint saved");
        Ok(())
    }

    /// Largest indexed id that is `<= target`, without touching storage.
    pub fn floor_entry(&self, target: u64) -> Option<u64> {
        let position = self.entries.partition_point(|&id| id <= target);
        position
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .copied()
    }

    /// Fetch the checkpoint with the largest id `<= target`.
    ///
    /// Returns `Ok(None)` when no checkpoint precedes `target`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::CheckpointCorrupted`] if the floor id is indexed
    /// but no storage layer has its payload; the id is removed from the index
    /// so a retry falls through to the next older checkpoint. Returns
    /// [`IndexError::Storage`] on a backend read failure.
    pub fn floor_lookup(&mut self, target: u64) -> Result<Option<Checkpoint>, IndexError> {
        let position = self.entries.partition_point(|&id| id <= target);
        let Some(slot) = position.checked_sub(1) else {
            return Ok(None);
        };
        let Some(&event_id) = self.entries.get(slot) else {
            return Ok(None);
        };

        if let Some(payload) = self.storage.get(event_id)? {
            return Ok(Some(Checkpoint { event_id, payload }));
        }

        self.entries.remove(slot);
        warn!(
            event_id,
            target_event = target,
            "Indexed checkpoint missing from storage, dropped from index"
        );
        Err(IndexError::CheckpointCorrupted { event_id })
    }

    /// Remove checkpoints older than `current_event - retention_window`.
    ///
    /// The checkpoint a floor lookup for `current_event` would select is
    /// always kept, even when it is older than the window. Returns the number
    /// of entries removed from the index.
    ///
    /// # Errors
    ///
    /// Returns the first [`IndexError::Storage`] raised while deleting
    /// payloads. The pruned ids are dropped from the index regardless.
    pub fn prune(
        &mut self,
        current_event: u64,
        retention_window: u64,
    ) -> Result<usize, IndexError> {
        let keep_from = current_event.saturating_sub(retention_window);
        let mut cut = self.entries.partition_point(|&id| id < keep_from);
        let floor = self.entries.partition_point(|&id| id <= current_event);
        if let Some(floor_slot) = floor.checked_sub(1) {
            cut = cut.min(floor_slot);
        }
        if cut == 0 {
            return Ok(0);
        }

        let mut first_error = None;
        for event_id in self.entries.drain(..cut) {
            if let Err(err) = self.storage.remove(event_id) {
                warn!(event_id, %err, "Failed to delete pruned checkpoint payload");
                first_error.get_or_insert(err);
            }
        }
        info!(
            current_event,
            keep_from,
            pruned = cut,
            remaining = self.entries.len(),
            "Pruned checkpoints"
        );

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(cut),
        }
    }

    /// Whether `event_id` is indexed.
    pub fn contains(&self, event_id: u64) -> bool {
        self.entries.binary_search(&event_id).is_ok()
    }

    /// Indexed ids in ascending order.
    pub const fn entries(&self) -> &[u64] {
        self.entries.as_slice()
    }

    /// The most recent indexed id.
    pub fn latest(&self) -> Option<u64> {
        self.entries.last().copied()
    }

    /// Number of indexed checkpoints.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The storage backend behind the index.
    pub const fn storage(&self) -> &S {
        &self.storage
    }
}
