//! Error types for the storage layer.
//!
//! Every backend reports failures through [`StorageError`]. A missing key is
//! never an error: backends return `Ok(None)` for absent checkpoints so the
//! index can tell "not stored" apart from "medium failed".

/// Errors that can occur in a storage backend or the tiered router.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Writing (or deleting) a checkpoint payload failed.
    #[error("storage write failed for event {event_id}: {reason}")]
    Write {
        /// The event id being written.
        event_id: u64,
        /// Description of the medium failure.
        reason: String,
    },

    /// Reading a checkpoint payload failed for a reason other than absence.
    #[error("storage read failed for event {event_id}: {reason}")]
    Read {
        /// The event id being read.
        event_id: u64,
        /// Description of the medium failure.
        reason: String,
    },

    /// A backend could not be constructed from its configuration.
    #[error("storage configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Build a [`StorageError::Write`] from any displayable cause.
    pub fn write(event_id: u64, cause: impl std::fmt::Display) -> Self {
        Self::Write {
            event_id,
            reason: cause.to_string(),
        }
    }

    /// Build a [`StorageError::Read`] from any displayable cause.
    pub fn read(event_id: u64, cause: impl std::fmt::Display) -> Self {
        Self::Read {
            event_id,
            reason: cause.to_string(),
        }
    }
}
