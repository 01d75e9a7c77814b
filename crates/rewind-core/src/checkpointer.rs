//! The checkpointing facade used by simulations.
//!
//! [`Checkpointer`] wires a [`CheckpointScheduler`], a [`CheckpointIndex`]
//! and a [`SnapshotCodec`] together:
//!
//! ```text
//! event --> should_checkpoint --yes--> save_checkpoint --> encode --> index.save --> router.put
//! rollback(target) --> index.floor_lookup --> router.get --> decode --> record_rollback(depth)
//! ```
//!
//! One checkpointer serves one simulation and expects to be driven in event
//! order. Use [`SharedCheckpointer`](crate::SharedCheckpointer) when several
//! threads need the same instance.

use rewind_codec::{CodecError, SnapshotCodec};
use rewind_storage::{StorageBackend, StorageError, TieredRouter};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::config::{CheckpointConfig, RewindConfig};
use crate::controller::ControllerError;
use crate::index::{Checkpoint, CheckpointIndex, IndexError};
use crate::report::{CheckpointReport, RollbackStats};
use crate::scheduler::CheckpointScheduler;

/// Errors surfaced by [`Checkpointer`] operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// State could not be encoded or decoded.
    #[error(transparent)]
    Codec {
        /// The codec error.
        #[from]
        source: CodecError,
    },

    /// The index or its storage failed, or a checkpoint is corrupted.
    #[error(transparent)]
    Index {
        /// The index error.
        #[from]
        source: IndexError,
    },

    /// The checkpoint configuration is invalid.
    #[error(transparent)]
    Controller {
        /// The controller error.
        #[from]
        source: ControllerError,
    },

    /// The storage tiers could not be built.
    #[error(transparent)]
    Storage {
        /// The storage error.
        #[from]
        source: StorageError,
    },

    /// A thread panicked while holding the shared checkpointer.
    #[error("checkpointer lock poisoned")]
    Poisoned,
}

impl CheckpointError {
    /// The corrupted event id, if this error reports a missing payload.
    pub const fn corrupted_event(&self) -> Option<u64> {
        match self {
            Self::Index {
                source: IndexError::CheckpointCorrupted { event_id },
            } => Some(*event_id),
            _ => None,
        }
    }
}

/// State restored from a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored<T> {
    /// Event id the checkpoint was taken at.
    pub event_id: u64,
    /// Events between the checkpoint and the rollback target.
    pub depth: u64,
    /// The decoded state.
    pub state: T,
}

/// Adaptive checkpointing over a storage backend.
pub struct Checkpointer<S = TieredRouter> {
    scheduler: CheckpointScheduler,
    index: CheckpointIndex<S>,
    codec: SnapshotCodec,
    retention_multiplier: u64,
    saved: u64,
    pruned: u64,
    corrupted: u64,
}

impl Checkpointer<TieredRouter> {
    /// Build a checkpointer with the storage tiers and codec described by
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Controller`] for an invalid checkpoint
    /// section and [`CheckpointError::Storage`] if a backend cannot be built.
    pub fn from_config(config: &RewindConfig) -> Result<Self, CheckpointError> {
        let router = config.storage.build()?;
        info!(
            layers = router.layers().len(),
            base_interval = config.checkpoint.base_interval,
            max_levels = config.checkpoint.max_levels,
            compression = ?config.codec.compression,
            "Checkpointer configured"
        );
        Self::new(
            &config.checkpoint,
            router,
            SnapshotCodec::new(config.codec.clone()),
        )
    }
}

impl<S: StorageBackend> Checkpointer<S> {
    /// Create a checkpointer over `storage`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Controller`] if `config` is invalid.
    pub fn new(
        config: &CheckpointConfig,
        storage: S,
        codec: SnapshotCodec,
    ) -> Result<Self, CheckpointError> {
        Ok(Self {
            scheduler: CheckpointScheduler::new(config)?,
            index: CheckpointIndex::new(storage),
            codec,
            retention_multiplier: config.retention_multiplier,
            saved: 0,
            pruned: 0,
            corrupted: 0,
        })
    }

    /// Whether `event_id` should be checkpointed.
    pub fn should_checkpoint(&mut self, event_id: u64) -> bool {
        self.scheduler.should_checkpoint(event_id)
    }

    /// Encode `state` and store it as the checkpoint for `event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Codec`] if the state cannot be encoded and
    /// [`CheckpointError::Index`] if the write fails.
    pub fn save_checkpoint<T: Serialize + ?Sized>(
        &mut self,
        event_id: u64,
        state: &T,
    ) -> Result<(), CheckpointError> {
        let payload = self.codec.encode(state)?;
        self.save_encoded(event_id, &payload)
    }

    /// Store an already encoded payload as the checkpoint for `event_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Index`] if `payload` is empty or the write
    /// fails.
    pub fn save_encoded(&mut self, event_id: u64, payload: &[u8]) -> Result<(), CheckpointError> {
        self.index.save(event_id, payload)?;
        self.saved = self.saved.saturating_add(1);
        Ok(())
    }

    /// Fetch the raw checkpoint at or before `target`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Index`] on storage failure or when the
    /// floor checkpoint is corrupted (see [`CheckpointError::corrupted_event`]).
    pub fn last_encoded(&mut self, target: u64) -> Result<Option<Checkpoint>, CheckpointError> {
        match self.index.floor_lookup(target) {
            Ok(found) => Ok(found),
            Err(err) => {
                if matches!(err, IndexError::CheckpointCorrupted { .. }) {
                    self.corrupted = self.corrupted.saturating_add(1);
                }
                Err(err.into())
            }
        }
    }

    /// Decode the checkpoint at or before `target`.
    ///
    /// Returns `Ok(None)` when no checkpoint precedes `target`. Does not
    /// record a rollback.
    ///
    /// # Errors
    ///
    /// As [`last_encoded`](Self::last_encoded), plus
    /// [`CheckpointError::Codec`] if the payload does not decode.
    pub fn last_checkpoint<T: DeserializeOwned>(
        &mut self,
        target: u64,
    ) -> Result<Option<Restored<T>>, CheckpointError> {
        let Some(checkpoint) = self.last_encoded(target)? else {
            return Ok(None);
        };
        let state = self.codec.decode(&checkpoint.payload)?;
        Ok(Some(Restored {
            event_id: checkpoint.event_id,
            depth: target.saturating_sub(checkpoint.event_id),
            state,
        }))
    }

    /// Restore the state at or before `target` and record the rollback.
    ///
    /// The realized depth is the distance from the restored checkpoint to
    /// `target`. When nothing precedes `target`, replay starts from the
    /// beginning and the depth recorded is `target` itself.
    ///
    /// Checkpoints with ids above `target` are left in the index. Once the
    /// replay passes them a floor lookup can return one of those states from
    /// the abandoned run, unless they are overwritten by a new save at the
    /// same id first.
    ///
    /// # Errors
    ///
    /// As [`last_checkpoint`](Self::last_checkpoint). A corrupted checkpoint
    /// is dropped from the index, so calling again rolls back further.
    pub fn roll_back_to<T: DeserializeOwned>(
        &mut self,
        target: u64,
    ) -> Result<Option<Restored<T>>, CheckpointError> {
        let restored = self.last_checkpoint(target)?;
        let depth = restored.as_ref().map_or(target, |r| r.depth);
        self.scheduler.record_rollback(depth);
        match &restored {
            Some(r) => info!(
                target_event = target,
                checkpoint = r.event_id,
                depth,
                "Rolled back"
            ),
            None => warn!(
                target_event = target,
                "No checkpoint before rollback target, replaying from start"
            ),
        }
        Ok(restored)
    }

    /// Report a rollback depth observed outside [`roll_back_to`](Self::roll_back_to).
    pub fn record_rollback(&mut self, depth: u64) {
        self.scheduler.record_rollback(depth);
    }

    /// Retention window used by [`optimize_storage`](Self::optimize_storage):
    /// `retention_multiplier * max(levels)`.
    pub fn retention_window(&self) -> u64 {
        self.scheduler
            .levels()
            .max()
            .unwrap_or_else(|| self.scheduler.controller().base_interval())
            .saturating_mul(self.retention_multiplier)
    }

    /// Prune checkpoints that fell out of the retention window.
    ///
    /// Returns the number of checkpoints removed.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Index`] if a payload could not be deleted.
    pub fn optimize_storage(&mut self, current_event: u64) -> Result<usize, CheckpointError> {
        let window = self.retention_window();
        let before = self.index.len();
        let result = self.index.prune(current_event, window);
        let removed = before.saturating_sub(self.index.len());
        self.pruned = self
            .pruned
            .saturating_add(u64::try_from(removed).unwrap_or(u64::MAX));
        result.map_err(CheckpointError::from)
    }

    /// Current counters and adaptive state.
    pub fn report(&self) -> CheckpointReport {
        let controller = self.scheduler.controller();
        CheckpointReport {
            checkpoints_saved: self.saved,
            checkpoints_retained: self.index.len(),
            latest_checkpoint: self.index.latest(),
            corrupted_lookups: self.corrupted,
            pruned: self.pruned,
            rollbacks: RollbackStats {
                recorded: controller.recorded(),
                in_window: controller.history_len(),
                avg_depth: controller.mean_depth(),
                min_depth: controller.min_depth(),
                max_depth: controller.max_depth(),
            },
            levels: self.scheduler.levels().as_slice().to_vec(),
            last_adaptation_event: self.scheduler.last_adaptation_event(),
        }
    }

    /// The scheduler deciding checkpoint placement.
    pub const fn scheduler(&self) -> &CheckpointScheduler {
        &self.scheduler
    }

    /// The checkpoint index.
    pub const fn index(&self) -> &CheckpointIndex<S> {
        &self.index
    }

    /// The state codec.
    pub const fn codec(&self) -> &SnapshotCodec {
        &self.codec
    }
}
