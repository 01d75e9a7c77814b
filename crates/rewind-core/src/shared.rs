//! Thread-safe handle around a [`Checkpointer`].
//!
//! Index entries and rollback history are the only mutable state, so one
//! mutex per checkpointer guards all of it. Every call holds the lock for
//! the whole operation, including the backend I/O.

use std::sync::{Arc, Mutex, MutexGuard};

use rewind_storage::{StorageBackend, TieredRouter};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::checkpointer::{CheckpointError, Checkpointer, Restored};
use crate::report::CheckpointReport;

/// Cloneable, `Mutex`-guarded [`Checkpointer`].
pub struct SharedCheckpointer<S = TieredRouter> {
    inner: Arc<Mutex<Checkpointer<S>>>,
}

impl<S> Clone for SharedCheckpointer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: StorageBackend> SharedCheckpointer<S> {
    /// Wrap a checkpointer for shared use.
    pub fn new(checkpointer: Checkpointer<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(checkpointer)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Checkpointer<S>>, CheckpointError> {
        let Ok(guard) = self.inner.lock() else {
            return Err(CheckpointError::Poisoned);
        };
        Ok(guard)
    }

    /// Run `f` with exclusive access to the checkpointer.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Poisoned`] if another holder panicked.
    pub fn with<R>(&self, f: impl FnOnce(&mut Checkpointer<S>) -> R) -> Result<R, CheckpointError> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }

    /// See [`Checkpointer::should_checkpoint`].
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Poisoned`] if another holder panicked.
    pub fn should_checkpoint(&self, event_id: u64) -> Result<bool, CheckpointError> {
        Ok(self.lock()?.should_checkpoint(event_id))
    }

    /// See [`Checkpointer::save_checkpoint`].
    ///
    /// # Errors
    ///
    /// As [`Checkpointer::save_checkpoint`], plus [`CheckpointError::Poisoned`].
    pub fn save_checkpoint<T: Serialize + ?Sized>(
        &self,
        event_id: u64,
        state: &T,
    ) -> Result<(), CheckpointError> {
        self.lock()?.save_checkpoint(event_id, state)
    }

    /// See [`Checkpointer::roll_back_to`].
    ///
    /// # Errors
    ///
    /// As [`Checkpointer::roll_back_to`], plus [`CheckpointError::Poisoned`].
    pub fn roll_back_to<T: DeserializeOwned>(
        &self,
        target: u64,
    ) -> Result<Option<Restored<T>>, CheckpointError> {
        self.lock()?.roll_back_to(target)
    }

    /// See [`Checkpointer::record_rollback`].
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Poisoned`] if another holder panicked.
    pub fn record_rollback(&self, depth: u64) -> Result<(), CheckpointError> {
        self.lock()?.record_rollback(depth);
        Ok(())
    }

    /// See [`Checkpointer::optimize_storage`].
    ///
    /// # Errors
    ///
    /// As [`Checkpointer::optimize_storage`], plus [`CheckpointError::Poisoned`].
    pub fn optimize_storage(&self, current_event: u64) -> Result<usize, CheckpointError> {
        self.lock()?.optimize_storage(current_event)
    }

    /// See [`Checkpointer::report`].
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Poisoned`] if another holder panicked.
    pub fn report(&self) -> Result<CheckpointReport, CheckpointError> {
        Ok(self.lock()?.report())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::arithmetic_side_effects)]
mod tests {
    use std::thread;

    use rewind_codec::SnapshotCodec;
    use rewind_storage::MemoryStorage;

    use super::*;
    use crate::config::CheckpointConfig;

    fn shared() -> SharedCheckpointer<MemoryStorage> {
        let cp = Checkpointer::new(
            &CheckpointConfig::with_base_interval(10),
            MemoryStorage::new(),
            SnapshotCodec::default(),
        )
        .unwrap();
        SharedCheckpointer::new(cp)
    }

    #[test]
    fn threads_share_one_index() {
        let shared = shared();
        let handles: Vec<_> = (0..4_u64)
            .map(|branch| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let id = (branch + 1) * 10;
                    shared.save_checkpoint(id, &id).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let report = shared.report().unwrap();
        assert_eq!(report.checkpoints_saved, 4);
        assert_eq!(report.checkpoints_retained, 4);
        let entries = shared.with(|cp| cp.index().entries().to_vec()).unwrap();
        assert_eq!(entries, vec![10, 20, 30, 40]);
    }

    #[test]
    fn rollback_through_shared_handle() {
        let shared = shared();
        for event in 0..=25 {
            if shared.should_checkpoint(event).unwrap() {
                shared.save_checkpoint(event, &event).unwrap();
            }
        }
        let restored: Restored<u64> = shared.roll_back_to(25).unwrap().unwrap();
        assert_eq!(restored.event_id, 20);
        assert_eq!(restored.state, 20);
        assert_eq!(shared.report().unwrap().rollbacks.recorded, 1);
    }

    #[test]
    fn poisoned_lock_is_reported() {
        let shared = shared();
        let poisoner = shared.clone();
        let _ = thread::spawn(move || {
            poisoner.with(|_| -> u8 { panic!("boom") }).unwrap();
        })
        .join();
        assert!(matches!(shared.report(), Err(CheckpointError::Poisoned)));
    }
}
