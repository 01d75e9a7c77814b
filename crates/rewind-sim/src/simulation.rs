//! Toy message-passing simulation with random rollbacks.
//!
//! Each event delivers a message to a random node. The checkpointer decides
//! which events are snapshotted; with a small probability the simulation
//! rolls back a random distance and restores the nearest checkpoint.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rewind_core::{CheckpointError, CheckpointReport, Checkpointer, HarnessConfig, Restored};
use rewind_storage::{StorageBackend, TieredRouter};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SimError;

/// Per-node state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    /// Messages received.
    pub count: u64,
    /// Message log.
    pub messages: Vec<String>,
}

/// Simulation state, keyed by node name.
pub type WorldState = BTreeMap<String, NodeState>;

/// Result of a rollback attempt that skips corrupted checkpoints.
#[derive(Debug)]
pub struct Recovery<T> {
    /// The restored checkpoint, or `None` to restart from scratch.
    pub restored: Option<Restored<T>>,
    /// Corrupted checkpoints skipped along the way.
    pub corrupted: u64,
}

/// Restore the newest usable checkpoint at or before `target`.
///
/// A corrupted checkpoint is dropped from the index by the lookup, so the
/// next attempt falls back to an older one. When `record` is set the
/// realized depth is reported to the adaptive controller.
pub fn recover<S, T>(
    checkpointer: &mut Checkpointer<S>,
    target: u64,
    record: bool,
) -> Result<Recovery<T>, CheckpointError>
where
    S: StorageBackend,
    T: DeserializeOwned,
{
    let mut corrupted: u64 = 0;
    loop {
        let attempt = if record {
            checkpointer.roll_back_to(target)
        } else {
            checkpointer.last_checkpoint(target)
        };
        match attempt {
            Ok(restored) => return Ok(Recovery { restored, corrupted }),
            Err(err) => {
                let Some(event_id) = err.corrupted_event() else {
                    return Err(err);
                };
                warn!(
                    event_id,
                    target_event = target,
                    "Corrupted checkpoint, rolling back further"
                );
                corrupted = corrupted.saturating_add(1);
            }
        }
    }
}

/// Summary of a finished simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationOutcome {
    /// Events processed, including replayed ones.
    pub events_processed: u64,
    /// Logical event id at the end of the run.
    pub final_event: u64,
    /// Rollbacks triggered.
    pub rollbacks: u64,
    /// Rollbacks that found no checkpoint and restarted from scratch.
    pub resets: u64,
    /// Corrupted checkpoints skipped.
    pub corrupted: u64,
    /// Nodes present in the final state.
    pub nodes: Vec<String>,
    /// Checkpointer statistics.
    pub report: CheckpointReport,
}

/// Drives a [`Checkpointer`] with a random message workload.
pub struct Simulation<S = TieredRouter> {
    checkpointer: Checkpointer<S>,
    harness: HarnessConfig,
    rng: StdRng,
    state: WorldState,
    event: u64,
    processed: u64,
    rollbacks: u64,
    resets: u64,
    corrupted: u64,
}

impl<S: StorageBackend> Simulation<S> {
    /// Create a simulation at event 0 with empty state.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidHarness`] if the harness parameters are
    /// out of range.
    pub fn new(checkpointer: Checkpointer<S>, harness: &HarnessConfig) -> Result<Self, SimError> {
        validate(harness)?;
        Ok(Self {
            checkpointer,
            harness: harness.clone(),
            rng: StdRng::seed_from_u64(harness.seed),
            state: WorldState::new(),
            event: 0,
            processed: 0,
            rollbacks: 0,
            resets: 0,
            corrupted: 0,
        })
    }

    /// Process one event: deliver a message, checkpoint if scheduled,
    /// prune on cadence, and maybe roll back.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Checkpoint`] if a checkpoint operation fails.
    pub fn process_event(&mut self) -> Result<(), SimError> {
        self.event = self.event.saturating_add(1);
        self.processed = self.processed.saturating_add(1);

        let node = format!("node{}", self.rng.random_range(1..=self.harness.nodes));
        let entry = self.state.entry(node).or_default();
        entry.count = entry.count.saturating_add(1);
        entry.messages.push(format!("msg_{}", self.event));

        if self.checkpointer.should_checkpoint(self.event) {
            self.checkpointer.save_checkpoint(self.event, &self.state)?;
            debug!(event = self.event, "Checkpoint taken");
        }

        if self.event.checked_rem(self.harness.prune_every) == Some(0) {
            self.checkpointer.optimize_storage(self.event)?;
        }

        if self.rng.random_bool(self.harness.rollback_probability) {
            let distance = self
                .rng
                .random_range(self.harness.min_rollback..=self.harness.max_rollback);
            let target = self.event.saturating_sub(distance);
            self.rollback(target)?;
        }
        Ok(())
    }

    /// Roll the simulation back to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Checkpoint`] if restoring fails for a reason other
    /// than a corrupted checkpoint.
    pub fn rollback(&mut self, target: u64) -> Result<(), SimError> {
        let from = self.event;
        let recovery = recover::<S, WorldState>(&mut self.checkpointer, target, true)?;
        self.corrupted = self.corrupted.saturating_add(recovery.corrupted);
        self.rollbacks = self.rollbacks.saturating_add(1);

        match recovery.restored {
            Some(restored) => {
                info!(
                    from,
                    target_event = target,
                    checkpoint = restored.event_id,
                    depth = restored.depth,
                    "Rollback restored checkpoint"
                );
                self.state = restored.state;
            }
            None => {
                info!(from, target_event = target, "Rollback reset to initial state");
                self.state = WorldState::new();
                self.resets = self.resets.saturating_add(1);
            }
        }
        self.event = target;
        Ok(())
    }

    /// Process events until `harness.events` have been handled.
    ///
    /// # Errors
    ///
    /// Returns the first [`SimError`] raised by an event.
    pub fn run(mut self) -> Result<SimulationOutcome, SimError> {
        for _ in 0..self.harness.events {
            self.process_event()?;
        }
        let outcome = SimulationOutcome {
            events_processed: self.processed,
            final_event: self.event,
            rollbacks: self.rollbacks,
            resets: self.resets,
            corrupted: self.corrupted,
            nodes: self.state.keys().cloned().collect(),
            report: self.checkpointer.report(),
        };
        info!(
            events = outcome.events_processed,
            final_event = outcome.final_event,
            rollbacks = outcome.rollbacks,
            checkpoints = outcome.report.checkpoints_saved,
            "Simulation completed"
        );
        Ok(outcome)
    }
}

/// Check the harness parameters the workload relies on.
///
/// # Errors
///
/// Returns [`SimError::InvalidHarness`] naming the first offending field.
pub fn validate(harness: &HarnessConfig) -> Result<(), SimError> {
    let invalid = |reason: &str| {
        Err(SimError::InvalidHarness {
            reason: reason.to_owned(),
        })
    };
    if !(0.0..=1.0).contains(&harness.rollback_probability) {
        return invalid("harness.rollback_probability must be in [0, 1]");
    }
    if harness.min_rollback > harness.max_rollback {
        return invalid("harness.min_rollback must not exceed harness.max_rollback");
    }
    if harness.nodes == 0 {
        return invalid("harness.nodes must be at least 1");
    }
    Ok(())
}
