//! Per-event checkpoint decisions.
//!
//! The scheduler owns the adaptation cadence: every `adaptation_trigger`
//! events it asks the controller for a fresh smoothed target and rebuilds
//! the levels from it. Between refreshes, deciding is a handful of
//! remainder checks against the current levels.

use tracing::{info, warn};

use crate::config::CheckpointConfig;
use crate::controller::{AdaptiveController, ControllerError};
use crate::levels::LevelSet;

/// Decides which event ids get checkpointed.
#[derive(Debug, Clone)]
pub struct CheckpointScheduler {
    controller: AdaptiveController,
    adaptation_trigger: u64,
    last_adaptation_event: u64,
}

impl CheckpointScheduler {
    /// Build a scheduler and its controller from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError`] if the configuration is invalid.
    pub fn new(config: &CheckpointConfig) -> Result<Self, ControllerError> {
        Ok(Self::with_controller(
            AdaptiveController::new(config)?,
            config.effective_adaptation_trigger(),
        ))
    }

    /// Wrap an existing controller.
    ///
    /// A zero `adaptation_trigger` is raised to 1.
    pub fn with_controller(controller: AdaptiveController, adaptation_trigger: u64) -> Self {
        Self {
            controller,
            adaptation_trigger: adaptation_trigger.max(1),
            last_adaptation_event: 0,
        }
    }

    /// Whether `event_id` should be checkpointed.
    ///
    /// Event 0 always checkpoints so there is an initial floor entry. Once
    /// `adaptation_trigger` events have passed since the last refresh, the
    /// levels are regenerated from the controller's smoothed target before
    /// testing. Ids below the last refresh point never trigger adaptation.
    pub fn should_checkpoint(&mut self, event_id: u64) -> bool {
        if event_id == 0 {
            return true;
        }
        if event_id.saturating_sub(self.last_adaptation_event) >= self.adaptation_trigger {
            self.adapt(event_id);
        }
        self.controller.levels().matches(event_id)
    }

    fn adapt(&mut self, event_id: u64) {
        let target = self.controller.smoothed_target();
        let max_levels = self.controller.max_levels();
        match self.controller.refresh_levels(target, max_levels) {
            Ok(levels) => info!(
                event_id,
                target,
                levels = ?levels.as_slice(),
                "Checkpoint levels refreshed"
            ),
            Err(err) => warn!(event_id, target, %err, "Keeping previous checkpoint levels"),
        }
        self.last_adaptation_event = event_id;
    }

    /// Forward a rollback depth to the controller.
    pub fn record_rollback(&mut self, depth: u64) {
        self.controller.record_rollback(depth);
    }

    /// The current level set.
    pub const fn levels(&self) -> &LevelSet {
        self.controller.levels()
    }

    /// Event id of the most recent level refresh (0 before the first).
    pub const fn last_adaptation_event(&self) -> u64 {
        self.last_adaptation_event
    }

    /// Events between level refreshes.
    pub const fn adaptation_trigger(&self) -> u64 {
        self.adaptation_trigger
    }

    /// The underlying controller.
    pub const fn controller(&self) -> &AdaptiveController {
        &self.controller
    }

    /// Mutable access to the underlying controller.
    pub const fn controller_mut(&mut self) -> &mut AdaptiveController {
        &mut self.controller
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scheduler(base: u64, max_levels: u32) -> CheckpointScheduler {
        CheckpointScheduler::new(&CheckpointConfig {
            max_levels,
            ..CheckpointConfig::with_base_interval(base)
        })
        .unwrap()
    }

    #[test]
    fn initial_levels_follow_base_interval() {
        let mut s = scheduler(100, 3);
        assert_eq!(s.levels().as_slice(), &[100, 200, 400]);
        assert!(s.should_checkpoint(0));
        assert!(s.should_checkpoint(100));
        assert!(!s.should_checkpoint(150));
        assert!(s.should_checkpoint(200));
    }

    #[test]
    fn adaptation_waits_for_trigger() {
        let mut s = scheduler(100, 3);
        s.record_rollback(20);
        assert!(!s.should_checkpoint(999));
        assert_eq!(s.last_adaptation_event(), 0);
        assert_eq!(s.levels().base(), Some(100));

        // 1000 events after start: refresh to 0.9 * 20 = 18.
        assert!(!s.should_checkpoint(1000));
        assert_eq!(s.last_adaptation_event(), 1000);
        assert_eq!(s.levels().as_slice(), &[18, 36, 72]);
        assert!(s.should_checkpoint(1008));
    }

    #[test]
    fn refresh_without_rollbacks_restores_base() {
        let mut s = scheduler(100, 2);
        assert!(s.should_checkpoint(1000));
        assert_eq!(s.levels().as_slice(), &[100, 200]);
    }

    #[test]
    fn explicit_trigger_is_respected() {
        let mut s = CheckpointScheduler::new(&CheckpointConfig {
            adaptation_trigger: Some(50),
            decay_factor: 1.0,
            ..CheckpointConfig::with_base_interval(100)
        })
        .unwrap();
        s.record_rollback(30);
        s.should_checkpoint(50);
        assert_eq!(s.last_adaptation_event(), 50);
        assert_eq!(s.levels().base(), Some(30));
    }

    #[test]
    fn out_of_order_ids_do_not_adapt() {
        let mut s = scheduler(100, 3);
        s.should_checkpoint(5000);
        assert_eq!(s.last_adaptation_event(), 5000);
        assert!(s.should_checkpoint(400));
        assert_eq!(s.last_adaptation_event(), 5000);
    }
}
