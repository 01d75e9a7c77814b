//! Adaptive checkpoint interval controller.
//!
//! The controller keeps a bounded history of observed rollback depths and
//! turns it into a smoothed target interval. From a base interval it
//! generates the exponentially spaced [`LevelSet`] the scheduler tests
//! event ids against.
//!
//! The controller does not decide *when* to refresh its levels; that
//! cadence belongs to the [`CheckpointScheduler`](crate::CheckpointScheduler).

use std::collections::VecDeque;

use crate::config::{CheckpointConfig, ConfigError};
use crate::levels::LevelSet;

/// The smoothed target never exceeds `base_interval * MAX_TARGET_MULTIPLIER`.
pub const MAX_TARGET_MULTIPLIER: u64 = 10;

/// Errors raised by the adaptive controller.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The checkpoint configuration failed validation.
    #[error(transparent)]
    InvalidConfig {
        /// The validation failure.
        #[from]
        source: ConfigError,
    },

    /// The requested levels cannot be represented without overflow.
    #[error("cannot generate {max_levels} levels from base {base}")]
    InvalidLevels {
        /// Requested base interval.
        base: u64,
        /// Requested number of levels.
        max_levels: u32,
    },
}

/// Tracks rollback depths and generates checkpoint levels.
#[derive(Debug, Clone)]
pub struct AdaptiveController {
    base_interval: u64,
    decay_factor: f64,
    max_levels: u32,
    window: usize,

    /// Most recent rollback depths, oldest at the front.
    history: VecDeque<u64>,

    /// Running sum of `history`.
    history_sum: u128,

    /// Total depths recorded over the controller's lifetime.
    recorded: u64,

    levels: LevelSet,
}

impl AdaptiveController {
    /// Create a controller with levels generated from the base interval.
    ///
    /// Every level the controller could ever generate (up to a base of
    /// `base_interval * 10`) is checked for overflow up front, so later
    /// refreshes driven by the smoothed target cannot fail.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidConfig`] if the configuration is out
    /// of range, or [`ControllerError::InvalidLevels`] if the largest
    /// reachable level would overflow `u64`.
    pub fn new(config: &CheckpointConfig) -> Result<Self, ControllerError> {
        config.validate()?;

        let ceiling = max_target(config.base_interval);
        if LevelSet::exponential(ceiling, config.max_levels).is_none() {
            return Err(ControllerError::InvalidLevels {
                base: ceiling,
                max_levels: config.max_levels,
            });
        }
        let levels = LevelSet::exponential(config.base_interval, config.max_levels).ok_or(
            ControllerError::InvalidLevels {
                base: config.base_interval,
                max_levels: config.max_levels,
            },
        )?;

        Ok(Self {
            base_interval: config.base_interval,
            decay_factor: config.decay_factor,
            max_levels: config.max_levels,
            window: config.adaptation_window,
            history: VecDeque::with_capacity(config.adaptation_window.min(4096)),
            history_sum: 0,
            recorded: 0,
            levels,
        })
    }

    /// Record an observed rollback depth.
    ///
    /// The oldest depth is evicted once the history is at capacity. A depth
    /// of zero is not a rollback and is ignored.
    pub fn record_rollback(&mut self, depth: u64) {
        if depth == 0 {
            return;
        }
        if self.history.len() >= self.window
            && let Some(evicted) = self.history.pop_front()
        {
            self.history_sum = self.history_sum.saturating_sub(u128::from(evicted));
        }
        self.history.push_back(depth);
        self.history_sum = self.history_sum.saturating_add(u128::from(depth));
        self.recorded = self.recorded.saturating_add(1);
    }

    /// Target checkpoint interval derived from the rollback history.
    ///
    /// Empty history yields the base interval. Otherwise the mean depth is
    /// scaled by the decay factor, truncated, and clamped to
    /// `[1, base_interval * 10]`.
    pub fn smoothed_target(&self) -> u64 {
        let Some(mean) = self.mean_depth() else {
            return self.base_interval;
        };
        let ceiling = max_target(self.base_interval);
        let smoothed = (mean * self.decay_factor).trunc();
        if smoothed.is_nan() || smoothed < 1.0 {
            return 1;
        }
        #[allow(clippy::cast_precision_loss)]
        let ceiling_f = ceiling as f64;
        if smoothed >= ceiling_f {
            return ceiling;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let target = smoothed as u64;
        target.clamp(1, ceiling)
    }

    /// Regenerate the current levels as `base * 2^i` for `i` in `0..max_levels`.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidLevels`] if `base` or `max_levels`
    /// is zero or the levels would overflow; the current levels are left
    /// unchanged in that case.
    pub fn refresh_levels(
        &mut self,
        base: u64,
        max_levels: u32,
    ) -> Result<&LevelSet, ControllerError> {
        let levels = LevelSet::exponential(base, max_levels)
            .ok_or(ControllerError::InvalidLevels { base, max_levels })?;
        self.levels = levels;
        Ok(&self.levels)
    }

    /// The current level set.
    pub const fn levels(&self) -> &LevelSet {
        &self.levels
    }

    /// Configured base interval.
    pub const fn base_interval(&self) -> u64 {
        self.base_interval
    }

    /// Configured number of levels.
    pub const fn max_levels(&self) -> u32 {
        self.max_levels
    }

    /// Capacity of the rollback history.
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Number of depths currently in the history.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Total rollbacks recorded, including evicted ones.
    pub const fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Mean of the depths in the history window.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_depth(&self) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }
        Some(self.history_sum as f64 / self.history.len() as f64)
    }

    /// Smallest depth in the history window.
    pub fn min_depth(&self) -> Option<u64> {
        self.history.iter().copied().min()
    }

    /// Largest depth in the history window.
    pub fn max_depth(&self) -> Option<u64> {
        self.history.iter().copied().max()
    }
}

const fn max_target(base_interval: u64) -> u64 {
    base_interval.saturating_mul(MAX_TARGET_MULTIPLIER)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn controller(base: u64, decay: f64, window: usize) -> AdaptiveController {
        AdaptiveController::new(&CheckpointConfig {
            decay_factor: decay,
            adaptation_window: window,
            ..CheckpointConfig::with_base_interval(base)
        })
        .unwrap()
    }

    #[test]
    fn empty_history_targets_base_interval() {
        let c = controller(100, 0.9, 1000);
        assert_eq!(c.smoothed_target(), 100);
        assert_eq!(c.mean_depth(), None);
    }

    #[test]
    fn smoothed_target_scales_mean_by_decay() {
        let mut c = controller(100, 0.9, 1000);
        for depth in [10, 20, 30] {
            c.record_rollback(depth);
        }
        assert_eq!(c.mean_depth(), Some(20.0));
        assert_eq!(c.smoothed_target(), 18);
    }

    #[test]
    fn target_is_clamped_to_ten_times_base() {
        let mut c = controller(10, 1.0, 10);
        c.record_rollback(5000);
        assert_eq!(c.smoothed_target(), 100);
    }

    #[test]
    fn target_never_drops_below_one() {
        let mut c = controller(100, 0.1, 10);
        c.record_rollback(1);
        assert_eq!(c.smoothed_target(), 1);
    }

    #[test]
    fn history_evicts_oldest_at_capacity() {
        let mut c = controller(100, 1.0, 2);
        c.record_rollback(100);
        c.record_rollback(10);
        c.record_rollback(20);
        assert_eq!(c.history_len(), 2);
        assert_eq!(c.recorded(), 3);
        assert_eq!(c.min_depth(), Some(10));
        assert_eq!(c.max_depth(), Some(20));
        assert_eq!(c.smoothed_target(), 15);
    }

    #[test]
    fn zero_depth_is_ignored() {
        let mut c = controller(100, 0.9, 10);
        c.record_rollback(0);
        assert_eq!(c.history_len(), 0);
        assert_eq!(c.recorded(), 0);
    }

    #[test]
    fn refresh_replaces_levels() {
        let mut c = controller(100, 0.9, 10);
        assert_eq!(c.levels().as_slice(), &[100, 200, 400, 800, 1600]);
        let levels = c.refresh_levels(18, 3).unwrap();
        assert_eq!(levels.as_slice(), &[18, 36, 72]);
        assert_eq!(c.levels().len(), 3);
    }

    #[test]
    fn failed_refresh_keeps_previous_levels() {
        let mut c = controller(100, 0.9, 10);
        let err = c.refresh_levels(0, 3).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidLevels { base: 0, .. }));
        assert_eq!(c.levels().base(), Some(100));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = AdaptiveController::new(&CheckpointConfig::with_base_interval(0)).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig { .. }));
    }

    #[test]
    fn overflowing_levels_are_rejected() {
        let err = AdaptiveController::new(&CheckpointConfig {
            max_levels: 64,
            ..CheckpointConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, ControllerError::InvalidLevels { .. }));
    }
}
