//! Checkpoint strategy comparison.
//!
//! Runs the same seeded workload under three strategies and reports
//! throughput, checkpoint count and replay depth:
//!
//! - **fixed**: base interval 100, rollbacks not fed back.
//! - **static**: base interval `sqrt(events)`, rollbacks not fed back.
//! - **adaptive**: base interval 100, realized depths drive the levels.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rewind_codec::SnapshotCodec;
use rewind_core::{CheckpointConfig, CheckpointError, Checkpointer, RewindConfig};
use serde::Serialize;
use tracing::info;

use crate::error::SimError;
use crate::simulation::{recover, validate};

/// Interval used by the fixed and adaptive strategies.
const FIXED_INTERVAL: u64 = 100;

/// Events kept in the benchmark state; older values are evicted.
const STATE_WINDOW: u64 = 256;

/// How a strategy sets and tunes its checkpoint interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// A constant base interval of 100 events.
    Fixed,
    /// A constant base interval of `sqrt(events)`.
    Static,
    /// Base interval 100, adapted from observed rollback depths.
    Adaptive,
}

impl Strategy {
    /// All strategies, in reporting order.
    pub const ALL: [Self; 3] = [Self::Fixed, Self::Static, Self::Adaptive];

    /// Base interval this strategy starts from for a run of `events`.
    pub fn base_interval(self, events: u64) -> u64 {
        match self {
            Self::Fixed | Self::Adaptive => FIXED_INTERVAL,
            Self::Static => events.isqrt().max(1),
        }
    }

    /// Whether realized rollback depths are fed to the controller.
    pub const fn records_rollbacks(self) -> bool {
        matches!(self, Self::Adaptive)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Static => write!(f, "static"),
            Self::Adaptive => write!(f, "adaptive"),
        }
    }
}

/// Measurements for one strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyResult {
    /// The strategy measured.
    pub strategy: Strategy,
    /// Base interval it started from.
    pub base_interval: u64,
    /// Events processed.
    pub events: u64,
    /// Wall-clock time for the run.
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    /// Events per second.
    pub throughput: f64,
    /// Checkpoints written.
    pub checkpoints: u64,
    /// Rollbacks performed.
    pub rollbacks: u64,
    /// Mean events replayed per rollback (from the restored checkpoint to
    /// the event the rollback was triggered at).
    pub avg_replay_depth: Option<f64>,
    /// Final checkpoint levels.
    pub levels: Vec<u64>,
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}

/// Run every strategy over the configured workload.
///
/// # Errors
///
/// Returns [`SimError`] if the harness parameters are invalid or a
/// checkpoint operation fails.
pub fn run(config: &RewindConfig) -> Result<Vec<StrategyResult>, SimError> {
    validate(&config.harness)?;
    Strategy::ALL
        .into_iter()
        .map(|strategy| run_strategy(config, strategy))
        .collect()
}

/// Run one strategy with a fresh checkpointer over the configured tiers.
///
/// # Errors
///
/// Returns [`SimError`] if the checkpointer cannot be built or a checkpoint
/// operation fails.
pub fn run_strategy(config: &RewindConfig, strategy: Strategy) -> Result<StrategyResult, SimError> {
    let harness = &config.harness;
    let checkpoint = CheckpointConfig {
        base_interval: strategy.base_interval(harness.events),
        ..config.checkpoint.clone()
    };
    let router = config.storage.build().map_err(CheckpointError::from)?;
    let mut checkpointer = Checkpointer::new(
        &checkpoint,
        router,
        SnapshotCodec::new(config.codec.clone()),
    )?;
    info!(%strategy, base_interval = checkpoint.base_interval, "Benchmarking strategy");

    let mut rng = StdRng::seed_from_u64(harness.seed);
    let mut state: BTreeMap<u64, u64> = BTreeMap::new();
    let mut rollbacks: u64 = 0;
    let mut replayed: u64 = 0;
    let started = Instant::now();

    for event in 0..harness.events {
        state.insert(event, rng.random());
        if let Some(evict) = event.checked_sub(STATE_WINDOW) {
            state.remove(&evict);
        }

        if checkpointer.should_checkpoint(event) {
            checkpointer.save_checkpoint(event, &state)?;
        }
        if event > 0 && event.checked_rem(harness.prune_every) == Some(0) {
            checkpointer.optimize_storage(event)?;
        }

        if rng.random_bool(harness.rollback_probability) {
            let distance = rng.random_range(harness.min_rollback..=harness.max_rollback);
            let target = event.saturating_sub(distance);
            let recovery = recover(&mut checkpointer, target, strategy.records_rollbacks())?;
            let restored_from = match recovery.restored {
                Some(restored) => {
                    state = restored.state;
                    restored.event_id
                }
                None => {
                    state.clear();
                    0
                }
            };
            rollbacks = rollbacks.saturating_add(1);
            replayed = replayed.saturating_add(event.saturating_sub(restored_from));
        }
    }

    let elapsed = started.elapsed();
    let report = checkpointer.report();
    let result = StrategyResult {
        strategy,
        base_interval: checkpoint.base_interval,
        events: harness.events,
        elapsed,
        throughput: per_second(harness.events, elapsed),
        checkpoints: report.checkpoints_saved,
        rollbacks,
        avg_replay_depth: mean(replayed, rollbacks),
        levels: report.levels,
    };
    info!(
        %strategy,
        throughput = result.throughput,
        checkpoints = result.checkpoints,
        rollbacks = result.rollbacks,
        avg_replay_depth = ?result.avg_replay_depth,
        "Strategy finished"
    );
    Ok(result)
}

#[allow(clippy::cast_precision_loss)]
fn per_second(events: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { events as f64 / secs } else { 0.0 }
}

#[allow(clippy::cast_precision_loss)]
fn mean(total: u64, count: u64) -> Option<f64> {
    (count > 0).then(|| total as f64 / count as f64)
}

/// Render results as a plain-text table.
pub fn render(results: &[StrategyResult]) -> String {
    let mut out = format!(
        "{:<10} {:>8} {:>14} {:>12} {:>10} {:>12}\n",
        "strategy", "base", "events/sec", "checkpoints", "rollbacks", "avg replay"
    );
    for r in results {
        let depth = r
            .avg_replay_depth
            .map_or_else(|| "-".to_owned(), |d| format!("{d:.1}"));
        out.push_str(&format!(
            "{:<10} {:>8} {:>14.1} {:>12} {:>10} {:>12}\n",
            r.strategy.to_string(),
            r.base_interval,
            r.throughput,
            r.checkpoints,
            r.rollbacks,
            depth
        ));
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rewind_core::HarnessConfig;

    use super::*;

    fn quick_harness(events: u64) -> HarnessConfig {
        HarnessConfig {
            events,
            rollback_probability: 0.02,
            min_rollback: 1,
            max_rollback: 500,
            ..HarnessConfig::default()
        }
    }

    fn config(events: u64) -> RewindConfig {
        RewindConfig {
            harness: quick_harness(events),
            ..RewindConfig::default()
        }
    }

    #[test]
    fn static_strategy_uses_square_root() {
        assert_eq!(Strategy::Static.base_interval(10_000), 100);
        assert_eq!(Strategy::Static.base_interval(50_000), 223);
        assert_eq!(Strategy::Static.base_interval(0), 1);
        assert_eq!(Strategy::Fixed.base_interval(50_000), 100);
    }

    #[test]
    fn every_strategy_reports() {
        let results = run(&config(3000)).unwrap();
        assert_eq!(results.len(), 3);
        for result in &results {
            assert_eq!(result.events, 3000);
            assert!(result.checkpoints > 0);
        }
        // Same seed, same rollback schedule.
        assert_eq!(results[0].rollbacks, results[1].rollbacks);
        assert_eq!(results[0].rollbacks, results[2].rollbacks);
    }

    #[test]
    fn only_adaptive_moves_its_levels() {
        let fixed = run_strategy(&config(5000), Strategy::Fixed).unwrap();
        let adaptive = run_strategy(&config(5000), Strategy::Adaptive).unwrap();
        assert_eq!(fixed.levels.first(), Some(&100));
        assert_ne!(adaptive.levels.first(), Some(&100));
    }

    #[test]
    fn table_has_a_row_per_strategy() {
        let results = run(&config(500)).unwrap();
        let table = render(&results);
        assert_eq!(table.lines().count(), 4);
        assert!(table.contains("adaptive"));
    }

    #[test]
    fn results_serialize_elapsed_as_seconds() {
        let result = run_strategy(&config(100), Strategy::Fixed).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("elapsed").is_some_and(serde_json::Value::is_f64));
        assert_eq!(json.get("strategy").and_then(|s| s.as_str()), Some("fixed"));
    }
}
