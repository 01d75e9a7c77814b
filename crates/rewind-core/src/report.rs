//! Checkpointing statistics.

use std::fmt;

use serde::Serialize;

/// Snapshot of a checkpointer's counters and adaptive state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckpointReport {
    /// Checkpoints written since creation.
    pub checkpoints_saved: u64,
    /// Checkpoints currently indexed.
    pub checkpoints_retained: usize,
    /// Most recent indexed checkpoint.
    pub latest_checkpoint: Option<u64>,
    /// Lookups that hit an indexed id with no stored payload.
    pub corrupted_lookups: u64,
    /// Checkpoints removed by pruning.
    pub pruned: u64,
    /// Rollback depth statistics over the adaptation window.
    pub rollbacks: RollbackStats,
    /// Current checkpoint levels.
    pub levels: Vec<u64>,
    /// Event id of the most recent level refresh.
    pub last_adaptation_event: u64,
}

/// Rollback depth statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollbackStats {
    /// Rollbacks recorded over the checkpointer's lifetime.
    pub recorded: u64,
    /// Depths currently in the history window.
    pub in_window: usize,
    /// Mean depth over the window.
    pub avg_depth: Option<f64>,
    /// Smallest depth in the window.
    pub min_depth: Option<u64>,
    /// Largest depth in the window.
    pub max_depth: Option<u64>,
}

impl fmt::Display for CheckpointReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "checkpoints saved:     {}", self.checkpoints_saved)?;
        writeln!(f, "checkpoints retained:  {}", self.checkpoints_retained)?;
        if let Some(latest) = self.latest_checkpoint {
            writeln!(f, "latest checkpoint:     {latest}")?;
        }
        writeln!(f, "corrupted lookups:     {}", self.corrupted_lookups)?;
        writeln!(f, "pruned:                {}", self.pruned)?;
        writeln!(f, "rollbacks recorded:    {}", self.rollbacks.recorded)?;
        if let (Some(avg), Some(min), Some(max)) = (
            self.rollbacks.avg_depth,
            self.rollbacks.min_depth,
            self.rollbacks.max_depth,
        ) {
            writeln!(f, "rollback depth:        avg {avg:.1}, min {min}, max {max}")?;
        }
        writeln!(f, "levels:                {:?}", self.levels)?;
        write!(f, "last adaptation event: {}", self.last_adaptation_event)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn report() -> CheckpointReport {
        CheckpointReport {
            checkpoints_saved: 12,
            checkpoints_retained: 4,
            latest_checkpoint: Some(1200),
            corrupted_lookups: 1,
            pruned: 8,
            rollbacks: RollbackStats {
                recorded: 3,
                in_window: 3,
                avg_depth: Some(20.0),
                min_depth: Some(10),
                max_depth: Some(30),
            },
            levels: vec![18, 36, 72],
            last_adaptation_event: 1000,
        }
    }

    #[test]
    fn display_lists_depth_stats() {
        let text = report().to_string();
        assert!(text.contains("checkpoints saved:     12"));
        assert!(text.contains("avg 20.0, min 10, max 30"));
        assert!(text.contains("[18, 36, 72]"));
    }

    #[test]
    fn display_omits_depth_without_rollbacks() {
        let mut r = report();
        r.rollbacks = RollbackStats::default();
        assert!(!r.to_string().contains("rollback depth"));
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["checkpoints_saved"], 12);
        assert_eq!(json["rollbacks"]["max_depth"], 30);
        assert_eq!(json["levels"][2], 72);
    }
}
