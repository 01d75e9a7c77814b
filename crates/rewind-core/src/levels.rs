//! Exponentially spaced checkpoint levels.
//!
//! A level set is `[base, 2*base, 4*base, ...]`. An event is checkpointed
//! when its id is a multiple of any level: the short levels catch frequent
//! shallow rollbacks, the long ones bound the worst-case replay.

use serde::Serialize;

/// Ordered, strictly increasing, all-positive checkpoint intervals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelSet {
    intervals: Vec<u64>,
}

impl LevelSet {
    /// Generate `count` levels `base * 2^i` for `i` in `0..count`.
    ///
    /// Returns `None` if `base` or `count` is zero, or if any level would
    /// overflow `u64`.
    pub fn exponential(base: u64, count: u32) -> Option<Self> {
        if base == 0 || count == 0 {
            return None;
        }
        let intervals = (0..count)
            .map(|i| 1_u64.checked_shl(i).and_then(|factor| base.checked_mul(factor)))
            .collect::<Option<Vec<u64>>>()?;
        // A shift that reaches bit 64 wraps to the same value, so re-check order.
        let increasing = intervals.windows(2).all(|w| matches!(w, [a, b] if a < b));
        increasing.then_some(Self { intervals })
    }

    /// Whether `event_id` is an exact multiple of any level.
    ///
    /// A zero level never matches.
    pub fn matches(&self, event_id: u64) -> bool {
        self.intervals
            .iter()
            .any(|&level| event_id.checked_rem(level) == Some(0))
    }

    /// The shortest level.
    pub fn base(&self) -> Option<u64> {
        self.intervals.first().copied()
    }

    /// The longest level.
    pub fn max(&self) -> Option<u64> {
        self.intervals.last().copied()
    }

    /// The levels in ascending order.
    pub const fn as_slice(&self) -> &[u64] {
        self.intervals.as_slice()
    }

    /// Number of levels.
    pub const fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether the set has no levels.
    pub const fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn generates_doubling_levels() {
        let levels = LevelSet::exponential(100, 3).unwrap();
        assert_eq!(levels.as_slice(), &[100, 200, 400]);
        assert_eq!(levels.base(), Some(100));
        assert_eq!(levels.max(), Some(400));
    }

    #[test]
    fn single_level() {
        let levels = LevelSet::exponential(7, 1).unwrap();
        assert_eq!(levels.as_slice(), &[7]);
    }

    #[test]
    fn zero_base_or_count_is_rejected() {
        assert!(LevelSet::exponential(0, 5).is_none());
        assert!(LevelSet::exponential(100, 0).is_none());
    }

    #[test]
    fn overflow_is_rejected() {
        assert!(LevelSet::exponential(u64::MAX / 2, 3).is_none());
        assert!(LevelSet::exponential(1, 65).is_none());
        assert!(LevelSet::exponential(1, 64).is_some());
    }

    #[test]
    fn matches_any_multiple() {
        let levels = LevelSet::exponential(100, 3).unwrap();
        assert!(levels.matches(0));
        assert!(levels.matches(100));
        assert!(!levels.matches(150));
        assert!(levels.matches(200));
        assert!(levels.matches(1200));
        assert!(!levels.matches(1));
    }
}
