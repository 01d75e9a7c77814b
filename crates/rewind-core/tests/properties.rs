//! Property tests for floor lookup, pruning, levels, and target clamping.

#![allow(
    clippy::unwrap_used,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]

use std::collections::BTreeMap;

use proptest::prelude::*;
use rewind_core::{AdaptiveController, CheckpointConfig, CheckpointIndex, LevelSet};
use rewind_storage::MemoryStorage;

fn saved_index(ids: &[u64]) -> (CheckpointIndex<MemoryStorage>, BTreeMap<u64, Vec<u8>>) {
    let mut index = CheckpointIndex::new(MemoryStorage::new());
    let mut model = BTreeMap::new();
    for (n, &id) in ids.iter().enumerate() {
        let payload = format!("{id}:{n}").into_bytes();
        index.save(id, &payload).unwrap();
        model.insert(id, payload);
    }
    (index, model)
}

proptest! {
    #[test]
    fn floor_lookup_matches_model(
        ids in prop::collection::vec(0_u64..10_000, 0..64),
        target in 0_u64..12_000,
    ) {
        let (mut index, model) = saved_index(&ids);
        let expected = model.range(..=target).next_back();
        let found = index.floor_lookup(target).unwrap();
        match (found, expected) {
            (None, None) => {}
            (Some(hit), Some((&id, payload))) => {
                prop_assert_eq!(hit.event_id, id);
                prop_assert_eq!(&hit.payload, payload);
            }
            (found, expected) => prop_assert!(false, "got {found:?}, expected {expected:?}"),
        }
    }

    #[test]
    fn entries_stay_sorted_and_unique(ids in prop::collection::vec(0_u64..500, 0..128)) {
        let (index, model) = saved_index(&ids);
        let expected: Vec<u64> = model.keys().copied().collect();
        prop_assert_eq!(index.entries(), expected.as_slice());
    }

    #[test]
    fn prune_respects_window_and_keeps_floor(
        ids in prop::collection::vec(0_u64..10_000, 1..64),
        current in 0_u64..12_000,
        window in 0_u64..5_000,
    ) {
        let (mut index, _) = saved_index(&ids);
        let floor_before = index.floor_entry(current);
        index.prune(current, window).unwrap();

        let keep_from = current.saturating_sub(window);
        for &id in index.entries() {
            prop_assert!(id >= keep_from || Some(id) == floor_before);
        }
        prop_assert_eq!(index.floor_entry(current), floor_before);
        if let Some(id) = floor_before {
            prop_assert!(index.floor_lookup(current).unwrap().is_some_and(|c| c.event_id == id));
        }
    }

    #[test]
    fn levels_are_strictly_increasing(base in 1_u64..1_000_000, count in 1_u32..16) {
        let levels = LevelSet::exponential(base, count).unwrap();
        prop_assert_eq!(levels.len(), usize::try_from(count).unwrap());
        prop_assert!(levels.as_slice().windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(levels.base(), Some(base));
    }

    #[test]
    fn smoothed_target_stays_in_bounds(
        base in 1_u64..10_000,
        decay in 0.01_f64..=1.0,
        depths in prop::collection::vec(1_u64..1_000_000, 1..200),
    ) {
        let mut controller = AdaptiveController::new(&CheckpointConfig {
            decay_factor: decay,
            adaptation_window: 100,
            ..CheckpointConfig::with_base_interval(base)
        })
        .unwrap();
        for depth in depths {
            controller.record_rollback(depth);
        }
        let target = controller.smoothed_target();
        prop_assert!((1..=base * 10).contains(&target));
        prop_assert!(controller.history_len() <= 100);
    }
}
