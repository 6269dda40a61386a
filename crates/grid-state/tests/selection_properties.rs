//! Property tests for the selection algebra.

use grid_model::{SelectionKind, SelectionState};
use grid_state::{SelectionEngine, SelectionMode};
use proptest::prelude::*;

fn arbitrary_state() -> impl Strategy<Value = SelectionState> {
    (
        proptest::collection::btree_set("[a-z0-9]{1,5}", 0..16),
        any::<bool>(),
    )
        .prop_map(|(ids, exclude)| SelectionState {
            ids,
            kind: if exclude {
                SelectionKind::Exclude
            } else {
                SelectionKind::Include
            },
        })
}

proptest! {
    // select then deselect restores the prior membership answer, for
    // both representations.
    #[test]
    fn select_then_deselect_round_trips(state in arbitrary_state(), id in "[a-z0-9]{1,5}") {
        let mut engine = SelectionEngine::new(SelectionMode::All);
        engine.set_state(state);
        let before = engine.is_selected(&id);

        engine.select_id(&id);
        prop_assert!(engine.is_selected(&id));
        engine.deselect_id(&id);
        prop_assert!(!engine.is_selected(&id));

        // Re-apply the opposite op to land back where we started.
        if before {
            engine.select_id(&id);
        }
        prop_assert_eq!(engine.is_selected(&id), before);
    }

    // deselect then select also round-trips membership.
    #[test]
    fn toggle_is_involutive(state in arbitrary_state(), id in "[a-z0-9]{1,5}") {
        let mut engine = SelectionEngine::new(SelectionMode::All);
        engine.set_state(state);
        let row = grid_model::Row::from_value(serde_json::json!({"id": id}));
        let before = engine.is_selected(&id);

        engine.toggle_row(&row);
        prop_assert_eq!(engine.is_selected(&id), !before);
        engine.toggle_row(&row);
        prop_assert_eq!(engine.is_selected(&id), before);
    }

    // Count never exceeds the total and matches the set arithmetic.
    #[test]
    fn selected_count_is_bounded(state in arbitrary_state(), extra in 0u64..500) {
        let total = state.ids.len() as u64 + extra;
        let mut engine = SelectionEngine::new(SelectionMode::All);
        engine.set_state(state.clone());

        let count = engine.selected_count(total);
        prop_assert!(count <= total);
        match state.kind {
            SelectionKind::Include => prop_assert_eq!(count, state.ids.len() as u64),
            SelectionKind::Exclude => prop_assert_eq!(count, total - state.ids.len() as u64),
        }
    }
}
