//! Property: whatever order deltas arrive in, the reconciled view is sorted
//! strictly ascending by sequence, holds each sequence once, and each entry
//! carries the payload of the last arrival for that sequence.

use std::collections::BTreeMap;

use proptest::prelude::*;
use sdl_reconcile::{apply, apply_lifecycle, GameDeltaState, Lifecycle};
use sdl_schemas::{DeltaFrame, GameDelta, StreamMessage};

fn delta_msg(sequence: i64, revision: usize) -> StreamMessage {
    StreamMessage::Delta(DeltaFrame {
        event_id: "401547439".to_string(),
        data: GameDelta::new(sequence, "play").with_description(format!("rev-{revision}")),
    })
}

proptest! {
    #[test]
    fn prop_deltas_sorted_unique_last_write_wins(
        seqs in prop::collection::vec(-20i64..200, 0..128)
    ) {
        let mut state = apply_lifecycle(&GameDeltaState::connecting(), &Lifecycle::Opened);
        let mut expected: BTreeMap<i64, String> = BTreeMap::new();

        for (revision, seq) in seqs.iter().enumerate() {
            state = apply(&state, &delta_msg(*seq, revision));
            expected.insert(*seq, format!("rev-{revision}"));
        }

        let got: Vec<i64> = state.deltas.iter().map(|d| d.sequence).collect();
        prop_assert!(got.windows(2).all(|w| w[0] < w[1]), "not strictly increasing: {:?}", got);

        let want: Vec<i64> = expected.keys().copied().collect();
        prop_assert_eq!(&got, &want);

        for d in &state.deltas {
            prop_assert_eq!(d.description.as_deref(), expected.get(&d.sequence).map(String::as_str));
        }
    }

    #[test]
    fn prop_arrival_order_does_not_change_final_view(
        seqs in prop::collection::btree_set(0i64..500, 0..64)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
            .prop_shuffle()
    ) {
        let open = apply_lifecycle(&GameDeltaState::connecting(), &Lifecycle::Opened);

        let mut shuffled = open.clone();
        for seq in &seqs {
            shuffled = apply(&shuffled, &delta_msg(*seq, 0));
        }

        let mut sorted_seqs = seqs.clone();
        sorted_seqs.sort_unstable();
        let mut in_order = open;
        for seq in &sorted_seqs {
            in_order = apply(&in_order, &delta_msg(*seq, 0));
        }

        prop_assert_eq!(shuffled, in_order);
    }
}
