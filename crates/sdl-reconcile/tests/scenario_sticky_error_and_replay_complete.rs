//! Scenario: error and replay completion are sticky for a subscription.
//!
//! # Invariants under test
//!
//! 1. Duplicate sequence: the later payload replaces the earlier one.
//! 2. `replay_complete` applied twice equals applied once.
//! 3. connect → error → disconnect → reopen leaves `is_connected = true` with
//!    the error still recorded.
//! 4. An error frame never clears deltas.
//! 5. The derived status follows the phase and sticky flags.
//!
//! All tests are pure in-process; no network required.

use sdl_reconcile::{
    apply, apply_lifecycle, GameDeltaState, Lifecycle, StreamPhase, StreamStatus,
};
use sdl_schemas::{DeltaFrame, ErrorFrame, GameDelta, ReplayComplete, StreamMessage};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const GAME: &str = "401547439";

fn opened() -> GameDeltaState {
    apply_lifecycle(&GameDeltaState::connecting(), &Lifecycle::Opened)
}

fn delta(seq: i64, desc: &str) -> StreamMessage {
    StreamMessage::Delta(DeltaFrame {
        event_id: GAME.to_string(),
        data: GameDelta::new(seq, "pass").with_description(desc),
    })
}

fn error(code: &str) -> StreamMessage {
    StreamMessage::Error(ErrorFrame {
        event_id: GAME.to_string(),
        code: code.to_string(),
        message: Some("stream failure".to_string()),
    })
}

fn replay_complete() -> StreamMessage {
    StreamMessage::ReplayComplete(ReplayComplete {
        event_id: GAME.to_string(),
    })
}

// ---------------------------------------------------------------------------
// 1. Last write wins
// ---------------------------------------------------------------------------

#[test]
fn duplicate_sequence_keeps_last_payload() {
    let st = apply(&opened(), &delta(5, "A"));
    let st = apply(&st, &delta(5, "B"));

    assert_eq!(st.deltas.len(), 1);
    let only = st.delta(5).expect("sequence 5 present");
    assert_eq!(only.description.as_deref(), Some("B"));
}

// ---------------------------------------------------------------------------
// 2. replay_complete idempotence
// ---------------------------------------------------------------------------

#[test]
fn replay_complete_twice_equals_once() {
    let base = apply(&opened(), &delta(1, "kickoff"));
    let once = apply(&base, &replay_complete());
    let twice = apply(&once, &replay_complete());

    assert!(once.replay_complete);
    assert_eq!(once, twice);
    assert_eq!(twice.status(), StreamStatus::ReplayFinished);
}

#[test]
fn replay_complete_survives_close() {
    let st = apply(&opened(), &replay_complete());
    let st = apply_lifecycle(&st, &Lifecycle::Closed);
    assert!(st.replay_complete);
    assert_eq!(st.status(), StreamStatus::ReplayFinished);
}

// ---------------------------------------------------------------------------
// 3. Reconnect preserves error
// ---------------------------------------------------------------------------

#[test]
fn reconnect_preserves_error() {
    let st = opened();
    let st = apply(&st, &error("x"));
    let st = apply_lifecycle(&st, &Lifecycle::Closed);
    assert!(!st.is_connected);
    assert_eq!(st.status(), StreamStatus::Disconnected);

    let st = apply_lifecycle(&st, &Lifecycle::Opened);
    assert!(st.is_connected);
    assert_eq!(st.error.as_ref().map(|e| e.code.as_str()), Some("x"));
    assert_eq!(st.status(), StreamStatus::RecoveredAfterError);
}

#[test]
fn transport_error_does_not_populate_error() {
    let st = apply_lifecycle(&opened(), &Lifecycle::TransportError("connection reset".into()));
    assert!(!st.is_connected);
    assert!(st.error.is_none());
}

// ---------------------------------------------------------------------------
// 4. Error is additive
// ---------------------------------------------------------------------------

#[test]
fn error_frame_keeps_reconciled_deltas() {
    let st = apply(&opened(), &delta(2, "b"));
    let st = apply(&st, &delta(1, "a"));
    let st = apply(&st, &error("upstream_timeout"));

    let seqs: Vec<i64> = st.deltas.iter().map(|d| d.sequence).collect();
    assert_eq!(seqs, vec![1, 2]);
    assert!(st.is_connected);
    assert_eq!(st.phase, StreamPhase::ErrorObserved);
    assert_eq!(st.status(), StreamStatus::ConnectedWithError);
}

// ---------------------------------------------------------------------------
// 5. Status derivation
// ---------------------------------------------------------------------------

#[test]
fn status_walks_through_the_lifecycle() {
    assert_eq!(GameDeltaState::idle().status(), StreamStatus::NoSubscription);

    let st = GameDeltaState::connecting();
    assert_eq!(st.status(), StreamStatus::Connecting);

    let st = apply_lifecycle(&st, &Lifecycle::Opened);
    assert_eq!(st.status(), StreamStatus::Connected);

    let st = apply(&st, &delta(1, "a"));
    assert_eq!(st.status(), StreamStatus::Connected);
    assert_eq!(st.last_sequence(), Some(1));

    let st = apply_lifecycle(&st, &Lifecycle::Closed);
    assert_eq!(st.status(), StreamStatus::Disconnected);
}
