use sdl_schemas::{GameDelta, StreamMessage};

use crate::{GameDeltaState, Lifecycle, StreamPhase};

/// Replace-or-insert `delta` by `sequence`, then order by `sequence`.
///
/// The two phases are kept separate so the ordering step never depends on
/// where the upsert landed:
/// 1. a delta whose sequence is already present replaces that entry in place
///    (last write wins); otherwise it is appended;
/// 2. the collection is sorted ascending by sequence.
pub fn upsert_delta(deltas: &[GameDelta], delta: GameDelta) -> Vec<GameDelta> {
    let mut next = deltas.to_vec();

    // Phase 1: replace-or-insert.
    match next.iter_mut().find(|d| d.sequence == delta.sequence) {
        Some(slot) => *slot = delta,
        None => next.push(delta),
    }

    // Phase 2: order by key.
    next.sort_by_key(|d| d.sequence);
    next
}

/// Fold one decoded frame into the state. Pure; `state` is not modified.
///
/// - handshake → recorded; connection flag untouched
/// - heartbeat → `last_heartbeat` set; an observed error is considered
///   recovered (phase back to `Connected`)
/// - error → latest error wins, deltas kept, phase `ErrorObserved` while open
/// - replay_complete → sticky `true`, only while the transport is open
/// - delta → upserted by sequence; dropped once the replay is complete
pub fn apply(state: &GameDeltaState, msg: &StreamMessage) -> GameDeltaState {
    let mut next = state.clone();
    match msg {
        StreamMessage::Handshake(h) => {
            next.handshake = Some(h.clone());
        }
        StreamMessage::Heartbeat(hb) => {
            next.last_heartbeat = Some(hb.server_time);
            recover_from_error(&mut next);
        }
        StreamMessage::Error(err) => {
            next.error = Some(err.clone());
            if next.phase == StreamPhase::Connected {
                next.phase = StreamPhase::ErrorObserved;
            }
        }
        StreamMessage::ReplayComplete(_) => {
            if next.phase.is_open() {
                next.replay_complete = true;
            }
        }
        StreamMessage::Delta(frame) => {
            if next.replay_complete {
                return next;
            }
            next.deltas = upsert_delta(&next.deltas, frame.data.clone());
            recover_from_error(&mut next);
        }
    }
    next
}

/// Fold one transport lifecycle signal into the state. Pure.
///
/// `error` is never cleared here: a reopened transport still shows that an
/// error happened earlier in this subscription.
pub fn apply_lifecycle(state: &GameDeltaState, signal: &Lifecycle) -> GameDeltaState {
    let mut next = state.clone();
    match signal {
        Lifecycle::Opened => {
            next.is_connected = true;
            next.phase = StreamPhase::Connected;
        }
        Lifecycle::Closed | Lifecycle::TransportError(_) => {
            next.is_connected = false;
            if next.phase != StreamPhase::Idle {
                next.phase = StreamPhase::Closed;
            }
        }
    }
    next
}

fn recover_from_error(state: &mut GameDeltaState) {
    if state.phase == StreamPhase::ErrorObserved {
        state.phase = StreamPhase::Connected;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sdl_schemas::{DeltaFrame, ErrorFrame, Handshake, Heartbeat, ReplayComplete};

    const GAME: &str = "401547439";

    fn open() -> GameDeltaState {
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
            message: None,
        })
    }

    fn done() -> StreamMessage {
        StreamMessage::ReplayComplete(ReplayComplete {
            event_id: GAME.to_string(),
        })
    }

    #[test]
    fn upsert_appends_then_sorts() {
        let a = upsert_delta(&[], GameDelta::new(3, "rush"));
        let b = upsert_delta(&a, GameDelta::new(1, "kickoff"));
        let c = upsert_delta(&b, GameDelta::new(2, "pass"));
        let seqs: Vec<i64> = c.iter().map(|d| d.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn upsert_replaces_same_sequence() {
        let a = upsert_delta(&[], GameDelta::new(5, "pass").with_description("A"));
        let b = upsert_delta(&a, GameDelta::new(5, "pass").with_description("B"));
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].description.as_deref(), Some("B"));
    }

    #[test]
    fn apply_does_not_mutate_input() {
        let before = open();
        let after = apply(&before, &delta(1, "x"));
        assert!(before.deltas.is_empty());
        assert_eq!(after.deltas.len(), 1);
    }

    #[test]
    fn handshake_does_not_touch_connection_flag() {
        let st = GameDeltaState::connecting();
        let next = apply(
            &st,
            &StreamMessage::Handshake(Handshake {
                event_id: GAME.to_string(),
                heartbeat_sec: 30,
                mode: None,
                server_time: None,
                feature_flags: None,
            }),
        );
        assert!(!next.is_connected);
        assert_eq!(next.handshake.unwrap().heartbeat_sec, 30);
    }

    #[test]
    fn heartbeat_records_server_time() {
        let ts = Utc.with_ymd_and_hms(2024, 9, 8, 17, 0, 0).unwrap();
        let next = apply(
            &open(),
            &StreamMessage::Heartbeat(Heartbeat {
                event_id: GAME.to_string(),
                server_time: ts,
            }),
        );
        assert_eq!(next.last_heartbeat, Some(ts));
        assert!(next.deltas.is_empty());
    }

    #[test]
    fn error_keeps_deltas_and_latest_error_wins() {
        let st = apply(&open(), &delta(1, "x"));
        let st = apply(&st, &error("first"));
        let st = apply(&st, &error("second"));
        assert_eq!(st.deltas.len(), 1);
        assert_eq!(st.error.as_ref().unwrap().code, "second");
        assert_eq!(st.phase, StreamPhase::ErrorObserved);
    }

    #[test]
    fn delta_after_error_returns_to_connected_but_keeps_error() {
        let st = apply(&open(), &error("x"));
        let st = apply(&st, &delta(1, "x"));
        assert_eq!(st.phase, StreamPhase::Connected);
        assert!(st.error.is_some());
    }

    #[test]
    fn replay_complete_requires_open_transport() {
        let st = apply(&GameDeltaState::connecting(), &done());
        assert!(!st.replay_complete);
        let st = apply(&open(), &done());
        assert!(st.replay_complete);
    }

    #[test]
    fn deltas_after_replay_complete_are_dropped() {
        let st = apply(&open(), &delta(1, "x"));
        let st = apply(&st, &done());
        let st = apply(&st, &delta(2, "late"));
        assert_eq!(st.deltas.len(), 1);
        assert!(st.replay_complete);
    }

    #[test]
    fn close_and_transport_error_drop_connection_flag() {
        let st = apply_lifecycle(&open(), &Lifecycle::TransportError("reset".into()));
        assert!(!st.is_connected);
        assert_eq!(st.phase, StreamPhase::Closed);
        let st = apply_lifecycle(&st, &Lifecycle::Closed);
        assert!(!st.is_connected);
        assert_eq!(st.phase, StreamPhase::Closed);
    }

    #[test]
    fn lifecycle_on_idle_state_stays_idle() {
        let st = apply_lifecycle(&GameDeltaState::idle(), &Lifecycle::Closed);
        assert_eq!(st.phase, StreamPhase::Idle);
    }
}
