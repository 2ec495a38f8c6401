//! Heartbeat freshness, for consumers.
//!
//! The stream core never acts on a missed heartbeat: no timeout, no
//! reconnect. This module only turns `(handshake cadence, last heartbeat,
//! now)` into a verdict a consumer can display or act upon.

use chrono::{DateTime, Duration, Utc};

use crate::GameDeltaState;

/// Heartbeat intervals that may pass before a stream counts as overdue.
pub const DEFAULT_MISSED_BEATS: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeartbeatLiveness {
    /// No handshake yet; the cadence is unknown.
    NoHandshake,
    /// Handshake seen, no heartbeat yet.
    AwaitingFirst,
    /// Last heartbeat is within the allowance.
    Fresh { age: Duration },
    /// Last heartbeat is older than `allowed`.
    Overdue { age: Duration, allowed: Duration },
}

impl HeartbeatLiveness {
    pub fn is_overdue(&self) -> bool {
        matches!(self, HeartbeatLiveness::Overdue { .. })
    }
}

/// Judge heartbeat freshness at `now`, allowing `missed_beats` intervals.
///
/// A heartbeat stamped in the future (clock skew) counts as age zero.
pub fn heartbeat_liveness(
    state: &GameDeltaState,
    now: DateTime<Utc>,
    missed_beats: u32,
) -> HeartbeatLiveness {
    let Some(handshake) = &state.handshake else {
        return HeartbeatLiveness::NoHandshake;
    };
    let Some(last) = state.last_heartbeat else {
        return HeartbeatLiveness::AwaitingFirst;
    };

    let age = (now - last).max(Duration::zero());
    let allowed = Duration::seconds(i64::from(handshake.heartbeat_sec) * i64::from(missed_beats));
    if age > allowed {
        HeartbeatLiveness::Overdue { age, allowed }
    } else {
        HeartbeatLiveness::Fresh { age }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sdl_schemas::Handshake;

    fn with_cadence(sec: u32, last: Option<DateTime<Utc>>) -> GameDeltaState {
        GameDeltaState {
            handshake: Some(Handshake {
                event_id: "1".to_string(),
                heartbeat_sec: sec,
                mode: None,
                server_time: None,
                feature_flags: None,
            }),
            last_heartbeat: last,
            ..GameDeltaState::connecting()
        }
    }

    fn t(sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 8, 17, 0, sec).unwrap()
    }

    #[test]
    fn unknown_cadence_without_handshake() {
        let st = GameDeltaState::connecting();
        assert_eq!(heartbeat_liveness(&st, t(0), 2), HeartbeatLiveness::NoHandshake);
    }

    #[test]
    fn awaiting_first_heartbeat() {
        let st = with_cadence(15, None);
        assert_eq!(heartbeat_liveness(&st, t(0), 2), HeartbeatLiveness::AwaitingFirst);
    }

    #[test]
    fn fresh_within_allowance_and_overdue_beyond() {
        let st = with_cadence(15, Some(t(0)));
        assert!(!heartbeat_liveness(&st, t(30), 2).is_overdue());
        assert!(heartbeat_liveness(&st, t(31), 2).is_overdue());
    }

    #[test]
    fn future_heartbeat_counts_as_age_zero() {
        let st = with_cadence(15, Some(t(40)));
        assert_eq!(
            heartbeat_liveness(&st, t(10), DEFAULT_MISSED_BEATS),
            HeartbeatLiveness::Fresh {
                age: Duration::zero()
            }
        );
    }
}
