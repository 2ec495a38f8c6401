use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sdl_schemas::{ErrorFrame, GameDelta, Handshake};

/// Per-subscription connection state machine.
///
/// ```text
/// Idle ──subscribe──► Connecting ──Opened──► Connected ◄──► ErrorObserved
///                          │                     │               │
///                          └────── Closed / TransportError ──────┴──► Closed
/// ```
///
/// `Closed` is also reachable from any state via teardown. `Closed` →
/// `Connected` happens when the same transport slot reopens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPhase {
    /// No subscription.
    #[default]
    Idle,
    /// Transport requested, not yet open.
    Connecting,
    /// Transport open; no unresolved error frame since the last healthy frame.
    Connected,
    /// Transport open; the most recent notable frame was an error.
    ErrorObserved,
    /// Transport closed or failed.
    Closed,
}

impl StreamPhase {
    /// Transport is open (with or without an observed error).
    pub fn is_open(&self) -> bool {
        matches!(self, StreamPhase::Connected | StreamPhase::ErrorObserved)
    }
}

/// Transport lifecycle signal, as seen by the reconciler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Opened,
    Closed,
    TransportError(String),
}

/// Reconciled view of one subscription.
///
/// `deltas` is always strictly increasing by `sequence`, each sequence at most
/// once. `error` and `replay_complete` are sticky until the subscription key
/// changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameDeltaState {
    pub deltas: Vec<GameDelta>,
    pub handshake: Option<Handshake>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub error: Option<ErrorFrame>,
    pub replay_complete: bool,
    pub is_connected: bool,
    pub phase: StreamPhase,
}

impl GameDeltaState {
    /// Empty state for "no subscription".
    pub fn idle() -> Self {
        Self::default()
    }

    /// Empty state for a freshly requested subscription.
    pub fn connecting() -> Self {
        Self {
            phase: StreamPhase::Connecting,
            ..Self::default()
        }
    }

    /// Highest reconciled sequence, if any.
    pub fn last_sequence(&self) -> Option<i64> {
        self.deltas.last().map(|d| d.sequence)
    }

    /// Look up a delta by sequence.
    pub fn delta(&self, sequence: i64) -> Option<&GameDelta> {
        self.deltas
            .binary_search_by_key(&sequence, |d| d.sequence)
            .ok()
            .map(|i| &self.deltas[i])
    }

    /// Presentation status derived purely from the fields above.
    pub fn status(&self) -> StreamStatus {
        match self.phase {
            StreamPhase::Idle => StreamStatus::NoSubscription,
            StreamPhase::Connecting => StreamStatus::Connecting,
            _ if self.replay_complete => StreamStatus::ReplayFinished,
            StreamPhase::Closed => StreamStatus::Disconnected,
            StreamPhase::ErrorObserved => StreamStatus::ConnectedWithError,
            StreamPhase::Connected if self.error.is_some() => StreamStatus::RecoveredAfterError,
            StreamPhase::Connected => StreamStatus::Connected,
        }
    }
}

/// What a consumer should show for a given state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    NoSubscription,
    Connecting,
    Connected,
    ConnectedWithError,
    RecoveredAfterError,
    Disconnected,
    ReplayFinished,
}

impl StreamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::NoSubscription => "no_subscription",
            StreamStatus::Connecting => "connecting",
            StreamStatus::Connected => "connected",
            StreamStatus::ConnectedWithError => "connected_with_error",
            StreamStatus::RecoveredAfterError => "recovered_after_error",
            StreamStatus::Disconnected => "disconnected",
            StreamStatus::ReplayFinished => "replay_finished",
        }
    }
}
