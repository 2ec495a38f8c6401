//! Game-update stream frames.
//!
//! Every frame is a JSON object discriminated by its `type` field:
//!
//! ```text
//! {type:"handshake",       event_id, heartbeat_sec}
//! {type:"heartbeat",       event_id, server_time}
//! {type:"delta",           event_id, data:{sequence, type, ...}}
//! {type:"replay_complete", event_id}
//! {type:"error",           event_id, code, message?}
//! ```
//!
//! Optional fields the server may add (handshake mode/flags, delta down and
//! distance, ...) are carried when present and default to `None` otherwise.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FeatureFlags, StreamMode};

// ---------------------------------------------------------------------------
// Frame bodies
// ---------------------------------------------------------------------------

/// First control frame on a connection; announces the heartbeat cadence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Handshake {
    pub event_id: String,
    pub heartbeat_sec: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<StreamMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_flags: Option<FeatureFlags>,
}

/// Periodic liveness pulse. Carries no delta content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub event_id: String,
    pub server_time: DateTime<Utc>,
}

/// One discrete game event (play or scoreboard change).
///
/// `sequence` identifies the delta within a subscription; the reconciler keys
/// on it and nothing else.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDelta {
    pub sequence: i64,
    /// Play classification, `type` on the wire.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarter: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<String>,
    #[serde(default)]
    pub flags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yardline_100: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yards: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// `true` when the delta was produced by a replay stream.
    #[serde(default)]
    pub replay: bool,
}

impl GameDelta {
    /// Minimal delta with only the required fields set.
    pub fn new(sequence: i64, kind: impl Into<String>) -> Self {
        Self {
            sequence,
            kind: kind.into(),
            description: None,
            quarter: None,
            clock: None,
            flags: BTreeSet::new(),
            down: None,
            distance: None,
            yardline_100: None,
            yards: None,
            play_id: None,
            source: None,
            generated_at: None,
            replay: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Envelope around a single [`GameDelta`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaFrame {
    pub event_id: String,
    pub data: GameDelta,
}

/// Terminal marker of a replay stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayComplete {
    pub event_id: String,
}

/// Stream-level failure notice from the server. Does not close the stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub event_id: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// StreamMessage
// ---------------------------------------------------------------------------

/// One decoded game-update frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Handshake(Handshake),
    Heartbeat(Heartbeat),
    Delta(DeltaFrame),
    ReplayComplete(ReplayComplete),
    Error(ErrorFrame),
}

impl StreamMessage {
    /// Discriminator values accepted on the wire, in declaration order.
    pub const KINDS: [&'static str; 5] =
        ["handshake", "heartbeat", "delta", "replay_complete", "error"];

    /// The `type` discriminator of this frame.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamMessage::Handshake(_) => "handshake",
            StreamMessage::Heartbeat(_) => "heartbeat",
            StreamMessage::Delta(_) => "delta",
            StreamMessage::ReplayComplete(_) => "replay_complete",
            StreamMessage::Error(_) => "error",
        }
    }

    /// The game id the server stamped on this frame.
    pub fn event_id(&self) -> &str {
        match self {
            StreamMessage::Handshake(m) => &m.event_id,
            StreamMessage::Heartbeat(m) => &m.event_id,
            StreamMessage::Delta(m) => &m.event_id,
            StreamMessage::ReplayComplete(m) => &m.event_id,
            StreamMessage::Error(m) => &m.event_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
