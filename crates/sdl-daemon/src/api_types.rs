//! Request and response types for all sdl-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests.  No business logic lives here.

use chrono::{DateTime, Utc};
use sdl_reconcile::{GameDeltaState, HeartbeatLiveness, StreamStatus};
use sdl_schemas::{RuntimeConfig, StreamMode};
use sdl_stream::SubscriptionKey;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// Errors (400 / 503)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// PUT /v1/runtime/config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfigUpdateResponse {
    /// Normalized config now in effect.
    pub config: RuntimeConfig,
    /// Subscription key after re-gating against the new flags.
    pub applied: SubscriptionKey,
}

// ---------------------------------------------------------------------------
// /v1/stream/state
// ---------------------------------------------------------------------------

/// Heartbeat freshness as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LivenessView {
    NoHandshake,
    AwaitingFirst,
    Fresh { age_secs: i64 },
    Overdue { age_secs: i64, allowed_secs: i64 },
}

impl From<HeartbeatLiveness> for LivenessView {
    fn from(l: HeartbeatLiveness) -> Self {
        match l {
            HeartbeatLiveness::NoHandshake => LivenessView::NoHandshake,
            HeartbeatLiveness::AwaitingFirst => LivenessView::AwaitingFirst,
            HeartbeatLiveness::Fresh { age } => LivenessView::Fresh {
                age_secs: age.num_seconds(),
            },
            HeartbeatLiveness::Overdue { age, allowed } => LivenessView::Overdue {
                age_secs: age.num_seconds(),
                allowed_secs: allowed.num_seconds(),
            },
        }
    }
}

/// Current subscription, derived status and full reconciled state. Also the
/// payload of SSE `snapshot` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamStateResponse {
    pub key: SubscriptionKey,
    pub status: StreamStatus,
    pub liveness: LivenessView,
    pub observed_at: DateTime<Utc>,
    pub state: GameDeltaState,
}

// ---------------------------------------------------------------------------
// /v1/stream/subscribe  /v1/stream/detach
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub game_id: String,
    #[serde(default)]
    pub mode: Option<StreamMode>,
    /// Replay speed multiplier; defaults to 1.
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeResponse {
    /// Key actually in effect.
    pub applied: SubscriptionKey,
    /// true when replay was requested but the feature flag is off.
    pub replay_refused: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetachResponse {
    pub detached: bool,
}
