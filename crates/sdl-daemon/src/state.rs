//! Shared runtime state for sdl-daemon.
//!
//! All types here are `Clone`-able (via `Arc` or copy). Handlers receive
//! `State<Arc<AppState>>` from Axum. The subscription controller runs on its
//! own task; handlers only talk to it through its [`ControllerHandle`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sdl_config::PublicEnv;
use sdl_reconcile::{heartbeat_liveness, GameDeltaState, DEFAULT_MISSED_BEATS};
use sdl_schemas::RuntimeConfig;
use sdl_stream::{ControllerHandle, SubscriptionKey};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use crate::api_types::StreamStateResponse;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Snapshot(Box<StreamStateResponse>),
    LogLine { level: String, msg: String },
}

impl BusMsg {
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::Snapshot(_) => "snapshot",
            BusMsg::LogLine { .. } => "log",
        }
    }
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    /// Front for the subscription controller task.
    pub controller: ControllerHandle,
    /// Endpoint bases; also fills gaps in pushed runtime configs.
    pub env: PublicEnv,
    /// Runtime config the controller was last given. Written by
    /// `PUT /v1/runtime/config`.
    pub runtime: Arc<RwLock<RuntimeConfig>>,
}

impl AppState {
    pub fn new(controller: ControllerHandle, env: PublicEnv, runtime: RuntimeConfig) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "sdl-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            controller,
            env,
            runtime: Arc::new(RwLock::new(runtime)),
        }
    }

    /// Current key, status and state as one response body.
    pub fn stream_state(&self) -> StreamStateResponse {
        let snap = self.controller.snapshot();
        stream_state_view(self.controller.key(), &snap, Utc::now())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn stream_state_view(
    key: SubscriptionKey,
    state: &GameDeltaState,
    now: DateTime<Utc>,
) -> StreamStateResponse {
    StreamStateResponse {
        key,
        status: state.status(),
        liveness: heartbeat_liveness(state, now, DEFAULT_MISSED_BEATS).into(),
        observed_at: now,
        state: state.clone(),
    }
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

/// Spawn a background task that republishes every controller snapshot on the
/// SSE bus. Ends when the controller stops.
pub fn spawn_snapshot_forwarder(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut rx = state.controller.watch();
        while rx.changed().await.is_ok() {
            let snap = rx.borrow_and_update().clone();
            let view = stream_state_view(state.controller.key(), &snap, Utc::now());
            let _ = state.bus.send(BusMsg::Snapshot(Box::new(view)));
        }
        tracing::debug!("snapshot forwarder stopped");
    });
}
