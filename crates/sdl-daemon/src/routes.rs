//! Axum router and all HTTP handlers for sdl-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers.  All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use sdl_config::RuntimeConfigPayload;
use sdl_schemas::{GameId, ReplaySpeed, StreamMode};
use sdl_stream::SubscriptionKey;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::{
    api_types::{
        DetachResponse, ErrorResponse, HealthResponse, RuntimeConfigUpdateResponse,
        SubscribeRequest, SubscribeResponse,
    },
    state::{AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/runtime/config", get(runtime_config).put(runtime_config_update))
        .route("/v1/stream/state", get(stream_state))
        .route("/v1/stream/subscribe", post(stream_subscribe))
        .route("/v1/stream/detach", post(stream_detach))
        .route("/v1/stream/events", get(stream_events))
        .with_state(state)
}

fn bad_request(error: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn controller_unavailable(err: anyhow::Error) -> Response {
    warn!(error = %err, "subscription controller unavailable");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/runtime/config
// ---------------------------------------------------------------------------

pub(crate) async fn runtime_config(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let cfg = st.runtime.read().await.clone();
    (StatusCode::OK, Json(cfg))
}

// ---------------------------------------------------------------------------
// PUT /v1/runtime/config
// ---------------------------------------------------------------------------

/// Replace the runtime config. Missing fields are filled from the defaults,
/// the controller re-gates the current subscription, and a moved stream path
/// reopens the transport.
pub(crate) async fn runtime_config_update(
    State(st): State<Arc<AppState>>,
    Json(payload): Json<RuntimeConfigPayload>,
) -> Response {
    let config = payload.normalize(&st.env);

    // Hold the write lock across the controller round trip so readers never
    // see a config the controller has not applied.
    let mut current = st.runtime.write().await;
    let applied = match st.controller.set_runtime_config(config.clone()).await {
        Ok(applied) => applied,
        Err(err) => return controller_unavailable(err),
    };
    *current = config.clone();
    drop(current);

    info!(
        replay = config.feature_flags.replay,
        game_updates = %config.websocket_paths.game_updates,
        mode = %applied.mode,
        "runtime/config updated"
    );
    let _ = st.bus.send(BusMsg::LogLine {
        level: "INFO".to_string(),
        msg: "runtime config replaced".to_string(),
    });

    (
        StatusCode::OK,
        Json(RuntimeConfigUpdateResponse { config, applied }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/stream/state
// ---------------------------------------------------------------------------

pub(crate) async fn stream_state(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(st.stream_state()))
}

// ---------------------------------------------------------------------------
// POST /v1/stream/subscribe
// ---------------------------------------------------------------------------

/// Subscribe to a game. Replay is demoted to live when the feature flag is
/// off; the response reports the key actually in effect.
pub(crate) async fn stream_subscribe(
    State(st): State<Arc<AppState>>,
    Json(req): Json<SubscribeRequest>,
) -> Response {
    let Some(game_id) = GameId::parse(&req.game_id) else {
        return bad_request("game_id must not be blank");
    };
    let speed = match req.speed.map(ReplaySpeed::new).transpose() {
        Ok(speed) => speed.unwrap_or_default(),
        Err(err) => return bad_request(format!("invalid speed: {err}")),
    };
    let requested = req.mode.unwrap_or_default();

    let key = SubscriptionKey {
        game_id: Some(game_id),
        mode: requested,
        speed,
    };
    let applied = match st.controller.subscribe(key).await {
        Ok(applied) => applied,
        Err(err) => return controller_unavailable(err),
    };
    let replay_refused = requested == StreamMode::Replay && applied.mode != StreamMode::Replay;

    info!(
        game_id = applied.game_id.as_ref().map(GameId::as_str),
        mode = %applied.mode,
        replay_refused,
        "stream/subscribe"
    );
    if replay_refused {
        let _ = st.bus.send(BusMsg::LogLine {
            level: "WARN".to_string(),
            msg: "replay requested but disabled by runtime config; streaming live".to_string(),
        });
    }

    (
        StatusCode::OK,
        Json(SubscribeResponse {
            applied,
            replay_refused,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/stream/detach
// ---------------------------------------------------------------------------

pub(crate) async fn stream_detach(State(st): State<Arc<AppState>>) -> Response {
    if let Err(err) = st.controller.detach().await {
        return controller_unavailable(err);
    }
    info!("stream/detach");
    (StatusCode::OK, Json(DetachResponse { detached: true })).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/stream/events  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream_events(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
