//! sdl-daemon entry point.
//!
//! Thin on purpose: it sets up tracing, resolves configuration, starts the
//! subscription controller, wires middleware, and starts the HTTP server.
//! All route handlers live in `routes.rs`; all shared state types live in
//! `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use sdl_config::{fetch_runtime_config, load_runtime_config_file, PublicEnv};
use sdl_daemon::{routes, state};
use sdl_stream::{SubscriptionController, WsTransportFactory};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

/// Optional local runtime-config override (YAML or JSON).
const ENV_RUNTIME_CONFIG_FILE: &str = "SIDELINE_RUNTIME_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience).
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let env = PublicEnv::from_env();
    let runtime = match std::env::var(ENV_RUNTIME_CONFIG_FILE) {
        Ok(path) => load_runtime_config_file(&path, &env)
            .with_context(|| format!("loading {ENV_RUNTIME_CONFIG_FILE}={path}"))?,
        Err(_) => {
            let client = reqwest::Client::builder()
                .build()
                .context("building http client")?;
            fetch_runtime_config(&client, &env).await
        }
    };
    info!(
        api = %env.api_url,
        ws = %env.ws_url,
        app_env = %env.app_env,
        replay = runtime.feature_flags.replay,
        "configuration resolved"
    );

    let controller =
        SubscriptionController::new(WsTransportFactory::default(), env.clone(), runtime.clone());
    let (handle, _controller_task) = controller.spawn();

    let shared = Arc::new(state::AppState::new(handle, env, runtime));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));
    state::spawn_snapshot_forwarder(Arc::clone(&shared));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr_from_env().unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8898)));
    info!("sdl-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    shared.controller.shutdown().await.ok();
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("SIDELINE_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("ctrl-c received, shutting down");
    }
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(tower_http::cors::Any)
}
