//! sdl-config
//!
//! Client-side configuration for the game-update stream:
//! - [`PublicEnv`]: base URLs and environment name, read once at startup
//! - [`runtime`]: runtime config fetch with fallback defaults
//! - [`endpoint`]: API / WebSocket URL building and stream endpoint resolution
//!
//! # Contract
//! - [`PublicEnv::from_env`] is the single place the `SIDELINE_*` URL vars are
//!   read. The result is passed into constructors; do not scatter
//!   `std::env::var` calls elsewhere.
//! - Fetch failures never abort startup: they log and fall back.

pub mod endpoint;
pub mod runtime;

use std::fmt;

pub use endpoint::{
    build_api_url, build_websocket_url, ensure_leading_slash, normalize_event_path,
    stream_endpoint, trim_trailing_slash,
};
pub use runtime::{
    fallback_runtime_config, fetch_runtime_config, load_runtime_config_file,
    try_fetch_runtime_config, RuntimeConfigPayload, RUNTIME_CONFIG_PATH,
};

pub const ENV_API_URL: &str = "SIDELINE_API_URL";
pub const ENV_WS_URL: &str = "SIDELINE_WS_URL";
pub const ENV_APP_ENV: &str = "SIDELINE_ENV";

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws";
pub const DEFAULT_APP_ENV: &str = "development";

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors raised while building URLs or loading runtime config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A base URL could not be parsed.
    InvalidUrl { url: String, reason: String },
    /// Runtime config request failed (transport, status, or body).
    Fetch(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidUrl { url, reason } => {
                write!(f, "invalid url '{url}': {reason}")
            }
            ConfigError::Fetch(msg) => write!(f, "runtime config fetch failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// PublicEnv
// ---------------------------------------------------------------------------

/// Base URLs the client talks to. Trailing slashes are always trimmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicEnv {
    pub api_url: String,
    pub ws_url: String,
    pub app_env: String,
}

impl Default for PublicEnv {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl PublicEnv {
    /// Read from the process environment, falling back to local defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            api_url: trim_trailing_slash(&read(ENV_API_URL, DEFAULT_API_URL)).to_string(),
            ws_url: trim_trailing_slash(&read(ENV_WS_URL, DEFAULT_WS_URL)).to_string(),
            app_env: read(ENV_APP_ENV, DEFAULT_APP_ENV),
        }
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = trim_trailing_slash(api_url).to_string();
        self
    }

    pub fn with_ws_url(mut self, ws_url: &str) -> Self {
        self.ws_url = trim_trailing_slash(ws_url).to_string();
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
