//! Runtime configuration: fetch from the backend, fall back to defaults.
//!
//! The backend may omit any field. [`RuntimeConfigPayload::normalize`] fills
//! the gaps so every consumer sees a complete [`RuntimeConfig`]:
//!
//! | Missing field                    | Fallback                     |
//! |----------------------------------|------------------------------|
//! | `api_base_url`                   | `PublicEnv::api_url`         |
//! | `websocket_paths.game_updates`   | `/ws/games/{event_id}`       |
//! | `feature_flags.replay`           | `false`                      |
//!
//! A request that fails for any reason yields [`RuntimeConfig`] built from
//! the fallback table alone (replay disabled).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sdl_schemas::{FeatureFlags, RuntimeConfig, WebSocketPaths, DEFAULT_GAME_UPDATES_PATH};

use crate::{build_api_url, ConfigError, PublicEnv};

/// Route (under the API base URL) that serves the runtime config.
pub const RUNTIME_CONFIG_PATH: &str = "/runtime/config";

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Raw runtime config as served; every field optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfigPayload {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub websocket_paths: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub feature_flags: Option<FeatureFlags>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

impl RuntimeConfigPayload {
    /// Fill missing fields from the fallback table.
    pub fn normalize(self, env: &PublicEnv) -> RuntimeConfig {
        let mut paths = self.websocket_paths.unwrap_or_default();
        let game_updates = paths
            .remove("game_updates")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GAME_UPDATES_PATH.to_string());

        RuntimeConfig {
            api_base_url: self
                .api_base_url
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| env.api_url.clone()),
            websocket_paths: WebSocketPaths {
                game_updates,
                extra: paths,
            },
            feature_flags: self.feature_flags.unwrap_or_default(),
            version: self.version,
            generated_at: self.generated_at,
        }
    }
}

/// Defaults used when the backend cannot be reached.
pub fn fallback_runtime_config(env: &PublicEnv) -> RuntimeConfig {
    RuntimeConfigPayload::default().normalize(env)
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// `GET {api_url}/runtime/config`, surfacing every failure.
pub async fn try_fetch_runtime_config(
    client: &reqwest::Client,
    env: &PublicEnv,
) -> Result<RuntimeConfig, ConfigError> {
    let url = build_api_url(&env.api_url, RUNTIME_CONFIG_PATH, "");

    let resp = client
        .get(&url)
        .header(reqwest::header::ACCEPT, "application/json")
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| ConfigError::Fetch(format!("GET {url}: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(ConfigError::Fetch(format!("GET {url}: status {status}")));
    }

    let payload: RuntimeConfigPayload = resp
        .json()
        .await
        .map_err(|e| ConfigError::Fetch(format!("GET {url}: invalid body: {e}")))?;

    Ok(payload.normalize(env))
}

/// Fetch the runtime config, falling back to defaults on any failure.
pub async fn fetch_runtime_config(client: &reqwest::Client, env: &PublicEnv) -> RuntimeConfig {
    match try_fetch_runtime_config(client, env).await {
        Ok(cfg) => {
            tracing::info!(
                replay = cfg.feature_flags.replay,
                game_updates = %cfg.websocket_paths.game_updates,
                "runtime config loaded"
            );
            cfg
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to load runtime config, falling back to defaults");
            fallback_runtime_config(env)
        }
    }
}

// ---------------------------------------------------------------------------
// Local override
// ---------------------------------------------------------------------------

/// Load a runtime config from a local YAML (or JSON) file instead of the
/// backend. Missing fields are filled exactly as for a fetched payload.
pub fn load_runtime_config_file(path: impl AsRef<Path>, env: &PublicEnv) -> Result<RuntimeConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read runtime config: {}", path.display()))?;
    let v_yaml: serde_yaml::Value = serde_yaml::from_str(&raw).context("invalid yaml")?;
    let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
    let payload: RuntimeConfigPayload =
        serde_json::from_value(v_json).context("runtime config has an unexpected shape")?;
    Ok(payload.normalize(env))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
