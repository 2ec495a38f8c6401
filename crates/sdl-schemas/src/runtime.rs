//! Runtime configuration payload served by the backend's runtime config route.
//!
//! Every field is optional on the wire; `sdl-config` fills the gaps with
//! fallback defaults before anything reads it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Path template used when the backend does not name one.
pub const DEFAULT_GAME_UPDATES_PATH: &str = "/ws/games/{event_id}";

/// Feature toggles surfaced to clients.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Replay streaming allowed. Missing means `false`.
    #[serde(default)]
    pub replay: bool,
    /// Any other flags (`weather`, ...), kept so they round-trip.
    #[serde(flatten)]
    pub extra: BTreeMap<String, bool>,
}

impl FeatureFlags {
    pub fn with_replay(replay: bool) -> Self {
        Self {
            replay,
            extra: BTreeMap::new(),
        }
    }
}

/// Named WebSocket path templates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSocketPaths {
    /// Game-update stream template; `{event_id}` is the game id placeholder.
    pub game_updates: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Default for WebSocketPaths {
    fn default() -> Self {
        Self {
            game_updates: DEFAULT_GAME_UPDATES_PATH.to_string(),
            extra: BTreeMap::new(),
        }
    }
}

/// Effective runtime configuration (after normalization).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub api_base_url: String,
    pub websocket_paths: WebSocketPaths,
    pub feature_flags: FeatureFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl RuntimeConfig {
    /// Whether replay streaming may be selected.
    pub fn replay_enabled(&self) -> bool {
        self.feature_flags.replay
    }

    /// Game-update path template.
    pub fn game_updates_path(&self) -> &str {
        &self.websocket_paths.game_updates
    }
}
