//! URL helpers for the REST API and the game-update stream.

use sdl_schemas::{GameId, ReplaySpeed, StreamMode};
use url::Url;

use crate::ConfigError;

const EVENT_ID_PLACEHOLDER: &str = "{event_id}";

pub fn trim_trailing_slash(value: &str) -> &str {
    value.trim_end_matches('/')
}

pub fn ensure_leading_slash(value: &str) -> String {
    if value.is_empty() {
        "/".to_string()
    } else if value.starts_with('/') {
        value.to_string()
    } else {
        format!("/{value}")
    }
}

/// `{base}{prefix}{path}` with exactly one slash at each joint.
///
/// An empty `prefix` is skipped.
pub fn build_api_url(base_url: &str, path: &str, prefix: &str) -> String {
    let base = trim_trailing_slash(base_url);
    let prefix = if prefix.is_empty() {
        String::new()
    } else {
        trim_trailing_slash(&ensure_leading_slash(prefix)).to_string()
    };
    format!("{base}{prefix}{}", ensure_leading_slash(path))
}

/// Join `path` onto a WebSocket base URL.
///
/// When the base already carries a path prefix (`wss://host/ws`) and `path`
/// repeats it (`/ws/games/1`), the prefix is not doubled.
pub fn build_websocket_url(base_url: &str, path: &str) -> Result<String, ConfigError> {
    let mut url = parse_url(trim_trailing_slash(base_url))?;
    let base_path = trim_trailing_slash(url.path()).to_string();
    let normalized = ensure_leading_slash(path);

    let deduped = if !base_path.is_empty() && normalized.starts_with(&format!("{base_path}/")) {
        &normalized[base_path.len()..]
    } else {
        normalized.as_str()
    };

    let joined = format!("{base_path}{deduped}");
    url.set_path(if joined.is_empty() { "/" } else { &joined });
    Ok(trim_trailing_slash(url.as_str()).to_string())
}

/// Resolve the stream path for one game.
///
/// `{event_id}` is replaced by the percent-encoded id. A template without the
/// placeholder gets the id appended as a trailing segment, unless it already
/// ends with it.
pub fn normalize_event_path(template: &str, game_id: &GameId) -> String {
    let encoded = urlencoding::encode(game_id.as_str());
    if template.contains(EVENT_ID_PLACEHOLDER) {
        return template.replacen(EVENT_ID_PLACEHOLDER, &encoded, 1);
    }
    if template.ends_with(&*encoded) {
        return template.to_string();
    }
    let stem = template.strip_suffix('/').unwrap_or(template);
    format!("{stem}/{encoded}")
}

/// Full socket URL for a subscription:
/// `{ws_base}{path}?mode={live|replay}[&speed={n}]`.
///
/// `speed` is only rendered for replay.
pub fn stream_endpoint(
    ws_base_url: &str,
    path_template: &str,
    game_id: &GameId,
    mode: StreamMode,
    speed: Option<ReplaySpeed>,
) -> Result<String, ConfigError> {
    let path = normalize_event_path(path_template, game_id);
    let base = build_websocket_url(ws_base_url, &path)?;
    let mut url = parse_url(&base)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("mode", mode.as_str());
        if let (StreamMode::Replay, Some(speed)) = (mode, speed) {
            query.append_pair("speed", &speed.to_string());
        }
    }
    Ok(url.into())
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
