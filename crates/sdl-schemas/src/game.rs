//! Subscription key parts: which game, which mode, what replay speed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GameId
// ---------------------------------------------------------------------------

/// Opaque upstream game identifier (an ESPN event id such as `"401547439"`).
///
/// Never blank once it reaches a transport: free text goes through
/// [`GameId::parse`], deserialization rejects blank strings, and the
/// subscription controller treats a blank id built with [`GameId::new`] as
/// "no game selected".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameId(String);

impl GameId {
    /// Build a game id from a known non-blank value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Parse user input. Blank or whitespace-only input is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GameId {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).ok_or_else(|| "game id must not be blank".to_string())
    }
}

impl From<GameId> for String {
    fn from(id: GameId) -> Self {
        id.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// StreamMode
// ---------------------------------------------------------------------------

/// Live feed or historical replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMode {
    #[default]
    Live,
    Replay,
}

impl StreamMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamMode::Live => "live",
            StreamMode::Replay => "replay",
        }
    }
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(StreamMode::Live),
            "replay" => Ok(StreamMode::Replay),
            other => Err(format!(
                "invalid stream mode '{other}'. expected one of: live | replay"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// ReplaySpeed
// ---------------------------------------------------------------------------

/// Rejected replay speed value.
#[derive(Clone, Debug, PartialEq)]
pub enum SpeedError {
    /// NaN or infinite.
    NotFinite,
    /// Zero or negative.
    NotPositive(f64),
    /// Above [`ReplaySpeed::MAX`].
    TooFast(f64),
}

impl fmt::Display for SpeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeedError::NotFinite => write!(f, "replay speed must be a finite number"),
            SpeedError::NotPositive(v) => write!(f, "replay speed must be positive, got {v}"),
            SpeedError::TooFast(v) => {
                write!(f, "replay speed must be at most {}, got {v}", ReplaySpeed::MAX)
            }
        }
    }
}

impl std::error::Error for SpeedError {}

/// Replay speed multiplier in `(0, 8]`; defaults to 1. The replay endpoint
/// refuses anything faster.
///
/// Rendered with Rust's shortest float formatting, so `2.0` becomes `"2"` and
/// `1.5` stays `"1.5"` in the `speed` query parameter.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ReplaySpeed(f64);

impl ReplaySpeed {
    pub const NORMAL: ReplaySpeed = ReplaySpeed(1.0);
    pub const MAX: f64 = 8.0;

    pub fn new(value: f64) -> Result<Self, SpeedError> {
        if !value.is_finite() {
            return Err(SpeedError::NotFinite);
        }
        if value <= 0.0 {
            return Err(SpeedError::NotPositive(value));
        }
        if value > Self::MAX {
            return Err(SpeedError::TooFast(value));
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

impl Default for ReplaySpeed {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl TryFrom<f64> for ReplaySpeed {
    type Error = SpeedError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReplaySpeed> for f64 {
    fn from(speed: ReplaySpeed) -> Self {
        speed.0
    }
}

impl fmt::Display for ReplaySpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReplaySpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid replay speed '{s}'"))?;
        Self::new(value).map_err(|e| e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
