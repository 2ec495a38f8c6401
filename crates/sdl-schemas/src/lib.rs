//! sdl-schemas
//!
//! Wire types shared by every Sideline crate:
//! - game identity and the subscription key parts (game id, mode, speed)
//! - the five game-update stream frames and their decoder
//! - the runtime configuration payload served by the backend
//!
//! No IO lives here. The decoder is pure; it only logs.

pub mod decode;
pub mod game;
pub mod messages;
pub mod runtime;

pub use decode::{decode_frame, decode_or_log, DecodeError};
pub use game::{GameId, ReplaySpeed, SpeedError, StreamMode};
pub use messages::*;
pub use runtime::{FeatureFlags, RuntimeConfig, WebSocketPaths, DEFAULT_GAME_UPDATES_PATH};
