//! sdl-reconcile
//!
//! Game-delta reconciliation: the pure core of the stream client.
//!
//! Architectural decisions:
//! - State changes only through `apply` / `apply_lifecycle` (pure folds)
//! - Deltas kept strictly ordered by sequence, last write wins
//! - Errors and replay completion are sticky for a subscription's lifetime
//! - Snapshots are published only on structural change
//! - Generation tokens make signals from torn-down transports inert
//!
//! Deterministic, pure logic. No IO. No sockets. No wall clock.

mod engine;
pub mod gate;
pub mod generation;
pub mod liveness;
pub mod projection;
mod types;

pub use engine::{apply, apply_lifecycle, upsert_delta};
pub use gate::{check_mode_gate, ModeGate};
pub use generation::{Generation, GenerationCheck, GenerationCounter};
pub use liveness::{heartbeat_liveness, HeartbeatLiveness, DEFAULT_MISSED_BEATS};
pub use projection::Projector;
pub use types::*;
