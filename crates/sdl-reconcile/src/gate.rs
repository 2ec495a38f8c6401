//! Replay feature gate.
//!
//! Replay may be selected only when the runtime config's `replay` flag is
//! on. Every mode change goes through [`check_mode_gate`]; a refused replay
//! request falls back to live instead of failing.

use sdl_schemas::{FeatureFlags, StreamMode};

/// Outcome of a mode request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeGate {
    /// Requested mode is allowed as-is.
    Permitted(StreamMode),
    /// Replay was requested while the flag is off; live applies instead.
    Demoted { requested: StreamMode },
}

impl ModeGate {
    /// Mode that actually applies.
    pub fn applied(&self) -> StreamMode {
        match self {
            ModeGate::Permitted(mode) => *mode,
            ModeGate::Demoted { .. } => StreamMode::Live,
        }
    }

    pub fn is_demoted(&self) -> bool {
        matches!(self, ModeGate::Demoted { .. })
    }
}

pub fn check_mode_gate(requested: StreamMode, flags: &FeatureFlags) -> ModeGate {
    match requested {
        StreamMode::Replay if !flags.replay => ModeGate::Demoted { requested },
        mode => ModeGate::Permitted(mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_refused_when_flag_off() {
        let gate = check_mode_gate(StreamMode::Replay, &FeatureFlags::with_replay(false));
        assert!(gate.is_demoted());
        assert_eq!(gate.applied(), StreamMode::Live);
    }

    #[test]
    fn replay_permitted_when_flag_on() {
        let gate = check_mode_gate(StreamMode::Replay, &FeatureFlags::with_replay(true));
        assert_eq!(gate, ModeGate::Permitted(StreamMode::Replay));
    }

    #[test]
    fn live_is_always_permitted() {
        let gate = check_mode_gate(StreamMode::Live, &FeatureFlags::default());
        assert_eq!(gate.applied(), StreamMode::Live);
        assert!(!gate.is_demoted());
    }
}
