//! Transport generation (epoch) tokens.
//!
//! # Purpose
//!
//! Every transport the controller opens is stamped with a [`Generation`].
//! Signals carry the stamp of the transport that produced them; the
//! controller applies a signal only if its stamp is still the current one.
//! Late frames from a torn-down socket therefore become inert.
//!
//! # Invariants
//!
//! - **Strictly increasing**: each [`GenerationCounter::advance`] returns a
//!   generation greater than every previous one.
//! - **Retire is final**: after [`GenerationCounter::retire`] no earlier
//!   generation is current again.
//! - **Pure, no IO**: the counter is plain data; the caller decides what to
//!   do with the decision.

use serde::{Deserialize, Serialize};

/// Opaque stamp identifying one transport instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Result of checking a signal's generation against the counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationCheck {
    /// Signal belongs to the active transport.
    Current,
    /// Signal belongs to a superseded transport, or arrived while no transport
    /// is active.
    Stale {
        current: Option<Generation>,
        got: Generation,
    },
}

impl GenerationCheck {
    pub fn is_current(&self) -> bool {
        matches!(self, GenerationCheck::Current)
    }

    pub fn is_stale(&self) -> bool {
        !self.is_current()
    }
}

/// Monotonic generation source owned by the subscription controller.
#[derive(Clone, Debug, Default)]
pub struct GenerationCounter {
    /// Last generation handed out. `0` means none yet.
    issued: u64,
    /// Generation of the active transport, if any.
    active: Option<Generation>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retire the active generation (if any) and issue a new one.
    pub fn advance(&mut self) -> Generation {
        self.issued += 1;
        let next = Generation(self.issued);
        self.active = Some(next);
        next
    }

    /// Retire the active generation without issuing a new one.
    pub fn retire(&mut self) -> Option<Generation> {
        self.active.take()
    }

    /// Generation of the active transport.
    pub fn active(&self) -> Option<Generation> {
        self.active
    }

    pub fn check(&self, got: Generation) -> GenerationCheck {
        if self.active == Some(got) {
            GenerationCheck::Current
        } else {
            GenerationCheck::Stale {
                current: self.active,
                got,
            }
        }
    }

    pub fn is_current(&self, got: Generation) -> bool {
        self.check(got).is_current()
    }
}
