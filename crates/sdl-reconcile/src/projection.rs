//! Snapshot projection.
//!
//! Consumers receive `Arc<GameDeltaState>` snapshots and may compare them by
//! pointer. A new `Arc` is produced only when the state is structurally
//! different from the last published one; a no-op fold keeps the old `Arc`.

use std::sync::Arc;

use crate::GameDeltaState;

/// Holds the last published snapshot.
#[derive(Clone, Debug)]
pub struct Projector {
    current: Arc<GameDeltaState>,
    /// Number of snapshots published since construction (the initial one
    /// counts as version 0).
    version: u64,
}

impl Default for Projector {
    fn default() -> Self {
        Self::new(GameDeltaState::idle())
    }
}

impl Projector {
    pub fn new(initial: GameDeltaState) -> Self {
        Self {
            current: Arc::new(initial),
            version: 0,
        }
    }

    /// Publish `next` if it differs from the current snapshot.
    ///
    /// Returns the new snapshot, or `None` for a no-op update.
    pub fn publish(&mut self, next: GameDeltaState) -> Option<Arc<GameDeltaState>> {
        if *self.current == next {
            return None;
        }
        self.current = Arc::new(next);
        self.version += 1;
        Some(Arc::clone(&self.current))
    }

    pub fn current(&self) -> Arc<GameDeltaState> {
        Arc::clone(&self.current)
    }

    /// Borrow the current state without bumping the refcount.
    pub fn state(&self) -> &GameDeltaState {
        &self.current
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StreamPhase;

    #[test]
    fn identical_state_is_not_republished() {
        let mut p = Projector::default();
        let before = p.current();
        assert!(p.publish(GameDeltaState::idle()).is_none());
        assert!(Arc::ptr_eq(&before, &p.current()));
        assert_eq!(p.version(), 0);
    }

    #[test]
    fn changed_state_is_published_once() {
        let mut p = Projector::default();
        let snap = p.publish(GameDeltaState::connecting()).unwrap();
        assert_eq!(snap.phase, StreamPhase::Connecting);
        assert_eq!(p.version(), 1);
        assert!(p.publish(GameDeltaState::connecting()).is_none());
        assert_eq!(p.version(), 1);
    }
}
