//! Scoped state cleanup

use crate::state::SessionState;
use parking_lot::Mutex;
use std::sync::Arc;

/// Applies a reset to session state when dropped
///
/// Busy flags are released through this guard so every exit path of an
/// operation, including early returns and a dropped future, clears them.
/// Must not be dropped while the state lock is held by the same task.
pub(crate) struct StateReset {
    state: Arc<Mutex<SessionState>>,
    reset: Option<fn(&mut SessionState)>,
}

impl StateReset {
    pub(crate) fn new(state: &Arc<Mutex<SessionState>>, reset: fn(&mut SessionState)) -> Self {
        Self {
            state: Arc::clone(state),
            reset: Some(reset),
        }
    }
}

impl Drop for StateReset {
    fn drop(&mut self) {
        if let Some(reset) = self.reset.take() {
            reset(&mut self.state.lock());
        }
    }
}
