//! Process lifecycle state machine.
//!
//! # State Transitions
//! ```text
//! Starting → Running:       supervisor begins running its tasks
//! Running → ShuttingDown:   first task finishes (error, completion or signal)
//! ShuttingDown → Stopped:   remaining tasks unwound or abandoned at deadline
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle state of one server run.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Starting = 0,
    Running = 1,
    ShuttingDown = 2,
    Stopped = 3,
}

impl From<u8> for LifecycleState {
    fn from(val: u8) -> Self {
        match val {
            1 => LifecycleState::Running,
            2 => LifecycleState::ShuttingDown,
            3 => LifecycleState::Stopped,
            _ => LifecycleState::Starting,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Read-only view of the lifecycle state, cheap to clone.
#[derive(Debug, Clone)]
pub struct LifecycleStatus {
    state: Arc<AtomicU8>,
}

impl LifecycleStatus {
    pub fn get(&self) -> LifecycleState {
        LifecycleState::from(self.state.load(Ordering::Acquire))
    }
}

/// Writable lifecycle state. Only the supervisor holds one.
#[derive(Debug)]
pub(crate) struct LifecycleCell {
    state: Arc<AtomicU8>,
}

impl LifecycleCell {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(LifecycleState::Starting as u8)),
        }
    }

    pub(crate) fn set(&self, next: LifecycleState) {
        let prev = LifecycleState::from(self.state.swap(next as u8, Ordering::AcqRel));
        if prev != next {
            tracing::debug!(from = %prev, to = %next, "Lifecycle state changed");
        }
    }

    pub(crate) fn status(&self) -> LifecycleStatus {
        LifecycleStatus {
            state: self.state.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tracks_cell() {
        let cell = LifecycleCell::new();
        let status = cell.status();
        assert_eq!(status.get(), LifecycleState::Starting);

        cell.set(LifecycleState::Running);
        assert_eq!(status.get(), LifecycleState::Running);

        cell.set(LifecycleState::Stopped);
        assert_eq!(status.clone().get(), LifecycleState::Stopped);
        assert_eq!(status.get().to_string(), "stopped");
    }
}
