//! Lifecycle state machine shared by applications and modules.
//!
//! ```text
//! Stopped ──start──▶ Starting ──▶ Running ──stop──▶ Stopping ──▶ Stopped
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl From<u8> for LifecycleState {
    fn from(val: u8) -> Self {
        match val {
            1 => LifecycleState::Starting,
            2 => LifecycleState::Running,
            3 => LifecycleState::Stopping,
            _ => LifecycleState::Stopped,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Stopped => "stopped",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Atomic holder for a [`LifecycleState`].
///
/// Transitions are compare-and-exchange, so when two threads race to start
/// the same application exactly one of them leaves `Stopped`.
#[derive(Debug)]
pub struct StateCell {
    state: AtomicU8,
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Stopped as u8),
        }
    }

    pub fn get(&self) -> LifecycleState {
        LifecycleState::from(self.state.load(Ordering::Acquire))
    }

    pub fn is(&self, state: LifecycleState) -> bool {
        self.get() == state
    }

    /// Move from `from` to `to`. On failure returns the actual current state.
    pub fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), LifecycleState> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(LifecycleState::from)
    }

    /// Unconditionally set the state. Only the owner of an in-flight
    /// transition (`Starting`/`Stopping`) should call this.
    pub fn set(&self, state: LifecycleState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_transition_guards() {
        let cell = StateCell::new();
        assert!(cell.is(LifecycleState::Stopped));

        assert_eq!(
            cell.transition(LifecycleState::Running, LifecycleState::Stopping),
            Err(LifecycleState::Stopped)
        );
        assert!(cell.transition(LifecycleState::Stopped, LifecycleState::Starting).is_ok());
        assert_eq!(
            cell.transition(LifecycleState::Stopped, LifecycleState::Starting),
            Err(LifecycleState::Starting)
        );

        cell.set(LifecycleState::Running);
        assert!(cell.is(LifecycleState::Running));
    }

    #[test]
    fn test_concurrent_start_single_winner() {
        let cell = Arc::new(StateCell::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                thread::spawn(move || {
                    cell.transition(LifecycleState::Stopped, LifecycleState::Starting).is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
