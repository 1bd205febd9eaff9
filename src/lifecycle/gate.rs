//! Lifecycle gate state machine.
//!
//! # States
//! - Idle: freshly constructed, nothing configured yet
//! - Configuring: layers and registrations being set up
//! - Starting: start sequence in progress, deferred registration allowed
//! - Running: chain sealed, request path is read-only
//! - Stopped: chain cleared, registrations kept for a restart
//!
//! # State Transitions
//! ```text
//! Idle → Configuring → Starting → Running → Stopped → Configuring
//!                          └──(start failed)──→ Configuring
//! ```

use std::fmt;

use crate::error::ContextError;

/// Lifecycle state of a processing context.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    #[default]
    Idle = 0,
    Configuring = 1,
    Starting = 2,
    Running = 3,
    Stopped = 4,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Configuring => "configuring",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
        }
    }

    /// Whether `self → next` is a legal edge.
    fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Idle, Configuring)
                | (Configuring, Starting)
                | (Starting, Running)
                | (Starting, Configuring)
                | (Running, Stopped)
                | (Stopped, Configuring)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guards structural mutation of a context by its lifecycle state.
///
/// The gate lives next to the data it protects (under the context lock), so a
/// predicate check and the mutation that follows it are atomic.
#[derive(Debug, Default)]
pub struct LifecycleGate {
    state: LifecycleState,
}

impl LifecycleGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == LifecycleState::Idle
    }

    /// True while the context is being configured, before any start.
    pub fn is_configuring(&self) -> bool {
        self.state == LifecycleState::Configuring
    }

    pub fn is_starting(&self) -> bool {
        self.state == LifecycleState::Starting
    }

    pub fn is_running(&self) -> bool {
        self.state == LifecycleState::Running
    }

    pub fn is_stopped(&self) -> bool {
        self.state == LifecycleState::Stopped
    }

    /// True for Idle, Configuring and Starting: the window in which layers
    /// may be substituted and middleware registered.
    pub fn is_mutable(&self) -> bool {
        matches!(
            self.state,
            LifecycleState::Idle | LifecycleState::Configuring | LifecycleState::Starting
        )
    }

    /// Move to `next`, failing with `IllegalState` on an illegal edge.
    pub fn transition(&mut self, next: LifecycleState) -> Result<LifecycleState, ContextError> {
        let previous = self.state;
        if !previous.can_transition_to(next) {
            return Err(ContextError::illegal_state(next.transition_name(), previous));
        }
        self.state = next;
        tracing::debug!(from = %previous, to = %next, "Lifecycle transition");
        crate::observability::metrics::record_transition(next);
        Ok(previous)
    }

    /// Idle → Configuring on the first configuration mutation; no-op otherwise.
    pub fn touch(&mut self) {
        if self.is_idle() {
            self.state = LifecycleState::Configuring;
            tracing::debug!(
                from = %LifecycleState::Idle,
                to = %LifecycleState::Configuring,
                "Lifecycle transition"
            );
            crate::observability::metrics::record_transition(LifecycleState::Configuring);
        }
    }

    /// Fail unless the gate is Starting.
    pub fn require_starting(&self, operation: &'static str) -> Result<(), ContextError> {
        if self.is_starting() {
            Ok(())
        } else {
            Err(ContextError::illegal_state(operation, self.state))
        }
    }

    /// Fail unless the gate is Idle, Configuring or Starting.
    pub fn require_mutable(&self, operation: &'static str) -> Result<(), ContextError> {
        if self.is_mutable() {
            Ok(())
        } else {
            Err(ContextError::illegal_state(operation, self.state))
        }
    }
}

impl LifecycleState {
    fn transition_name(self) -> &'static str {
        match self {
            LifecycleState::Idle => "reset",
            LifecycleState::Configuring => "configure",
            LifecycleState::Starting => "start",
            LifecycleState::Running => "run",
            LifecycleState::Stopped => "stop",
        }
    }
}
