//! Instance lifecycle state machine
//!
//! CREATED → CONFIGURED → COMPILED → TESTED → INSTALLED
//! CREATED → COMPILED (rebuild of a configured tree)
//! CREATED → CLEANED
//! any non-terminal state → FAILED(step)

use serde::{Deserialize, Serialize};

use super::TerminalState;
use crate::tools::Step;

/// Lifecycle state of one system instance within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceState {
    /// Resolved, no step run yet
    Created,
    Configured,
    Compiled,
    Tested,
    Installed,
    Cleaned,
    /// A step failed; later steps are not attempted
    Failed { step: Step },
}

impl TerminalState for InstanceState {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            InstanceState::Installed | InstanceState::Cleaned | InstanceState::Failed { .. }
        )
    }
}

impl InstanceState {
    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: InstanceState) -> bool {
        match (self, target) {
            // From CREATED
            (InstanceState::Created, InstanceState::Configured) => true,
            (InstanceState::Created, InstanceState::Compiled) => true,
            (InstanceState::Created, InstanceState::Cleaned) => true,

            (InstanceState::Configured, InstanceState::Compiled) => true,
            (InstanceState::Compiled, InstanceState::Tested) => true,
            (InstanceState::Tested, InstanceState::Installed) => true,

            (from, InstanceState::Failed { .. }) => !from.is_terminal(),

            // Terminal states cannot transition
            _ => false,
        }
    }
}

/// Errors for instance state transitions
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("{instance}: invalid state transition from {from:?} to {to:?}")]
    InvalidTransition {
        instance: String,
        from: InstanceState,
        to: InstanceState,
    },
}

/// Tracks the state of one instance and the states it went through.
#[derive(Debug, Clone)]
pub struct InstanceLifecycle {
    instance: String,
    state: InstanceState,
    history: Vec<InstanceState>,
}

impl InstanceLifecycle {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            state: InstanceState::Created,
            history: vec![InstanceState::Created],
        }
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    /// Every state entered so far, starting with CREATED
    pub fn history(&self) -> &[InstanceState] {
        &self.history
    }

    /// Transition to a new state
    pub fn transition(&mut self, new_state: InstanceState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(new_state) {
            return Err(TransitionError::InvalidTransition {
                instance: self.instance.clone(),
                from: self.state,
                to: new_state,
            });
        }
        self.state = new_state;
        self.history.push(new_state);
        Ok(())
    }

    /// Transition to `success` or to FAILED at `step`
    pub fn complete(
        &mut self,
        step: Step,
        success: bool,
        next: InstanceState,
    ) -> Result<(), TransitionError> {
        if success {
            self.transition(next)
        } else {
            self.transition(InstanceState::Failed { step })
        }
    }
}
