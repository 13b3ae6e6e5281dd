//! Build directory and instance state
//!
//! - Build directory: persisted mode record (`MakeMeHappy.yaml`) reconciled
//!   against each invocation's request
//! - Instance state: CREATED → CONFIGURED → COMPILED → TESTED → INSTALLED,
//!   with CLEANED and FAILED as terminal alternatives

mod directory;
mod instance_state;

pub use directory::{
    BuildDirectory, BuildMode, DirectoryState, ModeRequest, StateError, STATE_FILE,
};
pub use instance_state::{InstanceLifecycle, InstanceState, TransitionError};

/// Check if a state is terminal (no further transitions possible)
pub trait TerminalState {
    fn is_terminal(&self) -> bool;
}
