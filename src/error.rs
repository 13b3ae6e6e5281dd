//! Top-level error type for system runs

use std::io;
use thiserror::Error;

use mmh_matrix::MatrixError;
use mmh_stack::StackError;

use crate::state::{StateError, TransitionError};

/// Errors that abort a system run before or outside of building.
///
/// Build failures are not errors: they are recorded in the execution
/// statistics and reflected in the run's exit code.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("configuration error: {0}")]
    Stack(#[from] StackError),

    #[error("system specification error: {0}")]
    Matrix(#[from] MatrixError),

    #[error("build directory error: {0}")]
    State(#[from] StateError),

    #[error("instance state error: {0}")]
    Transition(#[from] TransitionError),

    #[error("unknown system instance: {0}")]
    UnknownInstance(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SystemError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SystemError::Stack(_) => 2,
            SystemError::Matrix(_) => 2,
            SystemError::UnknownInstance(_) => 2,
            SystemError::State(StateError::InvalidRequest(_)) => 2,
            SystemError::State(_) => 3,
            SystemError::Transition(_) => 1,
            SystemError::Io(_) => 1,
            SystemError::Serialization(_) => 1,
        }
    }
}

/// Result type for system operations
pub type SystemResult<T> = Result<T, SystemError>;
