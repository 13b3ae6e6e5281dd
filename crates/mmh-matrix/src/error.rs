//! Matrix and system specification errors.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum MatrixError {
    #[error("invalid system instance: {0}")]
    InvalidSystemInstance(String),

    #[error("unknown {kind} in system specification: {name}")]
    UnknownTarget { kind: &'static str, name: String },

    #[error("no build group of application {application} covers toolchain {toolchain} on board {board}")]
    NoBuildGroup {
        application: String,
        toolchain: String,
        board: String,
    },

    #[error("invalid {kind} name {name:?}: names must be non-empty and free of '/'")]
    InvalidName { kind: &'static str, name: String },

    #[error("invalid instance pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}
