//! Stack error kinds.

use std::io;
use std::path::PathBuf;

/// Errors raised while loading or querying a stack.
///
/// `NoData` and `UnknownItem` are deliberately distinct: the first means the
/// stack was never loaded, the second that it was loaded but no layer
/// provides the key.
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error("{stack}: no data loaded")]
    NoData { stack: String },

    #[error("unknown configuration item: {0}")]
    UnknownItem(String),

    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("configuration item {key} is not a {expected}")]
    InvalidType { key: String, expected: &'static str },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl StackError {
    /// True for errors caused by a stack that was never loaded.
    pub fn is_no_data(&self) -> bool {
        matches!(self, StackError::NoData { .. })
    }
}
