//! Layered configuration stacks.
//!
//! A stack is an ordered list of configuration layers. The layer registered
//! first has the highest precedence: lookups return the value from the
//! earliest layer that defines a key, later layers only supply defaults.
//!
//! Two specializations sit on top of the generic [`Stack`]:
//! - [`SourceStack`]: merges per-module source metadata (`modules:` maps)
//! - [`ConfigStack`]: tool configuration plus toolchain/build-tool queries

mod config;
mod error;
mod layer;
mod source;
mod stack;

pub use config::{ConfigStack, ToolchainEntry};
pub use error::StackError;
pub use layer::{Layer, LayerOrigin};
pub use source::{ModuleEntry, SourceStack, DEFAULT_MODULE_TYPE};
pub use stack::Stack;

/// Result type for stack operations
pub type StackResult<T> = Result<T, StackError>;
