//! MakeMeHappy system builds
//!
//! Orchestrates multi-target builds of embedded firmware systems: bare-board
//! targets and Zephyr applications across board, toolchain and build
//! configuration. The crate decides what to build, in which order and with
//! which settings; compilation itself is delegated to CMake, ctest and the
//! configured build tool.

pub mod config;
pub mod error;
pub mod instance;
pub mod state;
pub mod stats;
pub mod system;
pub mod tools;

pub use config::{BuiltinDefaults, ToolConfig};
pub use error::{SystemError, SystemResult};
pub use instance::{BuildLayout, InstanceContext, ResolvedInstance, SystemInstance};
pub use state::{BuildDirectory, BuildMode, DirectoryState, InstanceState, ModeRequest};
pub use stats::{ExecutionStatistics, RunSummary};
pub use system::{Operation, RunOptions, RunOutcome, System};
pub use tools::{Invocation, ProcessRunner, Step, ToolError, ToolRunner};
