//! System specifications and build-instance addressing.
//!
//! A system specification (`system.yaml`) declares bare-board targets and Zephyr
//! applications. Every point of the resulting build matrix is addressed by an
//! [`InstanceDescriptor`], a path-like string that round-trips through
//! [`InstanceDescriptor::parse`]:
//!
//! - `boards/<board>/<toolchain>/<config>`
//! - `zephyr/<board>/<application>/<toolchain>/<config>`

mod defaults;
mod descriptor;
mod error;
mod matrix;
mod spec;
pub mod template;

pub use defaults::{InstallSpec, TargetOverrides, TargetSettings};
pub use descriptor::{InstanceDescriptor, InstanceKind};
pub use error::MatrixError;
pub use matrix::{expand_patterns, generate_matrix, is_pattern, Matrix};
pub use spec::{BoardSpec, BuildGroup, SystemSpec, Toolchain, ZephyrSpec};
