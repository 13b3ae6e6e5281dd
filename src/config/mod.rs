//! Tool configuration
//!
//! Configuration comes from a layered stack, highest precedence first:
//! 1. Command line overrides
//! 2. Files given with `--config`
//! 3. User config (`$XDG_CONFIG_HOME/makemehappy/config.yaml`)
//! 4. Dot-file config (`~/.makemehappy/config.yaml`)
//! 5. Built-in defaults
//!
//! The source stack (module → repository mapping) is layered the same way
//! from `sources.yaml`.

mod defaults;

pub use defaults::{BuiltinDefaults, CMAKE, CTEST, LOG_ALL};

use serde_json::{Map, Value};
use std::path::PathBuf;

use mmh_stack::{ConfigStack, Layer, LayerOrigin, SourceStack, Stack, StackError};

/// Directory name used below the user's config and home directories
pub const APP_DIR: &str = "makemehappy";

/// File name of the configuration layers
pub const CONFIG_FILE: &str = "config.yaml";

/// File name of the source layers
pub const SOURCES_FILE: &str = "sources.yaml";

/// Per-user locations of `name`: XDG config directory first, then the
/// dot-directory in `$HOME`.
pub fn user_files(name: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        files.push(dir.join(APP_DIR).join(name));
    }
    if let Some(home) = dirs::home_dir() {
        files.push(home.join(format!(".{}", APP_DIR)).join(name));
    }
    files
}

/// Command line values that override every configuration file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_all: Option<bool>,
}

impl CliOverrides {
    fn to_layer(&self) -> Option<Layer> {
        let mut data = Map::new();
        if let Some(log_all) = self.log_all {
            data.insert(LOG_ALL.to_string(), Value::Bool(log_all));
        }
        if data.is_empty() {
            None
        } else {
            Some(Layer::new(LayerOrigin::Cli, data))
        }
    }
}

/// Assemble the configuration stack without loading it.
///
/// `extra` files take precedence over the per-user files in the order given.
pub fn config_stack(extra: &[PathBuf], user: &[PathBuf], cli: &CliOverrides) -> ConfigStack {
    let mut stack = Stack::new("config").with_fallback(BuiltinDefaults::default().to_layer());
    for path in extra.iter().chain(user) {
        stack.push(path);
    }
    if let Some(layer) = cli.to_layer() {
        stack.push_layer(layer);
    }
    ConfigStack::from_stack(stack)
}

/// Assemble the source stack without loading it.
pub fn source_stack(extra: &[PathBuf], user: &[PathBuf]) -> SourceStack {
    let mut stack = SourceStack::new("sources");
    for path in extra.iter().chain(user) {
        stack.push(path);
    }
    stack
}

/// Tool settings resolved from a loaded configuration stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub log_all: bool,
    pub cmake: String,
    pub ctest: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            log_all: defaults.log_all,
            cmake: defaults.cmake,
            ctest: defaults.ctest,
        }
    }
}

impl ToolConfig {
    pub fn from_stack(stack: &ConfigStack) -> Result<Self, StackError> {
        Ok(Self {
            log_all: stack.lookup_bool(LOG_ALL)?,
            cmake: stack.lookup_str(CMAKE)?.to_string(),
            ctest: stack.lookup_str(CTEST)?.to_string(),
        })
    }

    /// Load the stack and resolve tool settings from it
    pub fn load(stack: &mut ConfigStack) -> Result<Self, StackError> {
        stack.load()?;
        Self::from_stack(stack)
    }
}
