//! Build directory mode record and its reconciliation.
//!
//! A build directory remembers how it was first used: single-instance or
//! multi-instance layout, the tool version, and for single mode the instance
//! it holds. Later invocations must agree with that record unless `--force`
//! is given.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the state file inside a build directory
pub const STATE_FILE: &str = "MakeMeHappy.yaml";

/// Layout of a system build directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildMode {
    /// One instance built directly in the build directory
    #[serde(rename = "system-single")]
    Single,
    /// Every instance in its own subdirectory
    #[serde(rename = "system-multi")]
    Multi,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Single => "system-single",
            BuildMode::Multi => "system-multi",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted content of `MakeMeHappy.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DirectoryState {
    pub mode: BuildMode,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_instance: Option<String>,
}

/// Errors for build directory state
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("{}: version mismatch: {expected} != {found}; use --force to adopt the directory", path.display())]
    VersionMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("{}: build mode mismatch: {persisted} != {requested}", path.display())]
    ModeMismatch {
        path: PathBuf,
        persisted: BuildMode,
        requested: BuildMode,
    },

    #[error("{}: single instance mismatch: {persisted} != {requested}", path.display())]
    SingleInstanceMismatch {
        path: PathBuf,
        persisted: String,
        requested: String,
    },

    #[error("{}: build directory exists but its state could not be loaded", path.display())]
    StateMissing { path: PathBuf },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("YAML error in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl DirectoryState {
    pub fn from_file(path: &Path) -> Result<Self, StateError> {
        let yaml = fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&yaml).map_err(|source| StateError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write_to_file(&self, path: &Path) -> Result<(), StateError> {
        let yaml = serde_yaml::to_string(self).map_err(|source| StateError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, yaml).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Mode requested by the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeRequest {
    /// `None` lets an existing directory decide; new directories default to
    /// multi-instance mode.
    pub mode: Option<BuildMode>,
    pub single_instance: Option<String>,
}

impl ModeRequest {
    /// Build a request from the mode flags and the requested instances.
    ///
    /// Single-instance mode needs exactly one instance, except that an
    /// existing directory may supply it when none is given.
    pub fn from_flags(
        single: Option<bool>,
        instances: &[String],
        directory_exists: bool,
    ) -> Result<Self, StateError> {
        match single {
            None => Ok(Self::default()),
            Some(false) => Ok(Self {
                mode: Some(BuildMode::Multi),
                single_instance: None,
            }),
            Some(true) => match instances {
                [one] => Ok(Self {
                    mode: Some(BuildMode::Single),
                    single_instance: Some(one.clone()),
                }),
                [] if directory_exists => Ok(Self {
                    mode: Some(BuildMode::Single),
                    single_instance: None,
                }),
                [] => Err(StateError::InvalidRequest(
                    "single-instance mode requires an instance to build".to_string(),
                )),
                _ => Err(StateError::InvalidRequest(format!(
                    "single-instance mode requires exactly one instance, got {}",
                    instances.len()
                ))),
            },
        }
    }
}

/// A build directory after reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDirectory {
    pub path: PathBuf,
    pub mode: BuildMode,
    /// The instance a single-mode directory holds
    pub single_instance: Option<String>,
    /// True if this invocation created the directory
    pub created: bool,
}

impl BuildDirectory {
    pub fn state_file(path: &Path) -> PathBuf {
        path.join(STATE_FILE)
    }

    /// Create or adopt the build directory at `path`.
    ///
    /// A new directory is created with the requested mode (multi if none)
    /// and its state written. An existing directory must agree with its
    /// persisted state; `force` only replaces the persisted version.
    pub fn setup(
        path: &Path,
        request: &ModeRequest,
        version: &str,
        force: bool,
    ) -> Result<Self, StateError> {
        let state_path = Self::state_file(path);

        if !path.exists() {
            let state = DirectoryState {
                mode: request.mode.unwrap_or(BuildMode::Multi),
                version: Some(version.to_string()),
                single_instance: request.single_instance.clone(),
            };
            fs::create_dir_all(path).map_err(|source| StateError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            state.write_to_file(&state_path)?;
            info!(directory = %path.display(), mode = %state.mode, "created build directory");
            return Ok(Self::from_state(path, state, true));
        }

        let mut persisted = DirectoryState::from_file(&state_path).map_err(|e| {
            warn!(error = %e, "failed to load build directory state");
            StateError::StateMissing {
                path: path.to_path_buf(),
            }
        })?;

        if force && persisted.version.as_deref() != Some(version) {
            warn!(
                directory = %path.display(),
                found = persisted.version.as_deref().unwrap_or("none"),
                version,
                "forcing build directory version"
            );
            persisted.version = Some(version.to_string());
            persisted.write_to_file(&state_path)?;
        }

        if persisted.version.as_deref() != Some(version) {
            return Err(StateError::VersionMismatch {
                path: state_path,
                expected: version.to_string(),
                found: persisted.version.unwrap_or_else(|| "none".to_string()),
            });
        }

        if let Some(requested) = request.mode {
            if requested != persisted.mode {
                return Err(StateError::ModeMismatch {
                    path: state_path,
                    persisted: persisted.mode,
                    requested,
                });
            }
        }

        if persisted.mode == BuildMode::Single {
            let Some(held) = persisted.single_instance.as_ref() else {
                return Err(StateError::StateMissing {
                    path: path.to_path_buf(),
                });
            };
            if let Some(requested) = &request.single_instance {
                if requested != held {
                    return Err(StateError::SingleInstanceMismatch {
                        path: state_path,
                        persisted: held.clone(),
                        requested: requested.clone(),
                    });
                }
            }
        }

        info!(directory = %path.display(), mode = %persisted.mode, "using existing build directory");
        Ok(Self::from_state(path, persisted, false))
    }

    fn from_state(path: &Path, state: DirectoryState, created: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            mode: state.mode,
            single_instance: state.single_instance,
            created,
        }
    }
}
