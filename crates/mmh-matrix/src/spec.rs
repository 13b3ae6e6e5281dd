//! Declarative system specification (`system.yaml`)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::defaults::{TargetOverrides, TargetSettings};
use crate::error::MatrixError;

/// A toolchain reference: a bare name or a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Toolchain {
    Name(String),
    Record {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        architecture: Option<String>,
        /// Installation path of the toolchain, when it is not on `PATH`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
}

impl Toolchain {
    pub fn name(&self) -> &str {
        match self {
            Toolchain::Name(name) | Toolchain::Record { name, .. } => name,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Toolchain::Name(_) => None,
            Toolchain::Record { path, .. } => path.as_deref(),
        }
    }
}

/// A bare-board target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSpec {
    pub name: String,

    #[serde(default)]
    pub toolchains: Vec<Toolchain>,

    #[serde(flatten)]
    pub overrides: TargetOverrides,
}

/// A Zephyr build group: toolchains × boards sharing one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildGroup {
    #[serde(default)]
    pub toolchains: Vec<Toolchain>,

    #[serde(default)]
    pub boards: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_modules: Option<Vec<String>>,

    #[serde(flatten)]
    pub overrides: TargetOverrides,
}

impl BuildGroup {
    /// Toolchain entry named `toolchain`, if this group builds `board` with it
    pub fn covers(&self, toolchain: &str, board: &str) -> Option<&Toolchain> {
        if !self.boards.iter().any(|b| b == board) {
            return None;
        }
        self.toolchains.iter().find(|tc| tc.name() == toolchain)
    }
}

/// A Zephyr application target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ZephyrSpec {
    pub application: String,

    /// Application source directory; derived from `zephyr-template` if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default)]
    pub build: Vec<BuildGroup>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_modules: Option<Vec<String>>,

    #[serde(flatten)]
    pub overrides: TargetOverrides,
}

impl ZephyrSpec {
    /// First build group that builds `board` with `toolchain`.
    pub fn find_build(&self, toolchain: &str, board: &str) -> Result<&BuildGroup, MatrixError> {
        self.build
            .iter()
            .find(|group| group.covers(toolchain, board).is_some())
            .ok_or_else(|| MatrixError::NoBuildGroup {
                application: self.application.clone(),
                toolchain: toolchain.to_string(),
                board: board.to_string(),
            })
    }

    /// Module list for a build group: the group's modules (else the
    /// application's) followed by the base modules.
    pub fn modules_for(&self, group: &BuildGroup) -> Vec<String> {
        let mut modules = group
            .modules
            .as_ref()
            .or(self.modules.as_ref())
            .cloned()
            .unwrap_or_default();
        if let Some(base) = group.base_modules.as_ref().or(self.base_modules.as_ref()) {
            modules.extend(base.iter().cloned());
        }
        modules
    }

    /// Explicit application source for a build group, if any
    pub fn source_for<'a>(&'a self, group: &'a BuildGroup) -> Option<&'a str> {
        group.source.as_deref().or(self.source.as_deref())
    }
}

/// The whole system specification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSpec {
    #[serde(default)]
    pub boards: Vec<BoardSpec>,

    #[serde(default)]
    pub zephyr: Vec<ZephyrSpec>,

    /// Defaults shared by every target
    #[serde(default)]
    pub common: TargetOverrides,
}

impl SystemSpec {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    pub fn from_file(path: &Path) -> Result<Self, MatrixError> {
        let yaml = fs::read_to_string(path).map_err(|source| MatrixError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let spec = Self::from_yaml(&yaml).map_err(|e| MatrixError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        spec.validate()?;
        Ok(spec)
    }

    /// Check every name that ends up in a descriptor field.
    pub fn validate(&self) -> Result<(), MatrixError> {
        check_configs(&self.common)?;
        for board in &self.boards {
            check_name("board", &board.name)?;
            check_toolchains(&board.toolchains)?;
            check_configs(&board.overrides)?;
        }
        for app in &self.zephyr {
            check_name("zephyr application", &app.application)?;
            check_configs(&app.overrides)?;
            for group in &app.build {
                for board in &group.boards {
                    check_name("board", board)?;
                }
                check_toolchains(&group.toolchains)?;
                check_configs(&group.overrides)?;
            }
        }
        Ok(())
    }

    pub fn board(&self, name: &str) -> Result<&BoardSpec, MatrixError> {
        self.boards
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| MatrixError::UnknownTarget {
                kind: "board",
                name: name.to_string(),
            })
    }

    pub fn application(&self, name: &str) -> Result<&ZephyrSpec, MatrixError> {
        self.zephyr
            .iter()
            .find(|z| z.application == name)
            .ok_or_else(|| MatrixError::UnknownTarget {
                kind: "zephyr application",
                name: name.to_string(),
            })
    }

    /// Settings of a board: board, then `common`, then built-in defaults.
    pub fn board_settings(&self, board: &BoardSpec) -> TargetSettings {
        TargetSettings::resolve(&[&board.overrides, &self.common])
    }

    /// Settings of a Zephyr application, optionally refined by one of its
    /// build groups: group, application, `common`, built-in defaults.
    pub fn zephyr_settings(&self, app: &ZephyrSpec, group: Option<&BuildGroup>) -> TargetSettings {
        match group {
            Some(group) => {
                TargetSettings::resolve(&[&group.overrides, &app.overrides, &self.common])
            }
            None => TargetSettings::resolve(&[&app.overrides, &self.common]),
        }
    }
}

fn check_name(kind: &'static str, name: &str) -> Result<(), MatrixError> {
    if name.is_empty() || name.contains('/') {
        return Err(MatrixError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

fn check_toolchains(toolchains: &[Toolchain]) -> Result<(), MatrixError> {
    toolchains
        .iter()
        .try_for_each(|tc| check_name("toolchain", tc.name()))
}

fn check_configs(overrides: &TargetOverrides) -> Result<(), MatrixError> {
    overrides
        .build_configs
        .iter()
        .flatten()
        .try_for_each(|config| check_name("build configuration", config))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM: &str = "
common:
  build-tool: make
  install-dir: out
boards:
  - name: nucleo
    toolchains: [gcc]
    build-configs: [debug, release]
zephyr:
  - application: blinky
    build-configs: [debug]
    modules: [ufw]
    base-modules: [hal]
    build:
      - toolchains: [gcc, {name: gnuarmemb, path: /opt/gnuarmemb}]
        boards: [nucleo, esp32]
        kconfig: [small.conf]
      - toolchains: [clang]
        boards: [nucleo]
        modules: [ufw, tinycbor]
        build-tool: ninja
";

    #[test]
    fn test_parse_system_spec() {
        let spec = SystemSpec::from_yaml(SYSTEM).unwrap();
        assert_eq!(spec.boards.len(), 1);
        assert_eq!(spec.zephyr.len(), 1);
        assert_eq!(spec.common.build_tool.as_deref(), Some("make"));

        let app = spec.application("blinky").unwrap();
        assert_eq!(app.build[0].toolchains[1].name(), "gnuarmemb");
        assert_eq!(app.build[0].toolchains[1].path(), Some("/opt/gnuarmemb"));
        assert_eq!(app.build[0].toolchains[0], Toolchain::Name("gcc".to_string()));
    }

    #[test]
    fn test_board_settings_use_common() {
        let spec = SystemSpec::from_yaml(SYSTEM).unwrap();
        let settings = spec.board_settings(spec.board("nucleo").unwrap());
        assert_eq!(settings.build_tool, "make");
        assert_eq!(settings.install_dir, "out");
        assert_eq!(settings.build_configs, vec!["debug", "release"]);
    }

    #[test]
    fn test_group_overrides_application() {
        let spec = SystemSpec::from_yaml(SYSTEM).unwrap();
        let app = spec.application("blinky").unwrap();

        let first = app.find_build("gcc", "esp32").unwrap();
        let settings = spec.zephyr_settings(app, Some(first));
        assert_eq!(settings.kconfig, vec!["small.conf"]);
        assert_eq!(settings.build_tool, "make");

        let second = app.find_build("clang", "nucleo").unwrap();
        let settings = spec.zephyr_settings(app, Some(second));
        assert_eq!(settings.build_tool, "ninja");
        assert_eq!(settings.build_configs, vec!["debug"]);
    }

    #[test]
    fn test_modules_are_concatenated_with_base_modules() {
        let spec = SystemSpec::from_yaml(SYSTEM).unwrap();
        let app = spec.application("blinky").unwrap();

        let first = app.find_build("gcc", "nucleo").unwrap();
        assert_eq!(app.modules_for(first), vec!["ufw", "hal"]);

        let second = app.find_build("clang", "nucleo").unwrap();
        assert_eq!(app.modules_for(second), vec!["ufw", "tinycbor", "hal"]);
    }

    #[test]
    fn test_missing_build_group() {
        let spec = SystemSpec::from_yaml(SYSTEM).unwrap();
        let app = spec.application("blinky").unwrap();
        let err = app.find_build("clang", "esp32").unwrap_err();
        assert!(matches!(err, MatrixError::NoBuildGroup { .. }));
    }

    #[test]
    fn test_unknown_targets() {
        let spec = SystemSpec::from_yaml(SYSTEM).unwrap();
        assert!(spec.board("stm32").is_err());
        assert!(spec.application("hello").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = dir.path().join("system.yaml");
        std::fs::write(&good, SYSTEM).unwrap();
        assert_eq!(SystemSpec::from_file(&good).unwrap().boards[0].name, "nucleo");

        let bad = dir.path().join("broken.yaml");
        std::fs::write(&bad, "boards: {name: [").unwrap();
        assert!(matches!(SystemSpec::from_file(&bad), Err(MatrixError::Parse { .. })));

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(SystemSpec::from_file(&missing), Err(MatrixError::Io { .. })));
    }

    #[test]
    fn test_names_must_fit_descriptor_fields() {
        let cases = [
            ("boards:\n  - name: nucleo/f7\n    toolchains: [gcc]\n", "board"),
            ("boards:\n  - name: nucleo\n    toolchains: ['']\n", "toolchain"),
            ("common:\n  build-configs: [debug/lto]\n", "build configuration"),
            ("zephyr:\n  - application: ''\n", "zephyr application"),
            (
                "zephyr:\n  - application: blinky\n    build:\n      - toolchains: [gcc]\n        boards: [a/b]\n",
                "board",
            ),
        ];
        for (yaml, expected) in cases {
            let spec = SystemSpec::from_yaml(yaml).unwrap();
            match spec.validate() {
                Err(MatrixError::InvalidName { kind, .. }) => assert_eq!(kind, expected, "{}", yaml),
                other => panic!("{:?} validated as {:?}", yaml, other),
            }
        }
        assert!(SystemSpec::from_yaml(SYSTEM).unwrap().validate().is_ok());
    }

    #[test]
    fn test_from_file_rejects_invalid_names() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("system.yaml");
        std::fs::write(&path, "boards:\n  - name: a/b\n    toolchains: [gcc]\n").unwrap();
        assert!(matches!(
            SystemSpec::from_file(&path),
            Err(MatrixError::InvalidName { kind: "board", .. })
        ));
    }

    #[test]
    fn test_empty_spec() {
        let spec = SystemSpec::from_yaml("").unwrap();
        assert!(spec.boards.is_empty());
        assert!(spec.zephyr.is_empty());
    }
}
