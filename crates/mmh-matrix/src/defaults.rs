//! Target settings and their default resolution.
//!
//! Every target (board or Zephyr application) carries optional overrides.
//! [`TargetSettings::resolve`] turns an ordered list of override blocks into a
//! fully populated settings record: for each field the first block that sets
//! it wins, and the built-in default applies when none does.

use serde::{Deserialize, Serialize};

/// What the install step should do for a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstallSpec {
    /// `true`: default install target, `false`: installation disabled
    Enabled(bool),
    /// Install a single component
    Component(String),
    /// Install several components, one invocation each
    Components(Vec<String>),
}

impl InstallSpec {
    /// Components to install. `None` stands for the default install target;
    /// an empty list means installation is disabled.
    pub fn components(&self) -> Vec<Option<String>> {
        match self {
            InstallSpec::Enabled(true) => vec![None],
            InstallSpec::Enabled(false) => Vec::new(),
            InstallSpec::Component(c) => vec![Some(c.clone())],
            InstallSpec::Components(cs) => cs.iter().cloned().map(Some).collect(),
        }
    }
}

impl Default for InstallSpec {
    fn default() -> Self {
        InstallSpec::Enabled(true)
    }
}

/// Optional per-target settings as written in `system.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_configs: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_tool: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_dir: Option<String>,

    /// Root of the module library (`ufw`)
    #[serde(
        default,
        rename = "ufw",
        alias = "module-root",
        skip_serializing_if = "Option::is_none"
    )]
    pub module_root: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kconfig: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zephyr_kernel: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zephyr_module_path: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zephyr_template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<InstallSpec>,
}

/// Fully resolved settings for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetSettings {
    pub build_configs: Vec<String>,
    pub build_system: Option<String>,
    pub build_tool: String,
    pub install_dir: String,
    #[serde(rename = "ufw")]
    pub module_root: String,
    pub kconfig: Vec<String>,
    pub zephyr_kernel: String,
    pub zephyr_module_path: Vec<String>,
    pub zephyr_template: String,
    pub install: InstallSpec,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            build_configs: vec!["debug".to_string(), "release".to_string()],
            build_system: None,
            build_tool: "ninja".to_string(),
            install_dir: "artifacts".to_string(),
            module_root: "${system}/libraries/ufw".to_string(),
            kconfig: Vec::new(),
            zephyr_kernel: "${system}/zephyr/kernel".to_string(),
            zephyr_module_path: vec!["${system}/zephyr/modules".to_string()],
            zephyr_template: "applications/${application}".to_string(),
            install: InstallSpec::default(),
        }
    }
}

impl TargetSettings {
    /// Resolve settings from override blocks in precedence order
    /// (first block wins), falling back to the built-in defaults.
    pub fn resolve(layers: &[&TargetOverrides]) -> Self {
        let builtin = Self::default();
        Self {
            build_configs: pick(layers, |o| o.build_configs.as_ref())
                .unwrap_or(builtin.build_configs),
            build_system: pick(layers, |o| o.build_system.as_ref()).or(builtin.build_system),
            build_tool: pick(layers, |o| o.build_tool.as_ref()).unwrap_or(builtin.build_tool),
            install_dir: pick(layers, |o| o.install_dir.as_ref()).unwrap_or(builtin.install_dir),
            module_root: pick(layers, |o| o.module_root.as_ref()).unwrap_or(builtin.module_root),
            kconfig: pick(layers, |o| o.kconfig.as_ref()).unwrap_or(builtin.kconfig),
            zephyr_kernel: pick(layers, |o| o.zephyr_kernel.as_ref())
                .unwrap_or(builtin.zephyr_kernel),
            zephyr_module_path: pick(layers, |o| o.zephyr_module_path.as_ref())
                .unwrap_or(builtin.zephyr_module_path),
            zephyr_template: pick(layers, |o| o.zephyr_template.as_ref())
                .unwrap_or(builtin.zephyr_template),
            install: pick(layers, |o| o.install.as_ref()).unwrap_or(builtin.install),
        }
    }
}

fn pick<T: Clone>(
    layers: &[&TargetOverrides],
    field: impl Fn(&TargetOverrides) -> Option<&T>,
) -> Option<T> {
    layers.iter().find_map(|layer| field(layer)).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_defaults() {
        let settings = TargetSettings::resolve(&[]);
        assert_eq!(settings.build_configs, vec!["debug", "release"]);
        assert_eq!(settings.build_tool, "ninja");
        assert_eq!(settings.install_dir, "artifacts");
        assert!(settings.build_system.is_none());
        assert_eq!(settings.zephyr_module_path, vec!["${system}/zephyr/modules"]);
        assert_eq!(settings.install, InstallSpec::Enabled(true));
    }

    #[test]
    fn test_target_beats_common_beats_builtin() {
        let target = TargetOverrides {
            build_tool: Some("make".to_string()),
            ..Default::default()
        };
        let common = TargetOverrides {
            build_tool: Some("ninja-build".to_string()),
            install_dir: Some("out".to_string()),
            build_configs: Some(vec!["release".to_string()]),
            ..Default::default()
        };

        let settings = TargetSettings::resolve(&[&target, &common]);
        assert_eq!(settings.build_tool, "make");
        assert_eq!(settings.install_dir, "out");
        assert_eq!(settings.build_configs, vec!["release"]);
        assert_eq!(settings.zephyr_template, "applications/${application}");
    }

    #[test]
    fn test_overrides_from_yaml() {
        let yaml = "
build-configs: [debug]
build-system: cmake/system
ufw: libs/ufw
kconfig: [prj-extra.conf]
install: [runtime, docs]
";
        let overrides: TargetOverrides = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(overrides.module_root.as_deref(), Some("libs/ufw"));
        assert_eq!(overrides.build_system.as_deref(), Some("cmake/system"));

        let settings = TargetSettings::resolve(&[&overrides]);
        assert_eq!(
            settings.install.components(),
            vec![Some("runtime".to_string()), Some("docs".to_string())]
        );
    }

    #[test]
    fn test_install_components() {
        assert_eq!(InstallSpec::Enabled(true).components(), vec![None]);
        assert!(InstallSpec::Enabled(false).components().is_empty());
        assert_eq!(
            InstallSpec::Component("fw".to_string()).components(),
            vec![Some("fw".to_string())]
        );
    }
}
