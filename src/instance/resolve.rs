//! Instance resolution: effective settings, directories and the configure
//! arguments of one instance.

use std::path::{Path, PathBuf};

use mmh_matrix::template::{self, APPLICATION, SYSTEM};
use mmh_matrix::{InstanceDescriptor, MatrixError, SystemSpec, TargetSettings};

use crate::state::BuildMode;
use crate::tools::cmake::{self, ConfigureArgs, ConfigureTarget};

/// Where instances of a run are built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    /// System root; value of `${system}`
    pub system_dir: PathBuf,
    /// Build directory root as given on the command line
    pub root: PathBuf,
    pub mode: BuildMode,
}

impl BuildLayout {
    /// Build directory of an instance
    pub fn build_dir(&self, descriptor: &InstanceDescriptor) -> PathBuf {
        match self.mode {
            BuildMode::Single => self.root.clone(),
            BuildMode::Multi => match descriptor {
                InstanceDescriptor::Board {
                    board,
                    toolchain,
                    config,
                } => self.root.join("boards").join(board).join(toolchain).join(config),
                InstanceDescriptor::Zephyr {
                    board,
                    application,
                    toolchain,
                    config,
                } => self
                    .root
                    .join("zephyr")
                    .join(board)
                    .join(toolchain)
                    .join(application)
                    .join(config),
            },
        }
    }

    /// Install directory of an instance below `install_dir`
    pub fn install_dir(&self, descriptor: &InstanceDescriptor, install_dir: &str) -> PathBuf {
        let base = self.system_dir.join(&self.root).join(install_dir);
        match self.mode {
            BuildMode::Single => base,
            BuildMode::Multi => {
                let base = base
                    .join(descriptor.board_name())
                    .join(descriptor.toolchain());
                match descriptor.application() {
                    Some(app) => base.join(app).join(descriptor.config()),
                    None => base.join(descriptor.config()),
                }
            }
        }
    }

    fn expand(&self, value: &str, application: Option<&str>) -> String {
        let system = self.system_dir.display().to_string();
        let mut vars = vec![(SYSTEM, system.as_str())];
        if let Some(app) = application {
            vars.push((APPLICATION, app));
        }
        template::expand(value, &vars)
    }

    /// Expand templates and anchor relative paths at the system root
    fn path(&self, value: &str, application: Option<&str>) -> String {
        let expanded = self.expand(value, application);
        if Path::new(&expanded).is_absolute() {
            expanded
        } else {
            self.system_dir.join(expanded).display().to_string()
        }
    }
}

/// An instance with everything needed to run its steps
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInstance {
    pub descriptor: InstanceDescriptor,
    pub settings: TargetSettings,
    pub build_dir: PathBuf,
    pub install_dir: PathBuf,
    /// Zephyr module names (empty for boards)
    pub modules: Vec<String>,
    pub configure: ConfigureArgs,
}

impl ResolvedInstance {
    /// Resolve `descriptor` against the system specification.
    ///
    /// Fails if the descriptor names a target `system.yaml` does not define, or
    /// if no build group of a Zephyr application covers it.
    pub fn resolve(
        spec: &SystemSpec,
        descriptor: &InstanceDescriptor,
        layout: &BuildLayout,
    ) -> Result<Self, MatrixError> {
        match descriptor {
            InstanceDescriptor::Board {
                board, toolchain, ..
            } => {
                let board_spec = spec.board(board)?;
                if !board_spec.toolchains.iter().any(|tc| tc.name() == toolchain.as_str()) {
                    return Err(MatrixError::UnknownTarget {
                        kind: "toolchain",
                        name: toolchain.clone(),
                    });
                }
                let settings = spec.board_settings(board_spec);
                let target = ConfigureTarget::Board {
                    board: board.clone(),
                    toolchain: toolchain.clone(),
                };
                Ok(Self::assemble(descriptor, settings, Vec::new(), target, layout))
            }
            InstanceDescriptor::Zephyr {
                board,
                application,
                toolchain,
                ..
            } => {
                let app = spec.application(application)?;
                let group = app.find_build(toolchain, board)?;
                let toolchain_entry = group.covers(toolchain, board).ok_or_else(|| {
                    MatrixError::NoBuildGroup {
                        application: application.clone(),
                        toolchain: toolchain.clone(),
                        board: board.clone(),
                    }
                })?;
                let settings = spec.zephyr_settings(app, Some(group));
                let modules = app.modules_for(group);

                let app_name = Some(application.as_str());
                let application_source = match app.source_for(group) {
                    Some(source) => layout.path(source, app_name),
                    None => layout.path(&settings.zephyr_template, app_name),
                };
                let module_path: Vec<String> = settings
                    .zephyr_module_path
                    .iter()
                    .map(|p| layout.path(p, app_name))
                    .collect();
                let target = ConfigureTarget::Zephyr {
                    board: board.clone(),
                    toolchain: toolchain.clone(),
                    toolchain_path: toolchain_entry.path().map(|p| layout.path(p, app_name)),
                    application_source,
                    kernel: layout.path(&settings.zephyr_kernel, app_name),
                    modules: module_directories(&module_path, &modules),
                    kconfig: settings
                        .kconfig
                        .iter()
                        .map(|k| layout.path(k, app_name))
                        .collect(),
                };
                Ok(Self::assemble(descriptor, settings, modules, target, layout))
            }
        }
    }

    fn assemble(
        descriptor: &InstanceDescriptor,
        settings: TargetSettings,
        modules: Vec<String>,
        target: ConfigureTarget,
        layout: &BuildLayout,
    ) -> Self {
        let application = descriptor.application();
        let build_dir = layout.build_dir(descriptor);
        let install_dir = layout.install_dir(descriptor, &settings.install_dir);
        let source_dir = match &settings.build_system {
            Some(dir) => layout.path(dir, application),
            None => layout.system_dir.display().to_string(),
        };
        let configure = ConfigureArgs {
            generator: cmake::generator(&settings.build_tool),
            source_dir,
            build_dir: build_dir.clone(),
            install_dir: install_dir.clone(),
            build_config: descriptor.config().to_string(),
            module_root: layout.path(&settings.module_root, application),
            target,
            extra: Vec::new(),
        };
        Self {
            descriptor: descriptor.clone(),
            settings,
            build_dir,
            install_dir,
            modules,
            configure,
        }
    }

    pub fn name(&self) -> String {
        self.descriptor.to_string()
    }
}

/// Directory of each module: the first module path entry containing it,
/// else below the first entry.
pub fn module_directories(module_path: &[String], modules: &[String]) -> Vec<String> {
    modules
        .iter()
        .map(|module| {
            module_path
                .iter()
                .map(|dir| Path::new(dir).join(module))
                .find(|candidate| candidate.is_dir())
                .or_else(|| module_path.first().map(|dir| Path::new(dir).join(module)))
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| module.clone())
        })
        .collect()
}
