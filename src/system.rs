//! Run coordinator
//!
//! Loads `system.yaml`, generates the build matrix, validates requested
//! instances, reconciles the build directory and drives every selected
//! instance through the requested operation.

use std::fmt;
use std::path::PathBuf;
use tracing::{error, info};

use mmh_matrix::{expand_patterns, InstanceDescriptor, Matrix, SystemSpec};

use crate::config::ToolConfig;
use crate::error::{SystemError, SystemResult};
use crate::instance::{BuildLayout, InstanceContext, SystemInstance};
use crate::state::{BuildDirectory, BuildMode, ModeRequest};
use crate::stats::{ExecutionStatistics, RunSummary, CHECKPOINT_FINISH, CHECKPOINT_INIT};
use crate::tools::ToolRunner;

/// What to do with each selected instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Build,
    Rebuild,
    Clean,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Build => "build",
            Operation::Rebuild => "rebuild",
            Operation::Clean => "clean",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options of one invocation
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// System root; value of `${system}`
    pub system_dir: PathBuf,
    /// Build directory root
    pub directory: PathBuf,
    /// `Some(true)` for `--single-instance`, `Some(false)` for
    /// `--multi-instance`
    pub single_instance: Option<bool>,
    /// Requested instances or patterns; empty selects the whole matrix
    pub instances: Vec<String>,
    pub force: bool,
    /// Extra arguments for every configure call
    pub cmake_args: Vec<String>,
}

impl RunOptions {
    pub fn new(system_dir: impl Into<PathBuf>, directory: impl Into<PathBuf>) -> Self {
        Self {
            system_dir: system_dir.into(),
            directory: directory.into(),
            single_instance: None,
            instances: Vec::new(),
            force: false,
            cmake_args: Vec::new(),
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub operation: Operation,
    pub directory: BuildDirectory,
    pub summary: RunSummary,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.summary.exit_code == 0
    }

    pub fn exit_code(&self) -> i32 {
        self.summary.exit_code
    }
}

/// A system build
pub struct System<R: ToolRunner> {
    spec: SystemSpec,
    matrix: Matrix,
    options: RunOptions,
    tools: ToolConfig,
    runner: R,
    version: String,
}

impl<R: ToolRunner> System<R> {
    pub fn new(spec: SystemSpec, options: RunOptions, tools: ToolConfig, runner: R) -> Self {
        let matrix = Matrix::from_spec(&spec);
        Self {
            spec,
            matrix,
            options,
            tools,
            runner,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Version recorded in the build directory state
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn spec(&self) -> &SystemSpec {
        &self.spec
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Every descriptor of the matrix, in matrix order
    pub fn list(&self) -> &[String] {
        self.matrix.names()
    }

    /// Requested instances with patterns expanded
    pub fn requested(&self) -> SystemResult<Vec<String>> {
        Ok(expand_patterns(&self.matrix, &self.options.instances)?)
    }

    /// Check every name against the matrix. All unknown names are logged;
    /// the error names the first.
    pub fn validate(&self, names: &[String]) -> SystemResult<()> {
        let unknown: Vec<&String> = names.iter().filter(|n| !self.matrix.contains(n)).collect();
        for name in &unknown {
            error!(instance = %name, "unknown system instance");
        }
        match unknown.first() {
            Some(name) => Err(SystemError::UnknownInstance(name.to_string())),
            None => Ok(()),
        }
    }

    /// Create or adopt the build directory
    pub fn setup_directory(&self, requested: &[String]) -> SystemResult<BuildDirectory> {
        let root = &self.options.directory;
        let request = ModeRequest::from_flags(self.options.single_instance, requested, root.exists())?;
        Ok(BuildDirectory::setup(root, &request, &self.version, self.options.force)?)
    }

    /// Instances to process: the single instance of a single-mode
    /// directory, else the requested subset, else the whole matrix.
    pub fn select(&self, directory: &BuildDirectory, requested: &[String]) -> Vec<String> {
        match (&directory.mode, &directory.single_instance) {
            (BuildMode::Single, Some(instance)) => vec![instance.clone()],
            _ if !requested.is_empty() => requested.to_vec(),
            _ => self.matrix.names().to_vec(),
        }
    }

    fn layout(&self, directory: &BuildDirectory) -> BuildLayout {
        BuildLayout {
            system_dir: self.options.system_dir.clone(),
            root: directory.path.clone(),
            mode: directory.mode,
        }
    }

    /// Validate, set up the build directory and run `operation` on every
    /// selected instance.
    pub fn run(&self, operation: Operation) -> SystemResult<RunOutcome> {
        let mut stats = ExecutionStatistics::new();
        stats.checkpoint(CHECKPOINT_INIT);

        let requested = self.requested()?;
        self.validate(&requested)?;

        let directory = self.setup_directory(&requested)?;
        let selected = self.select(&directory, &requested);
        self.validate(&selected)?;

        let layout = self.layout(&directory);
        let mut instances = selected
            .iter()
            .map(|name| {
                let descriptor = InstanceDescriptor::parse(name)?;
                SystemInstance::resolve(&self.spec, &descriptor, &layout)
            })
            .collect::<SystemResult<Vec<_>>>()?;

        info!(
            operation = %operation,
            mode = %directory.mode,
            count = instances.len(),
            "processing system instances"
        );
        for instance in &instances {
            info!(instance = instance.name(), "selected");
        }

        let ctx = InstanceContext {
            tools: &self.tools,
            runner: &self.runner,
            cmake_args: &self.options.cmake_args,
        };
        for instance in &mut instances {
            stats.begin_instance(instance.name(), &instance.resolved().settings.build_tool);
            match operation {
                Operation::Build => instance.build(&ctx, &mut stats)?,
                Operation::Rebuild => instance.rebuild(&ctx, &mut stats)?,
                Operation::Clean => instance.clean(&ctx, &mut stats)?,
            };
        }

        stats.checkpoint(CHECKPOINT_FINISH);
        let summary = RunSummary::from_statistics(operation.as_str(), &stats);
        if summary.exit_code == 0 {
            info!("{}", summary.human_summary);
        } else {
            error!("{}", summary.human_summary);
            for failed in summary.failed_instances() {
                error!(instance = failed, "failed");
            }
        }

        Ok(RunOutcome {
            operation,
            directory,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::mock::ScriptedRunner;
    use crate::tools::Step;
    use tempfile::TempDir;

    const SYSTEM_YAML: &str = "
boards:
  - name: nucleo
    toolchains: [gcc, clang]
    build-configs: [debug]
";

    fn system(tmp: &TempDir, instances: &[&str]) -> System<ScriptedRunner> {
        let spec = SystemSpec::from_yaml(SYSTEM_YAML).unwrap();
        let mut options = RunOptions::new(tmp.path(), tmp.path().join("build"));
        options.instances = instances.iter().map(|s| s.to_string()).collect();
        System::new(spec, options, ToolConfig::default(), ScriptedRunner::new())
    }

    #[test]
    fn test_list_is_matrix_order() {
        let tmp = TempDir::new().unwrap();
        let sys = system(&tmp, &[]);
        assert_eq!(sys.list(), ["boards/nucleo/clang/debug", "boards/nucleo/gcc/debug"]);
    }

    #[test]
    fn test_unknown_instance_rejected_before_directory_setup() {
        let tmp = TempDir::new().unwrap();
        let sys = system(&tmp, &["boards/nucleo/gcc/debug", "boards/stm32/gcc/debug", "boards/x/y/z"]);
        match sys.run(Operation::Build) {
            Err(SystemError::UnknownInstance(name)) => assert_eq!(name, "boards/stm32/gcc/debug"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!tmp.path().join("build").exists());
        assert!(sys.runner().calls().is_empty());
    }

    #[test]
    fn test_full_matrix_build() {
        let tmp = TempDir::new().unwrap();
        let sys = system(&tmp, &[]);
        let outcome = sys.run(Operation::Build).unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.summary.instance_count, 2);
        assert_eq!(outcome.directory.mode, BuildMode::Multi);
    }

    #[test]
    fn test_subset_and_patterns() {
        let tmp = TempDir::new().unwrap();
        let sys = system(&tmp, &["boards/nucleo/g*/debug"]);
        let outcome = sys.run(Operation::Clean).unwrap();
        assert_eq!(outcome.summary.instance_count, 1);
        assert_eq!(outcome.summary.instances[0].instance, "boards/nucleo/gcc/debug");
        assert_eq!(sys.runner().steps(), vec![Step::Clean]);
    }

    #[test]
    fn test_exit_code_follows_statistics() {
        let tmp = TempDir::new().unwrap();
        let spec = SystemSpec::from_yaml(SYSTEM_YAML).unwrap();
        let options = RunOptions::new(tmp.path(), tmp.path().join("build"));
        let runner = ScriptedRunner::new().with_exit_code_for(Step::Compile, "clang", 1);
        let sys = System::new(spec, options, ToolConfig::default(), runner);

        let outcome = sys.run(Operation::Rebuild).unwrap();
        assert!(!outcome.succeeded());
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(outcome.summary.failed_instances(), vec!["boards/nucleo/clang/debug"]);
    }
}
