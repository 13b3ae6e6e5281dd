//! Test fixtures for system build tests
//!
//! - A system specification with bare-board and Zephyr targets
//! - Scratch system directories with the specification copied in

use std::fs;
use std::path::{Path, PathBuf};

use mmh_matrix::SystemSpec;
use mmh_system::tools::mock::ScriptedRunner;
use mmh_system::{RunOptions, System, ToolConfig};
use tempfile::TempDir;

/// Path to the fixture system specification
pub fn system_spec_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/system/system.yaml")
}

/// The parsed fixture system specification
pub fn system_spec() -> SystemSpec {
    SystemSpec::from_file(&system_spec_path()).expect("fixture system.yaml should parse")
}

/// Every descriptor the fixture specification produces, in matrix order
pub const FIXTURE_MATRIX: &[&str] = &[
    "boards/host/gcc/debug",
    "boards/nucleo-f767zi/clang/debug",
    "boards/nucleo-f767zi/clang/release",
    "boards/nucleo-f767zi/gcc-arm/debug",
    "boards/nucleo-f767zi/gcc-arm/release",
    "zephyr/esp32/blinky/zephyr/debug",
    "zephyr/nucleo_f767zi/blinky/gnuarmemb/debug",
    "zephyr/nucleo_l476rg/blinky/gnuarmemb/debug",
];

/// A scratch system directory holding a copy of the fixture `system.yaml`
pub struct SystemDir {
    pub dir: TempDir,
}

impl SystemDir {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        fs::copy(system_spec_path(), dir.path().join("system.yaml")).expect("copy system.yaml");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn build_dir(&self) -> PathBuf {
        self.path().join("build-system")
    }

    /// Run options for this directory requesting `instances`
    pub fn options(&self, instances: &[&str]) -> RunOptions {
        let mut options = RunOptions::new(self.path(), self.build_dir());
        options.instances = instances.iter().map(|s| s.to_string()).collect();
        options
    }

    /// A system over the fixture `system.yaml` driving `runner`
    pub fn system(&self, options: RunOptions, runner: ScriptedRunner) -> System<ScriptedRunner> {
        System::new(system_spec(), options, ToolConfig::default(), runner)
    }
}
