//! CMake and CTest command lines

use std::path::{Path, PathBuf};

use super::{Invocation, Step, ToolError};

/// CMake generator name for a build tool
pub fn generator(build_tool: &str) -> String {
    match build_tool {
        "ninja" => "Ninja".to_string(),
        "make" => "Unix Makefiles".to_string(),
        other => other.to_string(),
    }
}

/// Target-specific part of a configure call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigureTarget {
    Board {
        board: String,
        toolchain: String,
    },
    Zephyr {
        board: String,
        toolchain: String,
        toolchain_path: Option<String>,
        application_source: String,
        kernel: String,
        /// Module directories handed to the Zephyr build
        modules: Vec<String>,
        kconfig: Vec<String>,
    },
}

/// Everything a configure call needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureArgs {
    pub generator: String,
    pub source_dir: String,
    pub build_dir: PathBuf,
    pub install_dir: PathBuf,
    pub build_config: String,
    pub module_root: String,
    pub target: ConfigureTarget,
    /// Extra arguments from the command line, appended last
    pub extra: Vec<String>,
}

fn define(name: &str, value: impl AsRef<str>) -> String {
    format!("-D{}={}", name, value.as_ref())
}

/// Name of the cache variable holding a toolchain's installation path
pub fn toolchain_path_variable(toolchain: &str) -> String {
    format!("{}_TOOLCHAIN_PATH", toolchain.to_uppercase().replace('-', "_"))
}

pub fn configure(cmake: &str, args: &ConfigureArgs) -> Invocation {
    let mut inv = Invocation::new(Step::Configure, cmake)
        .arg("-G")
        .arg(&args.generator)
        .arg("-S")
        .arg(&args.source_dir)
        .arg("-B")
        .arg(args.build_dir.display().to_string())
        .arg(define("CMAKE_BUILD_TYPE", &args.build_config))
        .arg(define(
            "CMAKE_INSTALL_PREFIX",
            args.install_dir.display().to_string(),
        ));

    match &args.target {
        ConfigureTarget::Board { board, toolchain } => {
            inv = inv.arg(define("PROJECT_TARGET_NAME", board)).arg(define(
                "CMAKE_TOOLCHAIN_FILE",
                format!("{}/cmake/toolchains/{}.cmake", args.module_root, toolchain),
            ));
        }
        ConfigureTarget::Zephyr {
            board,
            toolchain,
            toolchain_path,
            application_source,
            kernel,
            modules,
            kconfig,
        } => {
            inv = inv
                .arg(define("BOARD", board))
                .arg(define("ZEPHYR_TOOLCHAIN_VARIANT", toolchain));
            if let Some(path) = toolchain_path {
                inv = inv.arg(define(&toolchain_path_variable(toolchain), path));
            }
            inv = inv
                .arg(define("APPLICATION_SOURCE", application_source))
                .arg(define("ZEPHYR_BASE", kernel));
            if !modules.is_empty() {
                inv = inv.arg(define("ZEPHYR_MODULES", modules.join(";")));
            }
            if !kconfig.is_empty() {
                inv = inv.arg(define("OVERLAY_CONFIG", kconfig.join(";")));
            }
        }
    }

    inv.arg(define("UFW_ROOT", &args.module_root))
        .args(args.extra.iter().cloned())
}

pub fn build(cmake: &str, dir: &Path) -> Invocation {
    Invocation::new(Step::Compile, cmake)
        .arg("--build")
        .arg(dir.display().to_string())
}

pub fn clean(cmake: &str, dir: &Path) -> Invocation {
    Invocation::new(Step::Clean, cmake)
        .arg("--build")
        .arg(dir.display().to_string())
        .args(["--target", "clean"])
}

/// `cmake --install .` run inside `dir`
pub fn install(cmake: &str, dir: &Path, component: Option<&str>) -> Invocation {
    let inv = Invocation::new(Step::Install, cmake)
        .args(["--install", "."])
        .current_dir(dir);
    match component {
        Some(component) => inv.arg("--component").arg(component),
        None => inv,
    }
}

/// `ctest --show-only`: lists the registered tests without running them
pub fn list_tests(ctest: &str, dir: &Path) -> Invocation {
    Invocation::new(Step::Test, ctest)
        .args(["--show-only", "--test-dir"])
        .arg(dir.display().to_string())
}

pub fn run_tests(ctest: &str, dir: &Path) -> Invocation {
    Invocation::new(Step::Test, ctest)
        .arg("--test-dir")
        .arg(dir.display().to_string())
}

/// Registered test count from `ctest --show-only` output: the last token of
/// the last non-empty line (`Total Tests: 3`).
pub fn parse_test_count(ctest: &str, output: &str) -> Result<usize, ToolError> {
    let unexpected = |message: String| ToolError::UnexpectedOutput {
        program: ctest.to_string(),
        message,
    };
    let line = output
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| unexpected("no output".to_string()))?;
    let token = line
        .split_whitespace()
        .last()
        .ok_or_else(|| unexpected("no output".to_string()))?;
    token
        .parse()
        .map_err(|_| unexpected(format!("cannot read test count from {:?}", line.trim())))
}
