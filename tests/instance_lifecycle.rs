//! Instance lifecycle tests driven through the run coordinator

mod fixtures;

use fixtures::SystemDir;
use mmh_system::stats::Status;
use mmh_system::tools::mock::ScriptedRunner;
use mmh_system::tools::Step;
use mmh_system::{Operation, RunSummary};

// =============================================================================
// Build
// =============================================================================

#[test]
fn test_build_step_order_per_instance() {
    let sys_dir = SystemDir::new();
    let system = sys_dir.system(
        sys_dir.options(&["boards/nucleo-f767zi/gcc-arm/debug"]),
        ScriptedRunner::new().with_test_count(3),
    );

    let outcome = system.run(Operation::Build).unwrap();
    assert!(outcome.succeeded());
    assert_eq!(
        system.runner().steps(),
        vec![Step::Configure, Step::Compile, Step::Test, Step::Test, Step::Install]
    );

    let record = &outcome.summary.instances[0];
    assert_eq!(record.build_tool, "ninja");
    assert_eq!(record.steps[2].tests, Some(3));
}

#[test]
fn test_board_configure_arguments() {
    let sys_dir = SystemDir::new();
    let mut options = sys_dir.options(&["boards/nucleo-f767zi/clang/release"]);
    options.cmake_args = vec!["-DUFW_WITH_DOCS=OFF".to_string()];
    let system = sys_dir.system(options, ScriptedRunner::new());
    system.run(Operation::Build).unwrap();

    let sys = sys_dir.path().display().to_string();
    let configure = &system.runner().calls()[0];
    assert_eq!(configure.program, "cmake");
    assert_eq!(
        configure.args,
        vec![
            "-G".to_string(),
            "Ninja".to_string(),
            "-S".to_string(),
            sys.clone(),
            "-B".to_string(),
            format!("{}/build-system/boards/nucleo-f767zi/clang/release", sys),
            "-DCMAKE_BUILD_TYPE=release".to_string(),
            format!(
                "-DCMAKE_INSTALL_PREFIX={}/build-system/artifacts/nucleo-f767zi/clang/release",
                sys
            ),
            "-DPROJECT_TARGET_NAME=nucleo-f767zi".to_string(),
            format!("-DCMAKE_TOOLCHAIN_FILE={}/libraries/ufw/cmake/toolchains/clang.cmake", sys),
            format!("-DUFW_ROOT={}/libraries/ufw", sys),
            "-DUFW_WITH_DOCS=OFF".to_string(),
        ]
    );
}

#[test]
fn test_zephyr_configure_arguments() {
    let sys_dir = SystemDir::new();
    let system = sys_dir.system(
        sys_dir.options(&["zephyr/esp32/blinky/zephyr/debug"]),
        ScriptedRunner::new(),
    );
    system.run(Operation::Build).unwrap();

    let sys = sys_dir.path().display().to_string();
    let configure = &system.runner().calls()[0];
    let args = &configure.args;
    assert!(args.contains(&format!("{}/build-system/zephyr/esp32/zephyr/blinky/debug", sys)));
    assert!(args.contains(&"-DBOARD=esp32".to_string()));
    assert!(args.contains(&"-DZEPHYR_TOOLCHAIN_VARIANT=zephyr".to_string()));
    assert!(args.contains(&"-DZEPHYR_TOOLCHAIN_PATH=/opt/zephyr-sdk".to_string()));
    assert!(args.contains(&format!("-DAPPLICATION_SOURCE={}/applications/blinky", sys)));
    assert!(args.contains(&format!("-DZEPHYR_BASE={}/zephyr/kernel", sys)));
    assert!(args.contains(&format!(
        "-DZEPHYR_MODULES={sys}/zephyr/modules/ufw;{sys}/zephyr/modules/tinycbor;{sys}/zephyr/modules/hal_stm32"
    )));
    assert!(!args.iter().any(|a| a.starts_with("-DOVERLAY_CONFIG")));
}

#[test]
fn test_group_kconfig_overlay() {
    let sys_dir = SystemDir::new();
    let system = sys_dir.system(
        sys_dir.options(&["zephyr/nucleo_l476rg/blinky/gnuarmemb/debug"]),
        ScriptedRunner::new(),
    );
    system.run(Operation::Build).unwrap();

    let sys = sys_dir.path().display().to_string();
    let args = &system.runner().calls()[0].args;
    assert!(args.contains(&format!("-DOVERLAY_CONFIG={}/boards.conf", sys)));
    assert!(args.contains(&format!(
        "-DZEPHYR_MODULES={sys}/zephyr/modules/ufw;{sys}/zephyr/modules/hal_stm32"
    )));
}

// =============================================================================
// Short-circuit and failure isolation
// =============================================================================

#[test]
fn test_configure_failure_stops_instance_only() {
    let sys_dir = SystemDir::new();
    let runner = ScriptedRunner::new().with_exit_code_for(Step::Configure, "clang", 1);
    let system = sys_dir.system(
        sys_dir.options(&["boards/nucleo-f767zi/*/debug"]),
        runner,
    );

    let outcome = system.run(Operation::Build).unwrap();
    assert!(!outcome.succeeded());
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(outcome.summary.status, Status::Failed);
    assert_eq!(outcome.summary.instance_count, 2);
    assert_eq!(
        outcome.summary.failed_instances(),
        vec!["boards/nucleo-f767zi/clang/debug"]
    );

    let clang = &outcome.summary.instances[0];
    assert_eq!(clang.steps.len(), 1);
    assert_eq!(clang.steps[0].exit_code, Some(1));

    let gcc = &outcome.summary.instances[1];
    assert_eq!(gcc.steps.len(), 4);
}

#[test]
fn test_failed_tests_skip_install() {
    let sys_dir = SystemDir::new();
    let runner = ScriptedRunner::new()
        .with_test_count(5)
        .with_exit_code(Step::Test, 8);
    let system = sys_dir.system(sys_dir.options(&["boards/nucleo-f767zi/gcc-arm/release"]), runner);

    let outcome = system.run(Operation::Build).unwrap();
    assert!(!outcome.succeeded());
    assert!(!system.runner().steps().contains(&Step::Install));
}

#[test]
fn test_zero_tests_is_success_without_running_ctest() {
    let sys_dir = SystemDir::new();
    let system = sys_dir.system(
        sys_dir.options(&["boards/host/gcc/debug"]),
        ScriptedRunner::new().with_test_count(0),
    );

    let outcome = system.run(Operation::Build).unwrap();
    assert!(outcome.succeeded());
    let ctest_runs = system
        .runner()
        .commands()
        .into_iter()
        .filter(|c| c.starts_with("ctest --test-dir"))
        .count();
    assert_eq!(ctest_runs, 0);
}

// =============================================================================
// Install
// =============================================================================

#[test]
fn test_install_components_run_in_build_directory() {
    let sys_dir = SystemDir::new();
    let system = sys_dir.system(
        sys_dir.options(&["zephyr/esp32/blinky/zephyr/debug"]),
        ScriptedRunner::new(),
    );
    system.run(Operation::Build).unwrap();

    let installs: Vec<_> = system
        .runner()
        .calls()
        .into_iter()
        .filter(|c| c.step == Step::Install)
        .collect();
    assert_eq!(installs.len(), 2);
    assert_eq!(installs[0].args, vec!["--install", ".", "--component", "firmware"]);
    assert_eq!(installs[1].args, vec!["--install", ".", "--component", "docs"]);
    assert_eq!(
        installs[0].cwd.as_deref(),
        Some(sys_dir.build_dir().join("zephyr/esp32/zephyr/blinky/debug").as_path())
    );
}

#[test]
fn test_install_disabled_target() {
    let sys_dir = SystemDir::new();
    let system = sys_dir.system(sys_dir.options(&["boards/host/gcc/debug"]), ScriptedRunner::new());
    let outcome = system.run(Operation::Build).unwrap();

    assert!(outcome.succeeded());
    assert!(!system.runner().steps().contains(&Step::Install));
}

// =============================================================================
// Rebuild and clean
// =============================================================================

#[test]
fn test_rebuild_skips_configure() {
    let sys_dir = SystemDir::new();
    let system = sys_dir.system(
        sys_dir.options(&["boards/nucleo-f767zi/gcc-arm/debug"]),
        ScriptedRunner::new(),
    );
    let outcome = system.run(Operation::Rebuild).unwrap();

    assert!(outcome.succeeded());
    assert_eq!(outcome.summary.operation, "rebuild");
    assert!(!system.runner().steps().contains(&Step::Configure));
}

#[test]
fn test_rebuild_failure_sets_exit_code() {
    let sys_dir = SystemDir::new();
    let system = sys_dir.system(
        sys_dir.options(&["boards/nucleo-f767zi/gcc-arm/debug"]),
        ScriptedRunner::new().with_exit_code(Step::Compile, 2),
    );
    let outcome = system.run(Operation::Rebuild).unwrap();
    assert_eq!(outcome.exit_code(), 1);
}

#[test]
fn test_clean_failure_is_reported() {
    let sys_dir = SystemDir::new();
    let system = sys_dir.system(
        sys_dir.options(&["boards/host/gcc/debug"]),
        ScriptedRunner::new().with_signal(Step::Clean),
    );
    let outcome = system.run(Operation::Clean).unwrap();

    assert!(!outcome.succeeded());
    assert_eq!(outcome.summary.instances[0].steps[0].exit_code, None);
}

// =============================================================================
// Run summary
// =============================================================================

#[test]
fn test_summary_written_and_reloaded() {
    let sys_dir = SystemDir::new();
    let system = sys_dir.system(sys_dir.options(&[]), ScriptedRunner::new());
    let outcome = system.run(Operation::Build).unwrap();

    let path = sys_dir.path().join("summary.json");
    outcome.summary.write_to_file(&path).unwrap();
    let loaded = RunSummary::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(loaded.instance_count, fixtures::FIXTURE_MATRIX.len());
    assert_eq!(loaded.human_summary, "All 8 build(s) succeeded.");
    let checkpoints: Vec<&str> = loaded.checkpoints.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(checkpoints, vec!["system-initialisation", "finish"]);
}
