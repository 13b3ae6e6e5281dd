//! MakeMeHappy system build CLI
//!
//! Entry point for the `mmh` command-line tool.

use clap::{Args, Parser, Subcommand};
use mmh_matrix::SystemSpec;
use mmh_system::config::{self, CliOverrides, CONFIG_FILE, SOURCES_FILE};
use mmh_system::{Operation, ProcessRunner, RunOptions, System, SystemResult, ToolConfig};
use std::path::PathBuf;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mmh")]
#[command(about = "Multi-target firmware system builds", version)]
struct Cli {
    /// Build directory
    #[arg(long, short = 'd', global = true, default_value = "build-system")]
    directory: PathBuf,

    /// System specification file
    #[arg(long, global = true, default_value = "system.yaml")]
    spec: PathBuf,

    /// Build exactly one instance directly in the build directory
    #[arg(long, global = true, conflicts_with = "multi_instance")]
    single_instance: bool,

    /// Build every instance in its own subdirectory
    #[arg(long, global = true)]
    multi_instance: bool,

    /// Adopt a build directory created by another version
    #[arg(long, global = true)]
    force: bool,

    /// Forward all tool output to the log
    #[arg(long, global = true)]
    log_all: bool,

    /// Additional configuration file (may be repeated)
    #[arg(long = "config", global = true)]
    config: Vec<PathBuf>,

    /// Additional source definition file (may be repeated)
    #[arg(long = "sources", global = true)]
    sources: Vec<PathBuf>,

    /// Extra argument for every CMake configure call (may be repeated)
    #[arg(long = "cmake", global = true, allow_hyphen_values = true)]
    cmake: Vec<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InstanceArgs {
    /// Instances or shell-style patterns; all instances if none given
    instances: Vec<String>,

    /// Write a JSON run summary to this file
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure, compile, test and install system instances
    Build(InstanceArgs),

    /// Compile, test and install already configured instances
    Rebuild(InstanceArgs),

    /// Clean the build trees of system instances
    Clean(InstanceArgs),

    /// List every instance of the build matrix
    List,

    /// Show toolchains, architectures, build tools and build configurations
    Toolchains,

    /// List module sources, or show one module's definition
    Sources {
        /// Module name
        module: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Build(args) => run_operation(&cli, Operation::Build, args),
        Commands::Rebuild(args) => run_operation(&cli, Operation::Rebuild, args),
        Commands::Clean(args) => run_operation(&cli, Operation::Clean, args),
        Commands::List => run_list(&cli),
        Commands::Toolchains => run_toolchains(&cli),
        Commands::Sources { module } => run_sources(&cli, module.as_deref()),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{}", e);
            process::exit(e.exit_code());
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .without_time()
        .init();
}

fn load_tools(cli: &Cli) -> SystemResult<ToolConfig> {
    let overrides = CliOverrides {
        log_all: cli.log_all.then_some(true),
    };
    let mut stack = config::config_stack(&cli.config, &config::user_files(CONFIG_FILE), &overrides);
    Ok(ToolConfig::load(&mut stack)?)
}

fn mode_flag(cli: &Cli) -> Option<bool> {
    if cli.single_instance {
        Some(true)
    } else if cli.multi_instance {
        Some(false)
    } else {
        None
    }
}

fn run_operation(cli: &Cli, operation: Operation, args: &InstanceArgs) -> SystemResult<i32> {
    let tools = load_tools(cli)?;
    let spec = SystemSpec::from_file(&cli.spec)?;

    let mut options = RunOptions::new(std::env::current_dir()?, &cli.directory);
    options.single_instance = mode_flag(cli);
    options.instances = args.instances.clone();
    options.force = cli.force;
    options.cmake_args = cli.cmake.clone();

    let runner = ProcessRunner::new(tools.log_all);
    let system = System::new(spec, options, tools, runner);
    let outcome = system.run(operation)?;

    if let Some(path) = &args.summary {
        outcome.summary.write_to_file(path)?;
    }
    Ok(outcome.exit_code())
}

fn run_list(cli: &Cli) -> SystemResult<i32> {
    let spec = SystemSpec::from_file(&cli.spec)?;
    let system = System::new(
        spec,
        RunOptions::new(".", &cli.directory),
        ToolConfig::default(),
        ProcessRunner::default(),
    );
    for name in system.list() {
        println!("{}", name);
    }
    Ok(0)
}

fn run_toolchains(cli: &Cli) -> SystemResult<i32> {
    let mut stack = config::config_stack(
        &cli.config,
        &config::user_files(CONFIG_FILE),
        &CliOverrides::default(),
    );
    stack.load()?;

    let sections = [
        ("Toolchains", stack.all_toolchains()),
        ("Architectures", stack.all_architectures()),
        ("Build tools", stack.all_buildtools()),
        ("Build configurations", stack.all_buildconfigs()),
    ];
    for (title, items) in sections {
        println!("{}:", title);
        for item in items {
            println!("  {}", item);
        }
    }
    Ok(0)
}

fn run_sources(cli: &Cli, module: Option<&str>) -> SystemResult<i32> {
    let mut stack = config::source_stack(&cli.sources, &config::user_files(SOURCES_FILE));
    stack.load()?;

    match module {
        None => {
            for name in stack.all_sources()? {
                println!("{}", name);
            }
        }
        Some(name) => {
            let entry = stack.lookup(name)?;
            println!("{} ({})", entry.name, entry.kind);
            for (key, value) in &entry.attributes {
                println!("  {}: {}", key, value);
            }
        }
    }
    Ok(0)
}
