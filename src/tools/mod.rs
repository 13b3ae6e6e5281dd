//! External build tools
//!
//! Every tool call is described by an [`Invocation`] and executed through a
//! [`ToolRunner`]. [`ProcessRunner`] spawns real processes; the scripted
//! runner in [`mock`] records invocations for tests.

pub mod cmake;
pub mod mock;
mod process;

pub use process::ProcessRunner;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

/// Lifecycle step an invocation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Configure,
    Compile,
    Test,
    Install,
    Clean,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Configure => "configure",
            Step::Compile => "compile",
            Step::Test => "test",
            Step::Install => "install",
            Step::Clean => "clean",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One external program call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub step: Step,
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for this call only
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(step: Step, program: impl Into<String>) -> Self {
        Self {
            step,
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// A `std::process::Command` for this invocation
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        command
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Tool errors. These fail the current step; they never abort a run.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with status {code:?}")]
    ExitStatus { program: String, code: Option<i32> },

    #[error("unexpected output from {program}: {message}")]
    UnexpectedOutput { program: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Executes invocations
pub trait ToolRunner {
    /// Run to completion and return the exit code (`None` if the process
    /// was terminated by a signal).
    fn run(&self, invocation: &Invocation) -> Result<Option<i32>, ToolError>;

    /// Run to completion and return standard output. A non-zero exit is an
    /// error.
    fn capture(&self, invocation: &Invocation) -> Result<String, ToolError>;
}
