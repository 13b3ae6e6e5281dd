//! Runner that spawns real processes

use std::io::{self, BufRead, BufReader};
use std::process::{Child, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

use super::{Invocation, ToolError, ToolRunner};

/// Spawns tool processes.
///
/// With `log_all` set, the child's stdout and stderr are read line by line
/// and re-emitted through the log; otherwise the child inherits the
/// terminal.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    log_all: bool,
}

impl ProcessRunner {
    pub fn new(log_all: bool) -> Self {
        Self { log_all }
    }

    fn spawn_error(invocation: &Invocation, source: std::io::Error) -> ToolError {
        ToolError::Spawn {
            program: invocation.program.clone(),
            source,
        }
    }

    fn run_logged(&self, invocation: &Invocation) -> Result<Option<i32>, ToolError> {
        let mut child = invocation
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_error(invocation, e))?;

        let step = invocation.step;
        let stdout = child.stdout.take();
        let stdout_handle = thread::spawn(move || {
            if let Some(stdout) = stdout {
                for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                    info!(step = %step, "{}", line);
                }
            }
        });

        let stderr = child.stderr.take();
        let stderr_handle = thread::spawn(move || {
            if let Some(stderr) = stderr {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    info!(step = %step, stream = "stderr", "{}", line);
                }
            }
        });

        let status = child.wait();
        finish_logged(&mut child, status, [stdout_handle, stderr_handle])
    }
}

/// Join the output streaming threads, then report the child's status. A
/// failed wait kills the child first so its pipes close.
fn finish_logged(
    child: &mut Child,
    status: io::Result<ExitStatus>,
    readers: [JoinHandle<()>; 2],
) -> Result<Option<i32>, ToolError> {
    if status.is_err() {
        let _ = child.kill();
        let _ = child.wait();
    }
    for reader in readers {
        let _ = reader.join();
    }
    Ok(status?.code())
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<Option<i32>, ToolError> {
        info!(step = %invocation.step, command = %invocation, "running");
        if let Some(cwd) = &invocation.cwd {
            debug!(cwd = %cwd.display(), "working directory");
        }

        if self.log_all {
            return self.run_logged(invocation);
        }
        let status = invocation
            .command()
            .status()
            .map_err(|e| Self::spawn_error(invocation, e))?;
        Ok(status.code())
    }

    fn capture(&self, invocation: &Invocation) -> Result<String, ToolError> {
        debug!(step = %invocation.step, command = %invocation, "capturing");
        let output = invocation
            .command()
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| Self::spawn_error(invocation, e))?;
        if !output.status.success() {
            return Err(ToolError::ExitStatus {
                program: invocation.program.clone(),
                code: output.status.code(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
