//! Supervisor command client.
//!
//! Wraps a [`CommandRunner`] with the pm2 executable path and converts raw
//! command outcomes into [`pm2ctl_common::Error`] values.

use super::runner::{CommandOutput, CommandRunner, RunnerError};
use pm2ctl_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name searched on `PATH` when no executable is configured.
pub const SUPERVISOR_BINARY: &str = "pm2";

/// Resolve the pm2 executable: the explicit path when given, else a `PATH`
/// search.
pub fn discover_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        debug!(executable = %path.display(), "using configured executable");
        return Ok(path.to_path_buf());
    }

    let found = which::which(SUPERVISOR_BINARY).map_err(|e| {
        debug!(error = %e, "pm2 not found on PATH");
        Error::ExecutableNotFound {
            name: SUPERVISOR_BINARY.to_string(),
        }
    })?;
    debug!(executable = %found.display(), "discovered executable on PATH");
    Ok(found)
}

/// Issues pm2 commands through a runner, one at a time.
#[derive(Debug)]
pub struct SupervisorClient<R> {
    executable: PathBuf,
    runner: R,
}

impl<R> SupervisorClient<R> {
    pub fn new(executable: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            executable: executable.into(),
            runner,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl<R: CommandRunner> SupervisorClient<R> {
    /// Run `pm2 <args...>` and return its stdout.
    ///
    /// A non-zero exit, a spawn failure or a timeout is an error carrying
    /// the command line.
    pub fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<String> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        let command = args.join(" ");

        let output = self
            .runner
            .run(&self.executable, &args)
            .map_err(|e| spawn_error(&command, e))?;

        check_output(&command, output)
    }
}

fn spawn_error(command: &str, err: RunnerError) -> Error {
    let reason = match err {
        RunnerError::SpawnFailed(reason) => reason,
        RunnerError::Io(e) => e.to_string(),
    };
    Error::CommandSpawn {
        command: command.to_string(),
        reason,
    }
}

fn check_output(command: &str, output: CommandOutput) -> Result<String> {
    if output.timed_out {
        return Err(Error::CommandTimeout {
            command: command.to_string(),
            seconds: output.duration.as_secs(),
        });
    }

    if output.truncated {
        warn!(command, "pm2 output exceeded the capture limit and was truncated");
    }

    if !output.success() {
        return Err(Error::CommandFailed {
            command: command.to_string(),
            // Killed by a signal: no exit code to report.
            rc: output.exit_code.unwrap_or(-1),
            stderr: output.stderr_str(),
        });
    }

    Ok(output.stdout_str())
}
