//! Subprocess runner with timeout and output cap.
//!
//! Every supervisor command goes through the [`CommandRunner`] trait so the
//! reconciliation engine can be driven by a scripted fake in tests. The
//! production implementation, [`SystemRunner`], adds:
//!
//! - Per-command timeout with SIGTERM then SIGKILL escalation
//! - Output size caps to prevent memory exhaustion
//! - Non-blocking capture of stdout and stderr
//!
//! Commands run strictly one at a time; there is no parallel execution.

use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, instrument, trace, warn};

/// Default timeout per command in seconds.
///
/// `pm2 reload` on a cluster waits for every worker to come back, so this is
/// far more generous than a quick status query needs.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default maximum output size in bytes (16MB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// Grace period between SIGTERM and SIGKILL in milliseconds.
const SIGTERM_GRACE_MS: u64 = 500;

/// Errors that prevent a command from producing an exit status.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("command failed to spawn: {0}")]
    SpawnFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output from a command execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommandOutput {
    /// Standard output (may be truncated).
    pub stdout: Vec<u8>,

    /// Standard error (may be truncated).
    pub stderr: Vec<u8>,

    /// Exit code (None when killed by a signal).
    pub exit_code: Option<i32>,

    /// Whether output was truncated.
    pub truncated: bool,

    /// Execution duration.
    pub duration: Duration,

    /// Whether the command timed out.
    pub timed_out: bool,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        CommandOutput {
            stdout: stdout.into().into_bytes(),
            exit_code: Some(0),
            ..Default::default()
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        CommandOutput {
            stderr: stderr.into().into_bytes(),
            exit_code: Some(exit_code),
            ..Default::default()
        }
    }

    /// Get stdout as string (lossy UTF-8 conversion).
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as string (lossy UTF-8 conversion).
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Check if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Capability to run an external program and capture its result.
pub trait CommandRunner {
    fn run(&self, program: &Path, args: &[String]) -> Result<CommandOutput, RunnerError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &Path, args: &[String]) -> Result<CommandOutput, RunnerError> {
        (**self).run(program, args)
    }
}

/// Configuration for the system runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Timeout per command.
    pub timeout: Duration,

    /// Maximum output size per stream in bytes.
    pub max_output_bytes: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Default)]
pub struct SystemRunner {
    config: RunnerConfig,
}

impl SystemRunner {
    /// Create a new runner with the given configuration.
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Create a runner with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(RunnerConfig::default())
    }

    /// Execute a child process with timeout and output capture.
    fn execute_with_timeout(&self, child: &mut Child) -> Result<CommandOutput, RunnerError> {
        let timeout = self.config.timeout;
        let max_output = self.config.max_output_bytes;
        let deadline = Instant::now() + timeout;
        let mut out = CommandOutput::default();

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        let mut chunk = vec![0u8; 8192];

        loop {
            if Instant::now() >= deadline {
                out.timed_out = true;
                warn!(timeout_ms = timeout.as_millis() as u64, "command timed out, sending SIGTERM");
                kill_with_grace(child);
                break;
            }

            let mut did_read = false;

            if let Some(ref mut pipe) = stdout {
                if let Ok(n) = try_read_nonblocking(pipe, &mut chunk) {
                    if n > 0 {
                        did_read = true;
                        append_capped(&mut out.stdout, &chunk[..n], max_output, &mut out.truncated);
                    }
                }
            }

            if let Some(ref mut pipe) = stderr {
                if let Ok(n) = try_read_nonblocking(pipe, &mut chunk) {
                    if n > 0 {
                        did_read = true;
                        append_capped(&mut out.stderr, &chunk[..n], max_output, &mut out.truncated);
                    }
                }
            }

            match child.try_wait() {
                Ok(Some(status)) => {
                    if let Some(ref mut pipe) = stdout {
                        let _ = drain_to_limit(pipe, &mut out.stdout, max_output, &mut out.truncated);
                    }
                    if let Some(ref mut pipe) = stderr {
                        let _ = drain_to_limit(pipe, &mut out.stderr, max_output, &mut out.truncated);
                    }
                    out.exit_code = status.code();
                    trace!(exit_code = ?out.exit_code, "process exited");
                    return Ok(out);
                }
                Ok(None) => {
                    if !did_read {
                        thread::sleep(Duration::from_millis(10));
                    }
                }
                Err(e) => {
                    error!(error = %e, "failed to wait for child");
                    return Err(RunnerError::Io(e));
                }
            }
        }

        // Timed out - wait for kill to complete
        out.exit_code = child.wait().ok().and_then(|s| s.code());
        Ok(out)
    }
}

impl CommandRunner for SystemRunner {
    #[instrument(skip(self, args), fields(program = %program.display()))]
    fn run(&self, program: &Path, args: &[String]) -> Result<CommandOutput, RunnerError> {
        debug!(
            args = ?args,
            timeout_ms = self.config.timeout.as_millis() as u64,
            "running command"
        );

        let start = Instant::now();

        // The environment is inherited: pm2 locates its daemon through HOME
        // and PM2_HOME.
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                error!(error = %e, "failed to spawn");
                RunnerError::SpawnFailed(e.to_string())
            })?;

        let mut output = self.execute_with_timeout(&mut child)?;
        output.duration = start.elapsed();

        debug!(
            duration_ms = output.duration.as_millis() as u64,
            exit_code = ?output.exit_code,
            timed_out = output.timed_out,
            "command complete"
        );

        Ok(output)
    }
}

fn append_capped(buf: &mut Vec<u8>, data: &[u8], max: usize, truncated: &mut bool) {
    let space = max.saturating_sub(buf.len());
    if space > 0 {
        let to_copy = data.len().min(space);
        buf.extend_from_slice(&data[..to_copy]);
        if data.len() > space {
            *truncated = true;
        }
    } else if !data.is_empty() {
        *truncated = true;
    }
}

/// Drain remaining data from a stream up to the limit.
///
/// Uses non-blocking reads so a grandchild still holding the pipe open
/// (the pm2 daemon on first start) cannot hang the caller.
fn drain_to_limit<R: Read + AsRawFdCompat>(
    stream: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
    truncated: &mut bool,
) -> std::io::Result<()> {
    let mut chunk = vec![0u8; 8192];
    loop {
        if *truncated {
            break;
        }
        match try_read_nonblocking(stream, &mut chunk) {
            Ok(0) => break,
            Ok(n) => append_capped(buf, &chunk[..n], max, truncated),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Kill a process with SIGTERM, then SIGKILL after grace period.
#[cfg(unix)]
fn kill_with_grace(child: &mut Child) {
    let pid = child.id() as i32;

    // SAFETY: plain signal delivery to our own child.
    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }
    debug!(pid, "sent SIGTERM");

    thread::sleep(Duration::from_millis(SIGTERM_GRACE_MS));

    match child.try_wait() {
        Ok(Some(_)) => {
            trace!(pid, "process exited after SIGTERM");
        }
        Ok(None) => {
            warn!(pid, "process did not exit after SIGTERM, sending SIGKILL");
            let _ = child.kill();
            let _ = child.wait();
        }
        Err(e) => {
            error!(pid, error = %e, "failed to check process status");
        }
    }
}

#[cfg(not(unix))]
fn kill_with_grace(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
use std::os::unix::io::AsRawFd as AsRawFdCompat;

#[cfg(not(unix))]
trait AsRawFdCompat {}
#[cfg(not(unix))]
impl<T> AsRawFdCompat for T {}

/// Try to read from a stream without blocking.
///
/// Sets O_NONBLOCK on the descriptor for the duration of one read and
/// restores the original flags. Returns Ok(0) if no data is available.
#[cfg(unix)]
fn try_read_nonblocking<R: Read + AsRawFdCompat>(
    stream: &mut R,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let fd = stream.as_raw_fd();

    // SAFETY: fcntl on a descriptor owned by `stream` for its lifetime.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }

    let was_nonblocking = (flags & libc::O_NONBLOCK) != 0;
    if !was_nonblocking {
        let result = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        if result < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    let result = stream.read(buf);

    if !was_nonblocking {
        unsafe {
            libc::fcntl(fd, libc::F_SETFL, flags);
        }
    }

    match result {
        Ok(n) => Ok(n),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
        Err(e) => Err(e),
    }
}

/// Non-blocking read fallback for non-Unix platforms.
#[cfg(not(unix))]
fn try_read_nonblocking<R: Read>(stream: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    stream.read(buf)
}
