//! Parsers for pm2 command output.
//!
//! `pm2 jlist` prints one JSON array with an entry per process. Only the
//! fields below are read; everything else pm2 reports is ignored. Entries
//! are decoded into raw records first and then mapped field by field onto
//! [`Process`].

use pm2ctl_common::{Error, ExecMode, Monitor, Pm2Id, Process, ProcessId, ProcessStatus, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// First bytes of `jlist` output when the daemon runs an older pm2 than
/// the CLI.
pub const STALE_REGISTRY_BANNER: &str = "\n>>>> In-memory PM2 is out-of-date, do:";

#[derive(Debug, Deserialize)]
struct RawProcess {
    pm_id: u32,
    name: String,
    #[serde(default)]
    pid: Option<u32>,
    pm2_env: RawEnv,
    #[serde(default)]
    monit: RawMonit,
}

#[derive(Debug, Deserialize)]
struct RawEnv {
    pm_exec_path: PathBuf,
    #[serde(default)]
    pm_cwd: Option<PathBuf>,
    #[serde(default = "default_interpreter")]
    exec_interpreter: String,
    #[serde(default = "default_exec_mode")]
    exec_mode: String,
    #[serde(default = "default_namespace")]
    namespace: String,
    status: String,
    #[serde(default)]
    restart_time: u64,
}

#[derive(Debug, Default, Deserialize)]
struct RawMonit {
    #[serde(default)]
    memory: u64,
    // pm2 prints integral percentages without a fraction
    #[serde(default)]
    cpu: f64,
}

fn default_interpreter() -> String {
    "none".to_string()
}

fn default_exec_mode() -> String {
    "fork_mode".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

impl From<RawProcess> for Process {
    fn from(raw: RawProcess) -> Self {
        Process {
            cwd: raw.pm2_env.pm_cwd,
            file: raw.pm2_env.pm_exec_path,
            id: Pm2Id(raw.pm_id),
            interpreter: raw.pm2_env.exec_interpreter,
            mode: ExecMode::from(raw.pm2_env.exec_mode),
            monitor: Monitor {
                memory: raw.monit.memory,
                cpu: raw.monit.cpu,
                restarts: raw.pm2_env.restart_time,
            },
            name: raw.name,
            namespace: raw.pm2_env.namespace,
            pid: raw.pid.map(ProcessId),
            status: ProcessStatus::from(raw.pm2_env.status),
        }
    }
}

/// Returns true when `output` starts with the stale registry banner.
pub fn is_stale_registry(output: &str) -> bool {
    output.starts_with(STALE_REGISTRY_BANNER)
}

/// Decode `pm2 jlist` output, keeping pm2's order.
pub fn parse_jlist(output: &str) -> Result<Vec<Process>> {
    let raw: Vec<RawProcess> =
        serde_json::from_str(output.trim()).map_err(|e| Error::InventoryDecode(e.to_string()))?;
    Ok(raw.into_iter().map(Process::from).collect())
}

/// Extract the version from `pm2 --version` output.
///
/// pm2 may print a daemon startup banner before the version, so the
/// version is the last line: the second-to-last element after splitting
/// on `\n`. Output with no trailing newline falls back to the last
/// non-empty line.
pub fn parse_version(output: &str) -> String {
    let lines: Vec<&str> = output.split('\n').collect();
    if output.ends_with('\n') && lines.len() >= 2 {
        return lines[lines.len() - 2].trim_end_matches('\r').to_string();
    }
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}
