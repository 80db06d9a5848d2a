//! Supervised process model.
//!
//! [`Process`] is a fixed-field record: every attribute PM2 reports that
//! pm2ctl cares about has a typed field, and nothing else is carried. The
//! mapping from `pm2 jlist` JSON lives in the core crate's inventory
//! parser.

use crate::id::{Pm2Id, ProcessId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Reserved process name that matches every known process.
pub const WILDCARD: &str = "*";

/// Returns true if `name` is the reserved match-all value.
pub fn is_wildcard(name: &str) -> bool {
    name == WILDCARD
}

/// Lifecycle status as reported by PM2.
///
/// PM2 may add statuses over time; unknown values are kept verbatim in
/// [`ProcessStatus::Other`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProcessStatus {
    Online,
    Stopped,
    Errored,
    Stopping,
    Launching,
    OneLaunchStatus,
    Other(String),
}

impl ProcessStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ProcessStatus::Online => "online",
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Errored => "errored",
            ProcessStatus::Stopping => "stopping",
            ProcessStatus::Launching => "launching",
            ProcessStatus::OneLaunchStatus => "one-launch-status",
            ProcessStatus::Other(s) => s,
        }
    }
}

impl From<String> for ProcessStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "online" => ProcessStatus::Online,
            "stopped" => ProcessStatus::Stopped,
            "errored" => ProcessStatus::Errored,
            "stopping" => ProcessStatus::Stopping,
            "launching" => ProcessStatus::Launching,
            "one-launch-status" => ProcessStatus::OneLaunchStatus,
            _ => ProcessStatus::Other(s),
        }
    }
}

impl From<&str> for ProcessStatus {
    fn from(s: &str) -> Self {
        ProcessStatus::from(s.to_string())
    }
}

impl From<ProcessStatus> for String {
    fn from(status: ProcessStatus) -> Self {
        match status {
            ProcessStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution mode (`pm2_env.exec_mode`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExecMode {
    Fork,
    Cluster,
    Other(String),
}

impl ExecMode {
    pub fn as_str(&self) -> &str {
        match self {
            ExecMode::Fork => "fork_mode",
            ExecMode::Cluster => "cluster_mode",
            ExecMode::Other(s) => s,
        }
    }
}

impl From<String> for ExecMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "fork_mode" | "fork" => ExecMode::Fork,
            "cluster_mode" | "cluster" => ExecMode::Cluster,
            _ => ExecMode::Other(s),
        }
    }
}

impl From<ExecMode> for String {
    fn from(mode: ExecMode) -> Self {
        match mode {
            ExecMode::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ExecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource snapshot taken by PM2 at `jlist` time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Monitor {
    /// Resident memory in bytes.
    pub memory: u64,
    /// CPU usage in percent.
    pub cpu: f64,
    /// Number of restarts since the process was registered.
    pub restarts: u64,
}

/// One supervised process as reported by PM2.
///
/// Serialized field names and order are the facts output contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    /// Working directory the script runs from (`pm2_env.pm_cwd`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Script file path (`pm2_env.pm_exec_path`).
    pub file: PathBuf,
    pub id: Pm2Id,
    /// Interpreter path, or `none` for binaries.
    pub interpreter: String,
    pub mode: ExecMode,
    pub monitor: Monitor,
    /// Process name; not unique across the inventory.
    pub name: String,
    pub namespace: String,
    pub pid: Option<ProcessId>,
    pub status: ProcessStatus,
}

impl Process {
    pub fn is_online(&self) -> bool {
        self.status == ProcessStatus::Online
    }

    pub fn is_stopped(&self) -> bool {
        self.status == ProcessStatus::Stopped
    }

    /// Returns true when `script` is given, non-empty, and differs from the
    /// script this process is bound to.
    pub fn script_differs(&self, script: Option<&Path>) -> bool {
        match script {
            Some(script) if !script.as_os_str().is_empty() => script != self.file,
            _ => false,
        }
    }
}
