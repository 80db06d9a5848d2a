//! Desired lifecycle state requested for a set of processes.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Target lifecycle state of the `process` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Running, bound to the requested script
    #[default]
    Started,
    /// Not running, still registered
    Stopped,
    /// Restarted unconditionally
    Restarted,
    /// Reloaded unconditionally (zero-downtime in cluster mode)
    Reloaded,
    /// Removed from the supervisor
    Deleted,
}

impl DesiredState {
    /// States that imply the process must exist afterwards; with no match
    /// they create it.
    pub fn requires_process(self) -> bool {
        matches!(
            self,
            DesiredState::Started | DesiredState::Restarted | DesiredState::Reloaded
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DesiredState::Started => "started",
            DesiredState::Stopped => "stopped",
            DesiredState::Restarted => "restarted",
            DesiredState::Reloaded => "reloaded",
            DesiredState::Deleted => "deleted",
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DesiredState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "started" => Ok(DesiredState::Started),
            "stopped" => Ok(DesiredState::Stopped),
            "restarted" => Ok(DesiredState::Restarted),
            "reloaded" => Ok(DesiredState::Reloaded),
            "deleted" => Ok(DesiredState::Deleted),
            _ => Err(format!(
                "unknown state '{}': expected one of started, stopped, restarted, reloaded, deleted",
                s
            )),
        }
    }
}

/// Input of the `process` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredSpec {
    /// Exact process name, or `*` for every known process.
    pub name: String,
    /// Script path; `None` when not given or given as an empty string.
    pub file: Option<PathBuf>,
    pub state: DesiredState,
}

impl DesiredSpec {
    pub fn new(name: impl Into<String>, state: DesiredState) -> Self {
        DesiredSpec {
            name: name.into(),
            file: None,
            state,
        }
    }

    /// Set the script path; empty paths are treated as absent.
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        self.file = if file.as_os_str().is_empty() {
            None
        } else {
            Some(file)
        };
        self
    }
}
