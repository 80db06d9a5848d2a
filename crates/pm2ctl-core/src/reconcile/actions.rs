//! Actions computed by the planner.

use pm2ctl_common::Pm2Id;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// In-place cycle command taking an ecosystem descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleVerb {
    Restart,
    Reload,
}

impl CycleVerb {
    /// pm2 subcommand.
    pub fn command(self) -> &'static str {
        match self {
            CycleVerb::Restart => "restart",
            CycleVerb::Reload => "reload",
        }
    }

    /// State reported after the command ran.
    pub fn outcome(self) -> &'static str {
        match self {
            CycleVerb::Restart => "restarted",
            CycleVerb::Reload => "reloaded",
        }
    }
}

/// One supervisor mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// `start <descriptor>` for a process that does not exist yet.
    Create { name: String, script: PathBuf },

    /// `restart|reload <descriptor>` keeping the current script.
    Cycle {
        id: Pm2Id,
        name: String,
        script: PathBuf,
        verb: CycleVerb,
    },

    /// `del <id>` followed by `start <descriptor>` with a new script.
    Replace {
        id: Pm2Id,
        name: String,
        script: PathBuf,
    },

    /// `stop <id>`.
    Stop { id: Pm2Id, name: String },

    /// `del <id>`.
    Delete { id: Pm2Id, name: String },
}

impl Action {
    pub fn name(&self) -> &str {
        match self {
            Action::Create { name, .. }
            | Action::Cycle { name, .. }
            | Action::Replace { name, .. }
            | Action::Stop { name, .. }
            | Action::Delete { name, .. } => name,
        }
    }

    /// Target id; `None` for a process still to be created.
    pub fn id(&self) -> Option<Pm2Id> {
        match self {
            Action::Create { .. } => None,
            Action::Cycle { id, .. }
            | Action::Replace { id, .. }
            | Action::Stop { id, .. }
            | Action::Delete { id, .. } => Some(*id),
        }
    }

    /// State reported for the process once the action ran.
    pub fn outcome(&self) -> &'static str {
        match self {
            Action::Create { .. } => "started",
            Action::Cycle { verb, .. } => verb.outcome(),
            Action::Replace { .. } => "deleted and restarted",
            Action::Stop { .. } => "stopped",
            Action::Delete { .. } => "deleted",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create { name, script } => write!(f, "start '{}' ({})", name, script.display()),
            Action::Cycle { id, name, verb, .. } => {
                write!(f, "{} '{}' (id {})", verb.command(), name, id)
            }
            Action::Replace { id, name, script } => write!(
                f,
                "delete '{}' (id {}) and start it with {}",
                name,
                id,
                script.display()
            ),
            Action::Stop { id, name } => write!(f, "stop '{}' (id {})", name, id),
            Action::Delete { id, name } => write!(f, "delete '{}' (id {})", name, id),
        }
    }
}
