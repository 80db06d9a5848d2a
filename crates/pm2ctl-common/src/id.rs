//! Identity types for supervised processes.
//!
//! A supervised process carries two distinct numbers: the id PM2 assigns
//! (`pm_id`, stable until the process is deleted) and the operating-system
//! pid of the current incarnation (absent or zero while stopped). Keeping
//! them in separate newtypes stops one being passed where the other is
//! expected, e.g. `pm2 stop <id>`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supervisor-assigned process id (`pm_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pm2Id(pub u32);

impl fmt::Display for Pm2Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Pm2Id {
    fn from(id: u32) -> Self {
        Pm2Id(id)
    }
}

/// Operating-system process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub u32);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProcessId {
    fn from(pid: u32) -> Self {
        ProcessId(pid)
    }
}
