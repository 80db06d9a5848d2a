//! Structured event definitions for logging.
//!
//! Every event carries the run id and the pipeline stage it was emitted
//! from, so JSONL output from one invocation can be grouped and ordered.

use serde::{Deserialize, Serialize};

/// Stages of one pm2ctl invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and option resolution.
    Init,
    /// Locating the pm2 executable.
    Discover,
    /// Reading version and process list.
    Inventory,
    /// Computing actions for the desired state.
    Plan,
    /// Issuing mutation commands.
    Apply,
    /// Writing the result payload.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Discover => "discover",
            Stage::Inventory => "inventory",
            Stage::Plan => "plan",
            Stage::Apply => "apply",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_ERROR: &str = "config.error";

    // Discover stage
    pub const DISCOVER_EXECUTABLE: &str = "discover.executable";

    // Inventory stage
    pub const INVENTORY_VERSION: &str = "inventory.version";
    pub const INVENTORY_STALE: &str = "inventory.stale_registry";
    pub const INVENTORY_UPDATED: &str = "inventory.updated";
    pub const INVENTORY_LOADED: &str = "inventory.loaded";

    // Plan stage
    pub const RECONCILE_MATCHED: &str = "reconcile.matched";
    pub const RECONCILE_PLANNED: &str = "reconcile.planned";

    // Apply stage
    pub const APPLY_STARTED: &str = "apply.started";
    pub const APPLY_SIMULATED: &str = "apply.simulated";
    pub const APPLY_ACTION_RESULT: &str = "apply.action_result";
    pub const APPLY_FINISHED: &str = "apply.finished";

    // Descriptor lifecycle
    pub const DESCRIPTOR_CREATED: &str = "descriptor.created";
    pub const DESCRIPTOR_DELETED: &str = "descriptor.deleted";
}

/// Correlation data shared by every event of one invocation.
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Unique ID for this invocation.
    pub run_id: String,
    /// Operation being run (`facts` or `process`).
    pub operation: Option<String>,
}

impl LogContext {
    /// Create a new log context.
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            operation: None,
        }
    }

    /// Set the operation name.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }
}
