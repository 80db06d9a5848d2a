//! Error types for pm2ctl.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Supervisor Registry Out of Date
//!   Reason: In-memory PM2 is out-of-date and 'allow_update' has been set to 'no'
//!   Fix: Run 'pm2 update' or drop --no-allow-update
//! ```
//!
//! # Machine-Facing Output
//!
//! Errors serialize to the failure shape automation harnesses expect:
//! ```json
//! {
//!   "failed": true,
//!   "msg": "failed to run 'pm2 stop 3' (rc=1)",
//!   "code": 30,
//!   "category": "supervisor",
//!   "rc": 1,
//!   "err": "[PM2][ERROR] Process 3 not found"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pm2ctl operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Option loading and validation.
    Config,
    /// Locating the supervisor executable.
    Discovery,
    /// Supervisor subprocess failures.
    Supervisor,
    /// Inventory decoding and registry state.
    Inventory,
    /// Temporary ecosystem descriptor handling.
    Descriptor,
    /// Desired specification cannot be satisfied as given.
    Specification,
    /// Generic I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Discovery => write!(f, "discovery"),
            ErrorCategory::Supervisor => write!(f, "supervisor"),
            ErrorCategory::Inventory => write!(f, "inventory"),
            ErrorCategory::Descriptor => write!(f, "descriptor"),
            ErrorCategory::Specification => write!(f, "specification"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for pm2ctl.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value for option '{option}': {reason}")]
    InvalidOption { option: String, reason: String },

    // Discovery errors (20-29)
    #[error("failed to find required executable '{name}' in PATH")]
    ExecutableNotFound { name: String },

    // Supervisor errors (30-39)
    #[error("failed to run 'pm2 {command}' (rc={rc})")]
    CommandFailed {
        command: String,
        rc: i32,
        stderr: String,
    },

    #[error("failed to spawn 'pm2 {command}': {reason}")]
    CommandSpawn { command: String, reason: String },

    #[error("'pm2 {command}' timed out after {seconds}s")]
    CommandTimeout { command: String, seconds: u64 },

    // Inventory errors (40-49)
    #[error("In-memory PM2 is out-of-date and 'allow_update' has been set to 'no'")]
    StaleRegistry,

    #[error("cannot decode pm2 process list: {0}")]
    InventoryDecode(String),

    // Descriptor errors (50-59)
    #[error("cannot create temporary ecosystem file: {reason}")]
    DescriptorCreate { reason: String },

    #[error("cannot delete temporary ecosystem file '{}': {reason}", path.display())]
    DescriptorDelete { path: PathBuf, reason: String },

    // Specification errors (60-69)
    #[error("cannot create '{name}' pm2 process: 'file' option not provided")]
    MissingScript { name: String },

    #[error("cannot create PM2 process with name '{name}': reserved name")]
    ReservedName { name: String },

    // I/O errors (70-79)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Discovery errors
    /// - 30-39: Supervisor command errors
    /// - 40-49: Inventory errors
    /// - 50-59: Descriptor errors
    /// - 60-69: Specification errors
    /// - 70-79: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidOption { .. } => 11,
            Error::ExecutableNotFound { .. } => 20,
            Error::CommandFailed { .. } => 30,
            Error::CommandSpawn { .. } => 31,
            Error::CommandTimeout { .. } => 32,
            Error::StaleRegistry => 40,
            Error::InventoryDecode(_) => 41,
            Error::DescriptorCreate { .. } => 50,
            Error::DescriptorDelete { .. } => 51,
            Error::MissingScript { .. } => 60,
            Error::ReservedName { .. } => 61,
            Error::Io(_) => 70,
            Error::Json(_) => 71,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidOption { .. } => ErrorCategory::Config,

            Error::ExecutableNotFound { .. } => ErrorCategory::Discovery,

            Error::CommandFailed { .. }
            | Error::CommandSpawn { .. }
            | Error::CommandTimeout { .. } => ErrorCategory::Supervisor,

            Error::StaleRegistry | Error::InventoryDecode(_) => ErrorCategory::Inventory,

            Error::DescriptorCreate { .. } | Error::DescriptorDelete { .. } => {
                ErrorCategory::Descriptor
            }

            Error::MissingScript { .. } | Error::ReservedName { .. } => {
                ErrorCategory::Specification
            }

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether the failure can be resolved by changing the inputs
    /// or the environment and running again.
    ///
    /// Nothing is retried internally; this is a hint for the caller.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) | Error::InvalidOption { .. } => true,
            Error::ExecutableNotFound { .. } => true,

            // Supervisor commands are treated as non-transient
            Error::CommandFailed { .. } => false,
            Error::CommandSpawn { .. } => false,
            Error::CommandTimeout { .. } => true,

            Error::StaleRegistry => true,
            Error::InventoryDecode(_) => false,

            Error::DescriptorCreate { .. } => true,
            Error::DescriptorDelete { .. } => false,

            Error::MissingScript { .. } | Error::ReservedName { .. } => true,

            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::InvalidOption { .. } => {
                "Check the options file passed with --args-file and the PM2CTL_* environment variables."
            }
            Error::ExecutableNotFound { .. } => {
                "Install pm2 ('npm install -g pm2') or pass its location with --executable."
            }
            Error::CommandFailed { .. } => {
                "Inspect the captured stderr. Run the same pm2 command by hand to reproduce."
            }
            Error::CommandSpawn { .. } => {
                "Check that the pm2 executable is runnable by the current user."
            }
            Error::CommandTimeout { .. } => {
                "The pm2 daemon did not answer in time. Retry with a larger --timeout."
            }
            Error::StaleRegistry => "Run 'pm2 update' or drop --no-allow-update.",
            Error::InventoryDecode(_) => {
                "Run 'pm2 jlist' by hand; the output must be a JSON array of processes."
            }
            Error::DescriptorCreate { .. } => {
                "Check free space and permissions of the temporary directory (TMPDIR)."
            }
            Error::DescriptorDelete { .. } => {
                "The pm2 command already ran. Remove the leftover file by hand."
            }
            Error::MissingScript { .. } => {
                "Pass --file with the script the new process should run."
            }
            Error::ReservedName { .. } => {
                "'*' only matches existing processes. Use a concrete process name to create one."
            }
            Error::Io(_) => "Check disk space and permissions, then retry the operation.",
            Error::Json(_) => "Report this as a bug together with the pm2 version in use.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidOption { .. } => "Invalid Option",
            Error::ExecutableNotFound { .. } => "Supervisor Executable Not Found",
            Error::CommandFailed { .. } => "Supervisor Command Failed",
            Error::CommandSpawn { .. } => "Supervisor Command Not Started",
            Error::CommandTimeout { .. } => "Supervisor Command Timeout",
            Error::StaleRegistry => "Supervisor Registry Out of Date",
            Error::InventoryDecode(_) => "Inventory Decode Error",
            Error::DescriptorCreate { .. } => "Ecosystem File Not Created",
            Error::DescriptorDelete { .. } => "Ecosystem File Not Deleted",
            Error::MissingScript { .. } => "Missing Script File",
            Error::ReservedName { .. } => "Reserved Process Name",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }
}

/// Structured failure report for JSON output.
///
/// `failed` and `msg` follow the result convention of the calling
/// automation harness; the remaining keys are pm2ctl specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Always true; lets callers test a single key.
    pub failed: bool,

    /// Human-readable error message.
    pub msg: String,

    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (exit code, stderr, path).
    #[serde(flatten)]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = BTreeMap::new();

        match err {
            Error::CommandFailed { command, rc, stderr } => {
                context.insert("command".to_string(), serde_json::json!(command));
                context.insert("rc".to_string(), serde_json::json!(rc));
                context.insert("err".to_string(), serde_json::json!(stderr));
            }
            Error::CommandSpawn { command, reason } => {
                context.insert("command".to_string(), serde_json::json!(command));
                context.insert("err".to_string(), serde_json::json!(reason));
            }
            Error::CommandTimeout { command, seconds } => {
                context.insert("command".to_string(), serde_json::json!(command));
                context.insert("timeout_seconds".to_string(), serde_json::json!(seconds));
            }
            Error::DescriptorCreate { reason } => {
                context.insert("err".to_string(), serde_json::json!(reason));
            }
            Error::DescriptorDelete { path, reason } => {
                context.insert("path".to_string(), serde_json::json!(path));
                context.insert("err".to_string(), serde_json::json!(reason));
            }
            Error::ExecutableNotFound { name } => {
                context.insert("executable".to_string(), serde_json::json!(name));
            }
            _ => {}
        }

        StructuredError {
            failed: true,
            msg: err.to_string(),
            code: err.code(),
            category: err.category(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"failed":true,"code":{},"msg":"serialization_failed"}}"#,
                self.code
            )
        })
    }

    /// Serialize to pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    let mut out = format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    );

    if let Error::CommandFailed { stderr, .. } = err {
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            out.push_str("\n  Stderr: ");
            out.push_str(stderr);
        }
    }

    out
}
