//! Exit codes for the pm2ctl CLI.
//!
//! Exit codes communicate the outcome without requiring output parsing.
//!
//! Exit code ranges:
//! - 0-2: Operational outcomes
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Runtime errors from pm2, the filesystem, or pm2ctl itself

use pm2ctl_common::{Error, ErrorCategory};

/// Exit codes for pm2ctl operations.
///
/// These codes are a stable contract for automation. Changes require
/// a major version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Operational Outcomes (0-2)
    // ========================================================================
    /// Success: processes already in the desired state, or facts reported
    Clean = 0,

    /// Success: at least one action was applied (or would be, when simulating)
    Changed = 2,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments or options file
    ArgsError = 10,

    /// pm2 executable not found
    CapabilityError = 11,

    /// In-memory pm2 out of date and updates disabled
    StaleRegistry = 12,

    /// Desired state cannot be reached as specified
    SpecificationError = 13,

    // ========================================================================
    // Runtime Errors (20-29)
    // ========================================================================
    /// A pm2 command failed, could not start, or timed out
    SupervisorError = 20,

    /// I/O error (descriptor files, output)
    IoError = 21,

    /// Internal error or undecodable pm2 output
    InternalError = 22,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Exit code for a finished run.
    pub fn from_changed(changed: bool) -> Self {
        if changed {
            ExitCode::Changed
        } else {
            ExitCode::Clean
        }
    }

    /// Check if this exit code indicates success (codes 0-2).
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::Changed)
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Check if this exit code indicates any error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::Changed => "OK_CHANGED",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::CapabilityError => "ERR_CAPABILITY",
            ExitCode::StaleRegistry => "ERR_STALE_REGISTRY",
            ExitCode::SpecificationError => "ERR_SPECIFICATION",
            ExitCode::SupervisorError => "ERR_SUPERVISOR",
            ExitCode::IoError => "ERR_IO",
            ExitCode::InternalError => "ERR_INTERNAL",
        }
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::StaleRegistry => ExitCode::StaleRegistry,
            Error::InventoryDecode(_) | Error::Json(_) => ExitCode::InternalError,
            _ => match err.category() {
                ErrorCategory::Config => ExitCode::ArgsError,
                ErrorCategory::Discovery => ExitCode::CapabilityError,
                ErrorCategory::Specification => ExitCode::SpecificationError,
                ErrorCategory::Supervisor => ExitCode::SupervisorError,
                ErrorCategory::Descriptor | ErrorCategory::Io => ExitCode::IoError,
                ErrorCategory::Inventory => ExitCode::InternalError,
            },
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
