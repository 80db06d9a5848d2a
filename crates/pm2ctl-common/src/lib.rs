//! pm2ctl common types, IDs, and errors.
//!
//! This crate provides foundational types shared across pm2ctl-core modules:
//! - The supervised process model and its identity types
//! - The desired lifecycle state of the `process` operation
//! - Common error types
//! - Output format specifications

pub mod error;
pub mod id;
pub mod output;
pub mod process;
pub mod state;

pub use error::{format_error_human, Error, ErrorCategory, Result, StructuredError};
pub use id::{Pm2Id, ProcessId};
pub use output::OutputFormat;
pub use process::{is_wildcard, ExecMode, Monitor, Process, ProcessStatus, WILDCARD};
pub use state::{DesiredSpec, DesiredState};
