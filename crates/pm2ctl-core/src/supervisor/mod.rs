//! Access to the pm2 executable.
//!
//! [`runner`] spawns child processes; [`client`] turns their outcomes into
//! pm2ctl errors.

pub mod client;
pub mod runner;

pub use client::{discover_executable, SupervisorClient, SUPERVISOR_BINARY};
pub use runner::{
    CommandOutput, CommandRunner, RunnerConfig, RunnerError, SystemRunner, DEFAULT_MAX_OUTPUT_BYTES,
    DEFAULT_TIMEOUT_SECS,
};
