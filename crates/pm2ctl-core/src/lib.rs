//! pm2ctl Core Library
//!
//! Reconciles PM2-managed processes against a desired state:
//! - Supervisor access through an injectable command runner
//! - Inventory snapshot from `pm2 jlist`
//! - Ecosystem descriptor files for start/restart/reload
//! - Pure planning and a separate apply step (with simulation)
//! - Result projection, exit codes, logging and option resolution
//!
//! The binary entry point is in `main.rs`.

pub mod config;
pub mod ecosystem;
pub mod exit_codes;
pub mod inventory;
pub mod logging;
pub mod matcher;
pub mod output;
pub mod reconcile;
pub mod supervisor;

#[cfg(test)]
pub mod test_utils;

pub use inventory::{Environment, Facts};
pub use reconcile::{reconcile, ApplyOptions, Outcome, Plan};
pub use supervisor::{CommandRunner, SupervisorClient, SystemRunner};
