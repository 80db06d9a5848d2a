//! Structured logging for pm2ctl.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSONL for automation harnesses
//!
//! # Usage
//!
//! ```ignore
//! use pm2ctl_core::logging::{init_logging, LogConfig, LogContext, Stage, event_names};
//! use pm2ctl_core::log_event;
//!
//! let config = LogConfig::from_env(None, None);
//! init_logging(&config);
//!
//! let ctx = LogContext::new(generate_run_id()).with_operation("facts");
//! log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "starting");
//! ```
//!
//! stdout is reserved for the result payload; all log output goes to stderr.

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, LogContext, Stage};

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging subsystem.
///
/// Call once at startup. A second call is ignored, which keeps tests that
/// share a process from panicking.
pub fn init_logging(config: &LogConfig) {
    let level = LevelFilter::from(config.level);
    let filter = EnvFilter::default()
        .add_directive(LevelFilter::OFF.into())
        .add_directive(directive("pm2ctl_core", level))
        .add_directive(directive("pm2ctl", level));

    let result = match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
        LogFormat::Jsonl => {
            let json_layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init()
        }
    };

    if result.is_err() {
        tracing::debug!("logging already initialized");
    }
}

fn directive(target: &str, level: LevelFilter) -> tracing_subscriber::filter::Directive {
    let raw = format!("{}={}", target, level);
    raw.parse()
        .unwrap_or_else(|_| tracing_subscriber::filter::Directive::from(level))
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    // First 12 hex chars are enough to tell runs apart in a log stream
    format!("run-{}", &uuid.simple().to_string()[..12])
}

/// Convenience macro for structured event logging with context.
///
/// ```ignore
/// log_event!(ctx, INFO, event_names::INVENTORY_LOADED, Stage::Inventory,
///     "inventory loaded", processes = 3);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, INFO, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::info!(
            event = $event,
            run_id = %$ctx.run_id,
            operation = $ctx.operation.as_deref().unwrap_or(""),
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, DEBUG, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::debug!(
            event = $event,
            run_id = %$ctx.run_id,
            operation = $ctx.operation.as_deref().unwrap_or(""),
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, WARN, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::warn!(
            event = $event,
            run_id = %$ctx.run_id,
            operation = $ctx.operation.as_deref().unwrap_or(""),
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, ERROR, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::error!(
            event = $event,
            run_id = %$ctx.run_id,
            operation = $ctx.operation.as_deref().unwrap_or(""),
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
}
