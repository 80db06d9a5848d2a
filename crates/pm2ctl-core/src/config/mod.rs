//! Option resolution for pm2ctl operations.
//!
//! Every option can come from several sources. Resolution order, highest
//! priority first:
//! 1. CLI flags
//! 2. Environment variables (`PM2CTL_EXECUTABLE`, `PM2CTL_ALLOW_UPDATE`,
//!    `PM2CTL_TIMEOUT`)
//! 3. The argument file given with `--args-file`
//! 4. The user config file (`$XDG_CONFIG_HOME/pm2ctl/config.toml`)
//! 5. Built-in defaults
//!
//! The user config file only supplies supervisor settings (`executable`,
//! `allow_update`, `timeout`), never the process to manage or the
//! check and diff flags.

pub mod args_file;

pub use args_file::load_option_file;

use crate::supervisor::DEFAULT_TIMEOUT_SECS;
use pm2ctl_common::{DesiredSpec, DesiredState, Error};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default XDG config directory name.
const CONFIG_DIR_NAME: &str = "pm2ctl";

/// User config file name inside the config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that can occur during option loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("options file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("cannot parse options file {}: {message}", path.display())]
    ParseError { path: PathBuf, message: String },

    #[error("unsupported options file format: {} (expected .json, .yaml, .yml or .toml)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("I/O error reading {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for environment variable {var}")]
    InvalidEnv { var: String, value: String },

    #[error("invalid value for option '{option}': {reason}")]
    InvalidOption { option: String, reason: String },
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidOption { option, reason } => Error::InvalidOption { option, reason },
            ConfigError::InvalidEnv { var, value } => Error::InvalidOption {
                option: var,
                reason: format!("cannot interpret '{}'", value),
            },
            other => Error::Config(other.to_string()),
        }
    }
}

/// Options supplied by one source; unset fields defer to lower sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OptionLayer {
    pub executable: Option<PathBuf>,
    #[serde(deserialize_with = "bool_like")]
    pub allow_update: Option<bool>,
    /// Per-command timeout in seconds.
    pub timeout: Option<u64>,
    pub name: Option<String>,
    pub file: Option<PathBuf>,
    pub state: Option<DesiredState>,
    /// Simulate instead of mutating.
    #[serde(alias = "_ansible_check_mode", deserialize_with = "bool_like")]
    pub check: Option<bool>,
    /// Report the before/after diff.
    #[serde(alias = "_ansible_diff", deserialize_with = "bool_like")]
    pub diff: Option<bool>,
}

impl OptionLayer {
    /// Fill unset fields from `lower`.
    pub fn or(self, lower: OptionLayer) -> OptionLayer {
        OptionLayer {
            executable: self.executable.or(lower.executable),
            allow_update: self.allow_update.or(lower.allow_update),
            timeout: self.timeout.or(lower.timeout),
            name: self.name.or(lower.name),
            file: self.file.or(lower.file),
            state: self.state.or(lower.state),
            check: self.check.or(lower.check),
            diff: self.diff.or(lower.diff),
        }
    }

    /// Keep only the supervisor settings.
    fn supervisor_only(self) -> OptionLayer {
        OptionLayer {
            executable: self.executable,
            allow_update: self.allow_update,
            timeout: self.timeout,
            ..Default::default()
        }
    }

    /// Options read from environment variables.
    pub fn from_env_lookup<F>(lookup: F) -> Result<OptionLayer, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut layer = OptionLayer {
            executable: lookup("PM2CTL_EXECUTABLE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            ..Default::default()
        };

        if let Some(value) = lookup("PM2CTL_ALLOW_UPDATE").filter(|v| !v.is_empty()) {
            layer.allow_update = Some(parse_bool(&value).ok_or_else(|| ConfigError::InvalidEnv {
                var: "PM2CTL_ALLOW_UPDATE".to_string(),
                value: value.clone(),
            })?);
        }

        if let Some(value) = lookup("PM2CTL_TIMEOUT").filter(|v| !v.is_empty()) {
            layer.timeout = Some(value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "PM2CTL_TIMEOUT".to_string(),
                value: value.clone(),
            })?);
        }

        Ok(layer)
    }
}

/// Fully resolved options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    /// Explicit executable; `None` means search `PATH`.
    pub executable: Option<PathBuf>,
    pub allow_update: bool,
    pub timeout: Duration,
    pub name: Option<String>,
    /// Script path; empty strings are normalized to `None`.
    pub file: Option<PathBuf>,
    pub state: DesiredState,
    pub check: bool,
    pub diff: bool,
    /// Option files that contributed, highest priority first.
    pub sources: Vec<PathBuf>,
}

impl ResolvedOptions {
    /// Desired specification for the `process` operation.
    pub fn desired_spec(&self) -> Result<DesiredSpec, ConfigError> {
        let name = self
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ConfigError::InvalidOption {
                option: "name".to_string(),
                reason: "a process name is required".to_string(),
            })?;
        let spec = DesiredSpec::new(name, self.state);
        Ok(match &self.file {
            Some(file) => spec.with_file(file),
            None => spec,
        })
    }
}

/// Resolve options from every source.
///
/// `lookup` reads environment variables; pass `|k| std::env::var(k).ok()`
/// outside of tests.
pub fn resolve_options<F>(
    cli: OptionLayer,
    args_file: Option<&Path>,
    lookup: F,
) -> Result<ResolvedOptions, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut sources = Vec::new();
    let env = OptionLayer::from_env_lookup(&lookup)?;

    let file_layer = match args_file {
        Some(path) => {
            sources.push(path.to_path_buf());
            load_option_file(path)?
        }
        None => OptionLayer::default(),
    };

    let user_path = resolve_config_dir(&lookup).join(CONFIG_FILE_NAME);
    let user_layer = if user_path.exists() {
        sources.push(user_path.clone());
        load_option_file(&user_path)?.supervisor_only()
    } else {
        OptionLayer::default()
    };

    let merged = cli.or(env).or(file_layer).or(user_layer);

    let timeout_secs = merged.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(ConfigError::InvalidOption {
            option: "timeout".to_string(),
            reason: "must be at least 1 second".to_string(),
        });
    }

    Ok(ResolvedOptions {
        executable: merged.executable.filter(|p| !p.as_os_str().is_empty()),
        allow_update: merged.allow_update.unwrap_or(true),
        timeout: Duration::from_secs(timeout_secs),
        name: merged.name,
        file: merged.file.filter(|p| !p.as_os_str().is_empty()),
        state: merged.state.unwrap_or_default(),
        check: merged.check.unwrap_or(false),
        diff: merged.diff.unwrap_or(false),
        sources,
    })
}

/// Resolve the config directory.
///
/// 1. `PM2CTL_CONFIG_DIR`
/// 2. `$XDG_CONFIG_HOME/pm2ctl`
/// 3. `~/.config/pm2ctl`
fn resolve_config_dir<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup("PM2CTL_CONFIG_DIR").filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }

    let xdg_config = lookup("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });

    xdg_config.join(CONFIG_DIR_NAME)
}

/// Boolean spellings accepted from option files and the environment.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "y" => Some(true),
        "0" | "false" | "no" | "off" | "n" => Some(false),
        _ => None,
    }
}

fn bool_like<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        Bool(bool),
        Text(String),
    }

    match Option::<BoolLike>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolLike::Bool(b)) => Ok(Some(b)),
        Some(BoolLike::Text(s)) => parse_bool(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("expected a boolean, got '{}'", s))),
    }
}
