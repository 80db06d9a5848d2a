//! Applies planned actions through the supervisor client.

use super::actions::{Action, CycleVerb};
use crate::ecosystem::{AppSpec, EcosystemDescriptor};
use crate::logging::{event_names, Stage};
use crate::supervisor::{CommandRunner, SupervisorClient};
use pm2ctl_common::{Pm2Id, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// How planned actions are carried out.
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Skip every command and descriptor file.
    pub simulate: bool,
    /// Directory for descriptor files; the system temp dir when unset.
    pub descriptor_dir: Option<PathBuf>,
}

impl ApplyOptions {
    pub fn simulated() -> Self {
        ApplyOptions {
            simulate: true,
            ..Default::default()
        }
    }

    pub fn with_descriptor_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.descriptor_dir = Some(dir.into());
        self
    }
}

/// Issue `actions` in order, stopping at the first failure.
///
/// Completed actions are not rolled back.
pub fn apply<R: CommandRunner>(
    actions: &[Action],
    client: &SupervisorClient<R>,
    options: &ApplyOptions,
) -> Result<()> {
    if options.simulate {
        for action in actions {
            info!(
                event = event_names::APPLY_SIMULATED,
                stage = %Stage::Apply,
                action = %action,
                "would apply"
            );
        }
        return Ok(());
    }

    let executor = Executor {
        client,
        descriptor_dir: options
            .descriptor_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir),
    };

    for (index, action) in actions.iter().enumerate() {
        debug!(index, action = %action, "applying");
        if let Err(err) = executor.execute(action) {
            warn!(
                event = event_names::APPLY_ACTION_RESULT,
                stage = %Stage::Apply,
                action = %action,
                success = false,
                error = %err,
                "action failed"
            );
            return Err(err);
        }
        info!(
            event = event_names::APPLY_ACTION_RESULT,
            stage = %Stage::Apply,
            action = %action,
            success = true,
            "action applied"
        );
    }
    Ok(())
}

struct Executor<'a, R> {
    client: &'a SupervisorClient<R>,
    descriptor_dir: PathBuf,
}

impl<R: CommandRunner> Executor<'_, R> {
    fn execute(&self, action: &Action) -> Result<()> {
        match action {
            Action::Create { name, script } => self.start(name, script),
            Action::Cycle {
                name,
                script,
                verb,
                ..
            } => self.cycle(*verb, name, script),
            Action::Replace { id, name, script } => {
                self.delete(*id)?;
                self.start(name, script)
            }
            Action::Stop { id, .. } => self.client.run(&["stop".to_string(), id.to_string()]).map(drop),
            Action::Delete { id, .. } => self.delete(*id),
        }
    }

    fn start(&self, name: &str, script: &Path) -> Result<()> {
        self.with_descriptor("start", &AppSpec::new(name, script))
    }

    fn cycle(&self, verb: CycleVerb, name: &str, script: &Path) -> Result<()> {
        self.with_descriptor(verb.command(), &AppSpec::new(name, script))
    }

    fn delete(&self, id: Pm2Id) -> Result<()> {
        self.client.run(&["del".to_string(), id.to_string()]).map(drop)
    }

    /// Run `<command> <descriptor>`; the descriptor is removed whether or
    /// not the command succeeded. A command failure wins over a delete
    /// failure.
    fn with_descriptor(&self, command: &str, app: &AppSpec) -> Result<()> {
        let descriptor = EcosystemDescriptor::create_in(&self.descriptor_dir, app)?;
        let path = descriptor.path().to_string_lossy().into_owned();

        let ran = self.client.run(&[command.to_string(), path]);
        let removed = descriptor.remove();

        ran?;
        removed
    }
}
