//! Reconciliation of pm2 processes toward a desired state.
//!
//! Work is split in two phases:
//!
//! 1. [`plan`] is pure: from the matched processes and a [`DesiredSpec`] it
//!    computes the actions and the diff, and raises every specification
//!    error before anything runs.
//! 2. [`executor::apply`] issues the actions, or only logs them when
//!    simulating.
//!
//! `changed` and the diff come from the plan, so a simulated run reports
//! exactly what a real one would.

pub mod actions;
pub mod diff;
pub mod executor;

pub use actions::{Action, CycleVerb};
pub use diff::{Diff, DiffRecord, RenderedDiff};
pub use executor::{apply, ApplyOptions};

use crate::inventory::Environment;
use crate::logging::{event_names, Stage};
use crate::matcher::match_processes;
use crate::supervisor::CommandRunner;
use pm2ctl_common::{is_wildcard, DesiredSpec, DesiredState, Error, Process, ProcessStatus, Result};
use std::path::Path;
use tracing::info;

/// Actions for one reconciliation and the diff they produce.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub actions: Vec<Action>,
    pub diff: Diff,
}

impl Plan {
    pub fn changed(&self) -> bool {
        !self.actions.is_empty()
    }

    fn push(&mut self, action: Action, before: Option<&ProcessStatus>) {
        self.diff.push(
            action.name(),
            before.map(|status| status.to_string()),
            action.outcome(),
        );
        self.actions.push(action);
    }
}

/// Result of [`reconcile`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub changed: bool,
    pub diff: Diff,
}

/// Compute the actions that bring `matched` to `spec.state`.
pub fn plan(matched: &[&Process], spec: &DesiredSpec) -> Result<Plan> {
    let mut plan = Plan::default();
    let script = spec.file.as_deref().filter(|p| !p.as_os_str().is_empty());

    if matched.is_empty() {
        if spec.state.requires_process() {
            let script = script.ok_or_else(|| Error::MissingScript {
                name: spec.name.clone(),
            })?;
            plan.push(create(&spec.name, script)?, None);
        }
        return Ok(plan);
    }

    for process in matched {
        let action = match spec.state {
            DesiredState::Started => {
                if process.is_online() && !process.script_differs(script) {
                    continue;
                }
                cycle(process, CycleVerb::Restart, script)?
            }
            DesiredState::Restarted => cycle(process, CycleVerb::Restart, script)?,
            DesiredState::Reloaded => cycle(process, CycleVerb::Reload, script)?,
            DesiredState::Stopped => {
                if process.is_stopped() {
                    continue;
                }
                Action::Stop {
                    id: process.id,
                    name: process.name.clone(),
                }
            }
            DesiredState::Deleted => Action::Delete {
                id: process.id,
                name: process.name.clone(),
            },
        };
        plan.push(action, Some(&process.status));
    }

    Ok(plan)
}

fn create(name: &str, script: &Path) -> Result<Action> {
    if is_wildcard(name) {
        return Err(Error::ReservedName {
            name: name.to_string(),
        });
    }
    Ok(Action::Create {
        name: name.to_string(),
        script: script.to_path_buf(),
    })
}

/// Restart or reload in place, or delete and recreate when the script
/// changes.
fn cycle(process: &Process, verb: CycleVerb, script: Option<&Path>) -> Result<Action> {
    match script {
        Some(script) if process.script_differs(Some(script)) => {
            // Recreation goes through the same reserved-name check as
            // creation.
            create(&process.name, script)?;
            Ok(Action::Replace {
                id: process.id,
                name: process.name.clone(),
                script: script.to_path_buf(),
            })
        }
        _ => Ok(Action::Cycle {
            id: process.id,
            name: process.name.clone(),
            script: process.file.clone(),
            verb,
        }),
    }
}

/// Match, plan and apply `spec` against the environment snapshot.
pub fn reconcile<R: CommandRunner>(
    env: &Environment<R>,
    spec: &DesiredSpec,
    options: &ApplyOptions,
) -> Result<Outcome> {
    let matched = match_processes(env.processes(), &spec.name);
    info!(
        event = event_names::RECONCILE_MATCHED,
        stage = %Stage::Plan,
        name = %spec.name,
        matched = matched.len(),
        "processes matched"
    );

    let plan = plan(&matched, spec)?;
    info!(
        event = event_names::RECONCILE_PLANNED,
        stage = %Stage::Plan,
        state = %spec.state,
        actions = plan.actions.len(),
        simulate = options.simulate,
        "reconciliation planned"
    );

    apply(&plan.actions, env.client(), options)?;

    Ok(Outcome {
        changed: plan.changed(),
        diff: plan.diff,
    })
}
