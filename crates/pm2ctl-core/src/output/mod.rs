//! Result projection for the CLI.
//!
//! Outcomes are turned into the payload shapes automation expects:
//!
//! ```json
//! {"changed": true, "diff": {"before": "...", "after": "..."}}
//! {"changed": false, "executable": "...", "processes": [...], "version": "5.3.0"}
//! ```
//!
//! Payloads go to stdout; the human error report goes to stderr.

use crate::inventory::Facts;
use crate::reconcile::{Outcome, RenderedDiff};
use pm2ctl_common::{format_error_human, DesiredSpec, Error, OutputFormat, Process, StructuredError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Text to write for one outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl Rendered {
    fn stdout(text: String) -> Self {
        Rendered {
            stdout: Some(text),
            stderr: None,
        }
    }

    fn nothing() -> Self {
        Rendered::default()
    }
}

/// Payload of the `facts` operation.
#[derive(Debug, Clone, Serialize)]
pub struct FactsReport<'a> {
    /// Reporting facts never changes anything.
    pub changed: bool,
    pub executable: &'a PathBuf,
    pub processes: &'a [Process],
    pub version: &'a str,
}

impl<'a> FactsReport<'a> {
    pub fn new(facts: &'a Facts) -> Self {
        FactsReport {
            changed: false,
            executable: &facts.executable,
            processes: &facts.processes,
            version: &facts.version,
        }
    }
}

/// Payload of the `process` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutateReport {
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<RenderedDiff>,
}

impl MutateReport {
    /// Project an outcome; the diff is included only when requested.
    pub fn new(outcome: &Outcome, with_diff: bool) -> Self {
        MutateReport {
            changed: outcome.changed,
            diff: with_diff.then(|| outcome.diff.render()),
        }
    }
}

pub fn render_facts(facts: &Facts, format: OutputFormat) -> Result<Rendered, Error> {
    match format {
        OutputFormat::Json => Ok(Rendered::stdout(serde_json::to_string_pretty(
            &FactsReport::new(facts),
        )?)),
        OutputFormat::Summary => Ok(Rendered::stdout(facts_summary(facts))),
        OutputFormat::Exitcode => Ok(Rendered::nothing()),
    }
}

pub fn render_mutate(
    spec: &DesiredSpec,
    outcome: &Outcome,
    with_diff: bool,
    format: OutputFormat,
) -> Result<Rendered, Error> {
    match format {
        OutputFormat::Json => Ok(Rendered::stdout(serde_json::to_string_pretty(
            &MutateReport::new(outcome, with_diff),
        )?)),
        OutputFormat::Summary => Ok(Rendered::stdout(mutate_summary(spec, outcome))),
        OutputFormat::Exitcode => Ok(Rendered::nothing()),
    }
}

/// Render a failure: the structured form on stdout for JSON, the human
/// form on stderr otherwise.
pub fn render_error(err: &Error, format: OutputFormat, use_color: bool) -> Rendered {
    match format {
        OutputFormat::Json => Rendered::stdout(StructuredError::from(err).to_json_pretty()),
        OutputFormat::Summary | OutputFormat::Exitcode => Rendered {
            stdout: None,
            stderr: Some(format_error_human(err, use_color)),
        },
    }
}

/// One-line description of the inventory, e.g.
/// `pm2 5.3.0 (/usr/bin/pm2): 3 processes (2 online, 1 stopped)`.
pub fn facts_summary(facts: &Facts) -> String {
    let mut by_status: BTreeMap<&str, usize> = BTreeMap::new();
    for process in &facts.processes {
        *by_status.entry(process.status.as_str()).or_default() += 1;
    }

    let noun = if facts.processes.len() == 1 {
        "process"
    } else {
        "processes"
    };
    let mut line = format!(
        "pm2 {} ({}): {} {}",
        facts.version,
        facts.executable.display(),
        facts.processes.len(),
        noun
    );
    if !by_status.is_empty() {
        let counts: Vec<String> = by_status
            .iter()
            .map(|(status, count)| format!("{} {}", count, status))
            .collect();
        line.push_str(&format!(" ({})", counts.join(", ")));
    }
    line
}

/// One-line description of a reconciliation, e.g.
/// `changed: 'web' restarted, 'api' stopped`.
pub fn mutate_summary(spec: &DesiredSpec, outcome: &Outcome) -> String {
    if !outcome.changed {
        return format!("ok: '{}' already {}", spec.name, spec.state);
    }
    let parts: Vec<String> = outcome
        .diff
        .records()
        .iter()
        .map(|record| format!("'{}' {}", record.subject, record.after))
        .collect();
    format!("changed: {}", parts.join(", "))
}
