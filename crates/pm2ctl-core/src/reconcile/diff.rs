//! Before/after records of a reconciliation.
//!
//! Records are kept structured until output, where [`Diff::render`] turns
//! them into two text blocks of `'<name>' state: <state>` lines.

use serde::Serialize;

/// State change of one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffRecord {
    /// Process name.
    pub subject: String,
    /// Status before the change; `None` for a created process.
    pub before: Option<String>,
    pub after: String,
}

/// Ordered diff records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diff {
    records: Vec<DiffRecord>,
}

/// Text form of a [`Diff`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderedDiff {
    pub before: String,
    pub after: String,
}

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subject: impl Into<String>, before: Option<String>, after: impl Into<String>) {
        self.records.push(DiffRecord {
            subject: subject.into(),
            before,
            after: after.into(),
        });
    }

    pub fn records(&self) -> &[DiffRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Render both blocks; every line ends with `\n`.
    pub fn render(&self) -> RenderedDiff {
        let mut rendered = RenderedDiff::default();
        for record in &self.records {
            if let Some(before) = &record.before {
                rendered.before.push_str(&state_line(&record.subject, before));
            }
            rendered.after.push_str(&state_line(&record.subject, &record.after));
        }
        rendered
    }
}

fn state_line(subject: &str, state: &str) -> String {
    format!("'{}' state: {}\n", subject, state)
}
