//! Test utilities for pm2ctl-core unit tests.
//!
//! - [`FakeRunner`]: scripted [`CommandRunner`] that records every command
//! - jlist fixture builders
//! - [`capture_json_logs`]: JSON log lines emitted while a closure runs

use crate::supervisor::{CommandOutput, CommandRunner, RunnerError};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;

// ============================================================================
// Fake runner
// ============================================================================

/// Scripted stand-in for the pm2 executable.
///
/// Responses are looked up by the full command line first (`"stop 3"`),
/// then by its first word (`"start"`), which matches commands carrying a
/// random descriptor path. Several responses for one key are returned in
/// order; the last one repeats. Unscripted commands fail to spawn.
#[derive(Debug, Default)]
pub struct FakeRunner {
    responses: RefCell<HashMap<String, VecDeque<CommandOutput>>>,
    issued: RefCell<Vec<String>>,
    descriptors: RefCell<Vec<serde_json::Value>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for a command line or a command verb.
    pub fn on(self, command: &str, output: CommandOutput) -> Self {
        self.responses
            .borrow_mut()
            .entry(command.to_string())
            .or_default()
            .push_back(output);
        self
    }

    /// Answer every mutation verb with success.
    pub fn accepting_mutations(self) -> Self {
        ["start", "restart", "reload", "stop", "del"]
            .iter()
            .fold(self, |runner, verb| runner.on(verb, CommandOutput::ok("")))
    }

    /// Command lines issued so far, descriptor paths replaced by `<file>`.
    pub fn commands(&self) -> Vec<String> {
        self.issued.borrow().clone()
    }

    /// Descriptor documents read while their command ran.
    pub fn descriptors(&self) -> Vec<serde_json::Value> {
        self.descriptors.borrow().clone()
    }

    fn next_response(&self, line: &str, verb: &str) -> Option<CommandOutput> {
        let mut responses = self.responses.borrow_mut();
        let queue = match responses.get_mut(line) {
            Some(queue) => queue,
            None => responses.get_mut(verb)?,
        };
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, _program: &Path, args: &[String]) -> Result<CommandOutput, RunnerError> {
        let line = args.join(" ");
        let verb = args.first().cloned().unwrap_or_default();

        let descriptor = args
            .get(1)
            .filter(|arg| arg.ends_with(".json"))
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|body| serde_json::from_str(&body).ok());
        let recorded = match descriptor {
            Some(document) => {
                self.descriptors.borrow_mut().push(document);
                format!("{} <file>", verb)
            }
            None => line.clone(),
        };
        self.issued.borrow_mut().push(recorded);

        self.next_response(&line, &verb)
            .ok_or_else(|| RunnerError::SpawnFailed(format!("unscripted command: {}", line)))
    }
}

// ============================================================================
// jlist fixtures
// ============================================================================

/// One `pm2 jlist` entry.
pub fn process_json(id: u32, name: &str, file: &str, status: &str) -> serde_json::Value {
    let pid = if status == "online" { 1000 + id } else { 0 };
    serde_json::json!({
        "pid": pid,
        "name": name,
        "pm_id": id,
        "pm2_env": {
            "pm_exec_path": file,
            "pm_cwd": "/srv",
            "exec_interpreter": "node",
            "exec_mode": "fork_mode",
            "namespace": "default",
            "status": status,
            "restart_time": 0
        },
        "monit": { "memory": 1024, "cpu": 0 }
    })
}

/// Render entries as `pm2 jlist` output.
pub fn jlist(entries: &[serde_json::Value]) -> String {
    serde_json::Value::Array(entries.to_vec()).to_string()
}

/// Parse entries straight into the process model.
pub fn processes(entries: &[serde_json::Value]) -> Vec<pm2ctl_common::Process> {
    crate::inventory::parse_jlist(&jlist(entries)).unwrap_or_default()
}

// ============================================================================
// Log capture
// ============================================================================

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a thread-local JSON subscriber and return every event it
/// logged, with fields flattened into the top-level object.
pub fn capture_json_logs<F: FnOnce()>(f: F) -> Vec<serde_json::Value> {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(move || writer.clone()),
    );
    tracing::subscriber::with_default(subscriber, f);

    let bytes = buffer.0.lock().unwrap().clone();
    String::from_utf8_lossy(&bytes)
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_runner_prefers_exact_line_then_verb() {
        let runner = FakeRunner::new()
            .on("stop 1", CommandOutput::failed(1, "boom"))
            .on("stop", CommandOutput::ok(""));

        let stop = |id: &str| {
            runner
                .run(Path::new("pm2"), &["stop".to_string(), id.to_string()])
                .unwrap()
        };
        assert!(!stop("1").success());
        assert!(stop("2").success());
        assert_eq!(runner.commands(), vec!["stop 1", "stop 2"]);
    }

    #[test]
    fn test_fake_runner_sequence_repeats_last() {
        let runner = FakeRunner::new()
            .on("jlist", CommandOutput::ok("first"))
            .on("jlist", CommandOutput::ok("second"));
        let args = vec!["jlist".to_string()];

        let outputs: Vec<String> = (0..3)
            .map(|_| runner.run(Path::new("pm2"), &args).unwrap().stdout_str())
            .collect();
        assert_eq!(outputs, vec!["first", "second", "second"]);
    }

    #[test]
    fn test_processes_fixture() {
        let list = processes(&[process_json(2, "web", "/srv/app.js", "online")]);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id.0, 2);
    }
}
