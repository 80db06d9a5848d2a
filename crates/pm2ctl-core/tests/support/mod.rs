//! Shared helpers for pm2ctl-core integration tests.
//!
//! - [`FakeRunner`]: scripted pm2 built on the public `CommandRunner` trait
//! - jlist fixtures and an environment loader
//! - a fake `pm2` shell script for CLI tests

#![allow(dead_code)]

use pm2ctl_core::inventory::Environment;
use pm2ctl_core::supervisor::{CommandOutput, CommandRunner, RunnerError, SupervisorClient};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

pub const PM2_VERSION: &str = "5.3.0";

/// Verbs that change supervisor state.
pub const MUTATION_VERBS: [&str; 5] = ["start", "restart", "reload", "stop", "del"];

// ============================================================================
// Fake runner
// ============================================================================

/// Scripted stand-in for the pm2 executable.
///
/// Lookup tries the full command line, then its first word. Queued
/// responses are returned in order and the last one repeats.
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

    /// A pm2 reporting `entries`, accepting every mutation.
    pub fn with_inventory(entries: &[serde_json::Value]) -> Self {
        let runner = FakeRunner::new()
            .on("--version", CommandOutput::ok(format!("{}\n", PM2_VERSION)))
            .on("jlist", CommandOutput::ok(jlist(entries)));
        MUTATION_VERBS
            .iter()
            .fold(runner, |runner, verb| runner.on(verb, CommandOutput::ok("")))
    }

    pub fn on(self, command: &str, output: CommandOutput) -> Self {
        self.responses
            .borrow_mut()
            .entry(command.to_string())
            .or_default()
            .push_back(output);
        self
    }

    /// Issued command lines; descriptor paths appear as `<file>`.
    pub fn commands(&self) -> Vec<String> {
        self.issued.borrow().clone()
    }

    /// Issued commands that change supervisor state.
    pub fn mutations(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|line| {
                let verb = line.split_whitespace().next().unwrap_or_default();
                MUTATION_VERBS.contains(&verb)
            })
            .collect()
    }

    pub fn descriptors(&self) -> Vec<serde_json::Value> {
        self.descriptors.borrow().clone()
    }

    /// Forget commands issued so far.
    pub fn reset_log(&self) {
        self.issued.borrow_mut().clear();
        self.descriptors.borrow_mut().clear();
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

/// Load an environment through `runner`, allowing updates.
pub fn load(runner: &FakeRunner) -> Environment<&FakeRunner> {
    Environment::load(SupervisorClient::new("/usr/bin/pm2", runner), true)
        .expect("environment should load")
}

// ============================================================================
// jlist fixtures
// ============================================================================

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

pub fn jlist(entries: &[serde_json::Value]) -> String {
    serde_json::Value::Array(entries.to_vec()).to_string()
}

// ============================================================================
// Fake pm2 executable
// ============================================================================

/// Write an executable `pm2` script into `dir`.
///
/// It answers `--version` and `jlist` from files next to it, and appends
/// every invocation to `calls.log`. Descriptor contents are appended to
/// `descriptors.log` while they still exist.
#[cfg(unix)]
pub fn write_fake_pm2(dir: &Path, entries: &[serde_json::Value]) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(dir.join("jlist.json"), jlist(entries)).expect("write jlist");
    let script = format!(
        r#"#!/bin/sh
here="{dir}"
echo "$*" >> "$here/calls.log"
case "$1" in
  --version) printf '{version}\n' ;;
  jlist) cat "$here/jlist.json" ;;
  start|restart|reload) cat "$2" >> "$here/descriptors.log"; echo >> "$here/descriptors.log" ;;
  stop|del|update) ;;
  *) echo "unknown command: $1" >&2; exit 1 ;;
esac
"#,
        dir = dir.display(),
        version = PM2_VERSION,
    );

    let path = dir.join("pm2");
    std::fs::write(&path, script).expect("write fake pm2");
    let mut perms = std::fs::metadata(&path).expect("stat fake pm2").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod fake pm2");
    path
}

/// Invocations recorded by the fake pm2 script.
pub fn recorded_calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
