//! CLI tests against a fake `pm2` shell script.
//!
//! The script lives in a temp directory, answers `--version` and `jlist`
//! from fixtures, and logs every invocation so tests can check exactly
//! which commands the CLI issued.

#![cfg(unix)]

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use support::{process_json, recorded_calls, write_fake_pm2};
use tempfile::TempDir;

struct FakePm2 {
    dir: TempDir,
    executable: std::path::PathBuf,
}

impl FakePm2 {
    fn new(entries: &[serde_json::Value]) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let executable = write_fake_pm2(dir.path(), entries);
        FakePm2 { dir, executable }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("pm2ctl").expect("pm2ctl binary should exist");
        cmd.env("PM2CTL_CONFIG_DIR", self.dir.path())
            .env_remove("PM2CTL_EXECUTABLE")
            .env_remove("PM2CTL_ALLOW_UPDATE")
            .env_remove("PM2CTL_TIMEOUT")
            .env_remove("PM2CTL_ARGS_FILE")
            .arg("--executable")
            .arg(&self.executable);
        cmd
    }

    fn calls(&self) -> Vec<String> {
        recorded_calls(self.dir.path())
    }

    fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|line| !matches!(line.as_str(), "--version" | "jlist"))
            .map(|line| {
                // Descriptor paths are random
                let mut words = line.split_whitespace();
                let verb = words.next().unwrap_or_default().to_string();
                match words.next() {
                    Some(arg) if arg.ends_with(".json") => format!("{} <file>", verb),
                    Some(arg) => format!("{} {}", verb, arg),
                    None => verb,
                }
            })
            .collect()
    }

    fn descriptors(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("descriptors.log")).unwrap_or_default()
    }
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ============================================================================
// facts
// ============================================================================

#[test]
fn facts_reports_inventory() {
    let pm2 = FakePm2::new(&[
        process_json(0, "web", "/srv/app.js", "online"),
        process_json(1, "cron", "/srv/cron.js", "stopped"),
    ]);

    let output = pm2.cmd().arg("facts").assert().code(0).get_output().clone();
    let value = stdout_json(&output);

    assert_eq!(value["changed"], false);
    assert_eq!(value["version"], "5.3.0");
    assert_eq!(
        value["executable"],
        serde_json::json!(pm2.executable.display().to_string())
    );
    assert_eq!(value["processes"][0]["name"], "web");
    assert_eq!(value["processes"][0]["pid"], 1000);
    assert_eq!(value["processes"][1]["status"], "stopped");
    assert_eq!(pm2.calls(), vec!["--version", "jlist"]);
}

#[test]
fn facts_summary_format() {
    let pm2 = FakePm2::new(&[process_json(0, "web", "/srv/app.js", "online")]);

    pm2.cmd()
        .args(["--format", "summary", "facts"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("pm2 5.3.0"))
        .stdout(predicate::str::contains("1 process (1 online)"));
}

// ============================================================================
// process
// ============================================================================

#[test]
fn process_creates_missing_process() {
    let pm2 = FakePm2::new(&[]);

    let output = pm2
        .cmd()
        .args(["--diff", "process", "--name", "web", "--file", "/srv/app.js"])
        .assert()
        .code(2)
        .get_output()
        .clone();
    let value = stdout_json(&output);

    assert_eq!(value["changed"], true);
    assert_eq!(value["diff"]["before"], "");
    assert_eq!(value["diff"]["after"], "'web' state: started\n");
    assert_eq!(pm2.mutations(), vec!["start <file>"]);

    let descriptor: serde_json::Value =
        serde_json::from_str(pm2.descriptors().trim()).expect("descriptor should be JSON");
    assert_eq!(
        descriptor,
        serde_json::json!({"apps": [{"name": "web", "script": "/srv/app.js"}]})
    );
}

#[test]
fn process_already_in_state_is_clean() {
    let pm2 = FakePm2::new(&[process_json(0, "web", "/srv/app.js", "online")]);

    let output = pm2
        .cmd()
        .args(["process", "--name", "web", "--file", "/srv/app.js"])
        .assert()
        .code(0)
        .get_output()
        .clone();

    assert_eq!(stdout_json(&output), serde_json::json!({"changed": false}));
    assert!(pm2.mutations().is_empty());
}

#[test]
fn check_mode_issues_no_mutations() {
    let pm2 = FakePm2::new(&[process_json(4, "web", "/srv/old.js", "online")]);

    let output = pm2
        .cmd()
        .args([
            "--check", "--diff", "process", "--name", "web", "--file", "/srv/new.js", "--state",
            "restarted",
        ])
        .assert()
        .code(2)
        .get_output()
        .clone();
    let value = stdout_json(&output);

    assert_eq!(value["diff"]["after"], "'web' state: deleted and restarted\n");
    assert_eq!(pm2.calls(), vec!["--version", "jlist"]);
}

#[test]
fn replace_deletes_then_starts() {
    let pm2 = FakePm2::new(&[process_json(4, "web", "/srv/old.js", "online")]);

    pm2.cmd()
        .args([
            "process", "--name", "web", "--file", "/srv/new.js", "--state", "reloaded",
        ])
        .assert()
        .code(2);

    assert_eq!(pm2.mutations(), vec!["del 4", "start <file>"]);
}

#[test]
fn args_file_supplies_process_options() {
    let pm2 = FakePm2::new(&[
        process_json(0, "web", "/srv/app.js", "online"),
        process_json(1, "api", "/srv/api.js", "online"),
    ]);
    let args = pm2.dir.path().join("args.json");
    std::fs::write(
        &args,
        r#"{"ANSIBLE_MODULE_ARGS": {"name": "*", "state": "stopped"}}"#,
    )
    .unwrap();

    pm2.cmd()
        .arg("--args-file")
        .arg(&args)
        .arg("process")
        .assert()
        .code(2);

    assert_eq!(pm2.mutations(), vec!["stop 0", "stop 1"]);
}

#[test]
fn args_file_check_mode_issues_no_mutations() {
    let pm2 = FakePm2::new(&[process_json(0, "web", "/srv/app.js", "online")]);
    let args = pm2.dir.path().join("args.json");
    std::fs::write(
        &args,
        r#"{"ANSIBLE_MODULE_ARGS": {"name": "web", "state": "stopped", "_ansible_check_mode": true, "_ansible_diff": true}}"#,
    )
    .unwrap();

    let output = pm2
        .cmd()
        .arg("--args-file")
        .arg(&args)
        .arg("process")
        .assert()
        .code(2)
        .get_output()
        .clone();
    let value = stdout_json(&output);

    assert_eq!(value["changed"], true);
    assert_eq!(value["diff"]["before"], "'web' state: online\n");
    assert_eq!(value["diff"]["after"], "'web' state: stopped\n");
    assert!(pm2.mutations().is_empty(), "{:?}", pm2.mutations());
}

#[test]
fn exitcode_format_prints_nothing() {
    let pm2 = FakePm2::new(&[process_json(0, "web", "/srv/app.js", "stopped")]);

    pm2.cmd()
        .args(["--format", "exitcode", "process", "--name", "web", "--state", "deleted"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty());

    assert_eq!(pm2.mutations(), vec!["del 0"]);
}

#[test]
fn reserved_name_creation_fails() {
    let pm2 = FakePm2::new(&[]);

    pm2.cmd()
        .args(["process", "--name", "*", "--file", "/srv/app.js"])
        .assert()
        .code(13)
        .stdout(predicate::str::contains("reserved name"));

    assert!(pm2.mutations().is_empty());
}

// ============================================================================
// Stale registry
// ============================================================================

#[test]
fn stale_registry_without_update_fails() {
    let pm2 = FakePm2::new(&[]);
    std::fs::write(
        pm2.dir.path().join("jlist.json"),
        "\n>>>> In-memory PM2 is out-of-date, do:\n>>>> $ pm2 update\n",
    )
    .unwrap();

    pm2.cmd()
        .args(["--no-allow-update", "facts"])
        .assert()
        .code(12)
        .stdout(predicate::str::contains("out-of-date"));

    assert_eq!(pm2.calls(), vec!["--version", "jlist"]);
}
