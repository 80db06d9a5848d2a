//! Supervisor inventory snapshot.
//!
//! [`Environment::load`] asks pm2 for its version and process list once.
//! The snapshot is never refreshed: mutations issued later through
//! [`Environment::client`] do not update it.

pub mod parse;

pub use parse::{is_stale_registry, parse_jlist, parse_version, STALE_REGISTRY_BANNER};

use crate::logging::{event_names, Stage};
use crate::supervisor::{CommandRunner, SupervisorClient};
use pm2ctl_common::{Error, Process, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The supervisor, its version and the processes it reported.
#[derive(Debug)]
pub struct Environment<R> {
    client: SupervisorClient<R>,
    version: String,
    processes: Vec<Process>,
}

impl<R: CommandRunner> Environment<R> {
    /// Query pm2 for its version and process list.
    ///
    /// When pm2 reports a stale in-memory registry, `pm2 update` is run and
    /// the list fetched again if `allow_update` is set. Otherwise loading
    /// fails without issuing any further command.
    pub fn load(client: SupervisorClient<R>, allow_update: bool) -> Result<Self> {
        let version = parse_version(&client.run(&["--version"])?);
        info!(
            event = event_names::INVENTORY_VERSION,
            stage = %Stage::Inventory,
            version = %version,
            "pm2 version"
        );

        let mut jlist = client.run(&["jlist"])?;
        if is_stale_registry(&jlist) {
            if !allow_update {
                warn!(
                    event = event_names::INVENTORY_STALE,
                    stage = %Stage::Inventory,
                    "in-memory pm2 is out of date and updates are disabled"
                );
                return Err(Error::StaleRegistry);
            }
            warn!(
                event = event_names::INVENTORY_STALE,
                stage = %Stage::Inventory,
                "in-memory pm2 is out of date, running 'pm2 update'"
            );
            client.run(&["update"])?;
            info!(event = event_names::INVENTORY_UPDATED, stage = %Stage::Inventory, "pm2 updated");
            jlist = client.run(&["jlist"])?;
        }

        let processes = parse_jlist(&jlist)?;
        info!(
            event = event_names::INVENTORY_LOADED,
            stage = %Stage::Inventory,
            processes = processes.len(),
            "inventory loaded"
        );

        Ok(Environment {
            client,
            version,
            processes,
        })
    }
}

impl<R> Environment<R> {
    pub fn client(&self) -> &SupervisorClient<R> {
        &self.client
    }

    pub fn executable(&self) -> &Path {
        self.client.executable()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Facts projection of the snapshot.
    pub fn facts(&self) -> Facts {
        Facts {
            executable: self.executable().to_path_buf(),
            version: self.version.clone(),
            processes: self.processes.clone(),
        }
    }
}

/// Serializable view of an [`Environment`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facts {
    pub executable: PathBuf,
    pub version: String,
    pub processes: Vec<Process>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::CommandOutput;
    use crate::test_utils::{jlist, process_json, FakeRunner};

    fn stale() -> CommandOutput {
        CommandOutput::ok(format!("{}\n>>>> $ pm2 update\n", STALE_REGISTRY_BANNER))
    }

    #[test]
    fn test_load_reads_version_and_processes() {
        let runner = FakeRunner::new()
            .on("--version", CommandOutput::ok("5.3.0\n"))
            .on(
                "jlist",
                CommandOutput::ok(jlist(&[process_json(0, "web", "/srv/app.js", "online")])),
            );

        let env = Environment::load(SupervisorClient::new("/usr/bin/pm2", &runner), true).unwrap();

        assert_eq!(env.version(), "5.3.0");
        assert_eq!(env.processes().len(), 1);
        assert_eq!(env.processes()[0].name, "web");
        assert_eq!(env.executable(), Path::new("/usr/bin/pm2"));
        assert_eq!(runner.commands(), vec!["--version", "jlist"]);
    }

    #[test]
    fn test_stale_registry_is_updated_when_allowed() {
        let runner = FakeRunner::new()
            .on("--version", CommandOutput::ok("5.3.0\n"))
            .on("jlist", stale())
            .on("jlist", CommandOutput::ok("[]"))
            .on("update", CommandOutput::ok("updated\n"));

        let env = Environment::load(SupervisorClient::new("pm2", &runner), true).unwrap();

        assert!(env.processes().is_empty());
        assert_eq!(runner.commands(), vec!["--version", "jlist", "update", "jlist"]);
    }

    #[test]
    fn test_stale_registry_fails_when_update_disallowed() {
        let runner = FakeRunner::new()
            .on("--version", CommandOutput::ok("5.3.0\n"))
            .on("jlist", stale());

        let result = Environment::load(SupervisorClient::new("pm2", &runner), false);

        assert!(matches!(result, Err(Error::StaleRegistry)));
        assert_eq!(runner.commands(), vec!["--version", "jlist"]);
    }

    #[test]
    fn test_version_failure_stops_loading() {
        let runner = FakeRunner::new().on("--version", CommandOutput::failed(127, "not found"));

        let result = Environment::load(SupervisorClient::new("pm2", &runner), true);

        assert!(matches!(result, Err(Error::CommandFailed { rc: 127, .. })));
        assert_eq!(runner.commands(), vec!["--version"]);
    }

    #[test]
    fn test_facts_projection() {
        let runner = FakeRunner::new()
            .on("--version", CommandOutput::ok("5.3.0\n"))
            .on(
                "jlist",
                CommandOutput::ok(jlist(&[process_json(3, "api", "/srv/api.js", "errored")])),
            );
        let env = Environment::load(SupervisorClient::new("/usr/bin/pm2", &runner), true).unwrap();

        let value = serde_json::to_value(env.facts()).unwrap();
        assert_eq!(value["executable"], "/usr/bin/pm2");
        assert_eq!(value["version"], "5.3.0");
        assert_eq!(value["processes"][0]["id"], 3);
        assert_eq!(value["processes"][0]["status"], "errored");
    }
}
