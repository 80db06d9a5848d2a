//! Temporary ecosystem descriptor files.
//!
//! pm2's `start`, `restart` and `reload` commands take an ecosystem file:
//!
//! ```json
//! {"apps":[{"name":"web","script":"/srv/app.js"}]}
//! ```
//!
//! A descriptor is written to a fresh `pm2*.json` file right before the
//! command and removed right after it. [`EcosystemDescriptor::remove`]
//! reports a failed delete; dropping the descriptor without calling it
//! still deletes the file, silently.

use crate::logging::{event_names, Stage};
use pm2ctl_common::{Error, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const FILE_PREFIX: &str = "pm2";
const FILE_SUFFIX: &str = ".json";

/// One application entry; empty fields are left out of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSpec {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "path_is_empty")]
    pub script: PathBuf,
}

impl AppSpec {
    pub fn new(name: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        AppSpec {
            name: name.into(),
            script: script.into(),
        }
    }
}

fn path_is_empty(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

#[derive(Serialize)]
struct Document<'a> {
    apps: [&'a AppSpec; 1],
}

/// Render the ecosystem document for `app`.
pub fn render(app: &AppSpec) -> Result<String> {
    Ok(serde_json::to_string(&Document { apps: [app] })?)
}

/// A descriptor file on disk.
#[derive(Debug)]
pub struct EcosystemDescriptor {
    file: NamedTempFile,
}

impl EcosystemDescriptor {
    /// Write `app` to a new descriptor in `dir`.
    pub fn create_in(dir: &Path, app: &AppSpec) -> Result<Self> {
        let body = render(app)?;

        let mut file = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(FILE_SUFFIX)
            .tempfile_in(dir)
            .map_err(create_error)?;
        file.write_all(body.as_bytes()).map_err(create_error)?;
        file.flush().map_err(create_error)?;

        debug!(
            event = event_names::DESCRIPTOR_CREATED,
            stage = %Stage::Apply,
            path = %file.path().display(),
            app = %app.name,
            "ecosystem file written"
        );

        Ok(EcosystemDescriptor { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the file, reporting failure with its path.
    pub fn remove(self) -> Result<()> {
        let path = self.file.path().to_path_buf();
        self.file.close().map_err(|e| Error::DescriptorDelete {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        debug!(
            event = event_names::DESCRIPTOR_DELETED,
            stage = %Stage::Apply,
            path = %path.display(),
            "ecosystem file deleted"
        );
        Ok(())
    }
}

fn create_error(err: std::io::Error) -> Error {
    Error::DescriptorCreate {
        reason: err.to_string(),
    }
}
