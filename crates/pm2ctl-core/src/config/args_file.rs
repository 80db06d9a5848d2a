//! Option files: the harness's argument file and the user config file.
//!
//! The format follows the file extension (`.json`, `.yaml`/`.yml`,
//! `.toml`). An argument file may wrap its options in an
//! `ANSIBLE_MODULE_ARGS` object, the way module argument files are written;
//! its `_ansible_check_mode` and `_ansible_diff` keys set `check` and `diff`.

use super::{ConfigError, OptionLayer};
use std::fs;
use std::path::Path;

/// Top-level key some harnesses wrap module arguments in.
const MODULE_ARGS_KEY: &str = "ANSIBLE_MODULE_ARGS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileFormat {
    Toml,
    Yaml,
    Json,
}

impl FileFormat {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

/// Read an option file; fails when the file is missing.
pub fn load_option_file(path: &Path) -> Result<OptionLayer, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let format = detect_format(path)?;
    parse_str(&content, format).map_err(|message| ConfigError::ParseError {
        path: path.to_path_buf(),
        message,
    })
}

pub(crate) fn parse_str(content: &str, format: FileFormat) -> Result<OptionLayer, String> {
    let value: serde_json::Value = match format {
        FileFormat::Toml => toml::from_str(content).map_err(|e| e.to_string())?,
        FileFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string())?,
        FileFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string())?,
    };

    let value = match value {
        serde_json::Value::Object(mut map) if map.contains_key(MODULE_ARGS_KEY) => map
            .remove(MODULE_ARGS_KEY)
            .unwrap_or(serde_json::Value::Null),
        // An empty YAML document is null
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other,
    };

    serde_json::from_value(value)
        .map_err(|e| format!("invalid {} options: {}", format.as_str(), e))
}

pub(crate) fn detect_format(path: &Path) -> Result<FileFormat, ConfigError> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "toml" => Ok(FileFormat::Toml),
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "json" => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm2ctl_common::DesiredState;
    use std::path::PathBuf;

    #[test]
    fn test_parse_json() {
        let layer = parse_str(
            r#"{"name":"web","file":"/srv/app.js","state":"reloaded","allow_update":false}"#,
            FileFormat::Json,
        )
        .unwrap();
        assert_eq!(layer.name.as_deref(), Some("web"));
        assert_eq!(layer.file, Some(PathBuf::from("/srv/app.js")));
        assert_eq!(layer.state, Some(DesiredState::Reloaded));
        assert_eq!(layer.allow_update, Some(false));
    }

    #[test]
    fn test_parse_wrapped_module_args_with_harness_flags() {
        let layer = parse_str(
            r#"{"ANSIBLE_MODULE_ARGS":{"name":"*","state":"stopped","_ansible_check_mode":true,"_ansible_verbosity":0}}"#,
            FileFormat::Json,
        )
        .unwrap();
        assert_eq!(layer.name.as_deref(), Some("*"));
        assert_eq!(layer.state, Some(DesiredState::Stopped));
        assert_eq!(layer.check, Some(true));
        assert_eq!(layer.diff, None);
    }

    #[test]
    fn test_parse_yaml_with_yes_no() {
        let layer = parse_str("name: api\nallow_update: no\n", FileFormat::Yaml).unwrap();
        assert_eq!(layer.allow_update, Some(false));

        let layer = parse_str("allow_update: \"yes\"\n", FileFormat::Yaml).unwrap();
        assert_eq!(layer.allow_update, Some(true));
    }

    #[test]
    fn test_parse_empty_yaml() {
        let layer = parse_str("", FileFormat::Yaml).unwrap();
        assert_eq!(layer, OptionLayer::default());
    }

    #[test]
    fn test_parse_toml() {
        let layer = parse_str(
            "executable = \"/opt/node/bin/pm2\"\ntimeout = 30\n",
            FileFormat::Toml,
        )
        .unwrap();
        assert_eq!(layer.executable, Some(PathBuf::from("/opt/node/bin/pm2")));
        assert_eq!(layer.timeout, Some(30));
    }

    #[test]
    fn test_parse_rejects_bad_state() {
        let err = parse_str(r#"{"state":"running"}"#, FileFormat::Json).unwrap_err();
        assert!(err.contains("json"), "{}", err);
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(Path::new("a.yml")).unwrap(), FileFormat::Yaml);
        assert_eq!(detect_format(Path::new("a.JSON")).unwrap(), FileFormat::Json);
        assert!(matches!(
            detect_format(Path::new("args")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_option_file(&dir.path().join("args.json")),
            Err(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("args.yaml");
        std::fs::write(&path, "name: web\nfile: /srv/app.js\n").unwrap();

        let layer = load_option_file(&path).unwrap();
        assert_eq!(layer.name.as_deref(), Some("web"));
    }
}
