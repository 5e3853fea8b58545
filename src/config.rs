//! The config module provides the config schema and parsing logic.
//!
//! The configuration file is TOML. Invalid configuration produces an error that names the
//! offending key, and unrecognized keys are reported with a warning rather than rejected.
//!
//! ```text
//! music_source_dir = "~/Music"              # required
//! database_path = "~/.local/rolas/db.db"    # optional
//! log_output = "file"                       # optional, "stderr" or "file"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::warn;

use crate::error::{Result, RolasError, RolasExpectedError};

const KNOWN_KEYS: [&str; 3] = ["music_source_dir", "database_path", "log_output"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stderr,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub music_source_dir: PathBuf,
    pub database_path: PathBuf,
    pub log_output: LogOutput,
}

pub(crate) fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "rolas").ok_or_else(|| RolasError::Generic("cannot determine the home directory".to_string()))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

pub fn default_database_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join("database.db"))
}

impl Config {
    /// Reads the configuration file, from the default location unless a path is given.
    pub fn parse(config_path_override: Option<&Path>) -> Result<Config> {
        let path = match config_path_override {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(RolasExpectedError::ConfigNotFound { path }.into()),
            Err(e) => return Err(e.into()),
        };
        Config::from_toml(&text, &path)
    }

    /// Parses configuration text. `path` is only used in error messages.
    pub fn from_toml(text: &str, path: &Path) -> Result<Config> {
        let data: toml::Table = text.parse().map_err(|e: toml::de::Error| RolasExpectedError::ConfigDecode(e.to_string()))?;

        let invalid = |key: &str, message: &str| RolasExpectedError::InvalidConfigValue {
            key: key.to_string(),
            path: path.to_path_buf(),
            message: message.to_string(),
        };

        let music_source_dir = match data.get("music_source_dir") {
            None => return Err(RolasExpectedError::MissingConfigKey { key: "music_source_dir".to_string(), path: path.to_path_buf() }.into()),
            Some(toml::Value::String(s)) => expand_path(s).map_err(|e| invalid("music_source_dir", &e))?,
            Some(_) => return Err(invalid("music_source_dir", "must be a path").into()),
        };

        let database_path = match data.get("database_path") {
            None => default_database_path()?,
            Some(toml::Value::String(s)) => expand_path(s).map_err(|e| invalid("database_path", &e))?,
            Some(_) => return Err(invalid("database_path", "must be a path").into()),
        };

        let log_output = match data.get("log_output") {
            None => LogOutput::default(),
            Some(v) => v.clone().try_into::<LogOutput>().map_err(|_| invalid("log_output", "must be one of stderr, file"))?,
        };

        for key in data.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                warn!("unrecognized config key {} in {}", key, path.display());
            }
        }

        Ok(Config { music_source_dir, database_path, log_output })
    }
}

fn expand_path(s: &str) -> std::result::Result<PathBuf, String> {
    let expanded = shellexpand::full(s).map_err(|e| e.to_string())?;
    Ok(PathBuf::from(expanded.as_ref()))
}
