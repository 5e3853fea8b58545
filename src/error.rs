use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RolasError {
    #[error("Rolas error: {0}")]
    Generic(String),
    #[error(transparent)]
    Expected(#[from] RolasExpectedError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors caused by the user's environment rather than by a bug: a missing music directory, an
/// unreadable audio file, a broken config file.
#[derive(Error, Debug)]
pub enum RolasExpectedError {
    #[error("{0}")]
    Generic(String),
    #[error("Cannot read directory {path}: {source}")]
    IoUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to extract metadata from {path}: {cause}")]
    ExtractionFailed { path: PathBuf, cause: String },
    #[error("Configuration file not found ({path})")]
    ConfigNotFound { path: PathBuf },
    #[error("Failed to decode configuration file: invalid TOML: {0}")]
    ConfigDecode(String),
    #[error("Missing key {key} in configuration file ({path})")]
    MissingConfigKey { key: String, path: PathBuf },
    #[error("Invalid value for {key} in configuration file ({path}): {message}")]
    InvalidConfigValue { key: String, path: PathBuf, message: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => StorageError::IntegrityViolation(err.to_string()),
            rusqlite::Error::InvalidParameterName(_)
            | rusqlite::Error::InvalidParameterCount(_, _)
            | rusqlite::Error::InvalidColumnName(_)
            | rusqlite::Error::InvalidColumnIndex(_)
            | rusqlite::Error::InvalidColumnType(_, _, _) => StorageError::InvalidQuery(err.to_string()),
            _ => StorageError::Unavailable(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RolasError>;
pub type StorageResult<T> = std::result::Result<T, StorageError>;
