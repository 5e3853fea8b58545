use std::fs;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use crate::config::{project_dirs, LogOutput};
use crate::error::{Result, RolasError};

/// Where log files go: the state directory where the platform has one, the cache directory
/// otherwise.
pub fn default_log_dir() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    Ok(dirs.state_dir().unwrap_or(dirs.cache_dir()).to_path_buf())
}

/// Installs the global tracing subscriber. The filter comes from RUST_LOG and defaults to info.
///
/// For file output the returned guard flushes the background writer when dropped, so hold on to
/// it for the life of the program.
pub fn initialize_logging(output: LogOutput, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match output {
        LogOutput::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| RolasError::Generic(format!("failed to initialize logging: {}", e)))?;
            Ok(None)
        }
        LogOutput::File => {
            let log_dir = match log_dir {
                Some(d) => d.to_path_buf(),
                None => default_log_dir()?,
            };
            fs::create_dir_all(&log_dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix("rolas")
                .filename_suffix("log")
                .build(&log_dir)
                .map_err(|e| RolasError::Generic(format!("failed to open log file in {}: {}", log_dir.display(), e)))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
                .map_err(|e| RolasError::Generic(format!("failed to initialize logging: {}", e)))?;
            Ok(Some(guard))
        }
    }
}
