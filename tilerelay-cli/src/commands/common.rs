//! Setup shared across CLI commands.

use std::path::Path;

use tilerelay::config::{config_file_path, ConfigFile, RuntimeSettings};
use tilerelay::logging::{init_logging, LoggingGuard};
use tokio::runtime::{Builder, Runtime};

use crate::error::CliError;

/// Load the configuration from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::load_from(path)?),
        None => Ok(ConfigFile::load_from(&config_file_path())?),
    }
}

/// Initialize file and stdout logging from the `[logging]` settings.
pub fn start_logging(config: &ConfigFile) -> Result<LoggingGuard, CliError> {
    init_logging(&config.logging.directory, &config.logging.file)
        .map_err(|e| CliError::LoggingInit(e.to_string()))
}

/// Build the multi-threaded runtime sized by the `[runtime]` settings.
///
/// Disk I/O runs on the blocking pool, so `blocking_threads` bounds the
/// number of concurrent file operations.
pub fn build_runtime(settings: &RuntimeSettings) -> Result<Runtime, CliError> {
    let mut builder = Builder::new_multi_thread();
    builder
        .enable_all()
        .thread_name("tilerelay-worker")
        .max_blocking_threads(settings.blocking_threads.max(1));
    if settings.worker_threads > 0 {
        builder.worker_threads(settings.worker_threads);
    }
    builder.build().map_err(CliError::Runtime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.ini");

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_load_config_reports_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(&path, "[runtime]\nblocking_threads = many\n").unwrap();

        assert!(matches!(load_config(Some(&path)), Err(CliError::Config(_))));
    }

    #[test]
    fn test_start_logging_reports_blocked_directory() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("logs");
        std::fs::write(&blocker, b"file").unwrap();
        let mut config = ConfigFile::default();
        config.logging.directory = blocker;

        assert!(matches!(
            start_logging(&config),
            Err(CliError::LoggingInit(_))
        ));
    }

    #[test]
    fn test_build_runtime_with_explicit_workers() {
        let settings = RuntimeSettings {
            worker_threads: 2,
            blocking_threads: 4,
        };

        let runtime = build_runtime(&settings).unwrap();

        assert_eq!(runtime.block_on(async { 1 + 1 }), 2);
    }
}
