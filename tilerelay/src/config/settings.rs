//! Configuration settings structs and their defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::provider::{DEFAULT_TIMEOUT_SECS, DEFAULT_URL_TEMPLATE, DEFAULT_USER_AGENT};

/// Default cache root, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "tiles";

/// Default cap on Tokio's blocking pool (disk I/O).
pub const DEFAULT_BLOCKING_THREADS: usize = 64;

/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "tilerelay.log";

/// Complete configuration, as loaded from `config.ini`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub server: ServerSettings,
    pub cache: CacheSettings,
    pub upstream: UpstreamSettings,
    pub runtime: RuntimeSettings,
    pub logging: LoggingSettings,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    /// Address the HTTP server binds to.
    pub bind: SocketAddr,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Root directory of the tile cache.
    pub directory: PathBuf,
}

/// `[upstream]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamSettings {
    /// URL template with `{z}`, `{x}`, `{y}` placeholders.
    pub url: String,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// User agent sent with every request.
    pub user_agent: String,
}

/// `[runtime]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    /// Async worker threads; 0 uses Tokio's default (one per core).
    pub worker_threads: usize,
    /// Upper bound on threads used for blocking disk I/O.
    pub blocking_threads: usize,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL_TEMPLATE.to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            blocking_threads: DEFAULT_BLOCKING_THREADS,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_LOG_DIR),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            cache: CacheSettings::default(),
            upstream: UpstreamSettings::default(),
            runtime: RuntimeSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_is_loopback() {
        assert_eq!(
            ServerSettings::default().bind,
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.cache.directory, PathBuf::from("tiles"));
        assert_eq!(config.upstream.url, DEFAULT_URL_TEMPLATE);
        assert_eq!(config.upstream.timeout, 30);
        assert_eq!(config.runtime.worker_threads, 0);
        assert_eq!(config.runtime.blocking_threads, 64);
        assert_eq!(config.logging.file, "tilerelay.log");
    }
}
