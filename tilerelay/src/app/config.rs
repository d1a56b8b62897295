//! Application configuration for `TileRelayApp`.
//!
//! `AppConfig` is the resolved set of values the bootstrap needs. It is built
//! from a [`ConfigFile`] and then adjusted by command-line overrides.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::ConfigFile;

/// Application configuration combining all component configs.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub bind: SocketAddr,

    /// Root directory of the disk tile cache.
    pub cache_dir: PathBuf,

    /// Upstream URL template.
    pub upstream_url: String,

    /// Upstream request timeout in seconds.
    pub upstream_timeout_secs: u64,

    /// User agent sent upstream.
    pub user_agent: String,
}

impl AppConfig {
    /// Create application config from the configuration file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        Self {
            bind: config.server.bind,
            cache_dir: config.cache.directory.clone(),
            upstream_url: config.upstream.url.clone(),
            upstream_timeout_secs: config.upstream.timeout,
            user_agent: config.upstream.user_agent.clone(),
        }
    }

    /// Override the bind address.
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Override the cache root.
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Override the upstream URL template.
    pub fn with_upstream_url(mut self, url: impl Into<String>) -> Self {
        self.upstream_url = url.into();
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_config_file(&ConfigFile::default())
    }
}
