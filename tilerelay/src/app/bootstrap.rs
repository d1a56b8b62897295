//! Application bootstrap implementation.
//!
//! `TileRelayApp` wires the disk store, the upstream fetcher and the resolver
//! together in the right order: the cache root exists before the first
//! request can be served.

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::config::AppConfig;
use super::error::AppError;
use crate::cache::DiskTileStore;
use crate::provider::{AsyncReqwestClient, UpstreamFetcher};
use crate::resolver::TileResolver;
use crate::server;

/// Resolver type used by the running application.
pub type AppResolver = TileResolver<DiskTileStore, UpstreamFetcher<AsyncReqwestClient>>;

/// tilerelay application with its long-lived components.
///
/// # Example
///
/// ```ignore
/// use tilerelay::app::{AppConfig, TileRelayApp};
///
/// let app = TileRelayApp::start(AppConfig::default()).await?;
/// app.serve(shutdown_token).await?;
/// app.shutdown();
/// ```
pub struct TileRelayApp {
    resolver: AppResolver,
    config: AppConfig,
}

impl TileRelayApp {
    /// Start the application with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache root cannot be created, the HTTP client
    /// cannot be built, or the upstream URL template is invalid.
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        info!(version = crate::VERSION, "Starting tilerelay");

        let store = DiskTileStore::new(&config.cache_dir);
        store.ensure_root().await?;
        let stale = store.remove_stale_temp_files().await?;
        info!(
            directory = %store.root().display(),
            stale_temp_files = stale,
            "Tile cache ready"
        );

        let client = AsyncReqwestClient::with_options(config.upstream_timeout_secs, &config.user_agent)
            .map_err(AppError::HttpClient)?;
        let fetcher = UpstreamFetcher::new(client, config.upstream_url.clone())?;
        info!(
            url = %fetcher.url_template(),
            timeout_secs = config.upstream_timeout_secs,
            "Upstream fetcher configured"
        );

        Ok(Self {
            resolver: TileResolver::new(store, fetcher),
            config,
        })
    }

    /// The shared resolver.
    pub fn resolver(&self) -> &AppResolver {
        &self.resolver
    }

    /// Configuration the application was started with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build the HTTP router for this application.
    pub fn router(&self) -> Router {
        server::router(self.resolver.clone())
    }

    /// Bind the configured address and serve until `shutdown` is cancelled.
    pub async fn serve(&self, shutdown: CancellationToken) -> Result<(), AppError> {
        let addr = self.config.bind;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AppError::Bind { addr, source })?;

        server::serve(listener, self.router(), shutdown)
            .await
            .map_err(AppError::Serve)
    }

    /// Log final statistics. Detached fill tasks still running finish on
    /// their own.
    pub fn shutdown(&self) {
        let in_flight = self.resolver.in_flight_count();
        if in_flight > 0 {
            info!(in_flight, "Shutting down with fills still in progress");
        }
        self.resolver.log_stats();
        info!("tilerelay stopped");
    }
}
