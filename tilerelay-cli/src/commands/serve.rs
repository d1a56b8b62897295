//! `serve` command: run the tile server until Ctrl-C.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;
use tilerelay::app::{AppConfig, TileRelayApp};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::common::{build_runtime, load_config, start_logging};
use crate::error::CliError;

/// Arguments for `tilerelay serve`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides [server] bind)
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Tile cache directory (overrides [cache] directory)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Upstream URL template with {z}, {x}, {y} (overrides [upstream] url)
    #[arg(long)]
    pub upstream: Option<String>,
}

/// Run the server.
pub fn run(args: ServeArgs, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    let _logging_guard = start_logging(&config)?;

    let mut app_config = AppConfig::from_config_file(&config);
    if let Some(bind) = args.bind {
        app_config = app_config.with_bind(bind);
    }
    if let Some(cache_dir) = args.cache_dir {
        app_config = app_config.with_cache_dir(cache_dir);
    }
    if let Some(upstream) = args.upstream {
        app_config = app_config.with_upstream_url(upstream);
    }

    let runtime = build_runtime(&config.runtime)?;
    runtime.block_on(async move {
        let app = TileRelayApp::start(app_config).await?;

        let shutdown = CancellationToken::new();
        tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));

        let result = app.serve(shutdown).await;
        app.shutdown();
        result.map_err(CliError::from)
    })
}

async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
    }
    shutdown.cancel();
}
