//! `get` command: resolve a single tile through the cache.

use std::path::PathBuf;

use clap::Args;
use tilerelay::app::{AppConfig, TileRelayApp};
use tilerelay::coord::TileKey;

use super::common::{build_runtime, load_config, start_logging};
use crate::error::CliError;

/// Arguments for `tilerelay get`.
#[derive(Debug, Args)]
pub struct GetArgs {
    /// Zoom level
    pub zoom: String,

    /// Tile column
    pub x: String,

    /// Tile row (a trailing .png is accepted)
    pub y: String,

    /// Write the tile to this file
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Where a resolved tile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileSource {
    Cache,
    Upstream,
}

impl TileSource {
    fn label(self) -> &'static str {
        match self {
            TileSource::Cache => "disk cache",
            TileSource::Upstream => "upstream",
        }
    }
}

/// Resolve one tile and report where it came from.
pub fn run(args: GetArgs, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let key = TileKey::from_segments(&args.zoom, &args.x, &args.y).map_err(CliError::InvalidTile)?;
    let config = load_config(config_path.as_deref())?;
    let _logging_guard = start_logging(&config)?;
    let app_config = AppConfig::from_config_file(&config);

    let runtime = build_runtime(&config.runtime)?;
    let (data, source, path) = runtime.block_on(async move {
        let app = TileRelayApp::start(app_config).await?;
        let data = app.resolver().resolve(key).await?;
        let source = if app.resolver().stats().fetches > 0 {
            TileSource::Upstream
        } else {
            TileSource::Cache
        };
        Ok::<_, CliError>((data, source, app.resolver().store().tile_path(&key)))
    })?;

    println!("Tile {}: {} bytes from {}", key, data.len(), source.label());
    println!("  Cached at: {}", path.display());

    if let Some(output) = args.output {
        std::fs::write(&output, &data).map_err(|error| CliError::FileWrite {
            path: output.display().to_string(),
            error,
        })?;
        println!("  Written to: {}", output.display());
    }

    Ok(())
}
