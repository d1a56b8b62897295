//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and the exit code.

use std::fmt;
use std::io;
use std::process;

use tilerelay::app::AppError;
use tilerelay::config::ConfigFileError;
use tilerelay::coord::CoordError;
use tilerelay::resolver::ResolveError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be loaded or saved
    Config(ConfigFileError),
    /// Failed to build the Tokio runtime
    Runtime(io::Error),
    /// Tile coordinates given on the command line are invalid
    InvalidTile(CoordError),
    /// Application startup or serving failed
    App(AppError),
    /// The requested tile could not be produced
    TileUnavailable(ResolveError),
    /// Failed to write output file
    FileWrite { path: String, error: io::Error },
}

impl CliError {
    /// Exit the process with an error message and code 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::App(AppError::Bind { .. }) = self {
            eprintln!();
            eprintln!("Common issues:");
            eprintln!("  1. Another process is already listening on that address");
            eprintln!("  2. Ports below 1024 need elevated privileges");
            eprintln!("Use --bind or [server] bind in config.ini to pick another address.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to create Tokio runtime: {}", e),
            CliError::InvalidTile(e) => write!(f, "Invalid tile: {}", e),
            CliError::App(e) => write!(f, "{}", e),
            CliError::TileUnavailable(e) => write!(f, "{}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::InvalidTile(e) => Some(e),
            CliError::App(e) => Some(e),
            CliError::TileUnavailable(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            CliError::LoggingInit(_) => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::App(e)
    }
}

impl From<ResolveError> for CliError {
    fn from(e: ResolveError) -> Self {
        CliError::TileUnavailable(e)
    }
}
