//! tilerelay CLI - Command-line interface
//!
//! This binary provides a command-line interface to the tilerelay library.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigArgs;
use commands::get::GetArgs;
use commands::serve::ServeArgs;

#[derive(Parser)]
#[command(name = "tilerelay")]
#[command(version, about = "Caching, request-coalescing proxy for map tiles", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.tilerelay/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve tiles over HTTP
    Serve(ServeArgs),

    /// Fetch a single tile through the cache
    Get(GetArgs),

    /// Show or save the effective configuration
    Config(ConfigArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(args, cli.config),
        Commands::Get(args) => commands::get::run(args, cli.config),
        Commands::Config(args) => commands::config::run(args, cli.config),
    };

    if let Err(e) = result {
        e.exit();
    }
}
