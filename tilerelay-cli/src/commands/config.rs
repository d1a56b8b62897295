//! `config` command: print or save the effective configuration.

use std::path::{Path, PathBuf};

use clap::Args;
use tilerelay::config::config_file_path;

use super::common::load_config;
use crate::error::CliError;

/// Arguments for `tilerelay config`.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Write the effective configuration back to the config file
    #[arg(long)]
    pub write: bool,
}

/// Print the configuration that `serve` would use, or persist it.
pub fn run(args: ConfigArgs, config_path: Option<PathBuf>) -> Result<(), CliError> {
    let path = config_path.unwrap_or_else(config_file_path);

    if args.write {
        let existed = path.exists();
        write_config(&path)?;
        if existed {
            println!("Updated {}", path.display());
        } else {
            println!("Created {} with defaults", path.display());
        }
        return Ok(());
    }

    let config = load_config(Some(&path))?;
    if path.exists() {
        println!("; Loaded from {}", path.display());
    } else {
        println!("; {} not found, showing defaults", path.display());
    }
    println!();
    print!("{}", config.to_config_string());

    Ok(())
}

/// Load the configuration at `path` (defaults if absent) and save it there,
/// filling in every key with its effective value.
fn write_config(path: &Path) -> Result<(), CliError> {
    let config = load_config(Some(path))?;
    config.save_to(path)?;
    Ok(())
}
