//! User configuration stored in `~/.tilerelay/config.ini`.
//!
//! A missing file yields defaults; every value present is validated on load.

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_file_path, ConfigFileError};
pub use settings::{
    CacheSettings, ConfigFile, LoggingSettings, RuntimeSettings, ServerSettings,
    UpstreamSettings, DEFAULT_BLOCKING_THREADS, DEFAULT_CACHE_DIR, DEFAULT_LOG_DIR,
    DEFAULT_LOG_FILE,
};
