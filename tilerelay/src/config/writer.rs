//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[server]
; Address the tile server listens on
bind = {}

[cache]
; Root directory of the on-disk tile cache. Tiles are stored as <directory>/<z>/<x>/<y>
directory = {}

[upstream]
; Tile URL template; {{z}}, {{x}} and {{y}} are substituted per request
url = {}
; Request timeout in seconds
timeout = {}
; User-Agent header sent upstream
user_agent = {}

[runtime]
; Async worker threads (0 = one per CPU core)
worker_threads = {}
; Maximum threads used for blocking disk I/O
blocking_threads = {}

[logging]
; Log directory and file name. The file is truncated on startup
directory = {}
file = {}
"#,
        config.server.bind,
        path_to_string(&config.cache.directory),
        config.upstream.url,
        config.upstream.timeout,
        config.upstream.user_agent,
        config.runtime.worker_threads,
        config.runtime.blocking_threads,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
