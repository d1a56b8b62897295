//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [server] section
    if let Some(section) = ini.section(Some("server")) {
        if let Some(v) = section.get("bind") {
            config.server.bind = v.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
                section: "server".to_string(),
                key: "bind".to_string(),
                value: v.to_string(),
                reason: "expected an address like '127.0.0.1:8080'".to_string(),
            })?;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.directory = expand_tilde(v);
            }
        }
    }

    // [upstream] section
    if let Some(section) = ini.section(Some("upstream")) {
        if let Some(v) = section.get("url") {
            let v = v.trim();
            if !v.is_empty() {
                config.upstream.url = v.to_string();
            }
        }
        if let Some(v) = section.get("timeout") {
            config.upstream.timeout = parse_positive(v).ok_or_else(|| {
                ConfigFileError::InvalidValue {
                    section: "upstream".to_string(),
                    key: "timeout".to_string(),
                    value: v.to_string(),
                    reason: "must be a positive integer (seconds)".to_string(),
                }
            })?;
        }
        if let Some(v) = section.get("user_agent") {
            let v = v.trim();
            if !v.is_empty() {
                config.upstream.user_agent = v.to_string();
            }
        }
    }

    // [runtime] section
    if let Some(section) = ini.section(Some("runtime")) {
        if let Some(v) = section.get("worker_threads") {
            config.runtime.worker_threads =
                v.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "runtime".to_string(),
                    key: "worker_threads".to_string(),
                    value: v.to_string(),
                    reason: "must be a non-negative integer (0 = one per core)".to_string(),
                })?;
        }
        if let Some(v) = section.get("blocking_threads") {
            config.runtime.blocking_threads =
                parse_positive(v).ok_or_else(|| ConfigFileError::InvalidValue {
                    section: "runtime".to_string(),
                    key: "blocking_threads".to_string(),
                    value: v.to_string(),
                    reason: "must be a positive integer".to_string(),
                })? as usize;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

fn parse_positive(value: &str) -> Option<u64> {
    value.trim().parse().ok().filter(|v| *v > 0)
}

/// Expands a leading `~` to the user's home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
