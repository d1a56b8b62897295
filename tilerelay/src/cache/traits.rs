//! Storage trait for cached tile payloads.
//!
//! The resolver only needs two operations from its backing store: read a
//! tile if it exists, and persist a freshly fetched tile. Keeping this behind
//! a trait lets tests substitute in-memory or failing stores.

use std::future::Future;
use std::io;
use std::path::PathBuf;

use bytes::Bytes;
use thiserror::Error;

use crate::coord::TileKey;

/// Errors that can occur during cache operations.
///
/// "Does not exist" is never an error; a missing tile is `Ok(None)`.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading an existing entry failed (permissions, I/O, ...).
    #[error("Failed to read cached tile {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing or renaming an entry into place failed.
    #[error("Failed to write cached tile {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Creating a cache directory failed.
    #[error("Failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Tile payload storage.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the returned futures must be `Send`
/// so they can be driven from spawned fill tasks.
pub trait TileStore: Send + Sync {
    /// Reads the payload stored for `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(data))` if the tile is cached
    /// - `Ok(None)` if it is not
    /// - `Err(_)` if the entry exists but could not be read
    fn read(&self, key: &TileKey) -> impl Future<Output = Result<Option<Bytes>, CacheError>> + Send;

    /// Persists `data` for `key`.
    ///
    /// Readers must never observe a partially written entry.
    fn write(&self, key: &TileKey, data: Bytes)
        -> impl Future<Output = Result<(), CacheError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_display_includes_path() {
        let err = CacheError::Write {
            path: PathBuf::from("tiles/3/4/1"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("tiles/3/4/1"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_cache_error_source() {
        use std::error::Error;

        let err = CacheError::Read {
            path: PathBuf::from("x"),
            source: io::Error::new(io::ErrorKind::Other, "boom"),
        };
        assert!(err.source().is_some());
    }
}
