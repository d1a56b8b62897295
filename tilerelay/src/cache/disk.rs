//! On-disk tile store.
//!
//! # File Layout
//!
//! ```text
//! {root}/{zoom}/{x}/{y}
//! ```
//!
//! Each file holds the raw payload returned by the upstream provider. There is
//! no index or metadata; the presence of a readable file is the only signal
//! that a tile is cached.
//!
//! # Atomic Writes
//!
//! Payloads are written to a hidden temp file next to the final path, synced,
//! and renamed into place. Concurrent readers either see no file or the
//! complete file. Two processes racing on the same tile both rename complete
//! files, so the last rename wins with identical content. The containing
//! directory is synced after the rename so the new entry survives a crash.
//! Temp files orphaned by an interrupted write are removed at startup by
//! [`DiskTileStore::remove_stale_temp_files`].
//!
//! All file operations go through `tokio::fs`, which runs them on Tokio's
//! blocking pool rather than on the request-handling workers.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use super::traits::{CacheError, TileStore};
use crate::coord::TileKey;

/// Extension used for in-progress writes.
const TEMP_EXTENSION: &str = "tmp";

/// Disambiguates temp files written concurrently by this process.
static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Tile store backed by a directory tree.
#[derive(Debug, Clone)]
pub struct DiskTileStore {
    root: PathBuf,
}

impl DiskTileStore {
    /// Creates a store rooted at `root`.
    ///
    /// The directory is not touched; call [`ensure_root`](Self::ensure_root)
    /// during startup to create it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the cache root directory if it doesn't exist.
    pub async fn ensure_root(&self) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| CacheError::CreateDir {
                path: self.root.clone(),
                source,
            })
    }

    /// Absolute path of the cache entry for `key`.
    pub fn tile_path(&self, key: &TileKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Temp file path used while writing `path`.
    fn temp_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let seq = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        path.with_file_name(format!(
            ".{}.{}.{}.{}",
            name,
            std::process::id(),
            seq,
            TEMP_EXTENSION
        ))
    }

    async fn write_atomic(path: &Path, temp_path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(temp_path, path).await?;
        if let Some(parent) = path.parent() {
            sync_dir(parent).await?;
        }
        Ok(())
    }

    /// Deletes temp files left behind by writes that never reached the rename.
    ///
    /// Must run before the store is shared, since it cannot tell an abandoned
    /// temp file from one being written right now. Returns the number of
    /// files removed.
    pub async fn remove_stale_temp_files(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let read_error = |source| CacheError::Read {
                path: dir.clone(),
                source,
            };
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(read_error(e)),
            };

            while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(read_error)?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if is_temp_file(&path) {
                    tokio::fs::remove_file(&path)
                        .await
                        .map_err(|source| CacheError::Write {
                            path: path.clone(),
                            source,
                        })?;
                    trace!(path = %path.display(), "Removed stale temp file");
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }
}

fn is_temp_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'));
    hidden && path.extension().is_some_and(|ext| ext == TEMP_EXTENSION)
}

/// Persists a rename by syncing the directory that holds the entry.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

impl TileStore for DiskTileStore {
    async fn read(&self, key: &TileKey) -> Result<Option<Bytes>, CacheError> {
        let path = self.tile_path(key);
        match tokio::fs::read(&path).await {
            Ok(data) => {
                trace!(tile = %key, bytes = data.len(), "Disk cache hit");
                Ok(Some(Bytes::from(data)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Read { path, source }),
        }
    }

    async fn write(&self, key: &TileKey, data: Bytes) -> Result<(), CacheError> {
        let path = self.tile_path(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| CacheError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let temp_path = Self::temp_path(&path);
        if let Err(source) = Self::write_atomic(&path, &temp_path, &data).await {
            // The temp file may not exist if create() failed
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(CacheError::Write { path, source });
        }

        debug!(tile = %key, bytes = data.len(), path = %path.display(), "Tile written to disk cache");
        Ok(())
    }
}
