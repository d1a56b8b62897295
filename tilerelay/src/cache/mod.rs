//! Disk cache for tile payloads.
//!
//! - [`TileStore`]: the storage interface consumed by the resolver
//! - [`DiskTileStore`]: files under `{root}/{zoom}/{x}/{y}`, written atomically
//!
//! Tiles are immutable once fetched, so the store never evicts or rewrites
//! entries on its own.

mod disk;
mod traits;

pub use disk::DiskTileStore;
pub use traits::{CacheError, TileStore};
