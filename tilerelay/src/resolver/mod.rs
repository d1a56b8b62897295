//! Tile resolver: decides between disk, an in-flight fetch, or a new fetch.

mod stats;
mod tile;

pub use stats::ResolverStats;
pub use tile::{ResolveError, TileResolver};
