//! tilerelay - a caching relay for slippy-map tiles
//!
//! Tiles addressed by `(zoom, x, y)` are served from a disk cache. A miss is
//! fetched once from the upstream tile server, written through to disk, and
//! delivered to every caller that asked for the same tile in the meantime.
//!
//! # Modules
//!
//! - [`coord`] - tile keys and their path layout
//! - [`cache`] - the on-disk tile store
//! - [`provider`] - upstream HTTP fetching
//! - [`coalesce`] - broadcast futures and the in-flight registry
//! - [`resolver`] - disk-or-fetch resolution with request coalescing
//! - [`server`] - the HTTP front end
//! - [`config`], [`logging`], [`app`] - configuration, tracing and bootstrap

pub mod app;
pub mod cache;
pub mod coalesce;
pub mod config;
pub mod coord;
pub mod logging;
pub mod provider;
pub mod resolver;
pub mod server;

/// Crate version, as reported at startup.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
