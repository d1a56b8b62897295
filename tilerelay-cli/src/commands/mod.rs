//! CLI command implementations.
//!
//! - [`serve`] - run the tile server
//! - [`get`] - resolve a single tile
//! - [`config`] - print the effective configuration

pub mod common;
pub mod config;
pub mod get;
pub mod serve;
