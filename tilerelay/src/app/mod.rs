//! Application bootstrap and lifecycle management.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      TileRelayApp                         │
//! │                                                           │
//! │  1. DiskTileStore ─── ensure_root()                       │
//! │  2. AsyncReqwestClient ──► UpstreamFetcher                │
//! │  3. TileResolver (store + fetcher + CoalescingRegistry)   │
//! │  4. axum Router ──► serve(listener, shutdown token)       │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::{AppResolver, TileRelayApp};
pub use config::AppConfig;
pub use error::AppError;
