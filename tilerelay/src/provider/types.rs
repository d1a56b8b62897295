//! Provider types and traits

use std::future::Future;

use bytes::Bytes;
use thiserror::Error;

use crate::coord::TileKey;

/// Errors that can occur while fetching a tile from upstream.
///
/// Every variant means the same thing to clients: no tile is available.
/// The variants exist for logging only. The type is `Clone` because a single
/// failure is broadcast to every coalesced waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Upstream answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The request did not complete within the client timeout
    #[error("Request to {0} timed out")]
    Timeout(String),

    /// Upstream answered successfully but with no payload
    #[error("Empty response body from {0}")]
    EmptyBody(String),

    /// The fill task ended without producing an outcome
    #[error("Fetch abandoned before completion")]
    Abandoned,
}

/// Fetches tile payloads from an upstream provider.
///
/// This is the seam the resolver depends on; tests use counting or failing
/// stubs in place of the HTTP-backed [`UpstreamFetcher`](super::UpstreamFetcher).
pub trait TileFetcher: Send + Sync {
    /// Performs exactly one upstream request for `key`.
    ///
    /// # Returns
    ///
    /// The raw tile payload, or a [`FetchError`] for any failure.
    fn fetch(&self, key: &TileKey) -> impl Future<Output = Result<Bytes, FetchError>> + Send;
}
