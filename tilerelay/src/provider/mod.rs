//! Upstream tile provider abstraction
//!
//! This module provides the traits and the HTTP implementation used to fetch
//! tiles that are not yet cached.
//!
//! ```ignore
//! use tilerelay::provider::{AsyncReqwestClient, UpstreamFetcher, DEFAULT_URL_TEMPLATE};
//!
//! let client = AsyncReqwestClient::new()?;
//! let fetcher = UpstreamFetcher::new(client, DEFAULT_URL_TEMPLATE)?;
//! let png = fetcher.fetch(&TileKey::new(3, 4, 1)).await?;
//! ```

mod http;
mod types;
mod upstream;

pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use types::{FetchError, TileFetcher};
pub use upstream::{UpstreamFetcher, UrlTemplateError, DEFAULT_URL_TEMPLATE};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
