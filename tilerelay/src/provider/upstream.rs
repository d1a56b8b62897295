//! Slippy-map upstream fetcher.
//!
//! Expands a URL template such as
//! `https://tile.openstreetmap.org/{z}/{x}/{y}.png` for each tile key and
//! issues a single GET through an [`AsyncHttpClient`].

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

use super::http::AsyncHttpClient;
use super::types::{FetchError, TileFetcher};
use crate::coord::TileKey;

/// Default upstream template (OpenStreetMap standard tile layer).
pub const DEFAULT_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

const PLACEHOLDERS: [&str; 3] = ["{z}", "{x}", "{y}"];

/// Rejected URL template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlTemplateError {
    /// The template lacks one of `{z}`, `{x}`, `{y}`.
    #[error("URL template '{template}' is missing the {placeholder} placeholder")]
    MissingPlaceholder {
        template: String,
        placeholder: &'static str,
    },

    /// The template is not an http(s) URL.
    #[error("URL template '{0}' must start with http:// or https://")]
    UnsupportedScheme(String),
}

/// Fetches tiles from an HTTP tile server.
pub struct UpstreamFetcher<C: AsyncHttpClient> {
    client: C,
    url_template: String,
}

impl<C: AsyncHttpClient> UpstreamFetcher<C> {
    /// Creates a fetcher for the given URL template.
    ///
    /// # Errors
    ///
    /// Returns [`UrlTemplateError`] if the template is not an http(s) URL or
    /// lacks a placeholder.
    pub fn new(client: C, url_template: impl Into<String>) -> Result<Self, UrlTemplateError> {
        let url_template = url_template.into();

        if !(url_template.starts_with("http://") || url_template.starts_with("https://")) {
            return Err(UrlTemplateError::UnsupportedScheme(url_template));
        }
        if let Some(placeholder) = PLACEHOLDERS
            .into_iter()
            .find(|p| !url_template.contains(*p))
        {
            return Err(UrlTemplateError::MissingPlaceholder {
                template: url_template.clone(),
                placeholder,
            });
        }

        Ok(Self {
            client,
            url_template,
        })
    }

    /// The configured URL template.
    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// Expands the template for `key`.
    pub fn tile_url(&self, key: &TileKey) -> String {
        self.url_template
            .replace("{z}", &key.zoom.to_string())
            .replace("{x}", &key.x.to_string())
            .replace("{y}", &key.y.to_string())
    }
}

impl<C: AsyncHttpClient> TileFetcher for UpstreamFetcher<C> {
    async fn fetch(&self, key: &TileKey) -> Result<Bytes, FetchError> {
        let url = self.tile_url(key);
        let data = self.client.get(&url).await?;

        if data.is_empty() {
            return Err(FetchError::EmptyBody(url));
        }

        debug!(tile = %key, bytes = data.len(), "Fetched tile from upstream");
        Ok(data)
    }
}
