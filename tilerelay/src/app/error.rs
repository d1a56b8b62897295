//! Application error types.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::cache::CacheError;
use crate::provider::{FetchError, UrlTemplateError};

/// Errors that can occur during application lifecycle.
#[derive(Debug, Error)]
pub enum AppError {
    /// The cache root could not be created.
    #[error("Failed to prepare cache directory: {0}")]
    CacheRoot(#[from] CacheError),

    /// The upstream HTTP client could not be built.
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(FetchError),

    /// The upstream URL template is unusable.
    #[error("Invalid upstream URL: {0}")]
    UpstreamUrl(#[from] UrlTemplateError),

    /// The listen socket could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The HTTP server stopped with an error.
    #[error("Tile server error: {0}")]
    Serve(io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_names_address() {
        let err = AppError::Bind {
            addr: "127.0.0.1:80".parse().unwrap(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().contains("127.0.0.1:80"));
    }

    #[test]
    fn test_from_url_template_error() {
        let err: AppError = UrlTemplateError::UnsupportedScheme("ftp://x".to_string()).into();
        assert!(matches!(err, AppError::UpstreamUrl(_)));
    }
}
