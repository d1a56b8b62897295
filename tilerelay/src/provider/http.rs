//! HTTP client abstraction for testability

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use super::types::FetchError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent sent upstream. Public tile servers reject anonymous clients.
pub const DEFAULT_USER_AGENT: &str = concat!("tilerelay/", env!("CARGO_PKG_VERSION"));

/// Trait for async HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response body, or an error for transport failures, timeouts and
    /// non-success statuses.
    fn get(&self, url: &str) -> impl Future<Output = Result<Bytes, FetchError>> + Send;
}

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a new AsyncReqwestClient with default configuration.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_options(DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT)
    }

    /// Creates a new AsyncReqwestClient with custom timeout and user agent.
    pub fn with_options(timeout_secs: u64, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            // Keep connections to the tile host warm between bursts
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| FetchError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<Bytes, FetchError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) if e.is_timeout() => {
                warn!(url = url, error = %e, "HTTP request timed out");
                return Err(FetchError::Timeout(url.to_string()));
            }
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_request = e.is_request(),
                    "HTTP request failed"
                );
                return Err(FetchError::Http(format!("Request failed: {}", e)));
            }
        };

        // Check HTTP status
        if !response.status().is_success() {
            warn!(
                url = url,
                status = response.status().as_u16(),
                "HTTP error status"
            );
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        // Read response body
        match response.bytes().await {
            Ok(bytes) => {
                trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                Ok(bytes)
            }
            Err(e) if e.is_timeout() => Err(FetchError::Timeout(url.to_string())),
            Err(e) => {
                warn!(url = url, error = %e, "Failed to read response body");
                Err(FetchError::Http(format!("Failed to read response: {}", e)))
            }
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock async HTTP client for testing.
    ///
    /// Returns a fixed response and records every requested URL.
    pub struct MockAsyncHttpClient {
        pub response: Result<Bytes, FetchError>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockAsyncHttpClient {
        pub fn new(response: Result<Bytes, FetchError>) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requested_urls(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl AsyncHttpClient for MockAsyncHttpClient {
        async fn get(&self, url: &str) -> Result<Bytes, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn test_mock_async_client_success() {
        let mock = MockAsyncHttpClient::new(Ok(Bytes::from_static(&[1, 2, 3, 4])));

        let result = mock.get("http://example.com").await;
        assert_eq!(result.unwrap(), Bytes::from_static(&[1, 2, 3, 4]));
        assert_eq!(mock.requested_urls(), vec!["http://example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_async_client_error() {
        let mock = MockAsyncHttpClient::new(Err(FetchError::Http("Test error".to_string())));

        let result = mock.get("http://example.com").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_slow_upstream_is_timeout() {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        // Accepts the request and never answers within the client timeout
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = AsyncReqwestClient::with_options(1, "tilerelay-test").unwrap();
        let url = format!("http://{}/1/1/1.png", addr);

        let result = client.get(&url).await;

        assert_eq!(result, Err(FetchError::Timeout(url)));
    }

    #[test]
    fn test_reqwest_client_builds() {
        assert!(AsyncReqwestClient::with_options(5, "tilerelay-test").is_ok());
    }

    #[test]
    fn test_default_user_agent_names_crate() {
        assert!(DEFAULT_USER_AGENT.starts_with("tilerelay/"));
    }
}
