//! HTTP client for static content documents.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, warn};

use super::FetchError;

/// Default HTTP request timeout in seconds.
/// Past this the fetch counts as `NetworkUnavailable` and the caller falls
/// back to cached content.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Fetches a remote document body.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// GET `url`, returning the body of a `200 OK` response.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// reqwest-backed fetcher.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("versecache/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn get_once(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        self.client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| FetchError::NetworkUnavailable(e.to_string()))
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self.get_once(url).await?;
            let status = response.status();

            if status == StatusCode::OK {
                let body = response.bytes().await?;
                debug!(url, bytes = body.len(), "Fetched remote document");
                return Ok(body.to_vec());
            }

            if status != StatusCode::TOO_MANY_REQUESTS || retries >= MAX_RATE_LIMIT_RETRIES {
                return Err(FetchError::from_status(status));
            }

            retries += 1;
            warn!(url, retry = retries, backoff_ms, "Rate limited, backing off");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms *= 2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert_eq!(
            FetchError::from_status(StatusCode::NOT_FOUND),
            FetchError::RemoteHttp { status: 404 }
        );
        assert_eq!(
            FetchError::from_status(StatusCode::SERVICE_UNAVAILABLE).to_string(),
            "Remote returned HTTP 503"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_unavailable() {
        let fetcher = HttpFetcher::with_timeout(Duration::from_millis(500)).unwrap();
        // Port 9 on loopback: connection refused, no DNS involved.
        let err = fetcher.fetch("http://127.0.0.1:9/none.json").await.unwrap_err();
        assert!(matches!(err, FetchError::NetworkUnavailable(_)));
    }
}
