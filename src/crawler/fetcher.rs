//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the mirror:
//! - Building the HTTP client with a browser-like user agent
//! - GET requests for pages (HTTP errors are returned, not raised)
//! - Binary GET requests for assets with `Referer` and bounded retries

use crate::config::HttpConfig;
use crate::MirrorError;
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Result of a page fetch
#[derive(Debug)]
pub enum FetchResult {
    /// The server answered; the status may still be an error status
    Success {
        /// HTTP status code
        status_code: u16,
        /// Final URL after redirects
        final_url: Url,
        /// Content-Type header value
        content_type: String,
        /// Page body content
        body: String,
    },

    /// HTTP 404: skipped silently by the crawl
    NotFound,
}

/// Builds an HTTP client with the configured user agent
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page and asset downloader shared by one job
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    page_timeout: Duration,
    asset_timeout: Duration,
    attempts: u32,
    backoff: Duration,
}

impl Fetcher {
    /// Creates a fetcher from the HTTP configuration
    pub fn new(config: &HttpConfig) -> Result<Self, MirrorError> {
        let client = build_http_client(config).map_err(|e| MirrorError::Http {
            url: String::new(),
            source: e,
        })?;

        Ok(Self {
            client,
            page_timeout: Duration::from_secs(config.page_timeout_secs),
            asset_timeout: Duration::from_secs(config.asset_timeout_secs),
            attempts: config.asset_attempts.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// Fetches a page
    ///
    /// # Request Flow
    ///
    /// 1. GET with the page timeout
    /// 2. HTTP 404 → [`FetchResult::NotFound`]
    /// 3. Any other status is returned to the caller with the body
    /// 4. A `Content-Type` that is present but not HTML-like is an error
    ///
    /// # Arguments
    ///
    /// * `url` - The page URL
    pub async fn fetch_page(&self, url: &Url) -> Result<FetchResult, MirrorError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.page_timeout)
            .send()
            .await
            .map_err(|e| http_error(url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(FetchResult::NotFound);
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html_content_type(&content_type) {
            return Err(MirrorError::Html {
                url: url.to_string(),
                message: format!("unsupported content type '{}'", content_type),
            });
        }

        let body = response.text().await.map_err(|e| http_error(url, e))?;

        Ok(FetchResult::Success {
            status_code: status.as_u16(),
            final_url,
            content_type,
            body,
        })
    }

    /// Downloads an asset body
    ///
    /// Sends `Referer` (the given referer, or the URL itself) and retries
    /// transport failures with a linear backoff of `attempt × backoff`. A
    /// non-success status is returned as [`MirrorError::HttpStatus`] without
    /// retrying.
    pub async fn fetch_binary(&self, url: &Url, referer: Option<&Url>) -> Result<Vec<u8>, MirrorError> {
        let referer = referer.unwrap_or(url).to_string();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.try_fetch_binary(url, &referer).await {
                Ok(bytes) => return Ok(bytes),
                Err(MirrorError::Http { url: failed, source }) if attempt < self.attempts => {
                    tracing::debug!(
                        url = %failed,
                        attempt,
                        "transient download failure: {}",
                        source
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_fetch_binary(&self, url: &Url, referer: &str) -> Result<Vec<u8>, MirrorError> {
        let response = self
            .client
            .get(url.clone())
            .header(REFERER, referer)
            .timeout(self.asset_timeout)
            .send()
            .await
            .map_err(|e| http_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| http_error(url, e))?;
        Ok(bytes.to_vec())
    }
}

fn http_error(url: &Url, source: reqwest::Error) -> MirrorError {
    MirrorError::Http {
        url: url.to_string(),
        source,
    }
}

/// Returns true for HTML-like or missing content types
fn is_html_content_type(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.is_empty() || lower.contains("html") || lower.contains("xml") || lower.starts_with("text/plain")
}
