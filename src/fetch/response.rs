//! Response assembly.
//!
//! Runs both channels for one URL and merges them into a
//! [`FetchResponse`]: status code and headers from the header channel,
//! content from the rendering channel.
//!
//! ```text
//!             ┌─► HeaderFetcher ──────────► (code, headers) ─┐
//! FetchRequest┤                                              ├─► FetchResponse
//!             └─► RenderedContentFetcher ─► body markup ─────┘
//! ```
//!
//! Either channel failing fails the whole fetch. The code is never
//! consulted to skip rendering, so a 304 or 404 is still rendered.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, LOCATION};
use tracing::{debug, trace, warn};

use super::headers::HeaderFetcher;
use super::metadata::Headers;
use super::page::PageMetadata;
use super::rendered::RenderedContentFetcher;
use crate::browser::ProxyConfig;
use crate::config::FetcherConfig;
use crate::error::ProtocolError;
use crate::transport::PoolParams;

// ============================================================================
// FetchRequest
// ============================================================================

/// Everything one fetch needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Absolute URL.
    pub url: String,
    /// Stored modification time, ms since the Unix epoch; `<= 0` if never
    /// fetched.
    pub last_modified: i64,
    /// Proxy for both channels.
    pub proxy: ProxyConfig,
    /// Header request timeout.
    pub timeout: Duration,
    /// Connection budget of the header channel.
    ///
    /// The shared pool is sized from the configuration, not per request;
    /// a differing value is logged and otherwise ignored.
    pub max_connections: usize,
    /// Port of the driver service.
    pub service_port: u16,
}

impl FetchRequest {
    /// Builds a request from the configuration.
    #[must_use]
    pub fn from_config(url: impl Into<String>, last_modified: i64, config: &FetcherConfig) -> Self {
        Self {
            url: url.into(),
            last_modified,
            proxy: config.proxy_config(),
            timeout: config.timeout(),
            max_connections: config.fetch_threads(),
            service_port: config.webdriver.service.port,
        }
    }

    /// Returns `true` if the connection budget matches the pool's capacity.
    #[must_use]
    pub fn fits_pool(&self, params: &PoolParams) -> bool {
        self.max_connections == params.max_total_connections
    }
}

// ============================================================================
// FetchResponse
// ============================================================================

/// Outcome of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    url: String,
    code: u16,
    headers: Headers,
    content: Vec<u8>,
}

impl FetchResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(url: impl Into<String>, code: u16, headers: Headers, content: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            code,
            headers,
            content,
        }
    }

    /// Fetched URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Status code from the header channel.
    #[inline]
    #[must_use]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Response headers from the header channel.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Value of one header.
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Rendered `<body>` markup, UTF-8.
    #[inline]
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Consumes the response, returning the content.
    #[inline]
    #[must_use]
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }
}

// ============================================================================
// ResponseAssembler
// ============================================================================

/// Runs both channels and merges their results.
#[derive(Debug, Clone)]
pub struct ResponseAssembler {
    headers: HeaderFetcher,
    renderer: RenderedContentFetcher,
}

impl ResponseAssembler {
    /// Creates an assembler from its two channels.
    #[inline]
    #[must_use]
    pub fn new(headers: HeaderFetcher, renderer: RenderedContentFetcher) -> Self {
        Self { headers, renderer }
    }

    /// Returns the header channel.
    #[inline]
    #[must_use]
    pub fn header_fetcher(&self) -> &HeaderFetcher {
        &self.headers
    }

    /// Returns the rendering channel.
    #[inline]
    #[must_use]
    pub fn renderer(&self) -> &RenderedContentFetcher {
        &self.renderer
    }

    /// Fetches `request.url` on both channels.
    ///
    /// On success the page's stored headers are replaced by the fetched
    /// ones. On failure the page is left untouched.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Network`] if only the header channel failed
    /// - [`ProtocolError::Rendering`] if only the rendering channel failed
    /// - [`ProtocolError::Both`] if both failed
    pub async fn fetch<P>(
        &self,
        request: &FetchRequest,
        page: &mut P,
    ) -> Result<FetchResponse, ProtocolError>
    where
        P: PageMetadata + ?Sized,
    {
        let url = request.url.as_str();
        debug!(url, last_modified = request.last_modified, "Fetching page");

        let params = self.headers.pool().params();
        if !request.fits_pool(&params) {
            warn!(
                url,
                requested = request.max_connections,
                pool = params.max_total_connections,
                "Connection budget differs from the shared pool; pool sizing applies"
            );
        }

        let (head, body) = tokio::join!(
            self.headers
                .fetch_headers(url, request.last_modified, request.timeout),
            self.renderer
                .fetch_rendered_body(url, &request.proxy, request.service_port),
        );

        let ((code, headers), body) = match (head, body) {
            (Ok(head), Ok(body)) => (head, body),
            (Err(network), Ok(_)) => {
                return Err(ProtocolError::Network {
                    url: url.to_string(),
                    source: network,
                });
            }
            (Ok(_), Err(rendering)) => return Err(ProtocolError::Rendering(rendering)),
            (Err(network), Err(rendering)) => {
                return Err(ProtocolError::Both {
                    url: url.to_string(),
                    network,
                    rendering,
                });
            }
        };

        let stored = page.headers_mut();
        stored.clear();
        stored.extend(headers.iter());

        let content = body.into_bytes();
        trace!(
            url,
            code,
            bytes = content.len(),
            content_length = headers.get(CONTENT_LENGTH.as_str()).unwrap_or("-"),
            location = headers.get(LOCATION.as_str()).unwrap_or("-"),
            "Assembled response"
        );

        Ok(FetchResponse::new(url, code, headers, content))
    }
}

// ============================================================================
// Tests
// ============================================================================
