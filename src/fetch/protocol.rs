//! Crawler-facing protocol entry point.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::info;

use super::headers::HeaderFetcher;
use super::page::{PageField, PageMetadata};
use super::rendered::RenderedContentFetcher;
use super::response::{FetchRequest, FetchResponse, ResponseAssembler};
use crate::config::FetcherConfig;
use crate::error::{ProtocolError, Result};
use crate::transport::ConnectionPool;

// ============================================================================
// Constants
// ============================================================================

/// Page fields read or written by a fetch.
const FIELDS: &[PageField] = &[PageField::ModifiedTime, PageField::Headers];

// ============================================================================
// WebDriverProtocol
// ============================================================================

/// Fetches pages through a browser plus a plain header request.
///
/// One instance serves every fetch task of a crawler process; the
/// connection pool inside it is shared by all of them.
///
/// # Example
///
/// ```no_run
/// use webdriver_fetch::{FetcherConfig, WebDriverProtocol, WebPage};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let protocol = WebDriverProtocol::new(FetcherConfig::load(None)?)?;
/// let mut page = WebPage::new();
///
/// let response = protocol.fetch("https://example.com/", &mut page).await?;
/// println!("{} {} bytes", response.code(), response.content().len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WebDriverProtocol {
    config: FetcherConfig,
    pool: Arc<ConnectionPool>,
    assembler: ResponseAssembler,
}

impl WebDriverProtocol {
    /// Creates the protocol and its connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) for an invalid
    /// configuration, or [`Error::Http`](crate::Error::Http) if the pool's
    /// client cannot be built.
    pub fn new(config: FetcherConfig) -> Result<Self> {
        config.validate()?;
        let pool = Arc::new(ConnectionPool::new(&config)?);
        let assembler = Self::assembler(&config, &pool);

        info!(
            service_port = config.webdriver.service.port,
            fetch_threads = config.fetch_threads(),
            "WebDriver protocol ready"
        );

        Ok(Self {
            config,
            pool,
            assembler,
        })
    }

    /// Applies a new configuration.
    ///
    /// The existing pool is reconfigured in place. On error the previous
    /// configuration stays in effect.
    ///
    /// # Errors
    ///
    /// See [`WebDriverProtocol::new`].
    pub fn set_config(&mut self, config: FetcherConfig) -> Result<()> {
        config.validate()?;
        self.pool.configure(&config)?;
        self.assembler = Self::assembler(&config, &self.pool);
        self.config = config;
        Ok(())
    }

    /// Returns the active configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Returns the shared connection pool.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Page fields a fetch reads or writes.
    #[inline]
    #[must_use]
    pub fn fields() -> &'static [PageField] {
        FIELDS
    }

    /// Builds the request for `url` from the configuration and the page.
    #[must_use]
    pub fn request<P>(&self, url: &str, page: &P) -> FetchRequest
    where
        P: PageMetadata + ?Sized,
    {
        FetchRequest::from_config(url, page.modified_time(), &self.config)
    }

    /// Fetches `url`, replacing the page's stored headers on success.
    ///
    /// # Errors
    ///
    /// See [`ResponseAssembler::fetch`].
    pub async fn fetch<P>(
        &self,
        url: &str,
        page: &mut P,
    ) -> std::result::Result<FetchResponse, ProtocolError>
    where
        P: PageMetadata + ?Sized,
    {
        let request = self.request(url, &*page);
        self.assembler.fetch(&request, page).await
    }

    fn assembler(config: &FetcherConfig, pool: &Arc<ConnectionPool>) -> ResponseAssembler {
        ResponseAssembler::new(
            HeaderFetcher::new(Arc::clone(pool)),
            RenderedContentFetcher::new(config),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::fetch::page::WebPage;

    #[test]
    fn test_fields() {
        assert_eq!(
            WebDriverProtocol::fields(),
            &[PageField::ModifiedTime, PageField::Headers]
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = FetcherConfig::default().with_fetch_threads(0);
        assert!(WebDriverProtocol::new(config).is_err());
    }

    #[test]
    fn test_request_uses_page_modified_time() {
        let protocol = WebDriverProtocol::new(FetcherConfig::default()).unwrap();
        let page = WebPage::modified_at(1_700_000_000_000);

        let request = protocol.request("http://example.com/", &page);
        assert_eq!(request.last_modified, 1_700_000_000_000);
        assert_eq!(request.service_port, protocol.config().webdriver.service.port);
    }

    #[test]
    fn test_set_config_resizes_pool() {
        let mut protocol = WebDriverProtocol::new(FetcherConfig::default()).unwrap();
        protocol
            .set_config(FetcherConfig::default().with_fetch_threads(3))
            .unwrap();

        assert_eq!(protocol.pool().params().max_total_connections, 3);
        assert_eq!(protocol.config().fetch_threads(), 3);
    }

    #[test]
    fn test_set_config_keeps_previous_on_error() {
        let mut protocol = WebDriverProtocol::new(FetcherConfig::default()).unwrap();
        let before = protocol.config().clone();

        assert!(protocol.set_config(FetcherConfig::default().with_fetch_threads(0)).is_err());
        assert_eq!(protocol.config(), &before);
    }
}
