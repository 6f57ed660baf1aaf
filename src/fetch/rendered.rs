//! Rendering channel.
//!
//! Each fetch runs its own browser session from start to finish:
//!
//! ```text
//! supervisor ─► session ─► connect ─► navigate ─► settle ─► <body>.innerHTML
//!                                                                │
//!                       quit (always, exactly once) ◄────────────┘
//! ```
//!
//! The settle period is a fixed grace sleep after navigation, not a
//! readiness condition. Pages that keep rendering after it are captured
//! as they are at that moment.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, trace};

use crate::browser::{BrowserSession, ProxyConfig};
use crate::config::FetcherConfig;
use crate::driver::{
    Capabilities, DriverService, FirefoxOptions, GeckoDriverService, ServiceBuilder,
    SessionFactory,
};
use crate::error::{Error, FetchError, Result};

// ============================================================================
// RenderedContentFetcher
// ============================================================================

/// Fetches the post-script `<body>` markup of a URL in a real browser.
#[derive(Debug, Clone)]
pub struct RenderedContentFetcher {
    factory: SessionFactory,
    executable: Option<PathBuf>,
    service_host: String,
    start_timeout: Duration,
    settle: Duration,
}

impl RenderedContentFetcher {
    /// Creates a fetcher from the configuration.
    #[must_use]
    pub fn new(config: &FetcherConfig) -> Self {
        let options = if config.webdriver.firefox.headless {
            FirefoxOptions::headless()
        } else {
            FirefoxOptions::new()
        };

        Self {
            factory: SessionFactory::with_options(options),
            executable: config.webdriver.gecko.driver.clone(),
            service_host: config.webdriver.service.host.clone(),
            start_timeout: config.start_timeout(),
            settle: config.settle(),
        }
    }

    /// Overrides the settle period.
    #[inline]
    #[must_use]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Returns the settle period.
    #[inline]
    #[must_use]
    pub fn settle(&self) -> Duration {
        self.settle
    }

    /// Returns the session factory.
    #[inline]
    #[must_use]
    pub fn factory(&self) -> &SessionFactory {
        &self.factory
    }

    /// Desired capabilities for one fetch: Firefox, routed through `proxy`.
    #[must_use]
    pub fn desired_capabilities(proxy: &ProxyConfig) -> Capabilities {
        Capabilities::firefox().with_proxy(proxy.clone())
    }

    /// Builds a fresh supervisor for the driver listening on `port`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExecutableNotFound`] or [`Error::Config`]; see
    /// [`ServiceBuilder::build`].
    pub fn driver_service(&self, port: u16) -> Result<GeckoDriverService> {
        ServiceBuilder::new()
            .executable_opt(self.executable.clone())
            .host(self.service_host.as_str())
            .port(port)
            .start_timeout(self.start_timeout)
            .build()
    }

    /// Renders `url` on the driver listening on `service_port`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::RenderingFailed`] if the supervisor, the
    /// session or the page cannot be set up, or the termination variants
    /// when the session cannot be torn down.
    pub async fn fetch_rendered_body(
        &self,
        url: &str,
        proxy: &ProxyConfig,
        service_port: u16,
    ) -> std::result::Result<String, FetchError> {
        let driver = self
            .driver_service(service_port)
            .map_err(|source| rendering_failed(url, source))?;

        self.fetch_with_driver(Arc::new(driver), url, proxy).await
    }

    /// Renders `url` on an existing supervisor.
    ///
    /// # Errors
    ///
    /// See [`RenderedContentFetcher::fetch_rendered_body`].
    pub async fn fetch_with_driver(
        &self,
        driver: Arc<dyn DriverService>,
        url: &str,
        proxy: &ProxyConfig,
    ) -> std::result::Result<String, FetchError> {
        let capabilities = Self::desired_capabilities(proxy);
        let mut session = self
            .factory
            .create_session(driver, capabilities)
            .map_err(|source| rendering_failed(url, source))?;

        let rendered = self.render(&mut session, url).await;
        let terminated = session.quit().await;

        match (rendered, terminated) {
            (Ok(html), Ok(())) => {
                trace!(url, bytes = html.len(), "Rendered page");
                Ok(html)
            }
            (Err(rendering), Ok(())) => {
                error!(url, error = %rendering, "Rendering failed");
                Err(rendering_failed(url, rendering))
            }
            (Ok(_), Err(termination)) => {
                error!(url, error = %termination, "Session termination failed");
                Err(FetchError::TerminationFailed {
                    url: url.to_string(),
                    source: termination,
                })
            }
            (Err(rendering), Err(termination)) => {
                error!(
                    url,
                    error = %rendering,
                    termination_error = %termination,
                    "Rendering and session termination failed"
                );
                Err(FetchError::RenderingAndTerminationFailed {
                    url: url.to_string(),
                    rendering,
                    termination,
                })
            }
        }
    }

    async fn render(&self, session: &mut BrowserSession, url: &str) -> Result<String> {
        session.connect().await?;
        session.navigate(url).await?;

        if !self.settle.is_zero() {
            debug!(url, settle_ms = self.settle.as_millis() as u64, "Waiting for page to settle");
            sleep(self.settle).await;
        }

        session.body_inner_html().await
    }
}

// ============================================================================
// Private Helpers
// ============================================================================

fn rendering_failed(url: &str, source: Error) -> FetchError {
    FetchError::RenderingFailed {
        url: url.to_string(),
        source,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::NamedTempFile;

    use crate::driver::capabilities::PROXY;

    #[test]
    fn test_new_reads_configuration() {
        let config = FetcherConfig::default()
            .with_settle(Duration::from_millis(250))
            .with_start_timeout(Duration::from_secs(3));
        let fetcher = RenderedContentFetcher::new(&config);

        assert_eq!(fetcher.settle(), Duration::from_millis(250));
        assert_eq!(fetcher.start_timeout, Duration::from_secs(3));
        assert_eq!(fetcher.service_host, config.webdriver.service.host);
    }

    #[test]
    fn test_headless_flag_reaches_base_options() {
        let mut config = FetcherConfig::default();
        config.webdriver.firefox.headless = true;

        let fetcher = RenderedContentFetcher::new(&config);
        assert!(fetcher.factory().base_options().is_headless());
    }

    #[test]
    fn test_desired_capabilities_carry_proxy() {
        let caps = RenderedContentFetcher::desired_capabilities(&ProxyConfig::http("p.local", 3128));
        assert_eq!(caps.proxy().map(|p| p.address()), Some("p.local:3128".to_string()));

        let caps = RenderedContentFetcher::desired_capabilities(&ProxyConfig::disabled());
        assert!(caps.get(PROXY).is_none());
    }

    #[test]
    fn test_driver_service_uses_port() {
        let exe = NamedTempFile::new().unwrap();
        let config = FetcherConfig::default().with_gecko_driver(exe.path());
        let fetcher = RenderedContentFetcher::new(&config);

        let service = fetcher.driver_service(5555).unwrap();
        assert_eq!(service.port(), 5555);
        assert_eq!(service.executable(), exe.path());
    }

    #[tokio::test]
    async fn test_unreachable_driver_is_rendering_failure() {
        let exe = NamedTempFile::new().unwrap();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = FetcherConfig::default()
            .with_gecko_driver(exe.path())
            .with_start_timeout(Duration::from_millis(200))
            .with_settle(Duration::ZERO);
        let fetcher = RenderedContentFetcher::new(&config);

        let err = fetcher
            .fetch_rendered_body("http://example.com/", &ProxyConfig::disabled(), port)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::RenderingFailed { .. }));
        assert!(matches!(err.cause(), Error::PortUnreachable { .. }));
        assert!(err.termination_error().is_none());
    }
}
