//! Fetcher configuration.
//!
//! Options use the crawler's dotted names and are layered in this order:
//!
//! 1. Built-in defaults
//! 2. An optional file (TOML, YAML or JSON, by extension)
//! 3. Environment variables prefixed `WEBDRIVER_FETCH__`, with `__` between
//!    segments (`WEBDRIVER_FETCH__HTTP__PROXY__HOST=proxy.local`)
//!
//! | Key | Default |
//! |-----|---------|
//! | `http.proxy.host` | none |
//! | `http.proxy.port` | 8080 |
//! | `http.proxy.username`, `http.proxy.password` | none |
//! | `http.timeout` (ms) | 10000 |
//! | `http.buffer.size` (bytes) | 8192 |
//! | `http.useHttp11` | true |
//! | `http.agent` | `webdriver-fetch/<version>` |
//! | `webdriver.service.host` | `127.0.0.1` |
//! | `webdriver.service.port` | 4444 |
//! | `webdriver.service.start_timeout` (ms) | 20000 |
//! | `webdriver.gecko.driver` | none |
//! | `webdriver.page.settle` (ms) | 3000 |
//! | `webdriver.firefox.headless` | false |
//! | `fetcher.threads.fetch` | 10 |

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::browser::ProxyConfig;
use crate::browser::proxy::DEFAULT_PROXY_PORT;
use crate::driver::builder::{DEFAULT_SERVICE_HOST, DEFAULT_SERVICE_PORT};
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "WEBDRIVER_FETCH";

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default socket buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Default driver port wait in milliseconds.
pub const DEFAULT_START_TIMEOUT_MS: u64 = 20_000;

/// Default post-navigation grace period in milliseconds.
pub const DEFAULT_SETTLE_MS: u64 = 3_000;

/// Default fetch thread budget.
pub const DEFAULT_FETCH_THREADS: usize = 10;

/// Default user agent.
pub const DEFAULT_AGENT: &str = concat!("webdriver-fetch/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// FetcherConfig
// ============================================================================

/// Complete fetcher configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// `http.*` options.
    pub http: HttpSettings,

    /// `webdriver.*` options.
    pub webdriver: WebDriverSettings,

    /// `fetcher.*` options.
    pub fetcher: FetcherSettings,
}

/// `http.*` options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// `http.proxy.*`.
    pub proxy: ProxySettings,

    /// `http.timeout`, milliseconds.
    pub timeout: u64,

    /// `http.buffer.*`.
    pub buffer: BufferSettings,

    /// `http.useHttp11`.
    #[serde(rename = "useHttp11", alias = "usehttp11", alias = "use_http11")]
    pub use_http11: bool,

    /// `http.agent`.
    pub agent: String,
}

/// `http.proxy.*` options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Proxy host; no proxy when unset or empty.
    pub host: Option<String>,
    /// Proxy port.
    pub port: u16,
    /// Proxy username.
    pub username: Option<String>,
    /// Proxy password.
    pub password: Option<String>,
}

/// `http.buffer.*` options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferSettings {
    /// Socket buffer size in bytes.
    pub size: usize,
}

/// `webdriver.*` options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverSettings {
    /// `webdriver.service.*`.
    pub service: ServiceSettings,
    /// `webdriver.gecko.*`.
    pub gecko: GeckoSettings,
    /// `webdriver.page.*`.
    pub page: PageSettings,
    /// `webdriver.firefox.*`.
    pub firefox: FirefoxSettings,
}

/// `webdriver.service.*` options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Driver host.
    pub host: String,
    /// Driver port.
    pub port: u16,
    /// Port wait, milliseconds.
    pub start_timeout: u64,
}

/// `webdriver.gecko.*` options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeckoSettings {
    /// Explicit geckodriver executable.
    pub driver: Option<PathBuf>,
}

/// `webdriver.page.*` options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSettings {
    /// Grace period after navigation, milliseconds.
    pub settle: u64,
}

/// `webdriver.firefox.*` options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirefoxSettings {
    /// Launch Firefox headless.
    pub headless: bool,
}

/// `fetcher.*` options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherSettings {
    /// `fetcher.threads.*`.
    pub threads: ThreadSettings,
}

/// `fetcher.threads.*` options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadSettings {
    /// Fetch thread budget; sizes the connection pool.
    pub fetch: usize,
}

// ============================================================================
// Defaults
// ============================================================================

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            proxy: ProxySettings::default(),
            timeout: DEFAULT_TIMEOUT_MS,
            buffer: BufferSettings::default(),
            use_http11: true,
            agent: DEFAULT_AGENT.to_string(),
        }
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PROXY_PORT,
            username: None,
            password: None,
        }
    }
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVICE_HOST.to_string(),
            port: DEFAULT_SERVICE_PORT,
            start_timeout: DEFAULT_START_TIMEOUT_MS,
        }
    }
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE_MS,
        }
    }
}

impl Default for ThreadSettings {
    fn default() -> Self {
        Self {
            fetch: DEFAULT_FETCH_THREADS,
        }
    }
}

// ============================================================================
// FetcherConfig - Loading
// ============================================================================

impl FetcherConfig {
    /// Loads defaults, then `path` if given, then the environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, a value has the
    /// wrong type, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::layered(path).map_err(|e| Error::config(e.to_string()))?;
        config.validate()?;

        debug!(
            proxy = config.http.proxy.host.as_deref().unwrap_or("none"),
            service_port = config.webdriver.service.port,
            threads = config.fetcher.threads.fetch,
            "Loaded fetcher configuration"
        );

        Ok(config)
    }

    fn layered(path: Option<&Path>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("http.proxy.port", i64::from(DEFAULT_PROXY_PORT))?
            .set_default("http.timeout", DEFAULT_TIMEOUT_MS as i64)?
            .set_default("http.buffer.size", DEFAULT_BUFFER_SIZE as i64)?
            .set_default("http.agent", DEFAULT_AGENT)?
            .set_default("webdriver.service.host", DEFAULT_SERVICE_HOST)?
            .set_default("webdriver.service.port", i64::from(DEFAULT_SERVICE_PORT))?
            .set_default("webdriver.service.start_timeout", DEFAULT_START_TIMEOUT_MS as i64)?
            .set_default("webdriver.page.settle", DEFAULT_SETTLE_MS as i64)?
            .set_default("webdriver.firefox.headless", false)?
            .set_default("fetcher.threads.fetch", DEFAULT_FETCH_THREADS as i64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.fetcher.threads.fetch == 0 {
            return Err(Error::config("fetcher.threads.fetch must be at least 1"));
        }
        if self.webdriver.service.port == 0 {
            return Err(Error::config("webdriver.service.port must be non-zero"));
        }
        if self.proxy_config().enabled && self.http.proxy.port == 0 {
            return Err(Error::config("http.proxy.port must be non-zero"));
        }
        if self.http.timeout == 0 {
            return Err(Error::config("http.timeout must be positive"));
        }
        Ok(())
    }
}

// ============================================================================
// FetcherConfig - Builder Methods
// ============================================================================

impl FetcherConfig {
    /// Sets the proxy host and port.
    #[must_use]
    pub fn with_proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.http.proxy.host = Some(host.into());
        self.http.proxy.port = port;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout = timeout.as_millis() as u64;
        self
    }

    /// Sets the fetch thread budget.
    #[must_use]
    pub fn with_fetch_threads(mut self, threads: usize) -> Self {
        self.fetcher.threads.fetch = threads;
        self
    }

    /// Sets the driver service port.
    #[must_use]
    pub fn with_service_port(mut self, port: u16) -> Self {
        self.webdriver.service.port = port;
        self
    }

    /// Sets the driver port wait.
    #[must_use]
    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.webdriver.service.start_timeout = timeout.as_millis() as u64;
        self
    }

    /// Sets the geckodriver executable.
    #[must_use]
    pub fn with_gecko_driver(mut self, path: impl Into<PathBuf>) -> Self {
        self.webdriver.gecko.driver = Some(path.into());
        self
    }

    /// Sets the post-navigation grace period.
    #[must_use]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.webdriver.page.settle = settle.as_millis() as u64;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.http.agent = agent.into();
        self
    }
}

// ============================================================================
// FetcherConfig - Derived Values
// ============================================================================

impl FetcherConfig {
    /// Returns the proxy, enabled iff `http.proxy.host` is non-empty.
    #[must_use]
    pub fn proxy_config(&self) -> ProxyConfig {
        let proxy = ProxyConfig::from_settings(self.http.proxy.host.as_deref(), self.http.proxy.port);
        match (&self.http.proxy.username, &self.http.proxy.password) {
            (Some(user), Some(pass)) if proxy.enabled => proxy.with_credentials(user, pass),
            _ => proxy,
        }
    }

    /// Returns `http.timeout`.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.http.timeout)
    }

    /// Returns `webdriver.service.start_timeout`.
    #[inline]
    #[must_use]
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.webdriver.service.start_timeout)
    }

    /// Returns `webdriver.page.settle`.
    #[inline]
    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.webdriver.page.settle)
    }

    /// Returns `fetcher.threads.fetch`.
    #[inline]
    #[must_use]
    pub fn fetch_threads(&self) -> usize {
        self.fetcher.threads.fetch
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = FetcherConfig::default();
        assert_eq!(config.http.proxy.port, 8080);
        assert!(config.http.proxy.host.is_none());
        assert_eq!(config.webdriver.service.port, 4444);
        assert_eq!(config.fetch_threads(), 10);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.start_timeout(), Duration::from_secs(20));
        assert_eq!(config.settle(), Duration::from_secs(3));
        assert!(config.http.use_http11);
        assert!(config.http.agent.starts_with("webdriver-fetch/"));
        assert!(!config.proxy_config().enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = FetcherConfig::load(None).unwrap();
        assert_eq!(config.webdriver.service.port, DEFAULT_SERVICE_PORT);
        assert_eq!(config.http.buffer.size, DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
[http]
timeout = 2500
useHttp11 = false

[http.proxy]
host = "proxy.local"
port = 3128

[webdriver.service]
port = 4545

[fetcher.threads]
fetch = 25
"#
        )
        .unwrap();

        let config = FetcherConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert!(!config.http.use_http11);
        assert_eq!(config.webdriver.service.port, 4545);
        assert_eq!(config.fetch_threads(), 25);

        let proxy = config.proxy_config();
        assert!(proxy.enabled);
        assert_eq!(proxy.address(), "proxy.local:3128");
    }

    #[test]
    fn test_load_rejects_zero_threads() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[fetcher.threads]\nfetch = 0").unwrap();

        let err = FetcherConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("fetcher.threads.fetch"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = FetcherConfig::load(Some(Path::new("/nonexistent/fetch.toml"))).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_proxy_credentials_only_with_host() {
        let mut config = FetcherConfig::default();
        config.http.proxy.username = Some("user".into());
        config.http.proxy.password = Some("pass".into());
        assert!(!config.proxy_config().has_auth());

        let config = config.with_proxy("proxy.local", 3128);
        assert!(config.proxy_config().has_auth());
    }

    #[test]
    fn test_builder_methods() {
        let config = FetcherConfig::default()
            .with_fetch_threads(4)
            .with_timeout(Duration::from_millis(500))
            .with_settle(Duration::ZERO)
            .with_service_port(5555)
            .with_gecko_driver("/opt/geckodriver");

        assert_eq!(config.fetch_threads(), 4);
        assert_eq!(config.http.timeout, 500);
        assert_eq!(config.settle(), Duration::ZERO);
        assert_eq!(config.webdriver.service.port, 5555);
        assert_eq!(
            config.webdriver.gecko.driver.as_deref(),
            Some(Path::new("/opt/geckodriver"))
        );
    }
}
