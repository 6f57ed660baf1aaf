//! WebDriver Fetch - crawler page fetcher backed by a real browser.
//!
//! Each page is fetched over two channels at once:
//!
//! - **Header channel**: a plain GET through a shared, bounded connection
//!   pool. Supplies the status code and response headers. Redirects are not
//!   followed and the body is discarded.
//! - **Rendering channel**: a Firefox session driven through geckodriver.
//!   Supplies the `<body>` markup after scripts have run.
//!
//! The two are merged into one [`FetchResponse`]. If either channel fails,
//! the fetch fails.
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────────────────┐
//!                      │    WebDriverProtocol     │
//!                      │  (config + shared pool)  │
//!                      └────────────┬─────────────┘
//!                                   │
//!                      ┌────────────▼─────────────┐
//!                      │    ResponseAssembler     │
//!                      └──────┬────────────┬──────┘
//!                             │            │
//!              ┌──────────────▼───┐    ┌───▼──────────────────────┐
//!              │  HeaderFetcher   │    │  RenderedContentFetcher  │
//!              │  ConnectionPool  │    │  SessionFactory          │
//!              └──────────────────┘    │  GeckoDriverService      │
//!                                      │  BrowserSession          │
//!                                      └──────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use webdriver_fetch::{FetcherConfig, WebDriverProtocol, WebPage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FetcherConfig::load(None)?.with_proxy("proxy.local", 3128);
//!     let protocol = WebDriverProtocol::new(config)?;
//!
//!     let mut page = WebPage::new();
//!     let response = protocol.fetch("https://example.com/", &mut page).await?;
//!
//!     println!("{} {}", response.code(), String::from_utf8_lossy(response.content()));
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`fetch`] | Protocol entry point and both fetch channels |
//! | [`driver`] | Driver supervisor, capabilities, profiles, session factory |
//! | [`browser`] | Browser session and proxy configuration |
//! | [`config`] | Layered configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | W3C WebDriver command and response types (internal) |
//! | [`transport`] | Command executor and connection pool |

// ============================================================================
// Modules
// ============================================================================

/// Browser session and proxy configuration.
pub mod browser;

/// Layered configuration.
pub mod config;

/// Driver supervisor, capabilities and session factory.
///
/// Use [`GeckoDriverService::builder()`] to configure a supervisor.
pub mod driver;

/// Error types and result aliases.
///
/// Most fallible operations return [`Result<T>`] which uses [`Error`].
/// A fetch returns [`ProtocolError`].
pub mod error;

/// Dual-channel page fetching.
pub mod fetch;

/// Type-safe identifiers for remote entities.
pub mod identifiers;

/// W3C WebDriver message types.
///
/// Internal module defining command and response structures.
pub mod protocol;

/// HTTP transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{BrowserSession, ProxyConfig};

// Configuration
pub use config::FetcherConfig;

// Driver types
pub use driver::{
    Capabilities, DriverService, FirefoxOptions, GeckoDriverService, Profile, ServiceBuilder,
    SessionFactory,
};

// Error types
pub use error::{Error, FetchError, ProtocolError, Result};

// Fetch types
pub use fetch::{
    FetchRequest, FetchResponse, HeaderFetcher, Headers, PageField, PageMetadata,
    RenderedContentFetcher, ResponseAssembler, WebDriverProtocol, WebPage,
};

// Identifier types
pub use identifiers::{ElementId, SessionId};

// Transport types
pub use transport::ConnectionPool;
