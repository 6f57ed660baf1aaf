//! Shared connection pool for the header channel.
//!
//! One [`ConnectionPool`] is built from the fetcher configuration and handed
//! by reference to every header fetch. It owns a single HTTP client and a
//! semaphore bounding the number of concurrent connections.
//!
//! # Sizing
//!
//! ```text
//! fetcher.threads.fetch = T
//!   ├── max total connections    = T   (semaphore permits)
//!   └── max connections per host = T   (idle pool per host)
//! ```
//!
//! Per-host equals total: every fetch task may target the same host.
//!
//! # Client Policy
//!
//! - Redirects are never followed
//! - TLS certificates are not verified (self-signed sites stay crawlable)
//! - Lenient HTTP/1 response parsing
//! - Default `Accept`, `Accept-Language` and `Accept-Charset` headers
//! - The configured proxy, if any

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::header::{ACCEPT, ACCEPT_CHARSET, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, RequestBuilder, Version};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::browser::ProxyConfig;
use crate::config::FetcherConfig;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default `Accept` header.
pub const DEFAULT_ACCEPT: &str = "text/html,application/xml;q=0.9,application/xhtml+xml,\
                                  text/xml;q=0.9,text/plain;q=0.8,image/png,*/*;q=0.5";

/// Default `Accept-Language` header.
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-us,en-gb,en;q=0.7,*;q=0.3";

/// Default `Accept-Charset` header.
pub const DEFAULT_ACCEPT_CHARSET: &str = "utf-8,ISO-8859-1;q=0.7,*;q=0.7";

// ============================================================================
// PoolParams
// ============================================================================

/// Capacity and timing parameters of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolParams {
    /// Connect timeout.
    pub connection_timeout: Duration,
    /// Request timeout.
    pub so_timeout: Duration,
    /// Socket send buffer size. Recorded only; the client has no socket knob.
    pub send_buffer_size: usize,
    /// Socket receive buffer size. Recorded only.
    pub receive_buffer_size: usize,
    /// Concurrent connections across all hosts.
    pub max_total_connections: usize,
    /// Connections kept per host.
    pub max_connections_per_host: usize,
    /// Wait for a free connection before failing.
    pub acquire_timeout: Duration,
    /// HTTP version of outgoing requests.
    pub version: Version,
}

impl PoolParams {
    /// Derives pool parameters from the configuration.
    #[must_use]
    pub fn from_config(config: &FetcherConfig) -> Self {
        let threads = config.fetch_threads().max(1);
        let timeout = config.timeout();

        Self {
            connection_timeout: timeout,
            so_timeout: timeout,
            send_buffer_size: config.http.buffer.size,
            receive_buffer_size: config.http.buffer.size,
            max_total_connections: threads,
            max_connections_per_host: threads,
            acquire_timeout: timeout,
            version: if config.http.use_http11 {
                Version::HTTP_11
            } else {
                Version::HTTP_10
            },
        }
    }
}

// ============================================================================
// PoolState
// ============================================================================

/// One configuration generation of the pool.
struct PoolState {
    client: Client,
    permits: Arc<Semaphore>,
    params: PoolParams,
    proxy: ProxyConfig,
}

// ============================================================================
// ConnectionPool
// ============================================================================

/// Process-wide pooled HTTP client for the header channel.
///
/// Reconfiguring swaps in a new client and semaphore. Requests already
/// holding a connection finish on the previous generation.
pub struct ConnectionPool {
    state: RwLock<Arc<PoolState>>,
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ConnectionPool")
            .field("params", &state.params)
            .field("proxy", &state.proxy.enabled.then(|| state.proxy.address()))
            .field("available", &state.permits.available_permits())
            .finish()
    }
}

// ============================================================================
// ConnectionPool - Constructor
// ============================================================================

impl ConnectionPool {
    /// Builds the pool from the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid proxy or [`Error::Http`] if
    /// the client cannot be built.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        Ok(Self {
            state: RwLock::new(Arc::new(Self::build_state(config)?)),
        })
    }

    /// Re-applies the configuration.
    ///
    /// # Errors
    ///
    /// See [`ConnectionPool::new`]. The previous configuration stays in
    /// effect on error.
    pub fn configure(&self, config: &FetcherConfig) -> Result<()> {
        let state = Self::build_state(config)?;
        *self.state.write() = Arc::new(state);
        Ok(())
    }

    fn build_state(config: &FetcherConfig) -> Result<PoolState> {
        let params = PoolParams::from_config(config);
        let proxy = config.proxy_config();

        let mut builder = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(params.connection_timeout)
            .timeout(params.so_timeout)
            .pool_max_idle_per_host(params.max_connections_per_host)
            .danger_accept_invalid_certs(true)
            .default_headers(default_headers())
            .user_agent(config.http.agent.as_str())
            .http1_title_case_headers()
            .http1_allow_obsolete_multiline_headers_in_responses(true)
            .http1_allow_spaces_after_header_name_in_responses(true)
            .http1_ignore_invalid_headers_in_responses(true);

        builder = match proxy.to_reqwest()? {
            Some(p) => builder.proxy(p),
            None => builder.no_proxy(),
        };

        let client = builder.build()?;
        let route = if proxy.enabled {
            proxy.address()
        } else {
            "direct".to_string()
        };

        info!(
            max_total = params.max_total_connections,
            max_per_host = params.max_connections_per_host,
            timeout_ms = params.so_timeout.as_millis() as u64,
            proxy = %route,
            "Connection pool configured"
        );

        Ok(PoolState {
            client,
            permits: Arc::new(Semaphore::new(params.max_total_connections)),
            params,
            proxy,
        })
    }
}

// ============================================================================
// ConnectionPool - Public API
// ============================================================================

impl ConnectionPool {
    /// Returns the current parameters.
    #[must_use]
    pub fn params(&self) -> PoolParams {
        self.state.read().params
    }

    /// Returns the proxy the client routes through.
    #[must_use]
    pub fn proxy(&self) -> ProxyConfig {
        self.state.read().proxy.clone()
    }

    /// Returns the number of connections that can be acquired right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.state.read().permits.available_permits()
    }

    /// Acquires a connection slot.
    ///
    /// The slot is released when the returned [`PooledClient`] is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionTimeout`] if no slot frees up within the
    /// acquire timeout.
    pub async fn acquire(&self) -> Result<PooledClient> {
        let state = Arc::clone(&self.state.read());
        let wait = state.params.acquire_timeout;

        let permit = match timeout(wait, Arc::clone(&state.permits).acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(Error::protocol("Connection pool closed")),
            Err(_) => {
                debug!(wait_ms = wait.as_millis() as u64, "No pooled connection available");
                return Err(Error::connection_timeout(wait.as_millis() as u64));
            }
        };

        Ok(PooledClient {
            state,
            _permit: permit,
        })
    }
}

// ============================================================================
// PooledClient
// ============================================================================

/// A leased connection slot plus the client to use with it.
pub struct PooledClient {
    state: Arc<PoolState>,
    _permit: OwnedSemaphorePermit,
}

impl fmt::Debug for PooledClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledClient")
            .field("version", &self.state.params.version)
            .finish_non_exhaustive()
    }
}

impl PooledClient {
    /// Starts a GET with the pool's HTTP version.
    #[must_use]
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.state.client.get(url).version(self.state.params.version)
    }

    /// Returns the parameters of the generation this slot belongs to.
    #[inline]
    #[must_use]
    pub fn params(&self) -> &PoolParams {
        &self.state.params
    }
}

// ============================================================================
// Private Helpers
// ============================================================================

/// Content-negotiation headers sent with every request.
fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE));
    headers.insert(ACCEPT_CHARSET, HeaderValue::from_static(DEFAULT_ACCEPT_CHARSET));
    headers
}

// ============================================================================
// Tests
// ============================================================================
