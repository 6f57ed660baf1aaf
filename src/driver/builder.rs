//! Builder for driver service supervisors.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use webdriver_fetch::GeckoDriverService;
//!
//! # fn example() -> webdriver_fetch::Result<()> {
//! let service = GeckoDriverService::builder()
//!     .executable("/usr/local/bin/geckodriver")
//!     .port(4444)
//!     .start_timeout(Duration::from_secs(20))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

use super::service::{DEFAULT_START_TIMEOUT, GeckoDriverService, find_executable};

// ============================================================================
// Constants
// ============================================================================

/// Port geckodriver listens on by default.
pub const DEFAULT_SERVICE_PORT: u16 = 4444;

/// Host geckodriver listens on by default.
pub const DEFAULT_SERVICE_HOST: &str = "127.0.0.1";

// ============================================================================
// ServiceBuilder
// ============================================================================

/// Builder for configuring a [`GeckoDriverService`].
///
/// Use [`GeckoDriverService::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct ServiceBuilder {
    /// Explicit driver executable.
    executable: Option<PathBuf>,
    /// Listening host.
    host: String,
    /// Listening port.
    port: u16,
    /// Driver arguments.
    args: Vec<String>,
    /// Driver environment.
    environment: FxHashMap<String, String>,
    /// Port wait bound.
    start_timeout: Duration,
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self {
            executable: None,
            host: DEFAULT_SERVICE_HOST.to_string(),
            port: DEFAULT_SERVICE_PORT,
            args: Vec::new(),
            environment: FxHashMap::default(),
            start_timeout: DEFAULT_START_TIMEOUT,
        }
    }
}

// ============================================================================
// ServiceBuilder Implementation
// ============================================================================

impl ServiceBuilder {
    /// Creates a builder with default host, port and timeout.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit driver executable, skipping the environment and
    /// `PATH` lookup.
    #[inline]
    #[must_use]
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Sets an explicit driver executable if one is given.
    #[inline]
    #[must_use]
    pub fn executable_opt(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.executable = path;
        }
        self
    }

    /// Sets the listening host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the listening port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets how long `start` waits for the port.
    #[inline]
    #[must_use]
    pub fn start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    /// Adds a driver argument.
    #[inline]
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds a driver environment variable.
    #[inline]
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Resolves the executable and builds the supervisor.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if port is zero or host is empty
    /// - [`Error::ExecutableNotFound`] if no executable can be resolved
    pub fn build(self) -> Result<GeckoDriverService> {
        self.validate()?;
        let executable = find_executable(self.executable.as_deref())?;

        GeckoDriverService::new(
            executable,
            self.host,
            self.port,
            self.args,
            self.environment,
            self.start_timeout,
        )
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ServiceBuilder {
    /// Validates the address configuration.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::config(
                "Driver service port must be non-zero. Use .port() to set it.",
            ));
        }
        if self.host.trim().is_empty() {
            return Err(Error::config("Driver service host must not be empty"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
