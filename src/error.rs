//! Error types for the WebDriver fetcher.
//!
//! This module defines the error taxonomy used throughout the crate.
//!
//! # Layers
//!
//! | Type | Raised by |
//! |------|-----------|
//! | [`enum@Error`] | Every building block (service, capabilities, session, pool) |
//! | [`FetchError`] | The rendering channel, wrapping navigation and termination failures |
//! | [`ProtocolError`] | The response assembler, the union surfaced to the crawler |
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::ExecutableNotFound`], [`Error::Profile`] |
//! | Driver service | [`Error::PortUnreachable`] |
//! | Capabilities | [`Error::CapabilityType`], [`Error::ProfileDecode`] |
//! | Remote session | [`Error::WebDriver`], [`Error::Protocol`], [`Error::SessionNotStarted`] |
//! | Transport | [`Error::ConnectionTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Http`], [`Error::Zip`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use zip::result::ZipError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a configuration value is missing or out of range.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The driver executable could not be resolved.
    ///
    /// Non-retryable until an operator installs the driver or points the
    /// resolution property at it.
    #[error(
        "Driver executable '{name}' not found. Set '{property}' or put it on PATH; \
         downloads: {download_url}"
    )]
    ExecutableNotFound {
        /// Executable name searched for on `PATH`.
        name: String,
        /// Property that overrides the lookup.
        property: String,
        /// Where the driver can be downloaded.
        download_url: String,
    },

    /// Profile error.
    ///
    /// Returned when Firefox profile creation, packing or setup fails.
    #[error("Profile error: {message}")]
    Profile {
        /// Description of the profile error.
        message: String,
    },

    // ========================================================================
    // Driver Service Errors
    // ========================================================================
    /// The driver service port never became reachable.
    #[error("Driver service port {port} unreachable after {timeout_ms}ms")]
    PortUnreachable {
        /// Port that was polled.
        port: u16,
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
    },

    // ========================================================================
    // Capability Errors
    // ========================================================================
    /// A capability has the wrong concrete shape.
    #[error("Capability '{key}' has the wrong type: {message}")]
    CapabilityType {
        /// Capability key.
        key: String,
        /// What was found instead.
        message: String,
    },

    /// A serialized profile could not be decoded.
    #[error("Failed to decode serialized profile: {message}")]
    ProfileDecode {
        /// Description of the decode failure.
        message: String,
    },

    // ========================================================================
    // Remote Session Errors
    // ========================================================================
    /// The driver answered a command with a WebDriver error.
    #[error("WebDriver error '{error}': {message}")]
    WebDriver {
        /// W3C error code (e.g. `no such element`).
        error: String,
        /// Error message from the driver.
        message: String,
    },

    /// Protocol violation or unexpected response.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// A command needing a remote session was issued before `connect`.
    #[error("Browser session not started")]
    SessionNotStarted,

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Timed out waiting for a pooled connection.
    #[error("Connection pool exhausted: no connection within {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Zip archive error.
    #[error("Archive error: {0}")]
    Zip(#[from] ZipError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an executable not found error.
    #[inline]
    pub fn executable_not_found(
        name: impl Into<String>,
        property: impl Into<String>,
        download_url: impl Into<String>,
    ) -> Self {
        Self::ExecutableNotFound {
            name: name.into(),
            property: property.into(),
            download_url: download_url.into(),
        }
    }

    /// Creates a profile error.
    #[inline]
    pub fn profile(message: impl Into<String>) -> Self {
        Self::Profile {
            message: message.into(),
        }
    }

    /// Creates a port unreachable error.
    #[inline]
    pub fn port_unreachable(port: u16, timeout_ms: u64) -> Self {
        Self::PortUnreachable { port, timeout_ms }
    }

    /// Creates a capability type error.
    #[inline]
    pub fn capability_type(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CapabilityType {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a profile decode error.
    #[inline]
    pub fn profile_decode(message: impl Into<String>) -> Self {
        Self::ProfileDecode {
            message: message.into(),
        }
    }

    /// Creates a WebDriver error from a W3C error payload.
    #[inline]
    pub fn webdriver(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WebDriver {
            error: error.into(),
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::PortUnreachable { .. } | Self::ConnectionTimeout { .. } => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if the error needs an operator fix rather than a retry.
    #[inline]
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::ExecutableNotFound { .. }
                | Self::CapabilityType { .. }
                | Self::ProfileDecode { .. }
        )
    }

    /// Returns `true` if this error may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::PortUnreachable { .. } | Self::ConnectionTimeout { .. } => true,
            Self::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }
}

// ============================================================================
// FetchError
// ============================================================================

/// Failure of the rendering channel for one URL.
///
/// Termination of the browser session is always attempted. When both the
/// rendering and the termination fail, both are kept.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Session setup, navigation or extraction failed.
    #[error("Rendering {url} failed: {source}")]
    RenderingFailed {
        /// URL being rendered.
        url: String,
        /// Underlying failure.
        #[source]
        source: Error,
    },

    /// Rendering succeeded but the session could not be terminated.
    #[error("Terminating browser session for {url} failed: {source}")]
    TerminationFailed {
        /// URL being rendered.
        url: String,
        /// Underlying failure.
        #[source]
        source: Error,
    },

    /// Rendering failed and so did the session termination.
    #[error("Rendering {url} failed: {rendering}; terminating the session also failed: {termination}")]
    RenderingAndTerminationFailed {
        /// URL being rendered.
        url: String,
        /// The triggering failure.
        rendering: Error,
        /// The cleanup failure.
        termination: Error,
    },
}

impl FetchError {
    /// Returns the error that triggered the failure.
    #[must_use]
    pub fn cause(&self) -> &Error {
        match self {
            Self::RenderingFailed { source, .. } | Self::TerminationFailed { source, .. } => source,
            Self::RenderingAndTerminationFailed { rendering, .. } => rendering,
        }
    }

    /// Returns the termination failure, if termination failed.
    #[must_use]
    pub fn termination_error(&self) -> Option<&Error> {
        match self {
            Self::RenderingFailed { .. } => None,
            Self::TerminationFailed { source, .. } => Some(source),
            Self::RenderingAndTerminationFailed { termination, .. } => Some(termination),
        }
    }
}

// ============================================================================
// ProtocolError
// ============================================================================

/// Error surfaced to the caller of a fetch.
///
/// Every variant aborts the fetch; no partial response is returned.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The header channel failed.
    #[error("Fetching headers for {url} failed: {source}")]
    Network {
        /// URL being fetched.
        url: String,
        /// Underlying failure.
        #[source]
        source: Error,
    },

    /// The rendering channel failed.
    #[error(transparent)]
    Rendering(#[from] FetchError),

    /// Both channels failed.
    #[error("Fetching {url} failed on both channels: {network}; {rendering}")]
    Both {
        /// URL being fetched.
        url: String,
        /// Header channel failure.
        network: Error,
        /// Rendering channel failure.
        rendering: FetchError,
    },
}

impl ProtocolError {
    /// Returns `true` if a retry by the scheduler may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { source, .. } => source.is_retryable(),
            Self::Rendering(e) => e.cause().is_retryable(),
            Self::Both {
                network, rendering, ..
            } => network.is_retryable() && rendering.cause().is_retryable(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_port_unreachable_display() {
        let err = Error::port_unreachable(4444, 20_000);
        assert_eq!(
            err.to_string(),
            "Driver service port 4444 unreachable after 20000ms"
        );
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("fetcher.threads.fetch must be positive");
        assert_eq!(
            err.to_string(),
            "Configuration error: fetcher.threads.fetch must be positive"
        );
    }

    #[test]
    fn test_executable_not_found_names_property() {
        let err = Error::executable_not_found(
            "geckodriver",
            "webdriver.gecko.driver",
            "https://github.com/mozilla/geckodriver/releases",
        );
        let text = err.to_string();
        assert!(text.contains("geckodriver"));
        assert!(text.contains("webdriver.gecko.driver"));
        assert!(err.is_configuration_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::port_unreachable(4444, 10).is_timeout());
        assert!(Error::connection_timeout(10).is_timeout());
        assert!(!Error::protocol("bad").is_timeout());
    }

    #[test]
    fn test_capability_errors_are_configuration_errors() {
        assert!(Error::capability_type("moz:firefoxOptions", "string").is_configuration_error());
        assert!(Error::profile_decode("bad base64").is_configuration_error());
        assert!(!Error::webdriver("no such element", "body").is_configuration_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_fetch_error_keeps_both_failures() {
        let err = FetchError::RenderingAndTerminationFailed {
            url: "http://example.com".into(),
            rendering: Error::webdriver("no such element", "body"),
            termination: Error::protocol("connection reset"),
        };

        assert!(matches!(err.cause(), Error::WebDriver { .. }));
        assert!(matches!(err.termination_error(), Some(Error::Protocol { .. })));
        let text = err.to_string();
        assert!(text.contains("no such element"));
        assert!(text.contains("connection reset"));
    }

    #[test]
    fn test_rendering_failure_has_no_termination_error() {
        let err = FetchError::RenderingFailed {
            url: "http://example.com".into(),
            source: Error::port_unreachable(4444, 10),
        };
        assert!(err.termination_error().is_none());
    }

    #[test]
    fn test_protocol_error_retryability() {
        let rendering = ProtocolError::Rendering(FetchError::RenderingFailed {
            url: "http://example.com".into(),
            source: Error::port_unreachable(4444, 10),
        });
        assert!(rendering.is_retryable());

        let network = ProtocolError::Network {
            url: "http://example.com".into(),
            source: Error::config("bad"),
        };
        assert!(!network.is_retryable());
    }
}
