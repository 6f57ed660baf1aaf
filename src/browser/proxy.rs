//! Proxy configuration shared by both fetch channels.
//!
//! One [`ProxyConfig`] is derived from the crawl configuration and projected
//! three ways:
//!
//! - Firefox profile preferences (`network.proxy.*`)
//! - The W3C `proxy` capability sent with `New Session`
//! - A [`reqwest::Proxy`] for the pooled header client
//!
//! # Example
//!
//! ```
//! use webdriver_fetch::ProxyConfig;
//!
//! let proxy = ProxyConfig::http("proxy.local", 3128);
//! assert!(proxy.enabled);
//! assert_eq!(proxy.address(), "proxy.local:3128");
//!
//! let direct = ProxyConfig::disabled();
//! assert!(!direct.enabled);
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::driver::profile::FirefoxPreference;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Port used when the configuration names a host but no port.
pub const DEFAULT_PROXY_PORT: u16 = 8080;

/// `network.proxy.type` value for a manually configured proxy.
const MANUAL_PROXY_TYPE: i32 = 1;

// ============================================================================
// ProxyConfig
// ============================================================================

/// HTTP proxy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy hostname.
    pub host: String,

    /// Proxy port.
    pub port: u16,

    /// Whether traffic goes through the proxy.
    pub enabled: bool,

    /// Username for proxy authentication (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password for proxy authentication (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

// ============================================================================
// ProxyConfig - Constructors
// ============================================================================

impl ProxyConfig {
    /// Creates an enabled HTTP proxy configuration.
    #[must_use]
    pub fn http(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self {
            enabled: !host.is_empty(),
            host,
            port,
            username: None,
            password: None,
        }
    }

    /// Creates a direct (no proxy) configuration.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PROXY_PORT,
            enabled: false,
            username: None,
            password: None,
        }
    }

    /// Builds the configuration from optional crawl settings.
    ///
    /// The proxy is enabled only when a non-empty host is configured.
    #[must_use]
    pub fn from_settings(host: Option<&str>, port: u16) -> Self {
        match host.map(str::trim) {
            Some(host) if !host.is_empty() => Self::http(host, port),
            _ => Self {
                port,
                ..Self::disabled()
            },
        }
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

// ============================================================================
// ProxyConfig - Projections
// ============================================================================

impl ProxyConfig {
    /// Returns `host:port`.
    #[inline]
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns `true` if this proxy has authentication configured.
    #[inline]
    #[must_use]
    pub fn has_auth(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Returns the Firefox preferences routing HTTP traffic through the proxy.
    ///
    /// Empty when the proxy is disabled.
    #[must_use]
    pub fn profile_preferences(&self) -> Vec<FirefoxPreference> {
        if !self.enabled {
            return Vec::new();
        }

        vec![
            FirefoxPreference::new("network.proxy.type", MANUAL_PROXY_TYPE)
                .with_comment("0 = direct, 1 = manual"),
            FirefoxPreference::new("network.proxy.http", self.host.as_str()),
            FirefoxPreference::new("network.proxy.http_port", i32::from(self.port)),
        ]
    }

    /// Returns the W3C `proxy` capability object.
    #[must_use]
    pub fn to_capability(&self) -> Value {
        if self.enabled {
            json!({
                "proxyType": "manual",
                "httpProxy": self.address(),
            })
        } else {
            json!({ "proxyType": "direct" })
        }
    }

    /// Returns the proxy for the pooled HTTP client, or `None` when disabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host does not form a valid proxy URL.
    pub fn to_reqwest(&self) -> Result<Option<reqwest::Proxy>> {
        if !self.enabled {
            return Ok(None);
        }

        let mut proxy = reqwest::Proxy::all(format!("http://{}", self.address()))
            .map_err(|e| Error::config(format!("Invalid proxy {}: {e}", self.address())))?;

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            proxy = proxy.basic_auth(username, password);
        }

        Ok(Some(proxy))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::driver::profile::PreferenceValue;

    #[test]
    fn test_http_proxy_is_enabled() {
        let proxy = ProxyConfig::http("proxy.local", 3128);
        assert!(proxy.enabled);
        assert_eq!(proxy.address(), "proxy.local:3128");
        assert!(!proxy.has_auth());
    }

    #[test]
    fn test_from_settings_without_host_is_disabled() {
        assert!(!ProxyConfig::from_settings(None, 8080).enabled);
        assert!(!ProxyConfig::from_settings(Some("  "), 8080).enabled);

        let proxy = ProxyConfig::from_settings(Some("proxy.local"), 3128);
        assert!(proxy.enabled);
        assert_eq!(proxy.port, 3128);
    }

    #[test]
    fn test_profile_preferences() {
        let prefs = ProxyConfig::http("proxy.local", 3128).profile_preferences();
        let lookup = |key: &str| {
            prefs
                .iter()
                .find(|p| p.key == key)
                .map(|p| p.value.clone())
        };

        assert_eq!(lookup("network.proxy.type"), Some(PreferenceValue::Int(1)));
        assert_eq!(
            lookup("network.proxy.http"),
            Some(PreferenceValue::String("proxy.local".into()))
        );
        assert_eq!(
            lookup("network.proxy.http_port"),
            Some(PreferenceValue::Int(3128))
        );
    }

    #[test]
    fn test_disabled_proxy_has_no_preferences() {
        assert!(ProxyConfig::disabled().profile_preferences().is_empty());
    }

    #[test]
    fn test_capability() {
        let manual = ProxyConfig::http("proxy.local", 3128).to_capability();
        assert_eq!(manual["proxyType"], "manual");
        assert_eq!(manual["httpProxy"], "proxy.local:3128");

        let direct = ProxyConfig::disabled().to_capability();
        assert_eq!(direct["proxyType"], "direct");
    }

    #[test]
    fn test_to_reqwest() {
        assert!(ProxyConfig::disabled().to_reqwest().unwrap().is_none());
        assert!(
            ProxyConfig::http("proxy.local", 3128)
                .with_credentials("user", "pass")
                .to_reqwest()
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_serialization_skips_missing_credentials() {
        let json = serde_json::to_string(&ProxyConfig::http("proxy.local", 3128)).unwrap();
        assert!(json.contains(r#""host":"proxy.local""#));
        assert!(!json.contains("username"));
    }
}
