//! Desired capabilities for a rendering session.
//!
//! Capabilities are a string-keyed map of JSON values, plus two typed slots
//! that the session factory resolves when the session is created:
//!
//! - the profile, either a structured [`Profile`] or its serialized base64
//!   string ([`ProfileCapability`])
//! - the proxy ([`ProxyConfig`])
//!
//! Browser options may arrive under the canonical `moz:firefoxOptions` key or
//! a legacy alias. Aliases are listed in [`LEGACY_KEYS`]; only the canonical
//! key is ever sent to the driver.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::{Map, Value};

use crate::browser::ProxyConfig;
use crate::driver::options::FirefoxOptions;
use crate::driver::profile::Profile;
use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Capability key holding the Firefox profile.
pub const PROFILE: &str = "firefox_profile";

/// Canonical capability key for Firefox options.
pub const FIREFOX_OPTIONS: &str = "moz:firefoxOptions";

/// Pre-W3C capability key for Firefox options.
pub const LEGACY_FIREFOX_OPTIONS: &str = "firefoxOptions";

/// W3C proxy capability key.
pub const PROXY: &str = "proxy";

/// Capability key selecting the Marionette remote protocol.
pub const MARIONETTE: &str = "marionette";

/// Capability key naming the browser.
pub const BROWSER_NAME: &str = "browserName";

/// Legacy key → canonical key.
pub const LEGACY_KEYS: &[(&str, &str)] = &[(LEGACY_FIREFOX_OPTIONS, FIREFOX_OPTIONS)];

// ============================================================================
// ProfileCapability
// ============================================================================

/// A profile as supplied in the capabilities.
pub enum ProfileCapability {
    /// A profile directory owned by this process.
    Structured(Profile),

    /// A base64 zip produced elsewhere; decoded at session creation.
    Serialized(String),
}

impl fmt::Debug for ProfileCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured(profile) => f.debug_tuple("Structured").field(profile).finish(),
            Self::Serialized(data) => f
                .debug_struct("Serialized")
                .field("len", &data.len())
                .finish(),
        }
    }
}

impl From<Profile> for ProfileCapability {
    fn from(profile: Profile) -> Self {
        Self::Structured(profile)
    }
}

impl From<String> for ProfileCapability {
    fn from(data: String) -> Self {
        Self::Serialized(data)
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Desired capabilities for one browser session.
#[derive(Debug, Default)]
pub struct Capabilities {
    /// Plain capability values.
    values: Map<String, Value>,

    /// Typed profile, taking precedence over a raw `firefox_profile` value.
    profile: Option<ProfileCapability>,

    /// Proxy applied to both the profile and the `proxy` capability.
    proxy: Option<ProxyConfig>,
}

// ============================================================================
// Capabilities - Constructors
// ============================================================================

impl Capabilities {
    /// Creates an empty capability set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates capabilities for Firefox driven through Marionette.
    #[must_use]
    pub fn firefox() -> Self {
        let mut caps = Self::new();
        caps.set(BROWSER_NAME, "firefox");
        caps.set(MARIONETTE, true);
        caps
    }
}

// ============================================================================
// Capabilities - Builder Methods
// ============================================================================

impl Capabilities {
    /// Sets a profile.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<ProfileCapability>) -> Self {
        self.set_profile(profile);
        self
    }

    /// Sets the proxy.
    #[must_use]
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Sets Firefox options under the canonical key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the options cannot be
    /// serialized.
    pub fn with_options(mut self, options: &FirefoxOptions) -> Result<Self> {
        self.set(FIREFOX_OPTIONS, options.to_capability()?);
        Ok(self)
    }

    /// Sets the Marionette flag.
    #[must_use]
    pub fn with_marionette(mut self, enabled: bool) -> Self {
        self.set(MARIONETTE, enabled);
        self
    }
}

// ============================================================================
// Capabilities - Access
// ============================================================================

impl Capabilities {
    /// Sets a raw capability value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns a raw capability value.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Removes and returns a raw capability value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Sets the typed profile.
    pub fn set_profile(&mut self, profile: impl Into<ProfileCapability>) {
        self.profile = Some(profile.into());
    }

    /// Removes and returns the typed profile.
    pub fn take_profile(&mut self) -> Option<ProfileCapability> {
        self.profile.take()
    }

    /// Returns `true` if a profile was supplied in either form.
    #[must_use]
    pub fn has_profile(&self) -> bool {
        self.profile.is_some() || self.values.contains_key(PROFILE)
    }

    /// Sets the proxy.
    pub fn set_proxy(&mut self, proxy: ProxyConfig) {
        self.proxy = Some(proxy);
    }

    /// Returns the proxy, if set.
    #[inline]
    #[must_use]
    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    /// Splits into raw values, profile and proxy.
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        Map<String, Value>,
        Option<ProfileCapability>,
        Option<ProxyConfig>,
    ) {
        (self.values, self.profile, self.proxy)
    }
}

// ============================================================================
// Key Resolution
// ============================================================================

/// Returns the canonical spelling of a capability key.
#[must_use]
pub fn canonical_key(key: &str) -> &str {
    LEGACY_KEYS
        .iter()
        .find(|(legacy, _)| *legacy == key)
        .map_or(key, |(_, canonical)| canonical)
}

/// Returns the legacy aliases of a canonical key.
pub fn legacy_aliases(canonical: &str) -> impl Iterator<Item = &'static str> + '_ {
    LEGACY_KEYS
        .iter()
        .filter(move |(_, c)| *c == canonical)
        .map(|(legacy, _)| *legacy)
}

// ============================================================================
// Tests
// ============================================================================
