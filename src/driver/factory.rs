//! Browser session factory.
//!
//! Turns desired [`Capabilities`] into the capability object sent with
//! `New Session`, and binds it to a driver service. No network traffic
//! happens here; the session connects on first use.
//!
//! # Merge Steps
//!
//! 1. Resolve the profile: typed slot, else raw `firefox_profile` string,
//!    else the profile inside the supplied options, else a fresh temporary one
//! 2. Write proxy preferences into the profile when the proxy is enabled
//! 3. Resolve options from `moz:firefoxOptions` or a legacy alias
//! 4. Pack the profile into the options and store them under the canonical key
//! 5. Serialize the proxy descriptor as the W3C `proxy` capability

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::browser::BrowserSession;
use crate::error::{Error, Result};

use super::capabilities::{
    Capabilities, FIREFOX_OPTIONS, PROFILE, PROXY, ProfileCapability, legacy_aliases,
};
use super::options::{FirefoxOptions, json_kind};
use super::profile::Profile;
use super::service::DriverService;

// ============================================================================
// SessionFactory
// ============================================================================

/// Creates browser sessions from desired capabilities.
#[derive(Debug, Clone, Default)]
pub struct SessionFactory {
    /// Options used when the capabilities carry none.
    base_options: FirefoxOptions,
}

impl SessionFactory {
    /// Creates a factory with empty base options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory whose sessions default to `options`.
    #[inline]
    #[must_use]
    pub fn with_options(options: FirefoxOptions) -> Self {
        Self {
            base_options: options,
        }
    }

    /// Returns the base options.
    #[inline]
    #[must_use]
    pub fn base_options(&self) -> &FirefoxOptions {
        &self.base_options
    }

    /// Builds a session bound to `driver`.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityType`] if an options capability is malformed
    /// - [`Error::ProfileDecode`] if a serialized profile cannot be unpacked
    /// - [`Error::Profile`] if the profile cannot be written or packed
    pub fn create_session(
        &self,
        driver: Arc<dyn DriverService>,
        capabilities: Capabilities,
    ) -> Result<BrowserSession> {
        let merged = self.merge_capabilities(capabilities)?;
        BrowserSession::new(driver, merged)
    }

    /// Merges desired capabilities into the `alwaysMatch` object.
    ///
    /// # Errors
    ///
    /// See [`SessionFactory::create_session`].
    pub fn merge_capabilities(&self, capabilities: Capabilities) -> Result<Map<String, Value>> {
        let (mut values, typed_profile, proxy) = capabilities.into_parts();

        let mut options = take_options(&mut values)?.unwrap_or_else(|| self.base_options.clone());
        let raw_profile = values.remove(PROFILE);

        let mut profile = match (typed_profile, raw_profile) {
            (Some(ProfileCapability::Structured(profile)), _) => profile,
            (Some(ProfileCapability::Serialized(data)), _) => Profile::decode(&data)?,
            (None, Some(Value::String(data))) => Profile::decode(&data)?,
            (None, Some(other)) => {
                return Err(Error::capability_type(
                    PROFILE,
                    format!("expected a profile or a string, found {}", json_kind(&other)),
                ));
            }
            (None, None) => match options.profile.take() {
                Some(data) => Profile::decode(&data)?,
                None => Profile::new_temp()?,
            },
        };

        if let Some(proxy) = proxy.as_ref().filter(|p| p.enabled) {
            debug!(proxy = %proxy.address(), "Applying proxy preferences to profile");
            profile.apply_all(proxy.profile_preferences());
        }

        options.profile = Some(profile.encode()?);
        values.insert(FIREFOX_OPTIONS.to_string(), options.to_capability()?);

        if let Some(proxy) = proxy {
            values.insert(PROXY.to_string(), proxy.to_capability());
        }

        debug!(
            keys = ?values.keys().collect::<Vec<_>>(),
            "Merged session capabilities"
        );

        Ok(values)
    }
}

// ============================================================================
// Private Helpers
// ============================================================================

/// Removes the options capability under the canonical key or any legacy alias.
///
/// The canonical key wins when both are present.
fn take_options(values: &mut Map<String, Value>) -> Result<Option<FirefoxOptions>> {
    let mut found = values
        .remove(FIREFOX_OPTIONS)
        .map(|v| (FIREFOX_OPTIONS, v));

    for alias in legacy_aliases(FIREFOX_OPTIONS) {
        if let Some(value) = values.remove(alias) {
            if found.is_none() {
                debug!(key = alias, "Using legacy options capability");
                found = Some((alias, value));
            } else {
                debug!(key = alias, "Ignoring legacy options capability");
            }
        }
    }

    found
        .map(|(key, value)| FirefoxOptions::from_capability(key, value))
        .transpose()
}

// ============================================================================
// Tests
// ============================================================================
