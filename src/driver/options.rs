//! The `moz:firefoxOptions` capability object.
//!
//! geckodriver reads browser launch settings from this member of the
//! capabilities:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `binary` | Firefox executable to launch |
//! | `args` | Firefox command-line arguments |
//! | `prefs` | Preferences applied on top of the profile |
//! | `profile` | Base64 zip of a profile directory |
//! | `log` | geckodriver log level |
//!
//! Unknown members are preserved so caller-supplied options survive a
//! round trip through [`FirefoxOptions`].
//!
//! # Example
//!
//! ```
//! use webdriver_fetch::FirefoxOptions;
//!
//! let options = FirefoxOptions::new()
//!     .with_headless()
//!     .with_window_size(1920, 1080);
//!
//! assert!(options.is_headless());
//! assert!(options.args.contains(&"--width=1920".to_string()));
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::driver::profile::PreferenceValue;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Firefox argument enabling headless mode.
const HEADLESS_ARG: &str = "-headless";

/// Firefox argument opening a private window.
const PRIVATE_ARG: &str = "-private";

// ============================================================================
// FirefoxOptions
// ============================================================================

/// Firefox launch options sent as `moz:firefoxOptions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirefoxOptions {
    /// Firefox executable; geckodriver searches its default locations when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,

    /// Command-line arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Preferences applied on top of the profile.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub prefs: Map<String, Value>,

    /// Base64 zip of the profile directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// geckodriver log settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogOptions>,

    /// Members this crate does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// geckodriver log settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogOptions {
    /// One of `trace`, `debug`, `config`, `info`, `warn`, `error`, `fatal`.
    pub level: String,
}

// ============================================================================
// Constructors
// ============================================================================

impl FirefoxOptions {
    /// Creates an empty options object.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options configured for headless mode.
    #[inline]
    #[must_use]
    pub fn headless() -> Self {
        Self::new().with_headless()
    }

    /// Parses the options found under a capability key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityType`] if the value is not an options object.
    pub fn from_capability(key: &str, value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::capability_type(
                key,
                format!("expected an options object, found {}", json_kind(&value)),
            ));
        }
        serde_json::from_value(value).map_err(|e| Error::capability_type(key, e.to_string()))
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl FirefoxOptions {
    /// Enables headless mode.
    #[must_use]
    pub fn with_headless(self) -> Self {
        self.with_flag(HEADLESS_ARG)
    }

    /// Opens a private browsing window.
    #[must_use]
    pub fn with_private(self) -> Self {
        self.with_flag(PRIVATE_ARG)
    }

    /// Sets the initial window size in pixels.
    #[must_use]
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.args
            .retain(|a| !a.starts_with("--width=") && !a.starts_with("--height="));
        self.args.push(format!("--width={width}"));
        self.args.push(format!("--height={height}"));
        self
    }

    /// Sets the Firefox executable.
    #[inline]
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    /// Adds a custom command-line argument.
    #[inline]
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple custom command-line arguments.
    #[inline]
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets a preference applied on top of the profile.
    #[must_use]
    pub fn with_pref(mut self, key: impl Into<String>, value: impl Into<PreferenceValue>) -> Self {
        self.prefs.insert(key.into(), value.into().to_json());
        self
    }

    /// Sets the geckodriver log level.
    #[inline]
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log = Some(LogOptions {
            level: level.into(),
        });
        self
    }

    /// Adds a flag argument once.
    fn with_flag(mut self, flag: &str) -> Self {
        if !self.args.iter().any(|a| a == flag) {
            self.args.push(flag.to_string());
        }
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl FirefoxOptions {
    /// Serializes the options as a capability value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_capability(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Returns `true` if headless mode is enabled.
    #[inline]
    #[must_use]
    pub fn is_headless(&self) -> bool {
        self.args.iter().any(|a| a == HEADLESS_ARG || a == "--headless")
    }
}

// ============================================================================
// Private Helpers
// ============================================================================

/// Names the JSON type of a value, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_new_is_empty() {
        let options = FirefoxOptions::new();
        assert!(!options.is_headless());
        assert_eq!(options.to_capability().unwrap(), json!({}));
    }

    #[test]
    fn test_headless_flag_added_once() {
        let options = FirefoxOptions::headless().with_headless();
        assert!(options.is_headless());
        assert_eq!(options.args, vec!["-headless".to_string()]);
    }

    #[test]
    fn test_window_size_replaces_previous() {
        let options = FirefoxOptions::new()
            .with_window_size(800, 600)
            .with_window_size(1024, 768);
        assert_eq!(options.args, vec!["--width=1024", "--height=768"]);
    }

    #[test]
    fn test_builder_chain_serializes() {
        let options = FirefoxOptions::new()
            .with_binary("/usr/bin/firefox")
            .with_private()
            .with_arg("--custom")
            .with_pref("network.proxy.type", 1)
            .with_log_level("trace");

        assert_eq!(
            options.to_capability().unwrap(),
            json!({
                "binary": "/usr/bin/firefox",
                "args": ["-private", "--custom"],
                "prefs": {"network.proxy.type": 1},
                "log": {"level": "trace"}
            })
        );
    }

    #[test]
    fn test_from_capability_keeps_unknown_members() {
        let options = FirefoxOptions::from_capability(
            "moz:firefoxOptions",
            json!({"args": ["-headless"], "env": {"MOZ_LOG": "x"}}),
        )
        .unwrap();

        assert!(options.is_headless());
        assert_eq!(options.to_capability().unwrap()["env"]["MOZ_LOG"], "x");
    }

    #[test]
    fn test_from_capability_rejects_wrong_shape() {
        let err = FirefoxOptions::from_capability("moz:firefoxOptions", json!("headless"))
            .unwrap_err();
        assert!(matches!(err, Error::CapabilityType { ref key, .. } if key == "moz:firefoxOptions"));

        let err =
            FirefoxOptions::from_capability("firefoxOptions", json!({"args": "-headless"}))
                .unwrap_err();
        assert!(matches!(err, Error::CapabilityType { .. }));
    }
}
