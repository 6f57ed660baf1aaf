//! Response envelope of the W3C WebDriver protocol.
//!
//! Every driver reply is a JSON object with a single `value` member:
//!
//! Success:
//! ```json
//! { "value": { ... } }
//! ```
//!
//! Error:
//! ```json
//! { "value": { "error": "no such element", "message": "...", "stacktrace": "..." } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{ElementId, SessionId};

// ============================================================================
// Response
// ============================================================================

/// A raw reply from the driver.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Payload of the reply (`null` for commands without a result).
    #[serde(default)]
    pub value: Value,
}

impl Response {
    /// Returns `true` if the payload is a W3C error object.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.value.get("error").and_then(Value::as_str).is_some()
    }

    /// Extracts the payload, returning the driver error if there was one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebDriver`] if the payload is an error object.
    pub fn into_result(self) -> Result<Value> {
        if self.is_error() {
            let error = self
                .value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            let message = self
                .value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(Error::webdriver(error, message));
        }
        Ok(self.value)
    }
}

// ============================================================================
// Typed Payloads
// ============================================================================

/// Payload of a successful `New Session`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSessionValue {
    /// Assigned session ID.
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,

    /// Capabilities the driver actually matched.
    #[serde(default)]
    pub capabilities: Value,
}

/// Parses the `New Session` payload.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if `sessionId` is missing.
pub fn parse_new_session(value: Value) -> Result<NewSessionValue> {
    serde_json::from_value(value)
        .map_err(|e| Error::protocol(format!("Malformed New Session reply: {e}")))
}

/// Parses a web element reference.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the payload has no element reference.
pub fn parse_element(value: &Value) -> Result<ElementId> {
    value
        .get(ElementId::W3C_KEY)
        .and_then(Value::as_str)
        .map(ElementId::new)
        .ok_or_else(|| Error::protocol("Find Element reply carries no element reference"))
}

// ============================================================================
// Tests
// ============================================================================
