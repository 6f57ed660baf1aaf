//! W3C WebDriver command definitions.
//!
//! Each command maps to one HTTP endpoint on the driver service:
//!
//! | Command | Method | Path |
//! |---------|--------|------|
//! | [`Command::NewSession`] | POST | `/session` |
//! | [`Command::DeleteSession`] | DELETE | `/session/{id}` |
//! | [`Command::NavigateTo`] | POST | `/session/{id}/url` |
//! | [`Command::FindElement`] | POST | `/session/{id}/element` |
//! | [`Command::GetElementProperty`] | GET | `/session/{id}/element/{eid}/property/{name}` |

// ============================================================================
// Imports
// ============================================================================

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::identifiers::{ElementId, SessionId};

// ============================================================================
// Locator
// ============================================================================

/// Element location strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "using", content = "value")]
pub enum Locator {
    /// CSS selector.
    #[serde(rename = "css selector")]
    Css(String),

    /// Element tag name.
    #[serde(rename = "tag name")]
    TagName(String),

    /// XPath expression.
    #[serde(rename = "xpath")]
    XPath(String),
}

// ============================================================================
// Command
// ============================================================================

/// A WebDriver command addressed to the driver service.
#[derive(Debug, Clone)]
pub enum Command {
    /// Create a remote session with the given capabilities.
    NewSession {
        /// Merged capability object, sent as `alwaysMatch`.
        capabilities: Map<String, Value>,
    },

    /// End a remote session, closing its browser.
    DeleteSession {
        /// Session to delete.
        session_id: SessionId,
    },

    /// Navigate the current top-level browsing context.
    NavigateTo {
        /// Target session.
        session_id: SessionId,
        /// URL to load.
        url: String,
    },

    /// Find the first element matching a locator.
    FindElement {
        /// Target session.
        session_id: SessionId,
        /// Location strategy.
        locator: Locator,
    },

    /// Read a DOM property of an element.
    GetElementProperty {
        /// Target session.
        session_id: SessionId,
        /// Element reference.
        element_id: ElementId,
        /// Property name (e.g. `innerHTML`).
        name: String,
    },
}

// ============================================================================
// Command - Wire Mapping
// ============================================================================

impl Command {
    /// Returns the HTTP method for this command.
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Self::GetElementProperty { .. } => Method::GET,
            Self::NewSession { .. } | Self::NavigateTo { .. } | Self::FindElement { .. } => {
                Method::POST
            }
            Self::DeleteSession { .. } => Method::DELETE,
        }
    }

    /// Returns the endpoint path, relative to the driver base URL.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::NewSession { .. } => "session".to_string(),
            Self::DeleteSession { session_id } => format!("session/{}", segment(session_id.as_str())),
            Self::NavigateTo { session_id, .. } => {
                format!("session/{}/url", segment(session_id.as_str()))
            }
            Self::FindElement { session_id, .. } => {
                format!("session/{}/element", segment(session_id.as_str()))
            }
            Self::GetElementProperty {
                session_id,
                element_id,
                name,
            } => format!(
                "session/{}/element/{}/property/{}",
                segment(session_id.as_str()),
                segment(element_id.as_str()),
                segment(name)
            ),
        }
    }

    /// Returns the JSON body, if the command carries one.
    #[must_use]
    pub fn body(&self) -> Option<Value> {
        match self {
            Self::NewSession { capabilities } => Some(json!({
                "capabilities": { "alwaysMatch": capabilities }
            })),
            Self::NavigateTo { url, .. } => Some(json!({ "url": url })),
            Self::FindElement { locator, .. } => serde_json::to_value(locator).ok(),
            Self::DeleteSession { .. } | Self::GetElementProperty { .. } => None,
        }
    }

    /// Returns the W3C command name, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewSession { .. } => "New Session",
            Self::DeleteSession { .. } => "Delete Session",
            Self::NavigateTo { .. } => "Navigate To",
            Self::FindElement { .. } => "Find Element",
            Self::GetElementProperty { .. } => "Get Element Property",
        }
    }
}

// ============================================================================
// Private Helpers
// ============================================================================

/// Percent-encodes a single path segment.
fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionId {
        SessionId::new("abc")
    }

    #[test]
    fn test_locator_serialization() {
        let value = serde_json::to_value(Locator::TagName("body".into())).unwrap();
        assert_eq!(value, json!({"using": "tag name", "value": "body"}));

        let value = serde_json::to_value(Locator::Css("#main".into())).unwrap();
        assert_eq!(value, json!({"using": "css selector", "value": "#main"}));
    }

    #[test]
    fn test_new_session_wraps_always_match() {
        let mut caps = Map::new();
        caps.insert("browserName".into(), json!("firefox"));
        let command = Command::NewSession { capabilities: caps };

        assert_eq!(command.method(), Method::POST);
        assert_eq!(command.path(), "session");
        assert_eq!(
            command.body().unwrap(),
            json!({"capabilities": {"alwaysMatch": {"browserName": "firefox"}}})
        );
    }

    #[test]
    fn test_navigate_to() {
        let command = Command::NavigateTo {
            session_id: session(),
            url: "http://example.com".into(),
        };
        assert_eq!(command.method(), Method::POST);
        assert_eq!(command.path(), "session/abc/url");
        assert_eq!(command.body().unwrap(), json!({"url": "http://example.com"}));
    }

    #[test]
    fn test_delete_session_has_no_body() {
        let command = Command::DeleteSession {
            session_id: session(),
        };
        assert_eq!(command.method(), Method::DELETE);
        assert_eq!(command.path(), "session/abc");
        assert!(command.body().is_none());
    }

    #[test]
    fn test_get_element_property_path() {
        let command = Command::GetElementProperty {
            session_id: session(),
            element_id: ElementId::new("e1"),
            name: "innerHTML".into(),
        };
        assert_eq!(command.method(), Method::GET);
        assert_eq!(command.path(), "session/abc/element/e1/property/innerHTML");
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let command = Command::DeleteSession {
            session_id: SessionId::new("a/b c"),
        };
        assert_eq!(command.path(), "session/a%2Fb%20c");
    }
}
