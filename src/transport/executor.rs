//! HTTP command executor for the driver service.
//!
//! Sends [`Command`]s to the driver's HTTP endpoint and decodes the
//! `{"value": ...}` envelope. No request timeout is applied: a hung remote
//! session blocks the calling task until the driver answers.

// ============================================================================
// Imports
// ============================================================================

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{Command, Response};

// ============================================================================
// HttpCommandExecutor
// ============================================================================

/// Executes WebDriver commands against one driver service URL.
#[derive(Debug, Clone)]
pub struct HttpCommandExecutor {
    /// HTTP client for driver traffic (not the crawl pool).
    client: Client,
    /// Driver base URL, always ending in `/`.
    base: Url,
}

impl HttpCommandExecutor {
    /// Creates an executor bound to the driver at `base`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(base: Url) -> Result<Self> {
        let client = Client::builder().no_proxy().build()?;
        Ok(Self::with_client(client, base))
    }

    /// Creates an executor reusing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: Client, mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { client, base }
    }

    /// Returns the driver base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Executes a command and returns its payload.
    ///
    /// # Errors
    ///
    /// - [`Error::Http`] if the driver cannot be reached
    /// - [`Error::WebDriver`] if the driver answers with an error object
    /// - [`Error::Protocol`] if the reply is not a WebDriver envelope
    pub async fn execute(&self, command: Command) -> Result<Value> {
        let endpoint = self
            .base
            .join(&command.path())
            .map_err(|e| Error::protocol(format!("Invalid endpoint for {}: {e}", command.name())))?;

        debug!(command = command.name(), endpoint = %endpoint, "Executing WebDriver command");

        let mut request = self.client.request(command.method(), endpoint);
        if let Some(body) = command.body() {
            request = request.json(&body);
        }

        let reply = request.send().await?;
        let status = reply.status();
        let text = reply.text().await?;
        trace!(command = command.name(), %status, body = %text, "WebDriver reply");

        let response: Response = serde_json::from_str(&text).map_err(|e| {
            Error::protocol(format!(
                "{} returned {status} with a non-WebDriver body: {e}",
                command.name()
            ))
        })?;

        if !status.is_success() && !response.is_error() {
            return Err(Error::webdriver(
                "unknown error",
                format!("{} returned {status}", command.name()),
            ));
        }

        response.into_result()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let executor =
            HttpCommandExecutor::new(Url::parse("http://127.0.0.1:4444/wd/hub").unwrap()).unwrap();
        assert_eq!(executor.base_url().as_str(), "http://127.0.0.1:4444/wd/hub/");

        let joined = executor.base_url().join("session").unwrap();
        assert_eq!(joined.as_str(), "http://127.0.0.1:4444/wd/hub/session");
    }

    #[test]
    fn test_root_base_url_unchanged() {
        let executor =
            HttpCommandExecutor::new(Url::parse("http://127.0.0.1:4444").unwrap()).unwrap();
        assert_eq!(executor.base_url().as_str(), "http://127.0.0.1:4444/");
    }
}
