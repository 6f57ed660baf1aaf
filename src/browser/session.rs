//! A remote browser session on a driver service.
//!
//! A session is created by [`SessionFactory`](crate::driver::SessionFactory)
//! with its capabilities already merged. It is single-use:
//!
//! 1. [`BrowserSession::connect`] starts the driver service if needed and
//!    opens the remote session
//! 2. [`BrowserSession::navigate`] and friends drive the page
//! 3. [`BrowserSession::quit`] consumes the session, deletes the remote
//!    session and stops the service
//!
//! A session dropped without `quit` schedules a best-effort delete on the
//! current runtime.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::driver::DriverService;
use crate::error::{Error, Result};
use crate::identifiers::{ElementId, SessionId};
use crate::protocol::{Command, Locator, parse_element, parse_new_session};
use crate::transport::HttpCommandExecutor;

// ============================================================================
// BrowserSession
// ============================================================================

/// One remote browser session, used for exactly one page.
pub struct BrowserSession {
    /// Driver service this session runs on.
    driver: Arc<dyn DriverService>,

    /// Command channel to the driver.
    executor: HttpCommandExecutor,

    /// Merged `alwaysMatch` capabilities.
    capabilities: Map<String, Value>,

    /// Remote session, set by `connect`.
    session_id: Option<SessionId>,
}

impl fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserSession")
            .field("driver", &self.driver.url().as_str())
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BrowserSession - Constructors
// ============================================================================

impl BrowserSession {
    /// Binds merged capabilities to a driver service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the command client cannot be built.
    pub(crate) fn new(
        driver: Arc<dyn DriverService>,
        capabilities: Map<String, Value>,
    ) -> Result<Self> {
        let executor = HttpCommandExecutor::new(driver.url().clone())?;
        Ok(Self {
            driver,
            executor,
            capabilities,
            session_id: None,
        })
    }
}

// ============================================================================
// BrowserSession - Accessors
// ============================================================================

impl BrowserSession {
    /// Returns the capabilities sent with `New Session`.
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &Map<String, Value> {
        &self.capabilities
    }

    /// Returns the remote session ID once connected.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Returns the driver service.
    #[inline]
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn DriverService> {
        &self.driver
    }

    fn require_session(&self) -> Result<&SessionId> {
        self.session_id.as_ref().ok_or(Error::SessionNotStarted)
    }
}

// ============================================================================
// BrowserSession - Commands
// ============================================================================

impl BrowserSession {
    /// Opens the remote session, starting the driver service if needed.
    ///
    /// # Errors
    ///
    /// - [`Error::PortUnreachable`] if the driver service does not come up
    /// - [`Error::WebDriver`] if the driver refuses the capabilities
    pub async fn connect(&mut self) -> Result<&SessionId> {
        if self.session_id.is_some() {
            return self.require_session();
        }

        if !self.driver.is_running().await {
            self.driver.start().await?;
        }

        let value = self
            .executor
            .execute(Command::NewSession {
                capabilities: self.capabilities.clone(),
            })
            .await?;
        let created = parse_new_session(value)?;

        info!(session_id = %created.session_id, "Browser session created");
        Ok(self.session_id.insert(created.session_id))
    }

    /// Navigates to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotStarted`] before `connect`, or the driver's
    /// error.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let session_id = self.require_session()?.clone();
        debug!(session_id = %session_id, url, "Navigating");

        self.executor
            .execute(Command::NavigateTo {
                session_id,
                url: url.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Finds the first element matching `locator`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebDriver`] (`no such element`) if nothing matches.
    pub async fn find_element(&self, locator: Locator) -> Result<ElementId> {
        let session_id = self.require_session()?.clone();
        let value = self
            .executor
            .execute(Command::FindElement {
                session_id,
                locator,
            })
            .await?;
        parse_element(&value)
    }

    /// Reads a DOM property of an element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotStarted`] before `connect`, or the driver's
    /// error.
    pub async fn property(&self, element: &ElementId, name: &str) -> Result<Value> {
        let session_id = self.require_session()?.clone();
        self.executor
            .execute(Command::GetElementProperty {
                session_id,
                element_id: element.clone(),
                name: name.to_string(),
            })
            .await
    }

    /// Returns the `innerHTML` of the document `body`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the property is not a string.
    pub async fn body_inner_html(&self) -> Result<String> {
        let body = self.find_element(Locator::TagName("body".into())).await?;
        match self.property(&body, "innerHTML").await? {
            Value::String(html) => Ok(html),
            Value::Null => Ok(String::new()),
            other => Err(Error::protocol(format!(
                "innerHTML is not a string: {other}"
            ))),
        }
    }

    /// Ends the session and stops the driver service.
    ///
    /// The service is stopped even when deleting the remote session fails.
    ///
    /// # Errors
    ///
    /// Returns the `Delete Session` failure, if any.
    pub async fn quit(mut self) -> Result<()> {
        let result = match self.session_id.take() {
            Some(session_id) => {
                let outcome = self
                    .executor
                    .execute(Command::DeleteSession {
                        session_id: session_id.clone(),
                    })
                    .await
                    .map(|_| ());
                match &outcome {
                    Ok(()) => info!(session_id = %session_id, "Browser session terminated"),
                    Err(e) => warn!(session_id = %session_id, error = %e, "Delete Session failed"),
                }
                outcome
            }
            None => Ok(()),
        };

        self.driver.stop().await;
        result
    }
}

// ============================================================================
// Drop
// ============================================================================

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let Some(session_id) = self.session_id.take() else {
            return;
        };

        warn!(session_id = %session_id, "Browser session dropped without quit");

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let executor = self.executor.clone();
            let driver = Arc::clone(&self.driver);
            handle.spawn(async move {
                if let Err(e) = executor.execute(Command::DeleteSession { session_id }).await {
                    debug!(error = %e, "Deferred Delete Session failed");
                }
                driver.stop().await;
            });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tempfile::NamedTempFile;

    use crate::driver::GeckoDriverService;

    fn session() -> BrowserSession {
        let exe = NamedTempFile::new().unwrap();
        let driver = GeckoDriverService::builder()
            .executable(exe.path())
            .port(4444)
            .start_timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        BrowserSession::new(Arc::new(driver), Map::new()).unwrap()
    }

    #[tokio::test]
    async fn test_commands_require_connect() {
        let session = session();
        assert!(session.session_id().is_none());
        assert!(matches!(
            session.navigate("http://example.com").await,
            Err(Error::SessionNotStarted)
        ));
        assert!(matches!(
            session.body_inner_html().await,
            Err(Error::SessionNotStarted)
        ));
    }

    #[tokio::test]
    async fn test_quit_without_connect_is_ok() {
        let session = session();
        let driver = Arc::clone(session.driver());
        session.quit().await.unwrap();
        assert!(!driver.is_running().await);
    }

    #[test]
    fn test_debug_hides_capabilities() {
        let output = format!("{:?}", session());
        assert!(output.contains("BrowserSession"));
        assert!(output.contains("127.0.0.1:4444"));
    }
}
