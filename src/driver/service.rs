//! Driver service supervisor.
//!
//! Tracks the logical availability of an externally launched geckodriver.
//! The supervisor never spawns or kills the driver process: `start` waits for
//! the driver's port to accept connections and `stop` only clears the running
//! flag.
//!
//! # Lifecycle
//!
//! | Call | Effect |
//! |------|--------|
//! | [`DriverService::start`] | Polls the port until reachable, then marks running |
//! | [`DriverService::is_running`] | Reads the flag |
//! | [`DriverService::stop`] | Clears the flag |
//!
//! All three take the same lock, and `start` holds it across the whole
//! port wait. A reader therefore never sees `running == true` before the port
//! was observed reachable.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};

use super::builder::ServiceBuilder;

// ============================================================================
// Constants
// ============================================================================

/// Executable name searched for on `PATH`.
pub const GECKO_DRIVER_EXE: &str = "geckodriver";

/// Property naming an explicit driver executable.
pub const GECKO_DRIVER_EXE_PROPERTY: &str = "webdriver.gecko.driver";

/// Environment variable naming an explicit driver executable.
pub const GECKO_DRIVER_EXE_ENV: &str = "WEBDRIVER_GECKO_DRIVER";

/// Where geckodriver is documented.
pub const GECKO_DRIVER_DOCS_URL: &str = "https://github.com/mozilla/geckodriver";

/// Where geckodriver releases are published.
pub const GECKO_DRIVER_DOWNLOAD_URL: &str = "https://github.com/mozilla/geckodriver/releases";

/// Default time to wait for the driver port.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(20);

/// Delay between port probes.
const PORT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for a single connect attempt.
const PORT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

// ============================================================================
// DriverService
// ============================================================================

/// Lifecycle of a driver service addressed over HTTP.
#[async_trait]
pub trait DriverService: Send + Sync + fmt::Debug {
    /// Base URL of the driver's WebDriver endpoint.
    fn url(&self) -> &Url;

    /// Returns the running flag.
    async fn is_running(&self) -> bool;

    /// Waits for the driver to become reachable and marks it running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PortUnreachable`] if the port never accepts a
    /// connection within the start timeout.
    async fn start(&self) -> Result<()>;

    /// Marks the driver as no longer running.
    async fn stop(&self);
}

// ============================================================================
// GeckoDriverService
// ============================================================================

/// Supervisor for a geckodriver listening on a local port.
pub struct GeckoDriverService {
    /// Resolved driver executable.
    executable: PathBuf,

    /// Host the driver listens on.
    host: String,

    /// Port the driver listens on.
    port: u16,

    /// `http://{host}:{port}/`.
    url: Url,

    /// Arguments for whoever launches the driver.
    args: Vec<String>,

    /// Environment for whoever launches the driver.
    environment: FxHashMap<String, String>,

    /// Bound on the port wait in [`DriverService::start`].
    start_timeout: Duration,

    /// Running flag; held across the whole port wait.
    running: Mutex<bool>,
}

impl fmt::Debug for GeckoDriverService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeckoDriverService")
            .field("executable", &self.executable)
            .field("url", &self.url.as_str())
            .field("start_timeout", &self.start_timeout)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// GeckoDriverService - Constructors
// ============================================================================

impl GeckoDriverService {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::new()
    }

    /// Creates a supervisor for `port` on localhost using the default
    /// executable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExecutableNotFound`] if no geckodriver is found.
    pub fn for_port(port: u16) -> Result<Self> {
        Self::builder().port(port).build()
    }

    pub(crate) fn new(
        executable: PathBuf,
        host: String,
        port: u16,
        args: Vec<String>,
        environment: FxHashMap<String, String>,
        start_timeout: Duration,
    ) -> Result<Self> {
        let url = Url::parse(&format!("http://{host}:{port}/"))
            .map_err(|e| Error::config(format!("Invalid driver address {host}:{port}: {e}")))?;

        debug!(
            executable = %executable.display(),
            url = %url,
            "Created driver service supervisor"
        );

        Ok(Self {
            executable,
            host,
            port,
            url,
            args,
            environment,
            start_timeout,
            running: Mutex::new(false),
        })
    }
}

// ============================================================================
// GeckoDriverService - Accessors
// ============================================================================

impl GeckoDriverService {
    /// Returns the resolved driver executable.
    #[inline]
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Returns the listening port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the listening host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the driver arguments.
    #[inline]
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the driver environment.
    #[inline]
    #[must_use]
    pub fn environment(&self) -> &FxHashMap<String, String> {
        &self.environment
    }

    /// Returns the port wait bound.
    #[inline]
    #[must_use]
    pub fn start_timeout(&self) -> Duration {
        self.start_timeout
    }
}

// ============================================================================
// GeckoDriverService - DriverService
// ============================================================================

#[async_trait]
impl DriverService for GeckoDriverService {
    fn url(&self) -> &Url {
        &self.url
    }

    async fn is_running(&self) -> bool {
        *self.running.lock().await
    }

    async fn start(&self) -> Result<()> {
        let mut running = self.running.lock().await;

        wait_for_port(&self.host, self.port, self.start_timeout).await?;
        *running = true;

        info!(url = %self.url, "Driver service running");
        Ok(())
    }

    async fn stop(&self) {
        let mut running = self.running.lock().await;
        if *running {
            info!(url = %self.url, "Driver service stopped");
        }
        *running = false;
    }
}

// ============================================================================
// Port Probing
// ============================================================================

/// Polls `host:port` until a TCP connection succeeds or `limit` elapses.
///
/// # Errors
///
/// Returns [`Error::PortUnreachable`] on timeout.
pub async fn wait_for_port(host: &str, port: u16, limit: Duration) -> Result<()> {
    let deadline = Instant::now() + limit;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        let probe = remaining.min(PORT_PROBE_TIMEOUT);

        match timeout(probe, TcpStream::connect((host, port))).await {
            Ok(Ok(_)) => {
                debug!(host, port, attempts, "Driver port reachable");
                return Ok(());
            }
            Ok(Err(e)) => debug!(host, port, error = %e, "Driver port not reachable yet"),
            Err(_) => debug!(host, port, "Driver port probe timed out"),
        }

        if Instant::now() + PORT_POLL_INTERVAL >= deadline {
            warn!(host, port, attempts, "Driver port never became reachable");
            return Err(Error::port_unreachable(port, limit.as_millis() as u64));
        }
        sleep(PORT_POLL_INTERVAL).await;
    }
}

// ============================================================================
// Executable Resolution
// ============================================================================

/// Resolves the geckodriver executable.
///
/// Order: `explicit` (the `webdriver.gecko.driver` setting), then the
/// `WEBDRIVER_GECKO_DRIVER` environment variable, then `geckodriver` on
/// `PATH`.
///
/// # Errors
///
/// Returns [`Error::ExecutableNotFound`] if none of them names an existing
/// file.
pub fn find_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    let not_found = || {
        Error::executable_not_found(
            GECKO_DRIVER_EXE,
            GECKO_DRIVER_EXE_PROPERTY,
            format!("{GECKO_DRIVER_DOCS_URL} ({GECKO_DRIVER_DOWNLOAD_URL})"),
        )
    };

    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            warn!(path = %path.display(), "Configured driver executable does not exist");
            Err(not_found())
        };
    }

    if let Some(value) = std::env::var_os(GECKO_DRIVER_EXE_ENV)
        && !value.is_empty()
    {
        let path = PathBuf::from(value);
        return if path.is_file() {
            Ok(path)
        } else {
            warn!(path = %path.display(), env = GECKO_DRIVER_EXE_ENV, "Driver executable does not exist");
            Err(not_found())
        };
    }

    which::which(GECKO_DRIVER_EXE).map_err(|e| {
        debug!(error = %e, "geckodriver not on PATH");
        not_found()
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use tempfile::NamedTempFile;
    use tokio::net::TcpListener;

    fn service(port: u16, start_timeout: Duration) -> GeckoDriverService {
        let exe = NamedTempFile::new().unwrap();
        GeckoDriverService::new(
            exe.path().to_path_buf(),
            "127.0.0.1".into(),
            port,
            Vec::new(),
            FxHashMap::default(),
            start_timeout,
        )
        .unwrap()
    }

    /// Returns a port nobody listens on.
    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_start_succeeds_when_port_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let service = service(port, Duration::from_secs(2));

        assert!(!service.is_running().await);
        service.start().await.unwrap();
        assert!(service.is_running().await);

        service.stop().await;
        assert!(!service.is_running().await);
    }

    #[tokio::test]
    async fn test_start_fails_when_port_closed() {
        let port = closed_port().await;
        let service = service(port, Duration::from_millis(300));

        let err = service.start().await.unwrap_err();
        assert!(matches!(err, Error::PortUnreachable { port: p, .. } if p == port));
        assert!(!service.is_running().await);
    }

    #[tokio::test]
    async fn test_start_waits_for_late_listener() {
        let port = closed_port().await;
        let service = service(port, Duration::from_secs(5));

        let binder = tokio::spawn(async move {
            sleep(Duration::from_millis(300)).await;
            let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
            sleep(Duration::from_secs(2)).await;
            drop(listener);
        });

        service.start().await.unwrap();
        assert!(service.is_running().await);
        binder.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_start_and_is_running() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let service = Arc::new(service(port, Duration::from_secs(2)));

        let mut handles = Vec::new();
        for i in 0..16 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    service.start().await.map(|_| true)
                } else {
                    Ok(service.is_running().await)
                }
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert!(service.is_running().await);
    }

    #[test]
    fn test_url_format() {
        let service = service(4444, DEFAULT_START_TIMEOUT);
        assert_eq!(service.url().as_str(), "http://127.0.0.1:4444/");
        assert_eq!(service.port(), 4444);
    }

    #[test]
    fn test_find_executable_explicit() {
        let exe = NamedTempFile::new().unwrap();
        assert_eq!(find_executable(Some(exe.path())).unwrap(), exe.path());
    }

    #[test]
    fn test_find_executable_missing_explicit() {
        let err = find_executable(Some(Path::new("/nonexistent/geckodriver"))).unwrap_err();
        assert!(matches!(err, Error::ExecutableNotFound { .. }));
        assert!(err.to_string().contains(GECKO_DRIVER_EXE_PROPERTY));
        assert!(err.is_configuration_error());
    }
}
