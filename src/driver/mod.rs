//! Driver side of the rendering channel.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DriverService`] | Lifecycle of a driver service (start, stop, is_running) |
//! | [`GeckoDriverService`] | Supervisor for an external geckodriver |
//! | [`ServiceBuilder`] | Fluent configuration for the supervisor |
//! | [`Capabilities`] | Desired capabilities with typed profile and proxy slots |
//! | [`SessionFactory`] | Merges capabilities and binds them to a service |
//! | [`FirefoxOptions`] | The `moz:firefoxOptions` object |
//! | [`Profile`] | Firefox profile directory and its serialized form |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use webdriver_fetch::{Capabilities, GeckoDriverService, ProxyConfig, Result, SessionFactory};
//!
//! # async fn example() -> Result<()> {
//! let driver = Arc::new(GeckoDriverService::for_port(4444)?);
//! let caps = Capabilities::firefox().with_proxy(ProxyConfig::http("proxy.local", 3128));
//!
//! let mut session = SessionFactory::new().create_session(driver, caps)?;
//! session.connect().await?;
//! session.navigate("https://example.com").await?;
//! let html = session.body_inner_html().await?;
//! session.quit().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for driver service supervisors.
pub mod builder;

/// Desired capabilities.
pub mod capabilities;

/// Browser session factory.
pub mod factory;

/// The `moz:firefoxOptions` capability.
pub mod options;

/// Firefox profile management.
pub mod profile;

/// Driver service supervisor.
pub mod service;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ServiceBuilder;
pub use capabilities::{Capabilities, ProfileCapability};
pub use factory::SessionFactory;
pub use options::FirefoxOptions;
pub use profile::Profile;
pub use service::{DriverService, GeckoDriverService};
