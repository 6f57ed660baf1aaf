//! Browser side of the rendering channel.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`BrowserSession`] | One remote session: connect, navigate, extract, quit |
//! | [`ProxyConfig`] | Proxy shared by the browser profile and the header client |

// ============================================================================
// Submodules
// ============================================================================

/// Proxy configuration types.
pub mod proxy;

/// Remote browser session.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use proxy::ProxyConfig;
pub use session::BrowserSession;
