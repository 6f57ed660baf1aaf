//! HTTP transport layer.
//!
//! Two independent HTTP paths leave this crate:
//!
//! ```text
//! ┌──────────────────┐   W3C WebDriver / HTTP   ┌─────────────────┐
//! │ BrowserSession   │─────────────────────────►│ geckodriver     │
//! │  HttpCommand-    │      localhost:PORT      │  (Firefox)      │
//! │  Executor        │                          └─────────────────┘
//! └──────────────────┘
//! ┌──────────────────┐   GET, no redirects      ┌─────────────────┐
//! │ HeaderFetcher    │─────────────────────────►│ target server   │
//! │  ConnectionPool  │    (optional proxy)      │                 │
//! └──────────────────┘                          └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `executor` | Sends WebDriver commands to the driver service |
//! | `pool` | Shared, bounded client for the header channel |

// ============================================================================
// Submodules
// ============================================================================

/// WebDriver command executor.
pub mod executor;

/// Shared connection pool.
pub mod pool;

// ============================================================================
// Re-exports
// ============================================================================

pub use executor::HttpCommandExecutor;
pub use pool::{ConnectionPool, PoolParams, PooledClient};
