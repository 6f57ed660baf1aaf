//! W3C WebDriver protocol message types.
//!
//! This module defines the messages exchanged between this crate (local end)
//! and the driver service (remote end) over HTTP.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | [`Command`] | Local → Remote | HTTP method, endpoint path and JSON body |
//! | [`Response`] | Remote → Local | `{"value": ...}` envelope, success or error |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command definitions and their endpoint mapping |
//! | `request` | Response envelope and typed payload parsers |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions and endpoint mapping.
pub mod command;

/// Response envelope and payload parsers.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, Locator};
pub use request::{NewSessionValue, Response, parse_element, parse_new_session};
