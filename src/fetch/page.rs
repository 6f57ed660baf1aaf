//! Page metadata exchanged with the crawler's page store.

// ============================================================================
// Imports
// ============================================================================

use super::metadata::Headers;

// ============================================================================
// PageField
// ============================================================================

/// Page fields a protocol reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageField {
    /// Last fetch time of the stored copy.
    ModifiedTime,
    /// Stored response headers.
    Headers,
}

// ============================================================================
// PageMetadata
// ============================================================================

/// The stored record of a page, as seen by a fetch.
pub trait PageMetadata: Send {
    /// Modification time of the stored copy, ms since the Unix epoch.
    ///
    /// Zero or negative when the page was never fetched.
    fn modified_time(&self) -> i64;

    /// Stored response headers.
    fn headers_mut(&mut self) -> &mut Headers;
}

// ============================================================================
// WebPage
// ============================================================================

/// In-memory page record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebPage {
    /// Modification time, ms since the Unix epoch.
    pub modified_time: i64,
    /// Stored response headers.
    pub headers: Headers,
}

impl WebPage {
    /// Creates a never-fetched page.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a page last modified at `millis`.
    #[inline]
    #[must_use]
    pub fn modified_at(millis: i64) -> Self {
        Self {
            modified_time: millis,
            headers: Headers::new(),
        }
    }
}

impl PageMetadata for WebPage {
    fn modified_time(&self) -> i64 {
        self.modified_time
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }
}
