//! Header and status channel.
//!
//! Issues one plain GET through the shared [`ConnectionPool`] and keeps only
//! the status code and response headers. The body is never read.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use reqwest::header::{CONTENT_LENGTH, IF_MODIFIED_SINCE, LOCATION};
use tracing::{debug, trace};

use super::metadata::Headers;
use crate::error::Result;
use crate::transport::ConnectionPool;

// ============================================================================
// Constants
// ============================================================================

/// RFC 1123 date format used for `If-Modified-Since`.
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

// ============================================================================
// HeaderFetcher
// ============================================================================

/// Fetches the status code and headers of a URL.
#[derive(Debug, Clone)]
pub struct HeaderFetcher {
    pool: Arc<ConnectionPool>,
}

impl HeaderFetcher {
    /// Creates a fetcher on a shared pool.
    #[inline]
    #[must_use]
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Returns the pool.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Fetches status and headers of `url`.
    ///
    /// Redirects are not followed: a 3xx status and its `Location` header
    /// are returned as-is. When `last_modified` is positive an
    /// `If-Modified-Since` header is sent. Credentials embedded in the URL
    /// are sent as basic auth.
    ///
    /// The connection slot is released on every path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionTimeout`](crate::Error::ConnectionTimeout)
    /// if no connection frees up, or [`Error::Http`](crate::Error::Http) on
    /// connect, timeout or protocol failures.
    pub async fn fetch_headers(
        &self,
        url: &str,
        last_modified: i64,
        timeout: Duration,
    ) -> Result<(u16, Headers)> {
        let lease = self.pool.acquire().await?;

        let mut request = lease.get(url).timeout(timeout);
        if let Some(date) = if_modified_since(last_modified) {
            debug!(url, if_modified_since = %date, "Conditional header request");
            request = request.header(IF_MODIFIED_SINCE, date);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = Headers::from_header_map(response.headers());

        trace!(
            url,
            status,
            content_length = headers.get(CONTENT_LENGTH.as_str()).unwrap_or("-"),
            location = headers.get(LOCATION.as_str()).unwrap_or("-"),
            "Fetched headers"
        );

        Ok((status, headers))
    }
}

// ============================================================================
// Dates
// ============================================================================

/// Formats milliseconds since the Unix epoch as an HTTP date.
///
/// Returns `None` when the instant is out of range.
///
/// ```
/// use webdriver_fetch::fetch::http_date;
///
/// assert_eq!(
///     http_date(1_700_000_000_000).as_deref(),
///     Some("Tue, 14 Nov 2023 22:13:20 GMT"),
/// );
/// ```
#[must_use]
pub fn http_date(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(|at| at.format(HTTP_DATE_FORMAT).to_string())
}

/// Returns the `If-Modified-Since` value for a stored modification time.
///
/// `None` for a page that was never fetched (`last_modified <= 0`).
#[must_use]
pub fn if_modified_since(last_modified: i64) -> Option<String> {
    if last_modified > 0 {
        http_date(last_modified)
    } else {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================
