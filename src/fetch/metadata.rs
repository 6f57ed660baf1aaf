//! Response header metadata.
//!
//! [`Headers`] is a case-insensitive name → value map. Well-known header
//! names are stored in their canonical spelling (`content-type` becomes
//! `Content-Type`) so stored page metadata does not depend on how a server
//! happened to spell them. A later value for the same name replaces the
//! earlier one.

// ============================================================================
// Imports
// ============================================================================

use reqwest::header::HeaderMap;
use rustc_hash::FxHashMap;

// ============================================================================
// Constants
// ============================================================================

/// Canonical spellings of well-known response headers.
const CANONICAL_NAMES: &[&str] = &[
    "Accept-Ranges",
    "Age",
    "Cache-Control",
    "Connection",
    "Content-Disposition",
    "Content-Encoding",
    "Content-Language",
    "Content-Length",
    "Content-Location",
    "Content-MD5",
    "Content-Type",
    "Date",
    "ETag",
    "Expires",
    "Last-Modified",
    "Link",
    "Location",
    "Pragma",
    "Refresh",
    "Retry-After",
    "Server",
    "Set-Cookie",
    "Transfer-Encoding",
    "Vary",
    "WWW-Authenticate",
    "X-Robots-Tag",
];

// ============================================================================
// Headers
// ============================================================================

/// Case-insensitive header map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    /// Lowercased name → (stored name, value).
    entries: FxHashMap<String, (String, String)>,
}

impl Headers {
    /// Creates an empty map.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies a response header map, decoding non-UTF-8 values lossily.
    #[must_use]
    pub fn from_header_map(map: &HeaderMap) -> Self {
        map.iter()
            .map(|(name, value)| {
                let value = match value.to_str() {
                    Ok(v) => v.to_string(),
                    Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
                };
                (name.as_str().to_string(), value)
            })
            .collect()
    }

    /// Sets a header, replacing any value under the same name.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref();
        self.entries
            .insert(name.to_ascii_lowercase(), (canonical_name(name), value.into()));
    }

    /// Returns the value of a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    /// Returns `true` if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Removes a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries
            .remove(&name.to_ascii_lowercase())
            .map(|(_, value)| value)
    }

    /// Removes every header.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of headers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no headers.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(name, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the pairs sorted by name.
    #[must_use]
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<_> = self.iter().collect();
        pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));
        pairs
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

impl<K: AsRef<str>, V: Into<String>> Extend<(K, V)> for Headers {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

// ============================================================================
// Private Helpers
// ============================================================================

/// Returns the canonical spelling of a well-known name, else `name` unchanged.
fn canonical_name(name: &str) -> String {
    CANONICAL_NAMES
        .iter()
        .find(|known| known.eq_ignore_ascii_case(name))
        .map_or_else(|| name.to_string(), |known| (*known).to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use reqwest::header::{CONTENT_TYPE, HeaderValue, LOCATION};

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("content-type", "text/html");

        assert_eq!(headers.get("Content-Type"), Some("text/html"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/html"));
        assert!(headers.contains("content-TYPE"));
    }

    #[test]
    fn test_well_known_names_are_canonicalized() {
        let headers: Headers = [("etag", "\"x\""), ("x-custom", "1"), ("LAST-MODIFIED", "y")]
            .into_iter()
            .collect();

        let names: Vec<_> = headers.sorted().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["ETag", "Last-Modified", "x-custom"]);
    }

    #[test]
    fn test_later_value_replaces() {
        let mut headers = Headers::new();
        headers.insert("Set-Cookie", "a=1");
        headers.insert("set-cookie", "b=2");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Set-Cookie"), Some("b=2"));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut headers: Headers = [("Server", "nginx"), ("Date", "today")].into_iter().collect();
        assert_eq!(headers.remove("server"), Some("nginx".to_string()));
        assert_eq!(headers.len(), 1);

        headers.clear();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_from_header_map() {
        let mut map = HeaderMap::new();
        map.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        map.insert(LOCATION, HeaderValue::from_static("/next"));
        map.insert("x-bytes", HeaderValue::from_bytes(b"caf\xe9").unwrap());

        let headers = Headers::from_header_map(&map);
        assert_eq!(headers.get("content-type"), Some("text/html"));
        assert_eq!(headers.get("Location"), Some("/next"));
        assert_eq!(headers.get("x-bytes"), Some("caf\u{fffd}"));
    }
}
