//! Firefox preferences as stored in a profile's `user.js`.
//!
//! Each preference is one JavaScript call:
//!
//! ```javascript
//! user_pref("network.proxy.type", 1);
//! ```
//!
//! Lines are written when a profile is materialized and parsed back when a
//! serialized profile is decoded, so later overrides (e.g. proxy settings)
//! replace earlier values instead of being appended twice.
//!
//! # Example
//!
//! ```
//! use webdriver_fetch::driver::profile::{FirefoxPreference, PreferenceValue};
//!
//! let pref = FirefoxPreference::new("network.proxy.http_port", 3128);
//! let line = pref.to_user_pref_line();
//!
//! let parsed = FirefoxPreference::parse_user_pref_line(&line).unwrap();
//! assert_eq!(parsed.value, PreferenceValue::Int(3128));
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

// ============================================================================
// PreferenceValue
// ============================================================================

/// A preference value: boolean, integer or string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PreferenceValue {
    /// Boolean value.
    Bool(bool),

    /// Integer value.
    Int(i32),

    /// String value.
    String(String),
}

// ============================================================================
// PreferenceValue - Methods
// ============================================================================

impl PreferenceValue {
    /// Formats the value as a `user.js` literal.
    #[must_use]
    pub fn to_js_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::String(s) => format!("\"{}\"", escape_js_string(s)),
        }
    }

    /// Parses a `user.js` literal.
    ///
    /// Returns `None` for anything that is not a boolean, a 32-bit integer or
    /// a double-quoted string.
    #[must_use]
    pub fn from_js_literal(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw {
            "true" => return Some(Self::Bool(true)),
            "false" => return Some(Self::Bool(false)),
            _ => {}
        }

        if let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
            return Some(Self::String(unescape_js_string(inner)));
        }

        raw.parse::<i32>().ok().map(Self::Int)
    }

    /// Converts the value to JSON, as used in `moz:firefoxOptions.prefs`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::String(s) => Value::String(s.clone()),
        }
    }
}

// ============================================================================
// PreferenceValue - Trait Implementations
// ============================================================================

impl From<bool> for PreferenceValue {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for PreferenceValue {
    #[inline]
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<String> for PreferenceValue {
    #[inline]
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for PreferenceValue {
    #[inline]
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

// ============================================================================
// FirefoxPreference
// ============================================================================

/// A named Firefox preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirefoxPreference {
    /// Preference name (e.g. `network.proxy.http`).
    pub key: String,

    /// Preference value.
    pub value: PreferenceValue,

    /// Optional comment written above the line.
    pub comment: Option<String>,
}

// ============================================================================
// FirefoxPreference - Implementation
// ============================================================================

impl FirefoxPreference {
    /// Creates a new preference.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<PreferenceValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            comment: None,
        }
    }

    /// Adds a comment, written as `// comment` above the preference line.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Generates the `user_pref("key", value);` line.
    #[must_use]
    pub fn to_user_pref_line(&self) -> String {
        let mut output = String::new();

        if let Some(comment) = &self.comment {
            output.push_str("// ");
            output.push_str(comment);
            output.push('\n');
        }

        output.push_str(&format!(
            "user_pref(\"{}\", {});",
            escape_js_string(&self.key),
            self.value.to_js_string()
        ));

        output
    }

    /// Parses one `user_pref(...)` or `pref(...)` line.
    ///
    /// Comments, blank lines and malformed calls yield `None`.
    #[must_use]
    pub fn parse_user_pref_line(line: &str) -> Option<Self> {
        let line = line.trim();
        let args = line
            .strip_prefix("user_pref(")
            .or_else(|| line.strip_prefix("pref("))?;
        let args = args.trim_end().strip_suffix(';')?.trim_end().strip_suffix(')')?;

        let rest = args.trim_start().strip_prefix('"')?;
        let key_end = closing_quote(rest)?;
        let key = unescape_js_string(&rest[..key_end]);

        let value = rest[key_end + 1..].trim_start().strip_prefix(',')?;
        let value = PreferenceValue::from_js_literal(value)?;

        Some(Self {
            key,
            value,
            comment: None,
        })
    }
}

// ============================================================================
// Private Helpers
// ============================================================================

/// Escapes special characters for JavaScript strings.
fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Reverses [`escape_js_string`].
fn unescape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

/// Byte index of the first unescaped `"` in `s`.
fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================
