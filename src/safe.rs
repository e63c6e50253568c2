//! Safe-marked strings and HTML escaping.
//!
//! A [`SafeString`] asserts "already escaped / intentionally raw": the
//! escaping step passes it through verbatim. Everything else is escaped per
//! the standard rules (`&`, `<`, `>`, `"`, `'`).

use crate::value::Value;

/// A string exempted from HTML escaping.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct SafeString(String);

impl SafeString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for SafeString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SafeString> for String {
    fn from(s: SafeString) -> String {
        s.0
    }
}

/// Mark a string as pre-escaped.
pub fn mark_safe(s: impl Into<String>) -> SafeString {
    SafeString::new(s)
}

/// HTML-escape a string.
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Escape a value unless it is safe-marked.
///
/// Safe-marked values are emitted verbatim; everything else is converted to
/// its display string and escaped.
pub fn conditional_escape(value: &Value) -> String {
    match value {
        Value::Safe(s) => s.as_str().to_string(),
        other => escape(&other.to_display_string()),
    }
}
