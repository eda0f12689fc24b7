//! Utility functions and types.

use std::fmt::Debug;

/// Redacts a secret (token, api key, temp url key) for logging.
///
/// - Values shorter than 12 characters are fully hidden.
/// - Longer values keep their first and last three characters so different
///   tokens can still be told apart in logs.
pub struct Redact<'a>(&'a str);

impl<'a> From<&'a str> for Redact<'a> {
    fn from(value: &'a str) -> Self {
        Redact(value)
    }
}

impl<'a> From<&'a String> for Redact<'a> {
    fn from(value: &'a String) -> Self {
        Redact(value.as_str())
    }
}

impl<'a> From<&'a Option<String>> for Redact<'a> {
    fn from(value: &'a Option<String>) -> Self {
        Redact(value.as_deref().unwrap_or_default())
    }
}

impl Debug for Redact<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let length = self.0.len();
        if length == 0 {
            f.write_str("EMPTY")
        } else if length < 12 || !self.0.is_char_boundary(3) || !self.0.is_char_boundary(length - 3)
        {
            f.write_str("***")
        } else {
            f.write_str(&self.0[..3])?;
            f.write_str("***")?;
            f.write_str(&self.0[length - 3..])
        }
    }
}

/// Join a base path and a relative path with exactly one `/` between them.
///
/// The result never ends with `/`, except that an empty join yields `""`.
pub fn join_path(base: &str, rel: Option<&str>) -> String {
    let base = base.trim_end_matches('/');
    let joined = match rel {
        Some(rel) if !rel.is_empty() => format!("{base}/{}", rel.trim_start_matches('/')),
        _ => base.to_string(),
    };
    joined.trim_end_matches('/').to_string()
}
