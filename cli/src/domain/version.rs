//! Version token extraction.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::component::Component;

/// `Version: X.Y[.Z]`, case-insensitive, anywhere in the text.
pub static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Constant pattern; cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"(?i)Version:\s*([0-9]+\.[0-9]+\.?[0-9]*)").expect("valid regex")
});

/// Extract the first version token from `text`.
#[must_use]
pub fn parse_version(text: &str) -> Option<String> {
    VERSION_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_string())
}

/// Read the component's main file and extract its version.
///
/// A missing or unreadable file yields `None`, same as a file without a
/// version line; callers treat both as "unknown".
#[must_use]
pub fn parse_local_version(component: &Component) -> Option<String> {
    let bytes = std::fs::read(&component.main_file).ok()?;
    parse_version(&String::from_utf8_lossy(&bytes))
}
