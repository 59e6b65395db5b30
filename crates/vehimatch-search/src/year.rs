use regex::Regex;
use std::sync::LazyLock;

// Compiled once; the pattern is a literal and always valid.
#[allow(clippy::expect_used)]
static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("year pattern is valid"));

/// Pull a model year out of raw query text.
///
/// Only standalone four-digit `19xx` or `20xx` tokens count, and only the
/// first one is used.
pub fn extract_year_filter(query: &str) -> Option<i32> {
    YEAR_PATTERN
        .captures(query)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
