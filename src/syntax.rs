//! Structural syntax checks and address normalization.
//!
//! This is the cheapest stage of the pipeline: a single anchored pattern,
//! no network access, no allocation beyond the normalized copy.

use std::sync::LazyLock;

use regex::Regex;

// local part: letters/digits . _ % + -; domain: letters/digits . -;
// final label: at least two letters.
static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("address pattern is a valid regex")
});

/// Canonical form used as the deduplication key: trimmed and lower-cased.
pub fn normalize(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Structural check on an (already normalized or raw) address string.
/// Empty input is simply invalid; this never panics.
pub fn is_syntactically_valid(address: &str) -> bool {
    ADDRESS_PATTERN.is_match(address)
}

/// Everything after the first `@`, if any.
pub fn domain_of(address: &str) -> Option<&str> {
    address.split_once('@').map(|(_, domain)| domain)
}
