//! Disposable-provider domain filtering.
//!
//! The built-in set covers well-known throwaway-mail providers; integrators
//! extend it at construction time rather than patching a global.

use std::collections::HashSet;

use phf::phf_set;

static DEFAULT_DISPOSABLE_DOMAINS: phf::Set<&'static str> = phf_set! {
    "mailinator.com",
    "guerrillamail.com",
    "temp-mail.org",
    "throwaway.email",
    "10minutemail.com",
    "trashmail.com",
    "tempmail.com",
    "yopmail.com",
    "maildrop.cc",
    "mohmal.com",
    "sharklasers.com",
    "guerrillamailblock.com",
    "grr.la",
    "spam4.me",
    "emailondeck.com",
    "fakeinbox.com",
};

/// Immutable membership filter: the static default set plus any
/// integrator-supplied extensions. Matching is case-insensitive exact.
#[derive(Debug, Clone, Default)]
pub struct DisposableDomains {
    extra: HashSet<String>,
}

impl DisposableDomains {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter that also matches `domains` on top of the default set.
    pub fn with_extra<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extra: domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn is_disposable(&self, domain: &str) -> bool {
        let lower = domain.trim().to_ascii_lowercase();
        DEFAULT_DISPOSABLE_DOMAINS.contains(lower.as_str()) || self.extra.contains(&lower)
    }
}
