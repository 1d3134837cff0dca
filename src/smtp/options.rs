use std::borrow::Cow;
use std::time::Duration;

/// Configuration knobs for [`probe_mailbox`](super::probe_mailbox).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpProbeOptions {
    /// Identity announced in `EHLO`. Defaults to the target's domain.
    pub helo_domain: Option<String>,
    /// Envelope sender for `MAIL FROM`. Defaults to `postmaster@<domain>`.
    pub mail_from: Option<String>,
    /// SMTP port; only tests should change this.
    pub port: u16,
    /// Bound on connect and on every command/reply exchange.
    pub timeout: Duration,
}

impl Default for SmtpProbeOptions {
    fn default() -> Self {
        Self {
            helo_domain: None,
            mail_from: None,
            port: 25,
            timeout: Duration::from_secs(10),
        }
    }
}

impl SmtpProbeOptions {
    pub fn helo_name<'a>(&'a self, fallback: &'a str) -> Cow<'a, str> {
        self.helo_domain
            .as_deref()
            .filter(|value| !value.is_empty())
            .map(Cow::Borrowed)
            .unwrap_or(Cow::Borrowed(fallback))
    }

    pub fn envelope_sender(&self, domain: &str) -> String {
        self.mail_from
            .as_ref()
            .filter(|value| !value.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("postmaster@{domain}"))
    }
}
