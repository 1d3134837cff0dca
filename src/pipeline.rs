//! The per-address validation pipeline.
//!
//! Checks run in a fixed cheapest-to-most-expensive order and short-circuit
//! on the first failure: empty, duplicate, syntax, disposable domain, MX
//! lookup, then (when enabled) the live SMTP probe. Every named rejection is
//! a normal outcome, not an error — the pipeline never fails a run because
//! one row is garbage.

use std::collections::HashSet;
use std::fmt;
use std::thread;

use tracing::debug;

use crate::batch::BatchOptions;
use crate::disposable::DisposableDomains;
use crate::mx;
use crate::smtp::{self, ProbeOutcome, SmtpProbeOptions};
use crate::syntax;

/// Closed set of user-visible rejection codes.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    EmptyEmail,
    Duplicate,
    InvalidSyntax,
    DisposableEmail,
    NoMxRecord,
    SmtpRejected { code: u16, message: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail => f.write_str("Empty email"),
            Self::Duplicate => f.write_str("Duplicate"),
            Self::InvalidSyntax => f.write_str("Invalid syntax"),
            Self::DisposableEmail => f.write_str("Disposable email"),
            Self::NoMxRecord => f.write_str("No MX record"),
            Self::SmtpRejected { .. } => f.write_str("SMTP rejected"),
        }
    }
}

/// Immutable per-address verdict.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Trimmed, lower-cased form of the input; the deduplication key.
    pub normalized: String,
    /// `None` means the address passed every check.
    pub rejection: Option<RejectReason>,
    /// Set when the SMTP probe was inconclusive and the address passed
    /// through without live confirmation.
    pub indeterminate: bool,
}

impl ValidationOutcome {
    fn valid(normalized: String, indeterminate: bool) -> Self {
        Self {
            normalized,
            rejection: None,
            indeterminate,
        }
    }

    fn rejected(normalized: String, reason: RejectReason) -> Self {
        Self {
            normalized,
            rejection: Some(reason),
            indeterminate: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.rejection.is_none()
    }

    /// The Status text handed to the output collaborator:
    /// `"Valid"` or `"Invalid (<reason>)"`.
    pub fn status_label(&self) -> String {
        match &self.rejection {
            None => "Valid".to_string(),
            Some(reason) => format!("Invalid ({reason})"),
        }
    }
}

/// Batch-scoped set of already-accepted normalized addresses.
#[derive(Debug, Default)]
pub struct DedupTracker {
    seen: HashSet<String>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, normalized: &str) -> bool {
        self.seen.contains(normalized)
    }

    pub fn record(&mut self, normalized: impl Into<String>) {
        self.seen.insert(normalized.into());
    }
}

/// Seam over the DNS layer so tests can pin routes without a resolver.
pub trait RouteCheck {
    fn has_route(&self, domain: &str) -> bool;
}

/// Seam over the SMTP layer so tests can script probe outcomes.
pub trait RcptProbe {
    fn probe(&self, address: &str, options: &SmtpProbeOptions) -> ProbeOutcome;
}

/// Production route check backed by [`mx::has_mail_exchange`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsRouteCheck;

impl RouteCheck for DnsRouteCheck {
    fn has_route(&self, domain: &str) -> bool {
        mx::has_mail_exchange(domain)
    }
}

/// Production probe backed by [`smtp::probe_mailbox`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpRcptProbe;

impl RcptProbe for SmtpRcptProbe {
    fn probe(&self, address: &str, options: &SmtpProbeOptions) -> ProbeOutcome {
        smtp::probe_mailbox(address, options)
    }
}

/// Composes the individual checks into one ordered decision function.
#[derive(Debug)]
pub struct Pipeline<R = DnsRouteCheck, P = SmtpRcptProbe> {
    disposable: DisposableDomains,
    route: R,
    probe: P,
}

impl Pipeline {
    pub fn new(disposable: DisposableDomains) -> Self {
        Self {
            disposable,
            route: DnsRouteCheck,
            probe: SmtpRcptProbe,
        }
    }
}

impl<R: RouteCheck, P: RcptProbe> Pipeline<R, P> {
    pub fn with_checkers(disposable: DisposableDomains, route: R, probe: P) -> Self {
        Self {
            disposable,
            route,
            probe,
        }
    }

    /// Evaluate one raw address against the batch's dedup state.
    ///
    /// `dedup` is read-only here: the orchestrator records accepted
    /// addresses after the fact, which is what makes the duplicate law hold
    /// (a later duplicate of an *invalid* row is evaluated independently).
    pub fn evaluate(
        &self,
        raw: &str,
        dedup: &DedupTracker,
        options: &BatchOptions,
    ) -> ValidationOutcome {
        let normalized = syntax::normalize(raw);

        if normalized.is_empty() {
            return ValidationOutcome::rejected(normalized, RejectReason::EmptyEmail);
        }
        if dedup.contains(&normalized) {
            return ValidationOutcome::rejected(normalized, RejectReason::Duplicate);
        }
        if !syntax::is_syntactically_valid(&normalized) {
            return ValidationOutcome::rejected(normalized, RejectReason::InvalidSyntax);
        }

        // syntax guarantees exactly one '@' with a non-empty domain
        let Some(domain) = syntax::domain_of(&normalized).map(str::to_string) else {
            return ValidationOutcome::rejected(normalized, RejectReason::InvalidSyntax);
        };

        if self.disposable.is_disposable(&domain) {
            return ValidationOutcome::rejected(normalized, RejectReason::DisposableEmail);
        }
        if !self.route.has_route(&domain) {
            return ValidationOutcome::rejected(normalized, RejectReason::NoMxRecord);
        }

        if !options.enable_smtp_probe {
            return ValidationOutcome::valid(normalized, false);
        }

        // mandatory pacing before every live probe: remote servers flag
        // unthrottled RCPT streams as abuse
        if !options.inter_probe_delay.is_zero() {
            thread::sleep(options.inter_probe_delay);
        }

        match self.probe.probe(&normalized, &options.smtp) {
            ProbeOutcome::Accepted(_) => ValidationOutcome::valid(normalized, false),
            ProbeOutcome::Rejected(reply) => ValidationOutcome::rejected(
                normalized,
                RejectReason::SmtpRejected {
                    code: reply.code,
                    message: reply.message,
                },
            ),
            ProbeOutcome::Inconclusive { cause, message } => {
                // no evidence either way: accept without confirmation
                debug!(address = %normalized, %cause, %message, "probe inconclusive; passing through");
                ValidationOutcome::valid(normalized, true)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::smtp::{InconclusiveCause, SmtpReply};
    use std::time::Duration;

    pub(crate) struct StaticRoute(pub bool);

    impl RouteCheck for StaticRoute {
        fn has_route(&self, _domain: &str) -> bool {
            self.0
        }
    }

    pub(crate) struct ScriptedProbe(pub ProbeOutcome);

    impl RcptProbe for ScriptedProbe {
        fn probe(&self, _address: &str, _options: &SmtpProbeOptions) -> ProbeOutcome {
            self.0.clone()
        }
    }

    pub(crate) struct PanicProbe;

    impl RcptProbe for PanicProbe {
        fn probe(&self, address: &str, _options: &SmtpProbeOptions) -> ProbeOutcome {
            panic!("probe must not run for {address}");
        }
    }

    fn accepted() -> ProbeOutcome {
        ProbeOutcome::Accepted(SmtpReply {
            code: 250,
            message: "Ok".to_string(),
        })
    }

    fn options() -> BatchOptions {
        BatchOptions {
            inter_probe_delay: Duration::ZERO,
            ..BatchOptions::default()
        }
    }

    fn smtp_options() -> BatchOptions {
        BatchOptions {
            enable_smtp_probe: true,
            ..options()
        }
    }

    fn pipeline<P: RcptProbe>(route: bool, probe: P) -> Pipeline<StaticRoute, P> {
        Pipeline::with_checkers(DisposableDomains::new(), StaticRoute(route), probe)
    }

    #[test]
    fn empty_address_is_rejected_first() {
        let p = pipeline(true, PanicProbe);
        let outcome = p.evaluate("   ", &DedupTracker::new(), &options());
        assert_eq!(outcome.rejection, Some(RejectReason::EmptyEmail));
        assert_eq!(outcome.status_label(), "Invalid (Empty email)");
    }

    #[test]
    fn duplicate_wins_over_every_later_check() {
        let p = pipeline(true, PanicProbe);
        let mut dedup = DedupTracker::new();
        dedup.record("john@example.com");
        // case and whitespace differences still hit the dedup set
        let outcome = p.evaluate("  JOHN@EXAMPLE.COM ", &dedup, &options());
        assert_eq!(outcome.rejection, Some(RejectReason::Duplicate));
    }

    #[test]
    fn syntax_beats_disposable() {
        // both syntactically invalid and on the disposable list: the earlier
        // check must win
        let p = pipeline(true, PanicProbe);
        let outcome = p.evaluate("bad@@mailinator.com", &DedupTracker::new(), &options());
        assert_eq!(outcome.rejection, Some(RejectReason::InvalidSyntax));
    }

    #[test]
    fn disposable_is_rejected_regardless_of_mx() {
        let p = pipeline(true, PanicProbe);
        let outcome = p.evaluate("x@mailinator.com", &DedupTracker::new(), &options());
        assert_eq!(outcome.rejection, Some(RejectReason::DisposableEmail));
        assert_eq!(outcome.status_label(), "Invalid (Disposable email)");
    }

    #[test]
    fn missing_route_is_rejected() {
        let p = pipeline(false, PanicProbe);
        let outcome = p.evaluate("y@nodomainhere.invalidtld", &DedupTracker::new(), &options());
        assert_eq!(outcome.rejection, Some(RejectReason::NoMxRecord));
        assert_eq!(outcome.status_label(), "Invalid (No MX record)");
    }

    #[test]
    fn probe_is_skipped_when_disabled() {
        let p = pipeline(true, PanicProbe);
        let outcome = p.evaluate("z@example.com", &DedupTracker::new(), &options());
        assert!(outcome.is_valid());
        assert!(!outcome.indeterminate);
    }

    #[test]
    fn probe_rejection_surfaces_as_smtp_rejected() {
        let p = pipeline(
            true,
            ScriptedProbe(ProbeOutcome::Rejected(SmtpReply {
                code: 550,
                message: "User unknown".to_string(),
            })),
        );
        let outcome = p.evaluate("z@example.com", &DedupTracker::new(), &smtp_options());
        assert_eq!(outcome.status_label(), "Invalid (SMTP rejected)");
        assert_eq!(
            outcome.rejection,
            Some(RejectReason::SmtpRejected {
                code: 550,
                message: "User unknown".to_string(),
            })
        );
    }

    #[test]
    fn inconclusive_probe_passes_through_as_valid() {
        let p = pipeline(
            true,
            ScriptedProbe(ProbeOutcome::Inconclusive {
                cause: InconclusiveCause::Timeout,
                message: "read timed out".to_string(),
            }),
        );
        let outcome = p.evaluate("z@example.com", &DedupTracker::new(), &smtp_options());
        assert!(outcome.is_valid());
        assert!(outcome.indeterminate);
        assert_eq!(outcome.status_label(), "Valid");
    }

    #[test]
    fn accepted_probe_is_valid_and_conclusive() {
        let p = pipeline(true, ScriptedProbe(accepted()));
        let outcome = p.evaluate("z@example.com", &DedupTracker::new(), &smtp_options());
        assert!(outcome.is_valid());
        assert!(!outcome.indeterminate);
    }

    #[test]
    fn outcome_keeps_the_normalized_form() {
        let p = pipeline(true, PanicProbe);
        let outcome = p.evaluate(" Alice@Example.COM ", &DedupTracker::new(), &options());
        assert_eq!(outcome.normalized, "alice@example.com");
    }
}
