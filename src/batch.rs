//! Batch orchestration: drive the pipeline over an ordered row list.
//!
//! Strictly sequential by design — one address fully resolves (including any
//! SMTP round-trip) before the next begins, so the per-probe pacing delay
//! actually paces. Dedup state and progress live for exactly one run.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::pipeline::{DedupTracker, Pipeline, RcptProbe, RouteCheck, ValidationOutcome};
use crate::smtp::SmtpProbeOptions;

/// One input row. Only the address participates in validation; name and
/// mobile are passthrough for the output collaborator.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputRow {
    pub name: Option<String>,
    pub email: String,
    pub mobile: Option<String>,
}

impl InputRow {
    pub fn from_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }
}

/// Knobs shared by the orchestrator and the pipeline.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub enable_smtp_probe: bool,
    /// Pause inserted before every live probe. Mandatory pacing, not a
    /// performance bug.
    pub inter_probe_delay: Duration,
    pub smtp: SmtpProbeOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            enable_smtp_probe: false,
            inter_probe_delay: Duration::from_millis(1_500),
            smtp: SmtpProbeOptions::default(),
        }
    }
}

/// Snapshot emitted to the progress sink after every row.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    pub processed: usize,
    pub total: usize,
    pub elapsed: Duration,
    /// Extrapolated from the average per-row time so far; absent on the
    /// first row.
    pub eta: Option<Duration>,
}

/// Capability receiving one [`BatchProgress`] per processed row.
pub trait ProgressSink {
    fn report(&mut self, progress: &BatchProgress);
}

/// Sink for non-interactive contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&mut self, _progress: &BatchProgress) {}
}

/// An input row annotated with its verdict.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedRow {
    pub row: InputRow,
    pub outcome: ValidationOutcome,
}

/// Full result of one run: the annotated sequence in input order plus
/// aggregate counts. `valid_count + invalid_count` always equals the row
/// count.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub rows: Vec<AnnotatedRow>,
    pub valid_count: usize,
    pub invalid_count: usize,
}

/// The only hard failure mode of a run: the input shape itself is wrong.
/// Everything per-row is a classification, never an error.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("input rows do not expose an 'Email Address' field")]
    MissingEmailField,
}

/// Run the pipeline over `rows` in input order.
///
/// On a Valid outcome the normalized address is recorded in the dedup set so
/// later occurrences classify as duplicates. Progress is recomputed and
/// emitted after every row.
pub fn run_batch<R, P, S>(
    rows: Vec<InputRow>,
    pipeline: &Pipeline<R, P>,
    options: &BatchOptions,
    sink: &mut S,
) -> BatchReport
where
    R: RouteCheck,
    P: RcptProbe,
    S: ProgressSink,
{
    let total = rows.len();
    let started = Instant::now();
    let mut dedup = DedupTracker::new();
    let mut annotated = Vec::with_capacity(total);
    let mut valid_count = 0usize;

    for (idx, row) in rows.into_iter().enumerate() {
        let outcome = pipeline.evaluate(&row.email, &dedup, options);
        if outcome.is_valid() {
            dedup.record(outcome.normalized.clone());
            valid_count += 1;
        }
        annotated.push(AnnotatedRow { row, outcome });

        let processed = idx + 1;
        let elapsed = started.elapsed();
        let eta = if idx > 0 {
            let avg = elapsed / processed as u32;
            Some(avg * (total - processed) as u32)
        } else {
            None
        };
        sink.report(&BatchProgress {
            processed,
            total,
            elapsed,
            eta,
        });
    }

    let invalid_count = total - valid_count;
    debug!(total, valid_count, invalid_count, "batch complete");
    BatchReport {
        rows: annotated,
        valid_count,
        invalid_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disposable::DisposableDomains;
    use crate::pipeline::tests::{PanicProbe, StaticRoute};
    use crate::pipeline::RejectReason;
    use proptest::prelude::*;

    fn pipeline() -> Pipeline<StaticRoute, PanicProbe> {
        Pipeline::with_checkers(DisposableDomains::new(), StaticRoute(true), PanicProbe)
    }

    fn options() -> BatchOptions {
        BatchOptions {
            inter_probe_delay: Duration::ZERO,
            ..BatchOptions::default()
        }
    }

    fn rows(emails: &[&str]) -> Vec<InputRow> {
        emails.iter().map(|e| InputRow::from_email(*e)).collect()
    }

    #[test]
    fn case_insensitive_duplicate_detection() {
        let report = run_batch(
            rows(&["john@example.com", "JOHN@EXAMPLE.COM"]),
            &pipeline(),
            &options(),
            &mut NoopProgress,
        );
        assert_eq!(report.rows[0].outcome.status_label(), "Valid");
        assert_eq!(
            report.rows[1].outcome.status_label(),
            "Invalid (Duplicate)"
        );
        assert_eq!(report.valid_count, 1);
        assert_eq!(report.invalid_count, 1);
    }

    #[test]
    fn duplicate_of_an_invalid_row_is_judged_on_its_own() {
        // first occurrence fails MX, so the second must not short-circuit
        // as a duplicate
        let p = Pipeline::with_checkers(DisposableDomains::new(), StaticRoute(false), PanicProbe);
        let report = run_batch(
            rows(&["a@dead.example", "a@dead.example"]),
            &p,
            &options(),
            &mut NoopProgress,
        );
        assert_eq!(
            report.rows[0].outcome.rejection,
            Some(RejectReason::NoMxRecord)
        );
        assert_eq!(
            report.rows[1].outcome.rejection,
            Some(RejectReason::NoMxRecord)
        );
    }

    #[derive(Default)]
    struct Recorder {
        snapshots: Vec<BatchProgress>,
    }

    impl ProgressSink for Recorder {
        fn report(&mut self, progress: &BatchProgress) {
            self.snapshots.push(progress.clone());
        }
    }

    #[test]
    fn progress_is_monotonic_and_complete() {
        let mut sink = Recorder::default();
        let report = run_batch(
            rows(&["a@x.example", "b@x.example", "c@x.example"]),
            &pipeline(),
            &options(),
            &mut sink,
        );
        assert_eq!(report.rows.len(), 3);
        let snapshots = &sink.snapshots;
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].processed, 1);
        assert!(snapshots[0].eta.is_none());
        assert!(snapshots[1].eta.is_some());
        assert_eq!(snapshots[2].processed, 3);
        assert_eq!(snapshots[2].total, 3);
        assert_eq!(snapshots.last().and_then(|s| s.eta), Some(Duration::ZERO));
    }

    #[test]
    fn reruns_are_idempotent() {
        let input = rows(&["a@x.example", "A@X.EXAMPLE", "", "bad@@x.example"]);
        let first = run_batch(input.clone(), &pipeline(), &options(), &mut NoopProgress);
        let second = run_batch(input, &pipeline(), &options(), &mut NoopProgress);
        assert_eq!(first, second);
    }

    #[test]
    fn passthrough_fields_survive_unchanged() {
        let input = vec![InputRow {
            name: Some("John Doe".to_string()),
            email: "john@example.com".to_string(),
            mobile: Some("555-0100".to_string()),
        }];
        let report = run_batch(input, &pipeline(), &options(), &mut NoopProgress);
        assert_eq!(report.rows[0].row.name.as_deref(), Some("John Doe"));
        assert_eq!(report.rows[0].row.mobile.as_deref(), Some("555-0100"));
    }

    proptest! {
        #[test]
        fn counts_always_sum_to_total(emails in prop::collection::vec("[a-c@. ]{0,12}", 0..40)) {
            let input: Vec<InputRow> = emails.iter().map(|e| InputRow::from_email(e.as_str())).collect();
            let total = input.len();
            let report = run_batch(input, &pipeline(), &options(), &mut NoopProgress);
            prop_assert_eq!(report.valid_count + report.invalid_count, total);
            prop_assert_eq!(report.rows.len(), total);
        }

        #[test]
        fn accepted_addresses_are_unique(emails in prop::collection::vec("[ab]@[xy]\\.example", 0..40)) {
            let input: Vec<InputRow> = emails.iter().map(|e| InputRow::from_email(e.as_str())).collect();
            let report = run_batch(input, &pipeline(), &options(), &mut NoopProgress);
            let mut accepted: Vec<&str> = report
                .rows
                .iter()
                .filter(|r| r.outcome.is_valid())
                .map(|r| r.outcome.normalized.as_str())
                .collect();
            let before = accepted.len();
            accepted.sort_unstable();
            accepted.dedup();
            prop_assert_eq!(accepted.len(), before);
        }
    }
}
