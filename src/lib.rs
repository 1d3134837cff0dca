#![forbid(unsafe_code)]
//! mailsweep — bulk email list cleaning.
//!
//! The pipeline runs an ordered chain of cheap-to-expensive checks per
//! address: empty/duplicate detection, structural syntax, disposable-domain
//! membership, MX lookup, and (optionally) a live but non-committing SMTP
//! `RCPT TO` probe. The batch orchestrator drives the pipeline over a row
//! list, paces probes, and reports progress/ETA after each row.

pub mod batch;
pub mod disposable;
pub mod mx;
pub mod pipeline;
pub mod smtp;
pub mod syntax;

pub use batch::{
    AnnotatedRow, BatchError, BatchOptions, BatchProgress, BatchReport, InputRow, NoopProgress,
    ProgressSink, run_batch,
};
pub use disposable::DisposableDomains;
pub use mx::{Error as MxError, MxRecord, MxStatus, check_mx, has_mail_exchange};
pub use pipeline::{
    DedupTracker, DnsRouteCheck, Pipeline, RcptProbe, RejectReason, RouteCheck, SmtpRcptProbe,
    ValidationOutcome,
};
pub use smtp::{InconclusiveCause, ProbeOutcome, SmtpProbeOptions, SmtpReply, probe_mailbox};
