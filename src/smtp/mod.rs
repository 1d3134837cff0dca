//! SMTP mailbox probing.
//!
//! [`probe_mailbox`] opens a transient session against the preferred MX host
//! and asks, via `RCPT TO`, whether the server would accept mail for the
//! address. No message body is ever transmitted. The outcome is tri-state:
//! accepted, rejected, or inconclusive with a cause tag — an inconclusive
//! probe carries no evidence either way and must not fail the address.

mod options;
mod probe;
mod session;
mod types;

pub use options::SmtpProbeOptions;
pub use probe::probe_mailbox;
pub use types::{InconclusiveCause, ProbeOutcome, SmtpReply};
