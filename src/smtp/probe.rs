use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

use tracing::debug;

use crate::mx;
use crate::syntax;

use super::options::SmtpProbeOptions;
use super::session::SmtpSession;
use super::types::{InconclusiveCause, ProbeOutcome};

/// Probe the mail server responsible for `address` without sending mail.
///
/// Resolves the domain's MX records, connects to the preferred exchange
/// (lowest preference value), and runs the minimal dialogue
/// `EHLO` → `MAIL FROM` → `RCPT TO` → `QUIT`. The `RCPT TO` reply decides
/// the outcome; any failure to obtain one yields an inconclusive result.
/// The session is never retried and the connection is always released.
pub fn probe_mailbox(address: &str, options: &SmtpProbeOptions) -> ProbeOutcome {
    let Some(domain) = syntax::domain_of(address) else {
        return ProbeOutcome::inconclusive(
            InconclusiveCause::Protocol,
            "address has no domain part",
        );
    };

    let status = match mx::check_mx(domain) {
        Ok(status) => status,
        Err(err) => {
            return ProbeOutcome::inconclusive(InconclusiveCause::NoMxRecords, err.to_string());
        }
    };
    let Some(best) = status.best_exchange() else {
        return ProbeOutcome::inconclusive(
            InconclusiveCause::NoMxRecords,
            format!("no MX records for {domain}"),
        );
    };

    debug!(%address, exchange = %best.exchange, preference = best.preference, "probing MX host");
    probe_exchange(&best.exchange, address, domain, options)
}

pub(crate) fn probe_exchange(
    exchange: &str,
    address: &str,
    domain: &str,
    options: &SmtpProbeOptions,
) -> ProbeOutcome {
    let addrs: Vec<SocketAddr> = match format!("{exchange}:{}", options.port).to_socket_addrs() {
        Ok(iter) => iter.collect(),
        Err(err) => return inconclusive_from_io(err, Stage::Connect),
    };
    if addrs.is_empty() {
        return ProbeOutcome::inconclusive(
            InconclusiveCause::ConnectFailed,
            format!("no socket addresses resolved for {exchange}"),
        );
    }

    let mut session = match SmtpSession::connect(&addrs, options.timeout) {
        Ok(session) => session,
        Err(err) => return inconclusive_from_io(err, Stage::Connect),
    };

    // the socket is dropped when `session` goes out of scope, so even an
    // error mid-dialogue releases the connection
    match run_dialogue(&mut session, address, domain, options) {
        Ok(outcome) => outcome,
        Err(err) => inconclusive_from_io(err, Stage::Dialogue),
    }
}

fn run_dialogue(
    session: &mut SmtpSession,
    address: &str,
    domain: &str,
    options: &SmtpProbeOptions,
) -> io::Result<ProbeOutcome> {
    let banner = session.read_reply()?;
    if !banner.is_positive_completion() {
        session.quit().ok();
        return Ok(ProbeOutcome::inconclusive(
            InconclusiveCause::Protocol,
            format!("unexpected greeting {}", banner.code),
        ));
    }

    let ehlo = session.exchange(&format!("EHLO {}", options.helo_name(domain)))?;
    if !ehlo.is_positive_completion() {
        session.quit().ok();
        return Ok(ProbeOutcome::inconclusive(
            InconclusiveCause::Protocol,
            format!("EHLO rejected with {}", ehlo.code),
        ));
    }

    let mail = session.exchange(&format!("MAIL FROM:<{}>", options.envelope_sender(domain)))?;
    if !mail.is_positive_completion() {
        session.quit().ok();
        return Ok(ProbeOutcome::inconclusive(
            InconclusiveCause::Protocol,
            format!("MAIL FROM refused with {}", mail.code),
        ));
    }

    let rcpt = session.exchange(&format!("RCPT TO:<{address}>"))?;
    let outcome = if rcpt.is_positive_completion() {
        ProbeOutcome::Accepted(rcpt)
    } else {
        ProbeOutcome::Rejected(rcpt)
    };
    session.quit().ok();
    Ok(outcome)
}

enum Stage {
    Connect,
    Dialogue,
}

fn inconclusive_from_io(err: io::Error, stage: Stage) -> ProbeOutcome {
    use io::ErrorKind;

    let cause = match err.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => InconclusiveCause::Timeout,
        ErrorKind::UnexpectedEof
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe => InconclusiveCause::Disconnected,
        ErrorKind::InvalidData => InconclusiveCause::Protocol,
        _ => match stage {
            Stage::Connect => InconclusiveCause::ConnectFailed,
            Stage::Dialogue => InconclusiveCause::Disconnected,
        },
    };
    debug!(error = %err, %cause, "SMTP probe did not conclude");
    ProbeOutcome::inconclusive(cause, err.to_string())
}
