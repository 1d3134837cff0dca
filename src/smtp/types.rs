use std::fmt;

/// A raw SMTP reply, preserving the numeric status code and message text.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }
}

/// Why a probe could not reach a definitive accept/reject signal.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InconclusiveCause {
    NoMxRecords,
    ConnectFailed,
    Disconnected,
    Timeout,
    Protocol,
}

impl fmt::Display for InconclusiveCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMxRecords => f.write_str("no MX"),
            Self::ConnectFailed => f.write_str("connect-failed"),
            Self::Disconnected => f.write_str("disconnected"),
            Self::Timeout => f.write_str("timeout"),
            Self::Protocol => f.write_str("protocol-error"),
        }
    }
}

/// Classification of a single probe. Never retried: one host, one session.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// `RCPT TO` answered with a 2xx completion.
    Accepted(SmtpReply),
    /// `RCPT TO` answered with any other definitive reply.
    Rejected(SmtpReply),
    /// No definitive signal (refused connection, disconnect, timeout,
    /// protocol breakage, or no MX to probe).
    Inconclusive {
        cause: InconclusiveCause,
        message: String,
    },
}

impl ProbeOutcome {
    pub(crate) fn inconclusive(cause: InconclusiveCause, message: impl Into<String>) -> Self {
        Self::Inconclusive {
            cause,
            message: message.into(),
        }
    }

    pub fn is_conclusive(&self) -> bool {
        matches!(self, Self::Accepted(_) | Self::Rejected(_))
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted(reply) => write!(f, "accepted ({} {})", reply.code, reply.message),
            Self::Rejected(reply) => write!(f, "rejected ({} {})", reply.code, reply.message),
            Self::Inconclusive { cause, message } => {
                write!(f, "inconclusive [{cause}] {message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(code: u16) -> SmtpReply {
        SmtpReply {
            code,
            message: String::new(),
        }
    }

    #[test]
    fn reply_code_classes() {
        assert!(reply(250).is_positive_completion());
        assert!(reply(451).is_transient_failure());
        assert!(reply(550).is_permanent_failure());
        assert!(!reply(550).is_positive_completion());
    }

    #[test]
    fn conclusiveness() {
        assert!(ProbeOutcome::Accepted(reply(250)).is_conclusive());
        assert!(ProbeOutcome::Rejected(reply(550)).is_conclusive());
        assert!(
            !ProbeOutcome::inconclusive(InconclusiveCause::Timeout, "read timed out")
                .is_conclusive()
        );
    }

    #[test]
    fn cause_tags_are_stable() {
        assert_eq!(InconclusiveCause::ConnectFailed.to_string(), "connect-failed");
        assert_eq!(InconclusiveCause::Timeout.to_string(), "timeout");
    }
}
