use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use super::types::SmtpReply;

pub(crate) struct SmtpSession {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl SmtpSession {
    pub(crate) fn connect(addrs: &[SocketAddr], timeout: Duration) -> io::Result<Self> {
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    let reader = BufReader::new(stream.try_clone()?);
                    return Ok(Self { stream, reader });
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no socket address available",
            )
        }))
    }

    /// Send `command` and read the server's (possibly multi-line) reply.
    pub(crate) fn exchange(&mut self, command: &str) -> io::Result<SmtpReply> {
        self.send_command(command)?;
        self.read_reply()
    }

    pub(crate) fn send_command(&mut self, command: &str) -> io::Result<()> {
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.stream.write_all(&line)?;
        self.stream.flush()
    }

    pub(crate) fn read_reply(&mut self) -> io::Result<SmtpReply> {
        let mut code = None;
        let mut message_lines = Vec::new();
        loop {
            let mut raw = String::new();
            if self.reader.read_line(&mut raw)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed while reading reply",
                ));
            }
            let line = parse_reply_line(raw.trim_end_matches(['\r', '\n']))?;
            match code {
                Some(existing) if existing != line.code => {
                    return Err(invalid_reply(format!(
                        "inconsistent SMTP reply codes: {existing} vs {}",
                        line.code
                    )));
                }
                Some(_) => {}
                None => code = Some(line.code),
            }
            let last = line.last;
            message_lines.push(line.text);
            if last {
                break;
            }
        }
        Ok(SmtpReply {
            code: code
                .ok_or_else(|| invalid_reply("SMTP reply missing status code".to_string()))?,
            message: message_lines.join("\n"),
        })
    }

    /// Polite teardown; the reply is best-effort since the socket is dropped
    /// right after regardless.
    pub(crate) fn quit(&mut self) -> io::Result<()> {
        self.send_command("QUIT")?;
        let _ = self.read_reply();
        Ok(())
    }
}

#[derive(Debug)]
struct ReplyLine {
    code: u16,
    last: bool,
    text: String,
}

/// Parse one reply line: three digit bytes, then `' '` for the final line
/// of a reply or `'-'` for a continuation, then text. Anything that does
/// not fit — a short line, a non-numeric code, a multi-byte character
/// straddling the code bytes — is protocol breakage reported as
/// `InvalidData`, never a panic.
fn parse_reply_line(raw: &str) -> io::Result<ReplyLine> {
    let code_part = raw
        .get(..3)
        .ok_or_else(|| invalid_reply(format!("invalid SMTP reply: '{raw}'")))?;
    let code = code_part
        .parse::<u16>()
        .map_err(|_| invalid_reply(format!("invalid SMTP status code: '{code_part}'")))?;
    let last = raw.get(3..4) != Some("-");
    let text = raw.get(4..).unwrap_or("").to_string();
    Ok(ReplyLine { code, last, text })
}

fn invalid_reply(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}
