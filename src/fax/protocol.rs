//! Low-level hfaxd command/reply codec.
//!
//! The hfaxd client protocol keeps the RFC 959 §4 reply grammar:
//! - Commands are text terminated with `\r\n`
//! - Replies are single- or multi-line with a 3-digit code
//! - `NNN-` marks a multi-line reply that runs until `NNN `

use crate::fax::error::{FaxError, FaxResult};
use crate::fax::types::FaxReply;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// The command/reply codec operating on split TCP halves.
pub struct FaxCodec {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    /// Log wire traffic at debug level instead of trace.
    pub verbose: bool,
}

impl FaxCodec {
    /// Create a codec from a connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        let (rd, wr) = stream.into_split();
        Self {
            reader: BufReader::new(rd),
            writer: wr,
            verbose: false,
        }
    }

    fn trace(&self, msg: &str) {
        if self.verbose {
            log::debug!("{}", msg);
        } else {
            log::trace!("{}", msg);
        }
    }

    /// Send a raw command (without trailing CRLF — we add it).
    pub async fn send_command(&mut self, cmd: &str) -> FaxResult<()> {
        let line = format!("{}\r\n", cmd);
        self.writer.write_all(line.as_bytes()).await?;
        self.trace(&format!(">>> {}", cmd));
        Ok(())
    }

    /// Read a single line from the control connection (including CRLF).
    async fn read_line_raw(&mut self) -> FaxResult<String> {
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf).await?;
        if n == 0 {
            return Err(FaxError::disconnected("Server closed connection"));
        }
        Ok(buf)
    }

    /// Read a complete reply (possibly multi-line).
    pub async fn read_reply(&mut self) -> FaxResult<FaxReply> {
        let first = self.read_line_raw().await?;
        let first_trimmed = first.trim_end_matches(|c| c == '\r' || c == '\n');

        if first_trimmed.len() < 3 {
            return Err(FaxError::protocol_error(format!(
                "Reply too short: '{}'",
                first_trimmed
            )));
        }

        let code = parse_code(first_trimmed)?;
        let mut lines = vec![first_trimmed.to_string()];

        // "NNN-" means more lines follow until "NNN " is seen.
        let is_multi = first_trimmed.len() >= 4 && first_trimmed.as_bytes()[3] == b'-';
        if is_multi {
            let terminator = format!("{} ", code);
            loop {
                let next = self.read_line_raw().await?;
                let next_trimmed = next.trim_end_matches(|c| c == '\r' || c == '\n');
                lines.push(next_trimmed.to_string());
                if next_trimmed.starts_with(&terminator) {
                    break;
                }
            }
        }

        let reply = FaxReply { code, lines };
        self.trace(&format!(
            "<<< {} {}",
            reply.code,
            reply.lines.last().map(String::as_str).unwrap_or("")
        ));
        Ok(reply)
    }

    /// Send a command and return the reply.
    pub async fn execute(&mut self, cmd: &str) -> FaxResult<FaxReply> {
        self.send_command(cmd).await?;
        self.read_reply().await
    }

    /// Send a command, expect a specific reply-code class.
    pub async fn expect(&mut self, cmd: &str, expected_first_digit: u16) -> FaxResult<FaxReply> {
        let reply = self.execute(cmd).await?;
        if reply.code / 100 != expected_first_digit {
            return Err(FaxError::from_reply(reply.code, &reply.text()));
        }
        Ok(reply)
    }

    /// Expect a 2xx reply.
    pub async fn expect_ok(&mut self, cmd: &str) -> FaxResult<FaxReply> {
        self.expect(cmd, 2).await
    }
}

/// Parse the 3-digit reply code from the start of a line.
fn parse_code(line: &str) -> FaxResult<u16> {
    if line.len() < 3 {
        return Err(FaxError::protocol_error("Reply too short to contain code"));
    }
    line[..3]
        .parse::<u16>()
        .map_err(|_| FaxError::protocol_error(format!("Invalid reply code in: '{}'", line)))
}
