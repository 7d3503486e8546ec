//! Fax-client error type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorised fax-client error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaxError {
    pub kind: FaxErrorKind,
    pub message: String,
    /// hfaxd reply code that triggered the error, if any.
    pub code: Option<u16>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FaxErrorKind {
    /// TCP / DNS resolution failure.
    ConnectionFailed,
    /// Wrong username/password, or login rejected.
    AuthFailed,
    /// Operation attempted before `connect()`.
    NotConnected,
    /// Operation attempted before `login()`.
    NotLoggedIn,
    /// Server returned a 4xx/5xx for a command.
    CommandRejected,
    /// Data connection could not be established (PASV/PORT failed).
    DataChannelFailed,
    /// Server sent an un-parseable reply.
    ProtocolError,
    /// An I/O error on the local side (document read, socket).
    IoError,
    /// Operation timed out.
    Timeout,
    /// Control connection dropped.
    Disconnected,
    /// Config / parameter validation error.
    InvalidConfig,
    /// Catch-all.
    Unknown,
}

pub type FaxResult<T> = Result<T, FaxError>;

// ── Construction helpers ─────────────────────────────────────────────

impl FaxError {
    pub fn new(kind: FaxErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    // ── Convenience constructors ─────────────────────────────────

    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::new(FaxErrorKind::ConnectionFailed, msg)
    }

    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::new(FaxErrorKind::AuthFailed, msg)
    }

    pub fn not_connected() -> Self {
        Self::new(FaxErrorKind::NotConnected, "Not connected to server")
    }

    pub fn not_logged_in() -> Self {
        Self::new(FaxErrorKind::NotLoggedIn, "Not connected or logged in")
    }

    pub fn command_rejected(code: u16, msg: impl Into<String>) -> Self {
        Self::new(FaxErrorKind::CommandRejected, msg).with_code(code)
    }

    pub fn data_channel(msg: impl Into<String>) -> Self {
        Self::new(FaxErrorKind::DataChannelFailed, msg)
    }

    pub fn protocol_error(msg: impl Into<String>) -> Self {
        Self::new(FaxErrorKind::ProtocolError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(FaxErrorKind::IoError, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(FaxErrorKind::Timeout, msg)
    }

    pub fn disconnected(msg: impl Into<String>) -> Self {
        Self::new(FaxErrorKind::Disconnected, msg)
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(FaxErrorKind::InvalidConfig, msg)
    }

    /// Classify an hfaxd reply code into the most appropriate error kind.
    /// hfaxd uses the RFC 959 reply grammar, so the classes match FTP.
    pub fn from_reply(code: u16, text: &str) -> Self {
        let kind = match code {
            421 => FaxErrorKind::Disconnected,
            425 | 426 => FaxErrorKind::DataChannelFailed,
            430 | 530 => FaxErrorKind::AuthFailed,
            450 | 451 | 452 | 550 | 552 | 553 => FaxErrorKind::CommandRejected,
            500..=504 => FaxErrorKind::CommandRejected,
            _ if code >= 400 => FaxErrorKind::CommandRejected,
            _ => FaxErrorKind::Unknown,
        };
        Self {
            kind,
            message: text.to_string(),
            code: Some(code),
        }
    }
}

impl fmt::Display for FaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code {
            write!(f, "[fax {:?} {}] {}", self.kind, code, self.message)
        } else {
            write!(f, "[fax {:?}] {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for FaxError {}

impl From<std::io::Error> for FaxError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::TimedOut {
            Self::timeout(format!("I/O timeout: {}", e))
        } else {
            Self::io_error(e.to_string())
        }
    }
}

impl From<FaxError> for String {
    fn from(e: FaxError) -> String {
        e.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_reply_classes() {
        assert_eq!(
            FaxError::from_reply(530, "Not logged in").kind,
            FaxErrorKind::AuthFailed
        );
        assert_eq!(
            FaxError::from_reply(421, "Service closing").kind,
            FaxErrorKind::Disconnected
        );
        assert_eq!(
            FaxError::from_reply(425, "Cannot open data connection").kind,
            FaxErrorKind::DataChannelFailed
        );
        assert_eq!(
            FaxError::from_reply(500, "Unknown command").kind,
            FaxErrorKind::CommandRejected
        );
    }

    #[test]
    fn test_message_surfaced_verbatim() {
        let e = FaxError::from_reply(550, "sendq: permission denied");
        assert_eq!(e.message, "sendq: permission denied");
        assert_eq!(e.code, Some(550));
    }
}
