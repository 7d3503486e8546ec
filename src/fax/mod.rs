//! # HylaFAX client protocol
//!
//! Client side of the hfaxd session protocol (FTP-derived, RFC 959
//! reply grammar, default port 4559) with the fax extensions: JNEW /
//! JPARM / JSUBM job management, STOT document upload, queue-format
//! selection (JOBFMT, RCVFMT, FILEFMT, MDMFMT), and TZONE.
//!
//! Architecture:
//! - `types` — all data structures, enums, config
//! - `error` — fax-specific error type
//! - `protocol` — low-level command/reply codec
//! - `connection` — TCP transport and banner handshake
//! - `channel` — control-connection trait + TCP impl + scripted double
//! - `transfer` — secondary data channel (PASV / PORT)
//! - `parser` — queue listing line parsing
//! - `queue` — queue directories, format strings, LIST retrieval
//! - `submit` — option-to-JPARM compilation and job submission
//! - `control` — job lifecycle (kill, suspend, resume, wait, modify)
//! - `session` — dual-connection session facade

pub mod types;
pub mod error;
pub mod protocol;
pub mod connection;
pub mod channel;
pub mod transfer;
pub mod parser;
pub mod queue;
pub mod submit;
pub mod control;
pub mod session;

// Re-exports for lib.rs consumers
pub use types::*;
pub use error::{FaxError, FaxErrorKind, FaxResult};
pub use channel::{ControlChannel, TcpControlChannel};
pub use session::FaxSession;
