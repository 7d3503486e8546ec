//! # hylafax-client — HylaFAX Session Layer
//!
//! Client library for the HylaFAX fax server (hfaxd), providing:
//!
//! - **Sessions** – dual control connections (job + status) opened,
//!   authenticated, and closed together
//! - **Submission** – document upload and per-destination job creation
//!   from an immutable option bundle
//! - **Status** – send/done/receive/archive queue listings with
//!   per-line parse outcomes
//! - **Job Control** – kill, suspend, resume, wait, inspect, modify

pub mod fax;

pub use fax::{
    ControlChannel, Destination, FaxConnectionConfig, FaxError, FaxErrorKind, FaxReply,
    FaxResult, FaxSession, JobOptions, JobRecord, ParsedLine, QueueKind, QueueListing,
    SessionInfo, SubmissionResult, TcpControlChannel, TimeZoneMode,
};
