//! Status-queue listing.
//!
//! Each queue kind maps to a well-known spool subdirectory and a column
//! format that must be configured before LIST, otherwise the server's
//! output does not match the layout the parser expects. Directory names
//! and format strings are the bit-exact compatibility surface with the
//! server and must be sent verbatim.

use crate::fax::channel::ControlChannel;
use crate::fax::error::FaxResult;
use crate::fax::parser;
use crate::fax::types::{ParsedLine, QueueKind, QueueListing};

// Spool subdirectories, fixed by the server layout.
pub const DIR_SENDQ: &str = "sendq";
pub const DIR_DONEQ: &str = "doneq";
pub const DIR_RECVQ: &str = "recvq";
pub const DIR_ARCHIVE: &str = "archive";
pub const DIR_DOCQ: &str = "docq";
pub const DIR_STATUS: &str = "status";

// Listing column formats, printf-style against server field names.
const JOB_FMT: &str = "%-4j %1a %3l %2d %12.12o %-20.20e %4v %s";
const RCV_FMT: &str = "%-18f %8p %4s %12.12t %-20.20e %5S %s";
const FILE_FMT: &str = "%-18f %8p %1o %8s %12.12t %s";
const MDM_FMT: &str = "%-14m %1s %5r %12.12t %-20.20h %s";

impl QueueKind {
    /// The spool subdirectory this queue lives in.
    pub fn directory(&self) -> &'static str {
        match self {
            QueueKind::Send => DIR_SENDQ,
            QueueKind::Done => DIR_DONEQ,
            QueueKind::Receive => DIR_RECVQ,
            QueueKind::Archive => DIR_ARCHIVE,
            QueueKind::Document => DIR_DOCQ,
            QueueKind::ServerStatus => DIR_STATUS,
        }
    }

    /// The format-configuration command to issue before listing.
    pub fn format_command(&self) -> String {
        match self {
            QueueKind::Send | QueueKind::Done | QueueKind::Archive => {
                format!("JOBFMT \"{}\"", JOB_FMT)
            }
            QueueKind::Receive => format!("RCVFMT \"{}\"", RCV_FMT),
            QueueKind::Document => format!("FILEFMT \"{}\"", FILE_FMT),
            QueueKind::ServerStatus => format!("MDMFMT \"{}\"", MDM_FMT),
        }
    }
}

/// Fetch and parse one queue listing.
///
/// Configures the listing format, retrieves `LIST <dir>` over a data
/// connection, and parses every returned line. Records whose
/// identifying field (job id, or file name for the receive queue) came
/// back empty are demoted to skipped lines rather than returned.
pub async fn fetch(
    channel: &mut dyn ControlChannel,
    kind: QueueKind,
) -> FaxResult<QueueListing> {
    channel.command(&kind.format_command()).await?;

    let body = channel
        .retrieve(&format!("LIST {}", kind.directory()))
        .await?;

    let mut listing = QueueListing::default();
    for outcome in parser::parse_listing(&body, kind) {
        match outcome {
            ParsedLine::Record(r) => {
                let identified = match kind {
                    QueueKind::Send | QueueKind::Done | QueueKind::Archive => {
                        !r.job_id.is_empty()
                    }
                    QueueKind::Receive => !r.file_name.is_empty(),
                    QueueKind::Document | QueueKind::ServerStatus => true,
                };
                if identified {
                    listing.records.push(r);
                }
            }
            ParsedLine::Skipped(s) => listing.skipped.push(s),
        }
    }
    log::debug!(
        "{} listing: {} records, {} skipped",
        kind.directory(),
        listing.records.len(),
        listing.skipped.len()
    );
    Ok(listing)
}
