//! Shared types for the fax client crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Connection / Session ────────────────────────────────────────────

/// Timezone used by the server when rendering listing timestamps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum TimeZoneMode {
    /// Server-local time (TZONE LOCAL).
    Local,
    /// UTC (TZONE GMT).
    Gmt,
}

impl Default for TimeZoneMode {
    fn default() -> Self {
        Self::Local
    }
}

/// Transfer mode selected for the secondary data connection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum DataChannelMode {
    Passive,
    Active,
}

impl Default for DataChannelMode {
    fn default() -> Self {
        Self::Passive
    }
}

/// Configuration for one control connection to an hfaxd server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaxConnectionConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Empty means "the identity of the calling process" ($USER).
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub data_channel_mode: DataChannelMode,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_sec: u64,
    /// Data-channel timeout in seconds.
    #[serde(default = "default_data_timeout")]
    pub data_timeout_sec: u64,
    #[serde(default)]
    pub timezone: TimeZoneMode,
    /// Log wire traffic at debug level instead of trace.
    #[serde(default)]
    pub verbose: bool,
    /// Friendly label for diagnostics.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_port() -> u16 {
    4559
}
fn default_connect_timeout() -> u64 {
    15
}
fn default_data_timeout() -> u64 {
    30
}

impl Default for FaxConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: default_port(),
            username: String::new(),
            password: String::new(),
            data_channel_mode: DataChannelMode::Passive,
            connect_timeout_sec: default_connect_timeout(),
            data_timeout_sec: default_data_timeout(),
            timezone: TimeZoneMode::Local,
            verbose: false,
            label: None,
        }
    }
}

impl FaxConnectionConfig {
    /// New configuration for `host` with all defaults.
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Resolve the login name: configured username, else the identity of
    /// the calling process, else "anonymous".
    pub fn effective_username(&self) -> String {
        if !self.username.is_empty() {
            return self.username.clone();
        }
        std::env::var("USER").unwrap_or_else(|_| "anonymous".into())
    }
}

/// Snapshot of an active fax session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub connected: bool,
    pub logged_in: bool,
    pub connected_at: Option<DateTime<Utc>>,
    pub label: Option<String>,
}

// ─── Queues ──────────────────────────────────────────────────────────

/// The server-side queues a status query can target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum QueueKind {
    /// Jobs waiting to be sent (sendq).
    Send,
    /// Completed jobs (doneq).
    Done,
    /// Received faxes (recvq).
    Receive,
    /// Archived jobs (archive).
    Archive,
    /// Queued documents (docq).
    Document,
    /// Modem / server status (status).
    ServerStatus,
}

// ─── Job options ─────────────────────────────────────────────────────

/// Job notification policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum NotifyMode {
    None,
    Done,
    Requeued,
}

impl Default for NotifyMode {
    fn default() -> Self {
        Self::Done
    }
}

/// Scheduling priority bands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum JobPriority {
    Normal,
    Bulk,
    High,
}

impl Default for JobPriority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Desired page data encoding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum DataFormat {
    /// 1-D MH.
    OneDimensional,
    /// 2-D MR.
    TwoDimensional,
    /// 2-D MMR.
    Mmr,
}

impl Default for DataFormat {
    fn default() -> Self {
        Self::OneDimensional
    }
}

/// Per-job option bundle.
///
/// String fields left empty mean "do not override the server default".
/// Numeric and boolean fields always apply; their defaults match the
/// classic sendfax behaviour. The bundle is immutable once handed to a
/// submission call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    // Cover page
    #[serde(default)]
    pub cover_comments: String,
    #[serde(default)]
    pub cover_regarding: String,
    #[serde(default)]
    pub cover_from_voice: String,
    #[serde(default)]
    pub cover_from_fax: String,
    #[serde(default)]
    pub cover_from_company: String,
    #[serde(default)]
    pub cover_from_location: String,
    #[serde(default)]
    pub cover_template: String,

    #[serde(default)]
    pub tagline_format: String,
    #[serde(default)]
    pub job_tag: String,
    /// Transmitting station identifier.
    #[serde(default)]
    pub tsi: String,
    #[serde(default)]
    pub send_time: String,
    #[serde(default)]
    pub kill_time: String,
    #[serde(default)]
    pub retry_time: String,
    /// Named page size: "a4", "letter", "legal", "b4".
    #[serde(default)]
    pub page_size: String,

    #[serde(default)]
    pub notify: NotifyMode,
    #[serde(default)]
    pub priority: JobPriority,
    /// Vertical resolution in lines/inch (98.0 low, 196.0 high).
    #[serde(default = "default_vres")]
    pub vres: f32,
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
    #[serde(default = "default_max_dials")]
    pub max_dials: u32,
    #[serde(default = "default_true")]
    pub auto_cover_page: bool,
    #[serde(default = "default_true")]
    pub use_ecm: bool,
    #[serde(default)]
    pub use_xvres: bool,
    /// Archive the job on completion (DONEOP archive).
    #[serde(default)]
    pub archive: bool,
    /// Desired transmission speed in bits/s.
    #[serde(default = "default_desired_speed")]
    pub desired_speed: u32,
    /// Minimum acceptable speed in bits/s.
    #[serde(default = "default_min_speed")]
    pub min_speed: u32,
    #[serde(default)]
    pub data_format: DataFormat,
}

fn default_vres() -> f32 {
    98.0
}
fn default_max_tries() -> u32 {
    3
}
fn default_max_dials() -> u32 {
    12
}
fn default_true() -> bool {
    true
}
fn default_desired_speed() -> u32 {
    14_400
}
fn default_min_speed() -> u32 {
    2_400
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            cover_comments: String::new(),
            cover_regarding: String::new(),
            cover_from_voice: String::new(),
            cover_from_fax: String::new(),
            cover_from_company: String::new(),
            cover_from_location: String::new(),
            cover_template: String::new(),
            tagline_format: String::new(),
            job_tag: String::new(),
            tsi: String::new(),
            send_time: String::new(),
            kill_time: String::new(),
            retry_time: String::new(),
            page_size: String::new(),
            notify: NotifyMode::Done,
            priority: JobPriority::Normal,
            vres: default_vres(),
            max_tries: default_max_tries(),
            max_dials: default_max_dials(),
            auto_cover_page: true,
            use_ecm: true,
            use_xvres: false,
            archive: false,
            desired_speed: default_desired_speed(),
            min_speed: default_min_speed(),
            data_format: DataFormat::OneDimensional,
        }
    }
}

// ─── Destination ─────────────────────────────────────────────────────

/// One fax target, parsed from the compact `recipient@number#subaddress`
/// form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// Display name for the cover page; may be empty.
    pub recipient: String,
    /// The dial string; never empty for a valid destination.
    pub number: String,
    /// ITU sub-address; may be empty.
    pub subaddress: String,
}

impl Destination {
    /// Split a compact destination string into its three fields.
    ///
    /// `@` separates recipient from number; `#` separates number from
    /// sub-address. Without an `@`, the whole prefix (up to `#` if
    /// present) is the dial string and the recipient is empty.
    pub fn parse(dest: &str) -> Self {
        let (recipient, rest) = match dest.split_once('@') {
            Some((r, rest)) => (r.to_string(), rest),
            None => (String::new(), dest),
        };
        let (number, subaddress) = match rest.split_once('#') {
            Some((n, s)) => (n.to_string(), s.to_string()),
            None => (rest.to_string(), String::new()),
        };
        Self {
            recipient,
            number,
            subaddress,
        }
    }
}

// ─── Submission ──────────────────────────────────────────────────────

/// Outcome of one submission call. Never mutated after return.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub success: bool,
    /// Id of the most recently created job; empty on failure.
    pub job_id: String,
    /// Group id when the server groups per-destination jobs; may be empty.
    pub group_id: String,
    pub total_pages: u32,
    /// Non-empty only on failure.
    pub error: String,
}

impl SubmissionResult {
    pub(crate) fn failed(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::default()
        }
    }
}

// ─── Status records ──────────────────────────────────────────────────

/// One parsed status-queue line. Which fields are populated depends on
/// the queue kind the line came from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: String,
    pub state: String,
    pub pages: String,
    pub dials: String,
    /// Time to send.
    pub tts: String,
    pub sender: String,
    /// Trailing status / error description, when the line carries one.
    pub status: String,
    // Receive-queue fields
    pub file_name: String,
    pub received: String,
    /// The raw line as returned by the server.
    pub raw: String,
}

/// Why a listing line was not turned into a record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// Column-header line (contains the JID marker).
    Header,
    /// Fewer whitespace-delimited fields than the queue format requires.
    TooFewFields,
}

/// A listing line that was skipped rather than parsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLine {
    pub line: String,
    pub reason: SkipReason,
}

/// Per-line parse outcome for one status-listing line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Record(JobRecord),
    Skipped(SkippedLine),
}

/// Result of one queue listing: the parsed records plus every line that
/// was skipped, so callers can count or log anomalies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueListing {
    pub records: Vec<JobRecord>,
    pub skipped: Vec<SkippedLine>,
}

// ─── Protocol reply ──────────────────────────────────────────────────

/// A single hfaxd reply (may be multi-line).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaxReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl FaxReply {
    /// Full reply text (all lines joined).
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Whether the reply code indicates success (1xx–3xx).
    pub fn is_success(&self) -> bool {
        self.code < 400
    }

    /// Positive-preliminary reply (1xx).
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// Positive-completion reply (2xx).
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Positive-intermediate reply (3xx).
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_full_form() {
        let d = Destination::parse("Bob@555-0100#42");
        assert_eq!(d.recipient, "Bob");
        assert_eq!(d.number, "555-0100");
        assert_eq!(d.subaddress, "42");
    }

    #[test]
    fn test_destination_no_recipient() {
        let d = Destination::parse("555-0200#42");
        assert_eq!(d.recipient, "");
        assert_eq!(d.number, "555-0200");
        assert_eq!(d.subaddress, "42");
    }

    #[test]
    fn test_destination_number_only() {
        let d = Destination::parse("555-0300");
        assert_eq!(d.recipient, "");
        assert_eq!(d.number, "555-0300");
        assert_eq!(d.subaddress, "");
    }

    #[test]
    fn test_destination_empty_number() {
        let d = Destination::parse("Bob@#7");
        assert_eq!(d.recipient, "Bob");
        assert_eq!(d.number, "");
        assert_eq!(d.subaddress, "7");
    }

    #[test]
    fn test_job_options_defaults() {
        let o = JobOptions::default();
        assert_eq!(o.vres, 98.0);
        assert_eq!(o.max_tries, 3);
        assert_eq!(o.max_dials, 12);
        assert!(o.auto_cover_page);
        assert!(o.use_ecm);
        assert!(!o.use_xvres);
        assert!(!o.archive);
        assert_eq!(o.desired_speed, 14_400);
        assert_eq!(o.min_speed, 2_400);
        assert_eq!(o.data_format, DataFormat::OneDimensional);
        assert_eq!(o.notify, NotifyMode::Done);
        assert_eq!(o.priority, JobPriority::Normal);
    }

    #[test]
    fn test_job_options_serde_defaults() {
        // A bare JSON object deserializes to the same bundle as Default.
        let from_json: JobOptions = serde_json::from_str("{}").unwrap();
        let dflt = JobOptions::default();
        assert_eq!(from_json.vres, dflt.vres);
        assert_eq!(from_json.notify, dflt.notify);
        assert_eq!(from_json.use_ecm, dflt.use_ecm);
        assert_eq!(from_json.page_size, dflt.page_size);
    }

    #[test]
    fn test_reply_classification() {
        let r = FaxReply {
            code: 150,
            lines: vec!["150 Opening data connection".into()],
        };
        assert!(r.is_preliminary());
        assert!(r.is_success());
        assert!(!r.is_completion());

        let r = FaxReply {
            code: 530,
            lines: vec!["530 Not logged in".into()],
        };
        assert!(!r.is_success());
    }
}
