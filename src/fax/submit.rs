//! Job submission.
//!
//! One submission call drives: destination parsing, document upload
//! (STOT), per-destination job creation (JNEW + JPARM), and submission
//! (JSUBM), in that order. The option bundle is compiled once into an
//! ordered JPARM list and replayed into every per-destination job, so
//! no mutable prototype state is shared between destinations.
//!
//! The call never fails past its own boundary: every error — local file
//! read, rejected command, dropped connection — is converted into a
//! failed [`SubmissionResult`] carrying the collaborator's message.

use crate::fax::channel::ControlChannel;
use crate::fax::error::{FaxError, FaxResult};
use crate::fax::types::{
    DataFormat, Destination, JobOptions, JobPriority, NotifyMode, SubmissionResult,
};

/// Submit `files` to a single destination.
pub async fn submit_one(
    channel: &mut dyn ControlChannel,
    files: &[String],
    destination: &str,
    options: &JobOptions,
) -> SubmissionResult {
    submit_many(channel, files, &[destination.to_string()], options).await
}

/// Submit `files` to every destination, sharing the uploaded documents
/// across all per-destination jobs.
pub async fn submit_many(
    channel: &mut dyn ControlChannel,
    files: &[String],
    destinations: &[String],
    options: &JobOptions,
) -> SubmissionResult {
    match submit_inner(channel, files, destinations, options).await {
        Ok(result) => result,
        Err(e) => {
            log::warn!("submission failed: {}", e);
            SubmissionResult::failed(e.message)
        }
    }
}

async fn submit_inner(
    channel: &mut dyn ControlChannel,
    files: &[String],
    destinations: &[String],
    options: &JobOptions,
) -> FaxResult<SubmissionResult> {
    if destinations.is_empty() {
        return Err(FaxError::invalid_config("No destinations given"));
    }

    // Parse every destination before any network I/O.
    let mut targets = Vec::with_capacity(destinations.len());
    for dest in destinations {
        let parsed = Destination::parse(dest);
        if parsed.number.is_empty() {
            return Err(FaxError::invalid_config(format!(
                "Empty dial string in destination '{}'",
                dest
            )));
        }
        targets.push(parsed);
    }

    let params = job_params(options);

    // Store every document once; all jobs reference the same copies.
    let mut documents = Vec::with_capacity(files.len());
    for file in files {
        let data = tokio::fs::read(file)
            .await
            .map_err(|e| FaxError::io_error(format!("{}: {}", file, e)))?;
        let reply = channel.store("STOT", &data).await?;
        documents.push(parse_stored_document(&reply.text())?);
    }

    // Create and configure one job per destination, in order.
    let mut job_ids = Vec::with_capacity(targets.len());
    let mut group_id = String::new();
    for target in &targets {
        let reply = channel.command("JNEW").await?;
        let (jid, gid) = parse_new_job_reply(&reply.text())?;
        group_id = gid;

        for (name, value) in &params {
            channel
                .command(&format!("JPARM {} {}", name, value))
                .await?;
        }
        channel
            .command(&format!("JPARM DIALSTRING {}", target.number))
            .await?;
        if !target.recipient.is_empty() {
            channel
                .command(&format!("JPARM TOUSER {}", target.recipient))
                .await?;
        }
        if !target.subaddress.is_empty() {
            channel
                .command(&format!("JPARM SUBADDR {}", target.subaddress))
                .await?;
        }
        for doc in &documents {
            channel.command(&format!("JPARM DOCUMENT {}", doc)).await?;
        }
        job_ids.push(jid);
    }

    // Submit in creation order.
    for jid in &job_ids {
        channel.command(&format!("JSUBM {}", jid)).await?;
    }

    let last_id = job_ids.last().cloned().unwrap_or_default();
    let total_pages = query_total_pages(channel, &last_id).await;

    Ok(SubmissionResult {
        success: true,
        job_id: last_id,
        // Only meaningful when the server grouped several jobs.
        group_id: if targets.len() > 1 { group_id } else { String::new() },
        total_pages,
        error: String::new(),
    })
}

/// Post-submission page-count read-back; best effort, 0 when the server
/// does not report it.
async fn query_total_pages(channel: &mut dyn ControlChannel, job_id: &str) -> u32 {
    if job_id.is_empty() {
        return 0;
    }
    if channel.command(&format!("JOB {}", job_id)).await.is_err() {
        return 0;
    }
    match channel.command("JPARM TOTPAGES").await {
        Ok(reply) => last_number(&reply.text()).unwrap_or(0),
        Err(_) => 0,
    }
}

// ─── Option → JPARM mapping ──────────────────────────────────────────

/// Compile a [`JobOptions`] bundle into the ordered JPARM assignment
/// list applied to every per-destination job.
///
/// String options are emitted only when non-empty ("do not override");
/// numeric and boolean options always carry their value. The order is
/// fixed and exhaustive over the recognized options.
pub fn job_params(options: &JobOptions) -> Vec<(&'static str, String)> {
    let mut params: Vec<(&'static str, String)> = Vec::new();
    let mut string_param = |name: &'static str, value: &str| {
        if !value.is_empty() {
            params.push((name, value.to_string()));
        }
    };

    string_param("COMMENTS", &options.cover_comments);
    string_param("REGARDING", &options.cover_regarding);
    string_param("FROMVOICE", &options.cover_from_voice);
    string_param("FAXNUMBER", &options.cover_from_fax);
    string_param("FROMCOMPANY", &options.cover_from_company);
    string_param("FROMLOCATION", &options.cover_from_location);
    if options.auto_cover_page {
        string_param("COVER", &options.cover_template);
    }
    string_param("TAGLINE", &options.tagline_format);
    string_param("JOBINFO", &options.job_tag);
    string_param("TSI", &options.tsi);
    string_param("SENDTIME", &options.send_time);
    string_param("LASTTIME", &options.kill_time);
    string_param("RETRYTIME", &options.retry_time);

    if !options.page_size.is_empty() {
        match page_dimensions(&options.page_size) {
            Some((width, length)) => {
                params.push(("PAGEWIDTH", width.to_string()));
                params.push(("PAGELENGTH", length.to_string()));
            }
            None => log::warn!("unknown page size '{}', ignored", options.page_size),
        }
    }

    params.push(("NOTIFY", notify_value(options.notify).to_string()));
    params.push(("SCHEDPRI", schedpri_value(options.priority).to_string()));
    params.push(("VRES", format!("{}", options.vres.round() as u32)));
    params.push(("MAXTRIES", options.max_tries.to_string()));
    params.push(("MAXDIALS", options.max_dials.to_string()));
    params.push(("USEECM", bool_value(options.use_ecm).to_string()));
    params.push(("USEXVRES", bool_value(options.use_xvres).to_string()));
    params.push(("BEGBR", speed_to_br(options.desired_speed).to_string()));
    params.push(("MINBR", speed_to_br(options.min_speed).to_string()));
    params.push(("DATAFORMAT", data_format_value(options.data_format).to_string()));

    if options.archive {
        params.push(("DONEOP", "archive".to_string()));
    }

    params
}

fn bool_value(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

fn notify_value(mode: NotifyMode) -> &'static str {
    match mode {
        NotifyMode::None => "NONE",
        NotifyMode::Done => "DONE",
        NotifyMode::Requeued => "REQUEUE",
    }
}

/// Lower schedpri runs sooner; the bands match classic sendfax.
fn schedpri_value(priority: JobPriority) -> u32 {
    match priority {
        JobPriority::High => 63,
        JobPriority::Normal => 127,
        JobPriority::Bulk => 190,
    }
}

fn data_format_value(df: DataFormat) -> &'static str {
    match df {
        DataFormat::OneDimensional => "g31d",
        DataFormat::TwoDimensional => "g32d",
        DataFormat::Mmr => "g4",
    }
}

/// Map a speed in bits/s to the Class-2 bit-rate code the server
/// expects. Speeds between steps round down.
pub(crate) fn speed_to_br(bps: u32) -> u32 {
    const STEPS: [u32; 14] = [
        2_400, 4_800, 7_200, 9_600, 12_000, 14_400, 16_800, 19_200, 21_600, 24_000, 26_400,
        28_800, 31_200, 33_600,
    ];
    let mut code = 0;
    for (i, step) in STEPS.iter().enumerate() {
        if bps >= *step {
            code = i as u32;
        }
    }
    code
}

/// Named page size → (width, length) in millimetres.
pub(crate) fn page_dimensions(name: &str) -> Option<(u32, u32)> {
    match name.to_ascii_lowercase().as_str() {
        "a4" => Some((210, 297)),
        "letter" | "na-let" => Some((216, 279)),
        "legal" => Some((216, 356)),
        "b4" => Some((255, 364)),
        _ => None,
    }
}

// ─── Reply parsing ───────────────────────────────────────────────────

/// Extract `jid:` and `groupid:` values from a JNEW reply such as
/// `200 New job created: jid: 12 groupid: 12.`
fn parse_new_job_reply(text: &str) -> FaxResult<(String, String)> {
    let jid = token_after(text, "jid:");
    let gid = token_after(text, "groupid:").unwrap_or_default();
    match jid {
        Some(jid) if !jid.is_empty() => Ok((jid, gid)),
        _ => Err(FaxError::protocol_error(format!(
            "Cannot parse job id from: {}",
            text
        ))),
    }
}

/// Extract the server-side pathname from a STOT preliminary reply such
/// as `150 FILE: /tmp/doc123.ps (Opening data connection).`
fn parse_stored_document(text: &str) -> FaxResult<String> {
    token_after(text, "FILE:")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            FaxError::protocol_error(format!("Cannot parse document name from: {}", text))
        })
}

/// The whitespace token following `marker`, with trailing punctuation
/// stripped.
fn token_after(text: &str, marker: &str) -> Option<String> {
    let mut tokens = text.split_whitespace();
    while let Some(tok) = tokens.next() {
        if tok.eq_ignore_ascii_case(marker) {
            return tokens
                .next()
                .map(|t| t.trim_end_matches(['.', ',', ';']).to_string());
        }
    }
    None
}

/// Last integer token in a reply, if any.
fn last_number(text: &str) -> Option<u32> {
    text.split_whitespace()
        .rev()
        .find_map(|t| t.trim_end_matches(['.', ',']).parse::<u32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fax::channel::ScriptedChannel;
    use std::io::Write;

    fn temp_doc(contents: &[u8]) -> String {
        let path = std::env::temp_dir().join(format!("faxdoc-{}.ps", uuid::Uuid::new_v4()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_default_params_match_fresh_options() {
        let params = job_params(&JobOptions::default());
        // No string overrides at defaults.
        assert!(params.iter().all(|(n, _)| *n != "COMMENTS"));
        assert!(params.iter().all(|(n, _)| *n != "COVER"));
        assert!(params.iter().all(|(n, _)| *n != "DONEOP"));
        // Numeric/boolean fields always apply.
        let get = |name: &str| {
            params
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("NOTIFY"), "DONE");
        assert_eq!(get("SCHEDPRI"), "127");
        assert_eq!(get("VRES"), "98");
        assert_eq!(get("MAXTRIES"), "3");
        assert_eq!(get("MAXDIALS"), "12");
        assert_eq!(get("USEECM"), "1");
        assert_eq!(get("USEXVRES"), "0");
        assert_eq!(get("BEGBR"), "5");
        assert_eq!(get("MINBR"), "0");
        assert_eq!(get("DATAFORMAT"), "g31d");
        // Applying defaults twice yields the identical list.
        assert_eq!(params, job_params(&JobOptions::default()));
    }

    #[test]
    fn test_string_params_in_fixed_order() {
        let options = JobOptions {
            cover_comments: "hello".into(),
            cover_regarding: "contract".into(),
            job_tag: "batch-7".into(),
            kill_time: "now + 1 day".into(),
            ..JobOptions::default()
        };
        let params = job_params(&options);
        let names: Vec<&str> = params.iter().map(|(n, _)| *n).collect();
        let pos = |n: &str| names.iter().position(|x| *x == n).unwrap();
        assert!(pos("COMMENTS") < pos("REGARDING"));
        assert!(pos("REGARDING") < pos("JOBINFO"));
        assert!(pos("JOBINFO") < pos("LASTTIME"));
        assert!(pos("LASTTIME") < pos("NOTIFY"));
        assert_eq!(params[pos("LASTTIME")].1, "now + 1 day");
    }

    #[test]
    fn test_archive_emits_doneop() {
        let options = JobOptions {
            archive: true,
            ..JobOptions::default()
        };
        let params = job_params(&options);
        assert_eq!(params.last().unwrap(), &("DONEOP", "archive".to_string()));
    }

    #[test]
    fn test_auto_cover_page_gates_template() {
        let mut options = JobOptions {
            cover_template: "corp.ps".into(),
            ..JobOptions::default()
        };
        assert!(job_params(&options)
            .iter()
            .any(|(n, v)| *n == "COVER" && v == "corp.ps"));
        options.auto_cover_page = false;
        assert!(job_params(&options).iter().all(|(n, _)| *n != "COVER"));
    }

    #[test]
    fn test_speed_to_br() {
        assert_eq!(speed_to_br(2_400), 0);
        assert_eq!(speed_to_br(9_600), 3);
        assert_eq!(speed_to_br(14_400), 5);
        assert_eq!(speed_to_br(33_600), 13);
        // Between steps rounds down; below the floor clamps to 0.
        assert_eq!(speed_to_br(10_000), 3);
        assert_eq!(speed_to_br(300), 0);
    }

    #[test]
    fn test_page_dimensions() {
        assert_eq!(page_dimensions("a4"), Some((210, 297)));
        assert_eq!(page_dimensions("Letter"), Some((216, 279)));
        assert_eq!(page_dimensions("tabloid"), None);
    }

    #[test]
    fn test_parse_new_job_reply() {
        let (jid, gid) =
            parse_new_job_reply("200 New job created: jid: 42 groupid: 40.").unwrap();
        assert_eq!(jid, "42");
        assert_eq!(gid, "40");
        assert!(parse_new_job_reply("200 Ok.").is_err());
    }

    #[test]
    fn test_parse_stored_document() {
        assert_eq!(
            parse_stored_document("150 FILE: /var/spool/hylafax/tmp/doc7.ps (data).").unwrap(),
            "/var/spool/hylafax/tmp/doc7.ps"
        );
        assert!(parse_stored_document("150 Opening data connection.").is_err());
    }

    #[tokio::test]
    async fn test_two_destination_submission() {
        let doc = temp_doc(b"%!PS fax body");
        let chan = ScriptedChannel::new();
        let mut boxed = chan.clone();

        let options = JobOptions {
            use_ecm: true,
            ..JobOptions::default()
        };
        let result = submit_many(
            &mut boxed,
            &[doc.clone()],
            &["Bob@555-0100".to_string(), "555-0200#42".to_string()],
            &options,
        )
        .await;
        assert!(result.success, "unexpected failure: {}", result.error);

        // One upload, shared by both jobs.
        let stored = chan.stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].1, b"%!PS fax body");

        let cmds = chan.commands();
        let jnew_positions: Vec<usize> = cmds
            .iter()
            .enumerate()
            .filter(|(_, c)| *c == "JNEW")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(jnew_positions.len(), 2);

        // First job: Bob at 555-0100, no subaddress.
        let first_job = &cmds[jnew_positions[0]..jnew_positions[1]];
        assert!(first_job.contains(&"JPARM DIALSTRING 555-0100".to_string()));
        assert!(first_job.contains(&"JPARM TOUSER Bob".to_string()));
        assert!(!first_job.iter().any(|c| c.starts_with("JPARM SUBADDR")));
        assert!(first_job.contains(&"JPARM USEECM 1".to_string()));
        assert!(first_job
            .iter()
            .any(|c| c.starts_with("JPARM DOCUMENT /tmp/doc")));

        // Second job: bare number with subaddress, no recipient.
        let second_job = &cmds[jnew_positions[1]..];
        assert!(second_job.contains(&"JPARM DIALSTRING 555-0200".to_string()));
        assert!(second_job.contains(&"JPARM SUBADDR 42".to_string()));
        assert!(!second_job.iter().any(|c| c.starts_with("JPARM TOUSER")));

        // Both submitted, in creation order; result carries the last id.
        let subm: Vec<&String> = cmds.iter().filter(|c| c.starts_with("JSUBM")).collect();
        assert_eq!(subm, vec!["JSUBM 1", "JSUBM 2"]);
        assert_eq!(result.job_id, "2");
        assert_eq!(result.group_id, "1");

        std::fs::remove_file(doc).ok();
    }

    #[tokio::test]
    async fn test_empty_dial_string_aborts_before_io() {
        let chan = ScriptedChannel::new();
        let mut boxed = chan.clone();
        let result = submit_many(
            &mut boxed,
            &["a.pdf".to_string()],
            &["Bob@".to_string()],
            &JobOptions::default(),
        )
        .await;
        assert!(!result.success);
        assert!(result.error.contains("dial string"));
        assert_eq!(chan.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_fails_with_no_jobs() {
        let chan = ScriptedChannel::new();
        let mut boxed = chan.clone();
        let result = submit_many(
            &mut boxed,
            &["/no/such/document.ps".to_string()],
            &["555-0100".to_string()],
            &JobOptions::default(),
        )
        .await;
        assert!(!result.success);
        assert!(result.error.contains("/no/such/document.ps"));
        assert!(!chan.commands().iter().any(|c| c == "JNEW"));
    }

    #[tokio::test]
    async fn test_rejected_submission_reports_server_text() {
        let doc = temp_doc(b"doc");
        let chan = ScriptedChannel::new();
        chan.push_reply(550, "STOT rejected: quota exceeded");
        let mut boxed = chan.clone();
        let result = submit_many(
            &mut boxed,
            &[doc.clone()],
            &["555-0100".to_string()],
            &JobOptions::default(),
        )
        .await;
        assert!(!result.success);
        assert!(result.error.contains("quota exceeded"));
        assert_eq!(result.job_id, "");
        std::fs::remove_file(doc).ok();
    }
}
