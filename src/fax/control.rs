//! Job lifecycle control: kill, suspend, resume, wait, inspect, modify.
//!
//! All operations run over the job-control connection and map one public
//! method to one server verb (plus the JOB selection round-trip where a
//! verb operates on "the current job").

use crate::fax::channel::ControlChannel;
use crate::fax::error::{FaxError, FaxErrorKind, FaxResult};
use crate::fax::submit::job_params;
use crate::fax::types::{JobOptions, JobRecord};

/// Remove a job from the scheduler. Terminal: a killed job cannot be
/// resumed.
pub async fn kill_job(channel: &mut dyn ControlChannel, job_id: &str) -> FaxResult<()> {
    channel.command(&format!("JKILL {}", job_id)).await?;
    log::debug!("killed job {}", job_id);
    Ok(())
}

/// Take a job out of the scheduler without discarding it.
pub async fn suspend_job(channel: &mut dyn ControlChannel, job_id: &str) -> FaxResult<()> {
    channel.command(&format!("JSUSP {}", job_id)).await?;
    log::debug!("suspended job {}", job_id);
    Ok(())
}

/// Hand a suspended job back to the scheduler.
pub async fn resume_job(channel: &mut dyn ControlChannel, job_id: &str) -> FaxResult<()> {
    channel.command(&format!("JSUBM {}", job_id)).await?;
    log::debug!("resumed job {}", job_id);
    Ok(())
}

/// Block until the job reaches a terminal state. The server holds the
/// reply until then, so this can wait for as long as the job runs.
pub async fn wait_for_job(channel: &mut dyn ControlChannel, job_id: &str) -> FaxResult<()> {
    channel.command(&format!("JWAIT {}", job_id)).await?;
    log::debug!("job {} reached a terminal state", job_id);
    Ok(())
}

/// Fetch the current server-side parameters of one job.
///
/// Returns `Ok(None)` when the server does not know the job (already
/// purged, or never existed); other failures propagate.
pub async fn get_job_info(
    channel: &mut dyn ControlChannel,
    job_id: &str,
) -> FaxResult<Option<JobRecord>> {
    match channel.command(&format!("JOB {}", job_id)).await {
        Ok(_) => {}
        Err(e) if e.kind == FaxErrorKind::CommandRejected => return Ok(None),
        Err(e) => return Err(e),
    }

    let mut record = JobRecord {
        job_id: job_id.to_string(),
        ..JobRecord::default()
    };
    record.state = query_param(channel, "STATE").await?;
    record.pages = query_param(channel, "NPAGES").await?;
    record.dials = query_param(channel, "NDIALS").await?;
    record.tts = query_param(channel, "SENDTIME").await?;
    record.sender = query_param(channel, "OWNER").await?;
    record.status = query_param(channel, "STATUS").await?;
    Ok(Some(record))
}

/// Re-parameterise a queued job: suspend it, select it, replay the
/// option bundle, and hand it back to the scheduler.
///
/// Fails when the job is already running or done; the server rejects
/// JSUSP for jobs it can no longer pull back.
pub async fn modify_job(
    channel: &mut dyn ControlChannel,
    job_id: &str,
    options: &JobOptions,
) -> FaxResult<()> {
    channel
        .command(&format!("JSUSP {}", job_id))
        .await
        .map_err(|e| match e.kind {
            FaxErrorKind::CommandRejected => FaxError::command_rejected(
                e.code.unwrap_or(0),
                format!("Job {} cannot be modified: {}", job_id, e.message),
            ),
            _ => e,
        })?;
    channel.command(&format!("JOB {}", job_id)).await?;
    for (name, value) in job_params(options) {
        channel
            .command(&format!("JPARM {} {}", name, value))
            .await?;
    }
    channel.command(&format!("JSUBM {}", job_id)).await?;
    log::debug!("modified and resubmitted job {}", job_id);
    Ok(())
}

/// Pull the value out of a `213 <NAME> <value...>` JPARM reply.
async fn query_param(channel: &mut dyn ControlChannel, name: &str) -> FaxResult<String> {
    let reply = channel.command(&format!("JPARM {}", name)).await?;
    Ok(param_value(&reply.text(), name))
}

fn param_value(text: &str, name: &str) -> String {
    let mut tokens = text.split_whitespace().peekable();
    // Skip the reply code if present.
    if tokens
        .peek()
        .map_or(false, |t| t.chars().all(|c| c.is_ascii_digit()) && t.len() == 3)
    {
        tokens.next();
    }
    // Skip the echoed parameter name.
    if tokens
        .peek()
        .map_or(false, |t| t.trim_end_matches(':').eq_ignore_ascii_case(name))
    {
        tokens.next();
    }
    tokens.collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fax::channel::ScriptedChannel;

    #[test]
    fn test_param_value_strips_code_and_name() {
        assert_eq!(param_value("213 STATE 7", "STATE"), "7");
        assert_eq!(param_value("213 OWNER alice", "OWNER"), "alice");
        assert_eq!(
            param_value("213 STATUS No answer from remote", "STATUS"),
            "No answer from remote"
        );
        // A bare value still comes through.
        assert_eq!(param_value("7", "STATE"), "7");
    }

    #[tokio::test]
    async fn test_kill_sends_jkill() {
        let chan = ScriptedChannel::new();
        let mut boxed = chan.clone();
        kill_job(&mut boxed, "42").await.unwrap();
        assert_eq!(chan.commands(), vec!["JKILL 42"]);
    }

    #[tokio::test]
    async fn test_suspend_resume_verbs() {
        let chan = ScriptedChannel::new();
        let mut boxed = chan.clone();
        suspend_job(&mut boxed, "7").await.unwrap();
        resume_job(&mut boxed, "7").await.unwrap();
        assert_eq!(chan.commands(), vec!["JSUSP 7", "JSUBM 7"]);
    }

    #[tokio::test]
    async fn test_kill_rejected_propagates() {
        let chan = ScriptedChannel::new();
        chan.push_reply(500, "JKILL: permission denied.");
        let mut boxed = chan.clone();
        let err = kill_job(&mut boxed, "42").await.unwrap_err();
        assert_eq!(err.kind, FaxErrorKind::CommandRejected);
        assert!(err.message.contains("permission denied"));
    }

    #[tokio::test]
    async fn test_job_info_for_unknown_job_is_none() {
        let chan = ScriptedChannel::new();
        chan.push_reply(500, "JOB: no such job.");
        let mut boxed = chan.clone();
        assert!(get_job_info(&mut boxed, "999").await.unwrap().is_none());
        assert_eq!(chan.commands(), vec!["JOB 999"]);
    }

    #[tokio::test]
    async fn test_job_info_collects_parameters() {
        let chan = ScriptedChannel::new();
        chan.push_reply(200, "Current job: 42.");
        chan.push_reply(213, "STATE 7");
        chan.push_reply(213, "NPAGES 3");
        chan.push_reply(213, "NDIALS 1");
        chan.push_reply(213, "SENDTIME 2026/08/31 12.30.00");
        chan.push_reply(213, "OWNER alice");
        chan.push_reply(213, "STATUS");
        let mut boxed = chan.clone();
        let record = get_job_info(&mut boxed, "42").await.unwrap().unwrap();
        assert_eq!(record.job_id, "42");
        assert_eq!(record.state, "7");
        assert_eq!(record.pages, "3");
        assert_eq!(record.sender, "alice");
        assert_eq!(record.status, "");
    }

    #[tokio::test]
    async fn test_modify_suspends_replays_and_resubmits() {
        let chan = ScriptedChannel::new();
        let mut boxed = chan.clone();
        let options = JobOptions {
            max_tries: 5,
            ..JobOptions::default()
        };
        modify_job(&mut boxed, "42", &options).await.unwrap();
        let cmds = chan.commands();
        assert_eq!(cmds.first().unwrap(), "JSUSP 42");
        assert_eq!(cmds.get(1).unwrap(), "JOB 42");
        assert!(cmds.contains(&"JPARM MAXTRIES 5".to_string()));
        assert_eq!(cmds.last().unwrap(), "JSUBM 42");
    }

    #[tokio::test]
    async fn test_modify_running_job_is_rejected() {
        let chan = ScriptedChannel::new();
        chan.push_reply(504, "JSUSP: job is being processed.");
        let mut boxed = chan.clone();
        let err = modify_job(&mut boxed, "42", &JobOptions::default())
            .await
            .unwrap_err();
        assert!(err.message.contains("cannot be modified"));
        // Nothing past the failed suspend.
        assert_eq!(chan.commands(), vec!["JSUSP 42"]);
    }
}
