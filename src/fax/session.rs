//! Session facade over a pair of control connections.
//!
//! hfaxd blocks the control connection while it works, so the session
//! keeps two of them: one dedicated to job submission and control, one
//! to status queries. A long LIST on the status connection never delays
//! a JSUBM on the job connection. Both connections target the same
//! server and are opened, authenticated, and closed together.

use crate::fax::channel::{ControlChannel, TcpControlChannel};
use crate::fax::control;
use crate::fax::error::{FaxError, FaxResult};
use crate::fax::queue;
use crate::fax::submit;
use crate::fax::types::{
    FaxConnectionConfig, JobOptions, JobRecord, QueueKind, QueueListing, SessionInfo,
    SubmissionResult, TimeZoneMode,
};
use chrono::{DateTime, Utc};

pub struct FaxSession {
    config: FaxConnectionConfig,
    id: String,
    job_channel: Box<dyn ControlChannel>,
    status_channel: Box<dyn ControlChannel>,
    connected: bool,
    logged_in: bool,
    connected_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl FaxSession {
    /// A session over plain TCP to the configured server.
    pub fn new(config: FaxConnectionConfig) -> Self {
        let job_channel = Box::new(TcpControlChannel::new(config.clone()));
        let status_channel = Box::new(TcpControlChannel::new(config.clone()));
        Self::with_channels(config, job_channel, status_channel)
    }

    /// A session over caller-supplied channels. Used for alternative
    /// transports and for tests.
    pub fn with_channels(
        config: FaxConnectionConfig,
        job_channel: Box<dyn ControlChannel>,
        status_channel: Box<dyn ControlChannel>,
    ) -> Self {
        Self {
            config,
            id: uuid::Uuid::new_v4().to_string(),
            job_channel,
            status_channel,
            connected: false,
            logged_in: false,
            connected_at: None,
            last_error: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// The most recent failure message, if any operation has failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            host: self.config.host.clone(),
            port: self.config.port,
            username: self.config.effective_username(),
            connected: self.connected,
            logged_in: self.logged_in,
            connected_at: self.connected_at,
            label: self.config.label.clone(),
        }
    }

    // ─── Configuration setters ───────────────────────────────────────

    /// Retarget the session. Takes effect on the next `connect()`; an
    /// open session keeps talking to the old host until reconnected.
    pub fn set_host(&mut self, host: &str) {
        self.config.host = host.to_string();
        self.job_channel.set_host(host, self.config.port);
        self.status_channel.set_host(host, self.config.port);
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.config.verbose = verbose;
        self.job_channel.set_verbose(verbose);
        self.status_channel.set_verbose(verbose);
    }

    /// Select the timezone the server reports times in. Applied to the
    /// status connection at the next login.
    pub fn set_timezone(&mut self, timezone: TimeZoneMode) {
        self.config.timezone = timezone;
    }

    // ─── Lifecycle ───────────────────────────────────────────────────

    /// Open both control connections. Idempotent; a failure on either
    /// connection leaves the session fully disconnected.
    pub async fn connect(&mut self) -> FaxResult<()> {
        if self.connected {
            return Ok(());
        }
        if let Err(e) = self.job_channel.connect().await {
            return Err(self.remember(e));
        }
        if let Err(e) = self.status_channel.connect().await {
            // No half-open sessions.
            self.job_channel.quit().await;
            return Err(self.remember(e));
        }
        self.connected = true;
        self.connected_at = Some(Utc::now());
        log::info!(
            "fax session {} connected to {}:{}",
            self.id,
            self.config.host,
            self.config.port
        );
        Ok(())
    }

    /// Authenticate both connections. Idempotent. The job connection
    /// logs in first; if the status connection then fails, the session
    /// reports the failure and stays not-logged-in even though the job
    /// connection's server-side login has succeeded.
    pub async fn login(&mut self, username: Option<&str>) -> FaxResult<()> {
        if !self.connected {
            return Err(self.remember(FaxError::not_connected()));
        }
        if self.logged_in {
            return Ok(());
        }
        if let Err(e) = self.job_channel.login(username).await {
            return Err(self.remember(e));
        }
        if let Err(e) = self.status_channel.login(username).await {
            return Err(self.remember(e));
        }
        self.logged_in = true;

        // Report times the way the caller asked; not fatal if refused.
        let tz = match self.config.timezone {
            TimeZoneMode::Local => "TZONE LOCAL",
            TimeZoneMode::Gmt => "TZONE GMT",
        };
        if let Err(e) = self.status_channel.command(tz).await {
            log::warn!("timezone selection refused: {}", e);
        }
        log::info!("fax session {} logged in", self.id);
        Ok(())
    }

    /// Close both connections. Always succeeds; safe when already
    /// disconnected.
    pub async fn disconnect(&mut self) {
        self.job_channel.quit().await;
        self.status_channel.quit().await;
        self.connected = false;
        self.logged_in = false;
        self.connected_at = None;
        log::info!("fax session {} disconnected", self.id);
    }

    // ─── Job submission ──────────────────────────────────────────────

    /// Send `files` to every destination. Never returns an error: all
    /// failures come back inside the result.
    pub async fn send_fax(
        &mut self,
        files: &[String],
        destinations: &[String],
        options: &JobOptions,
    ) -> SubmissionResult {
        if !self.logged_in {
            let result = SubmissionResult::failed("Not connected or logged in");
            self.last_error = Some(result.error.clone());
            return result;
        }
        let result = submit::submit_many(self.job_channel.as_mut(), files, destinations, options)
            .await;
        if !result.success {
            self.last_error = Some(result.error.clone());
        }
        result
    }

    /// Send `files` to a single destination.
    pub async fn send_fax_to(
        &mut self,
        files: &[String],
        destination: &str,
        options: &JobOptions,
    ) -> SubmissionResult {
        self.send_fax(files, &[destination.to_string()], options)
            .await
    }

    // ─── Status queries ──────────────────────────────────────────────

    /// Fetch one queue with per-line parse outcomes.
    pub async fn query_queue(&mut self, kind: QueueKind) -> FaxResult<QueueListing> {
        if !self.logged_in {
            return Err(self.remember(FaxError::not_logged_in()));
        }
        match queue::fetch(self.status_channel.as_mut(), kind).await {
            Ok(listing) => Ok(listing),
            Err(e) => Err(self.remember(e)),
        }
    }

    /// Best-effort queue fetch: an empty list on any failure, with the
    /// failure logged and retained in `last_error()`.
    pub async fn get_job_status(&mut self, kind: QueueKind) -> Vec<JobRecord> {
        match self.query_queue(kind).await {
            Ok(listing) => listing.records,
            Err(e) => {
                log::warn!("queue query failed: {}", e);
                Vec::new()
            }
        }
    }

    // ─── Job control ─────────────────────────────────────────────────

    pub async fn kill_job(&mut self, job_id: &str) -> FaxResult<()> {
        let channel = self.require_login()?;
        control::kill_job(channel, job_id).await
    }

    pub async fn suspend_job(&mut self, job_id: &str) -> FaxResult<()> {
        let channel = self.require_login()?;
        control::suspend_job(channel, job_id).await
    }

    pub async fn resume_job(&mut self, job_id: &str) -> FaxResult<()> {
        let channel = self.require_login()?;
        control::resume_job(channel, job_id).await
    }

    /// Block until the job reaches a terminal state.
    pub async fn wait_for_job(&mut self, job_id: &str) -> FaxResult<()> {
        let channel = self.require_login()?;
        control::wait_for_job(channel, job_id).await
    }

    /// Current server-side parameters of one job, `None` when unknown.
    pub async fn get_job_info(&mut self, job_id: &str) -> FaxResult<Option<JobRecord>> {
        let channel = self.require_login()?;
        control::get_job_info(channel, job_id).await
    }

    /// Re-parameterise a queued job.
    pub async fn modify_job(&mut self, job_id: &str, options: &JobOptions) -> FaxResult<()> {
        let channel = self.require_login()?;
        control::modify_job(channel, job_id, options).await
    }

    // ─── Internals ───────────────────────────────────────────────────

    /// Fail fast, with no collaborator traffic, when the session is not
    /// ready for job operations.
    fn require_login(&mut self) -> FaxResult<&mut dyn ControlChannel> {
        if !self.connected || !self.logged_in {
            let e = FaxError::not_logged_in();
            self.last_error = Some(e.message.clone());
            return Err(e);
        }
        Ok(self.job_channel.as_mut())
    }

    fn remember(&mut self, e: FaxError) -> FaxError {
        self.last_error = Some(e.message.clone());
        e
    }
}
