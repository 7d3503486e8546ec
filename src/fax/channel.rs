//! Control-connection abstraction.
//!
//! `ControlChannel` is the seam between the session/job/status logic and
//! the wire: open/close a control connection, authenticate, issue a
//! command, and move bytes over a secondary data connection. The real
//! implementation is `TcpControlChannel`; `ScriptedChannel` is a fully
//! in-memory double that records every call for unit tests.

use crate::fax::connection;
use crate::fax::error::{FaxError, FaxResult};
use crate::fax::protocol::FaxCodec;
use crate::fax::transfer;
use crate::fax::types::{FaxConnectionConfig, FaxReply};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// One control connection to an hfaxd server.
///
/// Implementations must be `Send` so a session can be moved across
/// tasks; a single channel is never used concurrently.
#[async_trait::async_trait]
pub trait ControlChannel: Send {
    /// Retarget the channel. Takes effect on the next `connect()`.
    fn set_host(&mut self, host: &str, port: u16);

    /// Toggle wire-traffic logging verbosity.
    fn set_verbose(&mut self, verbose: bool);

    fn is_connected(&self) -> bool;

    /// Establish the control connection. No-op when already connected.
    async fn connect(&mut self) -> FaxResult<()>;

    /// Authenticate. `None` means the identity of the calling process.
    async fn login(&mut self, username: Option<&str>) -> FaxResult<()>;

    /// Issue a command and return the categorised reply.
    async fn command(&mut self, cmd: &str) -> FaxResult<FaxReply>;

    /// Issue `cmd` with a secondary data connection open for reading,
    /// collect the entire response body, confirm completion on the
    /// control connection, and return the body.
    async fn retrieve(&mut self, cmd: &str) -> FaxResult<String>;

    /// Issue `cmd` with a secondary data connection open for writing,
    /// send `data`, confirm completion, and return the preliminary
    /// reply (which for STOT carries the server-side document name).
    async fn store(&mut self, cmd: &str, data: &[u8]) -> FaxResult<FaxReply>;

    /// Close the connection. Safe to call when already closed.
    async fn quit(&mut self);
}

// ─── TCP implementation ──────────────────────────────────────────────

/// The real wire implementation over plain TCP.
pub struct TcpControlChannel {
    config: FaxConnectionConfig,
    codec: Option<FaxCodec>,
}

impl TcpControlChannel {
    pub fn new(config: FaxConnectionConfig) -> Self {
        Self {
            config,
            codec: None,
        }
    }

    fn codec_mut(&mut self) -> FaxResult<&mut FaxCodec> {
        self.codec.as_mut().ok_or_else(FaxError::not_connected)
    }

    fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.config.data_timeout_sec)
    }
}

#[async_trait::async_trait]
impl ControlChannel for TcpControlChannel {
    fn set_host(&mut self, host: &str, port: u16) {
        self.config.host = host.to_string();
        self.config.port = port;
    }

    fn set_verbose(&mut self, verbose: bool) {
        self.config.verbose = verbose;
        if let Some(codec) = self.codec.as_mut() {
            codec.verbose = verbose;
        }
    }

    fn is_connected(&self) -> bool {
        self.codec.is_some()
    }

    async fn connect(&mut self) -> FaxResult<()> {
        if self.codec.is_some() {
            return Ok(());
        }
        let (codec, banner) = connection::connect(&self.config).await?;
        log::debug!(
            "connected to {}:{} — {}",
            self.config.host,
            self.config.port,
            banner.text()
        );
        self.codec = Some(codec);
        Ok(())
    }

    async fn login(&mut self, username: Option<&str>) -> FaxResult<()> {
        let user = match username {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => self.config.effective_username(),
        };
        let password = self.config.password.clone();
        let codec = self.codec_mut()?;

        let user_reply = codec.execute(&format!("USER {}", user)).await?;
        if user_reply.code == 331 {
            let pass_reply = codec.execute(&format!("PASS {}", password)).await?;
            if !pass_reply.is_success() {
                return Err(FaxError::auth_failed(format!(
                    "Login failed: {}",
                    pass_reply.text()
                )));
            }
        } else if !user_reply.is_success() {
            return Err(FaxError::auth_failed(format!(
                "USER rejected: {}",
                user_reply.text()
            )));
        }
        Ok(())
    }

    async fn command(&mut self, cmd: &str) -> FaxResult<FaxReply> {
        self.codec_mut()?.execute(cmd).await
    }

    async fn retrieve(&mut self, cmd: &str) -> FaxResult<String> {
        let mode = self.config.data_channel_mode;
        let data_timeout = self.data_timeout();
        let codec = self.codec_mut()?;

        // Stream mode before opening the data connection.
        codec.expect_ok("MODE S").await?;

        let mut stream = transfer::open_data_channel(codec, mode, data_timeout).await?;
        let reply = codec.execute(cmd).await?;
        if !reply.is_preliminary() && !reply.is_success() {
            return Err(FaxError::from_reply(reply.code, &reply.text()));
        }

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await?;
        drop(stream);

        let done = codec.read_reply().await?;
        if !done.is_success() {
            return Err(FaxError::from_reply(done.code, &done.text()));
        }

        String::from_utf8(buf)
            .map_err(|e| FaxError::protocol_error(format!("Listing not UTF-8: {}", e)))
    }

    async fn store(&mut self, cmd: &str, data: &[u8]) -> FaxResult<FaxReply> {
        let mode = self.config.data_channel_mode;
        let data_timeout = self.data_timeout();
        let codec = self.codec_mut()?;

        codec.expect_ok("TYPE I").await?;

        let mut stream = transfer::open_data_channel(codec, mode, data_timeout).await?;
        let reply = codec.execute(cmd).await?;
        if !reply.is_preliminary() && !reply.is_success() {
            return Err(FaxError::from_reply(reply.code, &reply.text()));
        }

        stream.write_all(data).await?;
        stream.shutdown().await?;
        drop(stream);

        let done = codec.read_reply().await?;
        if !done.is_success() {
            return Err(FaxError::from_reply(done.code, &done.text()));
        }
        Ok(reply)
    }

    async fn quit(&mut self) {
        if let Some(mut codec) = self.codec.take() {
            let _ = codec.execute("QUIT").await;
        }
    }
}

// ─── Scripted test double ────────────────────────────────────────────

#[derive(Default)]
struct ScriptState {
    connected: bool,
    connect_calls: u32,
    login_calls: u32,
    commands: Vec<String>,
    stored: Vec<(String, Vec<u8>)>,
    replies: VecDeque<FaxReply>,
    bodies: VecDeque<String>,
    fail_connect: bool,
    fail_login: bool,
    fail_retrieve: bool,
    jobs_created: u32,
    docs_stored: u32,
}

/// A fully in-memory channel for unit tests.
///
/// Records every call and replays scripted replies; when the script is
/// exhausted it synthesises sensible defaults (200 for commands, an
/// incrementing `jid:` for JNEW, a `FILE:` pathname for STOT) so tests
/// only script the replies they care about. Clones share state, so a
/// test can keep a handle after moving the channel into a session.
#[derive(Clone, Default)]
pub struct ScriptedChannel {
    state: Arc<StdMutex<ScriptState>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next command/store call.
    pub fn push_reply(&self, code: u16, text: &str) {
        self.state.lock().unwrap().replies.push_back(FaxReply {
            code,
            lines: vec![format!("{} {}", code, text)],
        });
    }

    /// Queue a data-connection body for the next retrieve call.
    pub fn push_body(&self, body: &str) {
        self.state
            .lock()
            .unwrap()
            .bodies
            .push_back(body.to_string());
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().unwrap().fail_connect = fail;
    }

    pub fn fail_login(&self, fail: bool) {
        self.state.lock().unwrap().fail_login = fail;
    }

    pub fn fail_retrieve(&self, fail: bool) {
        self.state.lock().unwrap().fail_retrieve = fail;
    }

    /// Every command issued, in order (including retrieve/store verbs).
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    /// Every stored payload, in order.
    pub fn stored(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().unwrap().stored.clone()
    }

    pub fn connect_calls(&self) -> u32 {
        self.state.lock().unwrap().connect_calls
    }

    pub fn login_calls(&self) -> u32 {
        self.state.lock().unwrap().login_calls
    }

    /// Total calls of any kind observed by this channel.
    pub fn total_calls(&self) -> u32 {
        let s = self.state.lock().unwrap();
        s.connect_calls + s.login_calls + s.commands.len() as u32
    }

    fn default_reply(state: &mut ScriptState, cmd: &str) -> FaxReply {
        let line = if cmd.starts_with("JNEW") {
            state.jobs_created += 1;
            format!(
                "200 New job created: jid: {} groupid: 1.",
                state.jobs_created
            )
        } else if cmd.starts_with("STOT") {
            state.docs_stored += 1;
            format!("150 FILE: /tmp/doc{}.ps (Opening data connection).", state.docs_stored)
        } else if cmd == "JPARM TOTPAGES" {
            "213 TOTPAGES 0".to_string()
        } else {
            "200 Ok.".to_string()
        };
        let code = line[..3].parse().unwrap_or(200);
        FaxReply {
            code,
            lines: vec![line],
        }
    }
}

#[async_trait::async_trait]
impl ControlChannel for ScriptedChannel {
    fn set_host(&mut self, host: &str, port: u16) {
        self.state
            .lock()
            .unwrap()
            .commands
            .push(format!("[set_host {}:{}]", host, port));
    }

    fn set_verbose(&mut self, _verbose: bool) {}

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    async fn connect(&mut self) -> FaxResult<()> {
        let mut s = self.state.lock().unwrap();
        s.connect_calls += 1;
        if s.fail_connect {
            return Err(FaxError::connection_failed("scripted connect failure"));
        }
        s.connected = true;
        Ok(())
    }

    async fn login(&mut self, _username: Option<&str>) -> FaxResult<()> {
        let mut s = self.state.lock().unwrap();
        s.login_calls += 1;
        if s.fail_login {
            return Err(FaxError::auth_failed("scripted login failure"));
        }
        Ok(())
    }

    async fn command(&mut self, cmd: &str) -> FaxResult<FaxReply> {
        let mut s = self.state.lock().unwrap();
        s.commands.push(cmd.to_string());
        let reply = match s.replies.pop_front() {
            Some(r) => r,
            None => Self::default_reply(&mut s, cmd),
        };
        if !reply.is_success() {
            return Err(FaxError::from_reply(reply.code, &reply.text()));
        }
        Ok(reply)
    }

    async fn retrieve(&mut self, cmd: &str) -> FaxResult<String> {
        let mut s = self.state.lock().unwrap();
        s.commands.push(cmd.to_string());
        if s.fail_retrieve {
            return Err(FaxError::data_channel("scripted data-channel failure"));
        }
        Ok(s.bodies.pop_front().unwrap_or_default())
    }

    async fn store(&mut self, cmd: &str, data: &[u8]) -> FaxResult<FaxReply> {
        let mut s = self.state.lock().unwrap();
        s.commands.push(cmd.to_string());
        s.stored.push((cmd.to_string(), data.to_vec()));
        let reply = match s.replies.pop_front() {
            Some(r) => r,
            None => Self::default_reply(&mut s, cmd),
        };
        if !reply.is_success() {
            return Err(FaxError::from_reply(reply.code, &reply.text()));
        }
        Ok(reply)
    }

    async fn quit(&mut self) {
        let mut s = self.state.lock().unwrap();
        s.commands.push("QUIT".to_string());
        s.connected = false;
    }
}
