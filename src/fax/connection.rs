//! TCP transport — establishes the hfaxd control connection.
//!
//! Plain TCP only (hfaxd has no TLS upgrade); applies the connect-timeout
//! policy from `FaxConnectionConfig` and reads the server banner.

use crate::fax::error::{FaxError, FaxResult};
use crate::fax::protocol::FaxCodec;
use crate::fax::types::{FaxConnectionConfig, FaxReply};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Establish the control connection and return a ready-to-use codec
/// **plus** the server welcome banner.
pub async fn connect(config: &FaxConnectionConfig) -> FaxResult<(FaxCodec, FaxReply)> {
    let addr = format!("{}:{}", config.host, config.port);
    let dur = Duration::from_secs(config.connect_timeout_sec);

    let tcp = timeout(dur, TcpStream::connect(&addr))
        .await
        .map_err(|_| FaxError::timeout(format!("TCP connect to {} timed out", addr)))?
        .map_err(|e| FaxError::connection_failed(format!("TCP connect to {}: {}", addr, e)))?;

    tcp.set_nodelay(true).ok();

    let mut codec = FaxCodec::from_tcp(tcp);
    codec.verbose = config.verbose;
    let banner = codec.read_reply().await?;
    if !banner.is_success() {
        return Err(FaxError::connection_failed(format!(
            "Server refused connection: {}",
            banner.text()
        )));
    }
    Ok((codec, banner))
}
