//! Data-connection management for listing retrieval and document upload.
//!
//! hfaxd inherits the RFC 959 data-connection model:
//! - **PASV** — server opens a port, client connects
//! - **PORT** — client opens a port, tells the server
//!
//! The extended variants (EPSV/EPRT) are not part of the hfaxd dialect.

use crate::fax::error::{FaxError, FaxResult};
use crate::fax::protocol::FaxCodec;
use crate::fax::types::DataChannelMode;
use regex::Regex;
use std::net::{IpAddr, SocketAddr};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};

/// Open a data connection according to the configured mode.
pub async fn open_data_channel(
    codec: &mut FaxCodec,
    mode: DataChannelMode,
    data_timeout: Duration,
) -> FaxResult<TcpStream> {
    match mode {
        DataChannelMode::Passive => open_pasv(codec, data_timeout).await,
        DataChannelMode::Active => open_port(codec, data_timeout).await,
    }
}

// ─── PASV ────────────────────────────────────────────────────────────

/// Issue `PASV`, parse the reply, connect to the returned address.
///
/// Reply format: `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`
async fn open_pasv(codec: &mut FaxCodec, data_timeout: Duration) -> FaxResult<TcpStream> {
    let reply = codec.expect_ok("PASV").await?;
    let addr = parse_pasv_reply(&reply.text())?;
    let tcp = timeout(data_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| FaxError::data_channel("PASV data connect timed out"))?
        .map_err(|e| FaxError::data_channel(format!("PASV data connect: {}", e)))?;
    Ok(tcp)
}

/// Parse `(h1,h2,h3,h4,p1,p2)` from a 227 reply.
pub(crate) fn parse_pasv_reply(text: &str) -> FaxResult<SocketAddr> {
    let re = Regex::new(r"\((\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)").unwrap();
    let caps = re
        .captures(text)
        .ok_or_else(|| FaxError::protocol_error(format!("Cannot parse PASV: {}", text)))?;

    let nums: Vec<u8> = (1..=6)
        .map(|i| {
            caps[i]
                .parse::<u8>()
                .map_err(|_| FaxError::protocol_error("PASV number out of range"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ip = IpAddr::from([nums[0], nums[1], nums[2], nums[3]]);
    let port = (nums[4] as u16) * 256 + (nums[5] as u16);
    Ok(SocketAddr::new(ip, port))
}

// ─── PORT ────────────────────────────────────────────────────────────

/// Bind a local TCP listener, tell the server via `PORT`, then accept.
async fn open_port(codec: &mut FaxCodec, data_timeout: Duration) -> FaxResult<TcpStream> {
    let listener = TcpListener::bind("0.0.0.0:0")
        .await
        .map_err(|e| FaxError::data_channel(format!("PORT bind: {}", e)))?;
    let local = listener
        .local_addr()
        .map_err(|e| FaxError::data_channel(format!("PORT local_addr: {}", e)))?;

    let ip = match local.ip() {
        IpAddr::V4(v4) => v4,
        _ => return Err(FaxError::data_channel("PORT requires IPv4")),
    };
    let octets = ip.octets();
    let port = local.port();

    let cmd = format!(
        "PORT {},{},{},{},{},{}",
        octets[0],
        octets[1],
        octets[2],
        octets[3],
        port / 256,
        port % 256
    );
    codec.expect_ok(&cmd).await?;

    let (tcp, _) = timeout(data_timeout, listener.accept())
        .await
        .map_err(|_| FaxError::data_channel("PORT accept timed out"))?
        .map_err(|e| FaxError::data_channel(format!("PORT accept: {}", e)))?;
    Ok(tcp)
}
