//! Data-channel management.
//!
//! - **PASV** — server opens a port, client connects
//! - **PORT** — client opens a port, tells the server, accepts
//!
//! PORT announces the local address of the control connection, so it works
//! on the same interface the server already reaches us through.

use crate::ftp::protocol::FtpCodec;
use crate::ftp::types::DataChannelMode;
use lazy_static::lazy_static;
use regex::Regex;
use remfs_core::{RemoteError, RemoteResult};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};

lazy_static! {
    static ref PASV_RE: Regex =
        Regex::new(r"\((\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)").expect("valid PASV regex");
}

/// A data connection that is either already connected (PASV) or still
/// waiting for the server to dial in (PORT).
pub enum DataChannel {
    Connected(TcpStream),
    Listening(TcpListener),
}

impl DataChannel {
    /// Resolve into a connected stream. Call after the transfer command has
    /// been accepted by the server.
    pub async fn into_stream(self, data_timeout: Duration) -> RemoteResult<TcpStream> {
        match self {
            DataChannel::Connected(tcp) => Ok(tcp),
            DataChannel::Listening(listener) => {
                let (tcp, _) = timeout(data_timeout, listener.accept())
                    .await
                    .map_err(|_| RemoteError::connection("PORT accept timed out"))?
                    .map_err(|e| RemoteError::connection(format!("PORT accept: {}", e)))?;
                Ok(tcp)
            }
        }
    }
}

/// Open a data channel according to the configured mode.
pub async fn open_data_channel(
    codec: &mut FtpCodec,
    mode: DataChannelMode,
    control_local: Option<IpAddr>,
    data_timeout: Duration,
) -> RemoteResult<DataChannel> {
    match mode {
        DataChannelMode::Passive => open_pasv(codec, data_timeout)
            .await
            .map(DataChannel::Connected),
        DataChannelMode::Active => open_port(codec, control_local)
            .await
            .map(DataChannel::Listening),
    }
}

// ─── PASV ────────────────────────────────────────────────────────────

/// `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`
async fn open_pasv(codec: &mut FtpCodec, data_timeout: Duration) -> RemoteResult<TcpStream> {
    let resp = codec.expect_ok("PASV").await?;
    let addr = parse_pasv_response(&resp.text())?;
    let tcp = timeout(data_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| RemoteError::connection("PASV data connect timed out"))?
        .map_err(|e| RemoteError::connection(format!("PASV data connect: {}", e)))?;
    Ok(tcp)
}

pub(crate) fn parse_pasv_response(text: &str) -> RemoteResult<SocketAddr> {
    let caps = PASV_RE
        .captures(text)
        .ok_or_else(|| RemoteError::protocol(format!("Cannot parse PASV: {}", text)))?;

    let nums = (1..=6)
        .map(|i| {
            caps[i]
                .parse::<u8>()
                .map_err(|_| RemoteError::protocol("PASV number out of range"))
        })
        .collect::<RemoteResult<Vec<u8>>>()?;

    let ip = IpAddr::from([nums[0], nums[1], nums[2], nums[3]]);
    let port = u16::from(nums[4]) * 256 + u16::from(nums[5]);
    Ok(SocketAddr::new(ip, port))
}

// ─── PORT ────────────────────────────────────────────────────────────

async fn open_port(codec: &mut FtpCodec, control_local: Option<IpAddr>) -> RemoteResult<TcpListener> {
    let ip = match control_local {
        Some(IpAddr::V4(v4)) => v4,
        Some(IpAddr::V6(_)) => return Err(RemoteError::unsupported("PORT requires IPv4")),
        None => Ipv4Addr::UNSPECIFIED,
    };
    let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(ip), 0))
        .await
        .map_err(|e| RemoteError::connection(format!("PORT bind: {}", e)))?;
    let port = listener
        .local_addr()
        .map_err(|e| RemoteError::connection(format!("PORT local_addr: {}", e)))?
        .port();

    codec.expect_ok(&format_port_command(ip, port)).await?;
    Ok(listener)
}

pub(crate) fn format_port_command(ip: Ipv4Addr, port: u16) -> String {
    let o = ip.octets();
    format!(
        "PORT {},{},{},{},{},{}",
        o[0],
        o[1],
        o[2],
        o[3],
        port / 256,
        port % 256
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pasv_reply() {
        let addr = parse_pasv_response("227 Entering Passive Mode (192,168,1,20,195,80)").unwrap();
        assert_eq!(addr, "192.168.1.20:50000".parse().unwrap());
    }

    #[test]
    fn rejects_malformed_pasv() {
        assert!(parse_pasv_response("227 Entering Passive Mode").is_err());
        assert!(parse_pasv_response("227 (300,1,1,1,1,1)").is_err());
    }

    #[test]
    fn formats_port_command() {
        assert_eq!(
            format_port_command(Ipv4Addr::new(10, 0, 0, 5), 50000),
            "PORT 10,0,0,5,195,80"
        );
    }
}
