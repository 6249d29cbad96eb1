//! TCP transport: establishes the control connection.

use crate::ftp::error::from_reply;
use crate::ftp::protocol::FtpCodec;
use crate::ftp::types::{FtpResponse, FtpSettings};
use remfs_core::{RemoteError, RemoteResult};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Open the control connection and return the codec plus the server banner.
pub async fn connect(settings: &FtpSettings) -> RemoteResult<(FtpCodec, FtpResponse)> {
    let addr = format!("{}:{}", settings.host, settings.port);
    let dur = Duration::from_secs(settings.connect_timeout_sec);

    let tcp = timeout(dur, TcpStream::connect(&addr))
        .await
        .map_err(|_| RemoteError::connection(format!("TCP connect to {} timed out", addr)))?
        .map_err(|e| RemoteError::connection(format!("TCP connect to {}: {}", addr, e)))?;

    tcp.set_nodelay(true).ok();

    let reply_timeout = Duration::from_secs(settings.control_timeout_sec);
    let mut codec = FtpCodec::from_tcp(tcp, reply_timeout);
    let banner = codec
        .read_response()
        .await
        .map_err(|e| RemoteError::connection(format!("No greeting from {}: {}", addr, e.message)))?;
    if !banner.is_completion() {
        return Err(from_reply(banner.code, &banner.text()));
    }
    Ok((codec, banner))
}
