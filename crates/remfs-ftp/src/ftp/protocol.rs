//! Control-channel codec (RFC 959 §4).
//!
//! Handles:
//! - Sending commands terminated with `\r\n`
//! - Reading single-line and multi-line replies
//! - Parsing the 3-digit reply code
//!
//! Every reply read is bounded by the codec's reply timeout, and commands
//! carrying a CR or LF are refused before anything is written.

use crate::ftp::error::from_reply;
use crate::ftp::types::FtpResponse;
use remfs_core::{RemoteError, RemoteResult};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Codec over the split halves of the control connection.
pub struct FtpCodec {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    reply_timeout: Duration,
}

impl FtpCodec {
    pub fn from_tcp(stream: TcpStream, reply_timeout: Duration) -> Self {
        let (rd, wr) = stream.into_split();
        Self {
            reader: BufReader::new(rd),
            writer: wr,
            reply_timeout,
        }
    }

    /// Send a raw command (CRLF is appended here). A command containing a
    /// line break would smuggle a second command onto the wire and is
    /// rejected.
    pub async fn send_command(&mut self, cmd: &str) -> RemoteResult<()> {
        check_argument(cmd)?;
        let line = format!("{}\r\n", cmd);
        self.writer.write_all(line.as_bytes()).await?;
        if cmd.starts_with("PASS ") {
            log::trace!(">>> PASS ****");
        } else {
            log::trace!(">>> {}", cmd);
        }
        Ok(())
    }

    async fn read_line_raw(&mut self) -> RemoteResult<String> {
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf).await?;
        if n == 0 {
            return Err(RemoteError::connection("Server closed connection"));
        }
        Ok(buf)
    }

    /// Read a complete reply (possibly multi-line).
    ///
    /// ```text
    /// 220-Welcome to my FTP server
    /// 220-This is line 2
    /// 220 End of greeting
    /// ```
    pub async fn read_response(&mut self) -> RemoteResult<FtpResponse> {
        let limit = self.reply_timeout;
        timeout(limit, self.read_reply()).await.map_err(|_| {
            RemoteError::connection(format!("No reply from server within {}s", limit.as_secs()))
        })?
    }

    async fn read_reply(&mut self) -> RemoteResult<FtpResponse> {
        let first = self.read_line_raw().await?;
        let first_trimmed = first.trim_end_matches(['\r', '\n']);

        let code = parse_code(first_trimmed)?;
        let mut lines = vec![first_trimmed.to_string()];

        // "NNN-" opens a multi-line reply that runs until a line starting "NNN ".
        let is_multi = first_trimmed.as_bytes().get(3) == Some(&b'-');
        if is_multi {
            let terminator = format!("{} ", code);
            loop {
                let next = self.read_line_raw().await?;
                let next_trimmed = next.trim_end_matches(['\r', '\n']);
                lines.push(next_trimmed.to_string());
                if next_trimmed.starts_with(&terminator) {
                    break;
                }
            }
        }

        let resp = FtpResponse { code, lines };
        log::trace!(
            "<<< {}",
            resp.lines.last().map(String::as_str).unwrap_or_default()
        );
        Ok(resp)
    }

    /// Send a command and return the reply, whatever its code.
    pub async fn execute(&mut self, cmd: &str) -> RemoteResult<FtpResponse> {
        self.send_command(cmd).await?;
        self.read_response().await
    }

    /// Send a command and require a reply in the given class (`2` for 2xx …).
    pub async fn expect(&mut self, cmd: &str, expected_first_digit: u16) -> RemoteResult<FtpResponse> {
        let resp = self.execute(cmd).await?;
        if resp.code / 100 != expected_first_digit {
            return Err(from_reply(resp.code, &resp.text()));
        }
        Ok(resp)
    }

    /// Expect a 2xx reply.
    pub async fn expect_ok(&mut self, cmd: &str) -> RemoteResult<FtpResponse> {
        self.expect(cmd, 2).await
    }

    /// Local address of the control connection.
    pub fn local_ip(&self) -> Option<std::net::IpAddr> {
        self.writer.local_addr().ok().map(|a| a.ip())
    }

    pub async fn shutdown(&mut self) {
        let _ = self.writer.shutdown().await;
    }
}

/// Refuse control-channel text that contains CR or LF.
pub fn check_argument(arg: &str) -> RemoteResult<()> {
    if arg.contains(['\r', '\n']) {
        return Err(RemoteError::invalid_input(
            "FTP command arguments must not contain line breaks",
        ));
    }
    Ok(())
}

/// Parse the 3-digit reply code from the start of a line.
fn parse_code(line: &str) -> RemoteResult<u16> {
    line.get(..3)
        .and_then(|c| c.parse::<u16>().ok())
        .filter(|c| (100..600).contains(c))
        .ok_or_else(|| RemoteError::protocol(format!("Invalid reply code in: '{}'", line)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn pair() -> (FtpCodec, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (FtpCodec::from_tcp(client, Duration::from_secs(5)), server)
    }

    #[tokio::test]
    async fn reads_multi_line_reply() {
        let (mut codec, mut server) = pair().await;
        server
            .write_all(b"220-Welcome\r\n220-second line\r\n220 Ready\r\n")
            .await
            .unwrap();
        let resp = codec.read_response().await.unwrap();
        assert_eq!(resp.code, 220);
        assert_eq!(resp.lines.len(), 3);
        assert!(resp.is_completion());
    }

    #[tokio::test]
    async fn execute_sends_crlf_terminated_command() {
        let (mut codec, mut server) = pair().await;
        let server_task = tokio::spawn(async move {
            let mut buf = [0u8; 6];
            server.read_exact(&mut buf).await.unwrap();
            server.write_all(b"200 NOOP ok\r\n").await.unwrap();
            buf
        });
        let resp = codec.execute("NOOP").await.unwrap();
        assert_eq!(resp.code, 200);
        assert_eq!(&server_task.await.unwrap(), b"NOOP\r\n");
    }

    #[tokio::test]
    async fn expect_ok_maps_negative_reply() {
        let (mut codec, mut server) = pair().await;
        server
            .write_all(b"550 /x: No such file or directory\r\n")
            .await
            .unwrap();
        let err = codec.expect_ok("DELE /x").await.unwrap_err();
        assert!(err.is(remfs_core::RemoteErrorKind::NotFound));
    }

    #[tokio::test]
    async fn closed_connection_is_a_connection_error() {
        let (mut codec, server) = pair().await;
        drop(server);
        let err = codec.read_response().await.unwrap_err();
        assert!(err.is(remfs_core::RemoteErrorKind::Connection));
    }

    #[tokio::test]
    async fn silent_server_times_out_as_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (_server, _) = listener.accept().await.unwrap();
        let mut codec = FtpCodec::from_tcp(client, Duration::from_millis(200));

        let err = codec.execute("NOOP").await.unwrap_err();
        assert!(err.is(remfs_core::RemoteErrorKind::Connection));
    }

    #[tokio::test]
    async fn line_breaks_in_commands_are_refused_before_writing() {
        let (mut codec, mut server) = pair().await;
        for cmd in ["STOR /up/a\r\nDELE /victim", "MKD /x\ny", "DELE /z\r"] {
            let err = codec.send_command(cmd).await.unwrap_err();
            assert!(err.is(remfs_core::RemoteErrorKind::InvalidInput));
        }

        // Nothing reached the server; the next clean command is the first
        // bytes it sees.
        let server_task = tokio::spawn(async move {
            let mut buf = [0u8; 6];
            server.read_exact(&mut buf).await.unwrap();
            server.write_all(b"200 ok\r\n").await.unwrap();
            buf
        });
        codec.execute("NOOP").await.unwrap();
        assert_eq!(&server_task.await.unwrap(), b"NOOP\r\n");
    }

    #[test]
    fn rejects_garbage_codes() {
        assert!(parse_code("abc hello").is_err());
        assert!(parse_code("22").is_err());
        assert_eq!(parse_code("226 Done").unwrap(), 226);
    }
}
