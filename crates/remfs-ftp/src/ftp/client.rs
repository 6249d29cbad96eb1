//! Stateful FTP session: owns the control connection and issues commands.
//!
//! Lifecycle: `connect()` → USER/PASS → FEAT → OPTS UTF8 → PWD → TYPE I →
//! optional CWD into the configured root.
//!
//! Low-level helpers here are used by `directory.rs` and `file_ops.rs`.

use crate::ftp::connection;
use crate::ftp::error::from_reply;
use crate::ftp::parser;
use crate::ftp::protocol::{check_argument, FtpCodec};
use crate::ftp::transfer::{self, DataChannel};
use crate::ftp::types::*;
use remfs_core::{RemoteError, RemoteResult};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use uuid::Uuid;

/// A connected, logged-in FTP session.
pub struct FtpClient {
    /// Correlates log lines of one session.
    pub id: String,
    pub(crate) codec: FtpCodec,
    pub settings: FtpSettings,
    pub features: ServerFeatures,
    pub current_directory: String,
    pub server_banner: String,
}

impl FtpClient {
    pub async fn connect(settings: FtpSettings) -> RemoteResult<Self> {
        if settings.host.is_empty() {
            return Err(RemoteError::invalid_input("Host must not be empty"));
        }

        let session_id = Uuid::new_v4().to_string();
        let (mut codec, banner) = connection::connect(&settings).await?;

        // ── Authenticate ─────────────────────────────────────────
        let user_resp = codec.execute(&format!("USER {}", settings.username)).await?;
        match user_resp.code {
            230 => {}
            331 => {
                let pass_resp = codec.execute(&format!("PASS {}", settings.password)).await?;
                if !pass_resp.is_completion() {
                    return Err(RemoteError::connection(format!(
                        "Login failed: {}",
                        pass_resp.text()
                    )));
                }
            }
            _ => {
                return Err(RemoteError::connection(format!(
                    "USER rejected: {}",
                    user_resp.text()
                )))
            }
        }

        let features = Self::probe_features(&mut codec).await;

        if settings.utf8 && features.utf8 {
            let _ = codec.execute("OPTS UTF8 ON").await;
        }

        let cwd = Self::get_pwd(&mut codec).await.unwrap_or_else(|_| "/".into());

        codec.expect_ok("TYPE I").await?;

        let current_directory = match settings.initial_directory.as_deref() {
            Some(dir) => {
                let resp = codec.execute(&format!("CWD {}", dir)).await?;
                if resp.is_success() {
                    Self::get_pwd(&mut codec).await.unwrap_or_else(|_| dir.to_string())
                } else {
                    log::warn!(
                        "FTP [{}] initial CWD {} failed: {}",
                        session_id,
                        dir,
                        resp.text()
                    );
                    cwd
                }
            }
            None => cwd,
        };

        log::info!(
            "FTP [{}] logged in to {}:{} as {} (cwd {})",
            session_id,
            settings.host,
            settings.port,
            settings.username,
            current_directory
        );

        Ok(Self {
            id: session_id,
            codec,
            settings,
            features,
            current_directory,
            server_banner: banner.text(),
        })
    }

    /// Liveness probe.
    pub async fn noop(&mut self) -> RemoteResult<()> {
        self.codec.expect_ok("NOOP").await?;
        Ok(())
    }

    async fn get_pwd(codec: &mut FtpCodec) -> RemoteResult<String> {
        let resp = codec.expect_ok("PWD").await?;
        parse_pwd(&resp.text())
    }

    // ─── FEAT probe ──────────────────────────────────────────────

    async fn probe_features(codec: &mut FtpCodec) -> ServerFeatures {
        let resp = match codec.execute("FEAT").await {
            Ok(r) if r.is_completion() => r,
            _ => return ServerFeatures::default(),
        };

        let raw: Vec<String> = resp
            .lines
            .iter()
            .skip(1) // "211-Features:"
            .filter(|l| !l.starts_with("211"))
            .map(|l| l.trim().to_uppercase())
            .collect();

        let has = |feat: &str| raw.iter().any(|l| l.starts_with(feat));

        ServerFeatures {
            mlsd: has("MLSD"),
            size: has("SIZE"),
            rest_stream: has("REST STREAM"),
            utf8: has("UTF8"),
            raw_features: raw,
        }
    }

    // ─── Data channel helpers ────────────────────────────────────

    pub(crate) fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.data_timeout_sec)
    }

    /// Open a data channel, send `cmd`, and return the connected stream.
    /// The returned flag is `true` when the server already sent its final
    /// reply and no completion reply should be awaited.
    pub(crate) async fn start_transfer(&mut self, cmd: &str) -> RemoteResult<(TcpStream, bool)> {
        // Checked before PASV/PORT so a bad path never opens a data channel.
        check_argument(cmd)?;
        let local_ip = self.codec.local_ip();
        let data_timeout = self.data_timeout();
        let channel: DataChannel = transfer::open_data_channel(
            &mut self.codec,
            self.settings.data_channel_mode,
            local_ip,
            data_timeout,
        )
        .await?;
        let resp = self.codec.execute(cmd).await?;
        if !resp.is_preliminary() && !resp.is_completion() {
            return Err(from_reply(resp.code, &resp.text()));
        }
        let stream = channel.into_stream(self.data_timeout()).await?;
        Ok((stream, resp.is_completion()))
    }

    /// Read the 226 (or similar) reply that closes a transfer.
    pub(crate) async fn finish_transfer(&mut self, already_done: bool) -> RemoteResult<()> {
        if already_done {
            return Ok(());
        }
        let done = self.codec.read_response().await?;
        if !done.is_completion() {
            return Err(from_reply(done.code, &done.text()));
        }
        Ok(())
    }

    // ─── Listing ─────────────────────────────────────────────────

    /// Directory listing; MLSD when the server advertises it, LIST otherwise.
    pub async fn list(&mut self, path: &str) -> RemoteResult<Vec<FtpEntry>> {
        let verb = if self.features.mlsd { "MLSD" } else { "LIST" };
        let data = self.retrieve_data_as_string(&format!("{} {}", verb, path)).await?;
        Ok(parser::parse_listing(&data))
    }

    /// Open a data channel, send `cmd`, collect the body as text.
    pub async fn retrieve_data_as_string(&mut self, cmd: &str) -> RemoteResult<String> {
        let (mut stream, done) = self.start_transfer(cmd).await?;
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await?;
        drop(stream);
        self.finish_transfer(done).await?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    // ─── SIZE ────────────────────────────────────────────────────

    /// Size of a remote file (RFC 3659 SIZE).
    pub async fn size(&mut self, path: &str) -> RemoteResult<u64> {
        let resp = self.codec.expect_ok(&format!("SIZE {}", path)).await?;
        let text = resp.text();
        // "213 12345"
        text.split_whitespace()
            .nth(1)
            .and_then(|n| n.trim().parse::<u64>().ok())
            .ok_or_else(|| RemoteError::protocol(format!("Cannot parse SIZE: {}", text)))
    }

    pub async fn site(&mut self, args: &str) -> RemoteResult<FtpResponse> {
        self.codec.execute(&format!("SITE {}", args)).await
    }

    /// Say goodbye and close the control socket. Errors are ignored: the
    /// session is gone either way.
    pub async fn quit(&mut self) {
        let _ = self.codec.execute("QUIT").await;
        self.codec.shutdown().await;
        log::info!("FTP [{}] disconnected from {}", self.id, self.settings.host);
    }
}

/// Parse `257 "/some/path"` into the path string.
pub(crate) fn parse_pwd(text: &str) -> RemoteResult<String> {
    if let Some(start) = text.find('"') {
        if let Some(end) = text[start + 1..].find('"') {
            return Ok(text[start + 1..start + 1 + end].to_string());
        }
    }
    Err(RemoteError::protocol(format!("Cannot parse PWD: {}", text)))
}
