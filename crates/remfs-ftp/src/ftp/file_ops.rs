//! File transfers: RETR and STOR, streamed in fixed-size chunks.

use crate::ftp::client::FtpClient;
use remfs_core::RemoteResult;
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Chunk size for streaming transfers (64 KiB).
const DEFAULT_CHUNK: usize = 65_536;

impl FtpClient {
    // ─── DOWNLOAD (RETR) ─────────────────────────────────────────

    /// Download a remote file to a local path, creating local parents.
    pub async fn download(&mut self, remote_path: &str, local_path: &Path) -> RemoteResult<u64> {
        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let (mut stream, done) = self.start_transfer(&format!("RETR {}", remote_path)).await?;
        let mut file = fs::File::create(local_path).await?;

        let mut transferred = 0u64;
        let mut buf = vec![0u8; DEFAULT_CHUNK];
        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await?;
            transferred += n as u64;
        }
        file.flush().await?;
        drop(file);
        drop(stream);

        self.finish_transfer(done).await?;
        log::debug!(
            "FTP [{}] RETR {} -> {} ({} bytes)",
            self.id,
            remote_path,
            local_path.display(),
            transferred
        );
        Ok(transferred)
    }

    // ─── UPLOAD (STOR) ───────────────────────────────────────────

    /// Upload a local file, replacing the remote file.
    pub async fn upload(&mut self, local_path: &Path, remote_path: &str) -> RemoteResult<u64> {
        // Open locally first so a missing source never leaves a truncated remote file.
        let mut file = fs::File::open(local_path).await?;
        let (mut stream, done) = self.start_transfer(&format!("STOR {}", remote_path)).await?;

        let mut transferred = 0u64;
        let mut buf = vec![0u8; DEFAULT_CHUNK];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            stream.write_all(&buf[..n]).await?;
            transferred += n as u64;
        }
        stream.flush().await?;
        stream.shutdown().await?;
        drop(stream);

        self.finish_transfer(done).await?;
        log::debug!(
            "FTP [{}] STOR {} -> {} ({} bytes)",
            self.id,
            local_path.display(),
            remote_path,
            transferred
        );
        Ok(transferred)
    }
}
