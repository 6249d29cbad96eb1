//! Directory and namespace operations: MKD, RMD, RNFR/RNTO, DELE, SITE CHMOD.

use crate::ftp::client::FtpClient;
use crate::ftp::error::from_reply;
use crate::ftp::types::FtpEntryKind;
use remfs_core::{path, RemoteError, RemoteErrorKind, RemoteResult};

impl FtpClient {
    // ─── MKD ─────────────────────────────────────────────────────

    /// Create one directory. An existing directory is reported as
    /// `AlreadyExists` even when the server's 550 text doesn't say so.
    pub async fn mkdir(&mut self, dir: &str) -> RemoteResult<()> {
        let resp = self.codec.execute(&format!("MKD {}", dir)).await?;
        if resp.is_completion() {
            return Ok(());
        }
        let err = from_reply(resp.code, &resp.text());
        if !err.is(RemoteErrorKind::AlreadyExists) && self.dir_exists(dir).await? {
            return Err(RemoteError::already_exists(resp.text()));
        }
        Err(err)
    }

    /// Create a directory and all missing parents. FTP has no `mkdir -p`, so
    /// each component is probed with CWD and created when missing.
    pub async fn mkdir_all(&mut self, dir: &str) -> RemoteResult<()> {
        let mut current = String::from("/");
        for component in dir.split('/').filter(|c| !c.is_empty()) {
            current = path::join(&current, component);
            let cwd_resp = self.codec.execute(&format!("CWD {}", current)).await?;
            if !cwd_resp.is_completion() {
                let mkd_resp = self.codec.execute(&format!("MKD {}", current)).await?;
                // A failed MKD is fine only if the directory exists now,
                // i.e. a concurrent creator won the race.
                if !mkd_resp.is_completion() && !self.dir_exists(&current).await? {
                    self.restore_cwd().await;
                    return Err(from_reply(mkd_resp.code, &mkd_resp.text()));
                }
            }
        }
        self.restore_cwd().await;
        Ok(())
    }

    async fn dir_exists(&mut self, dir: &str) -> RemoteResult<bool> {
        let resp = self.codec.execute(&format!("CWD {}", dir)).await?;
        if resp.is_completion() {
            self.restore_cwd().await;
            return Ok(true);
        }
        Ok(false)
    }

    async fn restore_cwd(&mut self) {
        let cwd = self.current_directory.clone();
        if let Err(e) = self.codec.expect_ok(&format!("CWD {}", cwd)).await {
            log::warn!("FTP [{}] could not return to {}: {}", self.id, cwd, e);
        }
    }

    // ─── RMD ─────────────────────────────────────────────────────

    /// Remove an empty directory.
    pub async fn rmdir(&mut self, dir: &str) -> RemoteResult<()> {
        self.codec.expect_ok(&format!("RMD {}", dir)).await?;
        Ok(())
    }

    /// Remove a directory and everything below it, children first.
    pub async fn rmdir_recursive(&mut self, dir: &str) -> RemoteResult<()> {
        let entries = self.list(dir).await?;

        for entry in entries {
            let full_path = path::join(dir, &entry.name);
            match entry.kind {
                FtpEntryKind::Directory => {
                    Box::pin(self.rmdir_recursive(&full_path)).await?;
                }
                _ => {
                    self.delete(&full_path).await?;
                }
            }
        }

        self.rmdir(dir).await
    }

    // ─── RNFR / RNTO ────────────────────────────────────────────

    /// Rename (or move) a file or directory.
    pub async fn rename(&mut self, from: &str, to: &str) -> RemoteResult<()> {
        let rnfr = self.codec.execute(&format!("RNFR {}", from)).await?;
        if !rnfr.is_intermediate() && !rnfr.is_completion() {
            return Err(from_reply(rnfr.code, &rnfr.text()));
        }
        self.codec.expect_ok(&format!("RNTO {}", to)).await?;
        Ok(())
    }

    // ─── DELE ────────────────────────────────────────────────────

    pub async fn delete(&mut self, file: &str) -> RemoteResult<()> {
        self.codec.expect_ok(&format!("DELE {}", file)).await?;
        Ok(())
    }

    // ─── SITE CHMOD ─────────────────────────────────────────────

    /// Change permissions via `SITE CHMOD`, a widespread but non-standard
    /// extension. Only attempted when the connection opted in.
    pub async fn chmod(&mut self, target: &str, mode: u32) -> RemoteResult<()> {
        if !self.settings.site_chmod {
            return Err(RemoteError::unsupported(
                "chmod is not part of FTP; enable SITE CHMOD emulation for this connection",
            ));
        }
        let resp = self.site(&format!("CHMOD {:03o} {}", mode & 0o7777, target)).await?;
        match resp.code {
            200..=299 => Ok(()),
            500..=504 => Err(RemoteError::unsupported(format!(
                "Server does not support SITE CHMOD: {}",
                resp.text()
            ))),
            _ => Err(RemoteError::emulation_failed(format!(
                "SITE CHMOD failed: {}",
                resp.text()
            ))),
        }
    }
}
