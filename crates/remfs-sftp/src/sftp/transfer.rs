// ── Chunked single-file uploads & downloads ──────────────────────────────────

use crate::sftp::error::from_ssh;
use crate::sftp::session::SftpSession;
use crate::sftp::types::CHUNK_SIZE;
use remfs_core::{RemoteError, RemoteResult};
use std::io::{Read, Write};
use std::path::Path;

impl SftpSession {
    // ── Upload ───────────────────────────────────────────────────────────────

    pub fn upload(&self, local_path: &Path, remote_path: &str) -> RemoteResult<u64> {
        let mut local_file = std::fs::File::open(local_path)
            .map_err(|e| RemoteError::from(e).with_path(local_path.display().to_string()))?;

        let open_flags =
            ssh2::OpenFlags::WRITE | ssh2::OpenFlags::CREATE | ssh2::OpenFlags::TRUNCATE;
        let mut remote_file = self
            .sftp
            .open_mode(Path::new(remote_path), open_flags, 0o644, ssh2::OpenType::File)
            .map_err(from_ssh)?;

        let mut transferred: u64 = 0;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = local_file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            remote_file.write_all(&buf[..n])?;
            transferred += n as u64;
        }
        remote_file.flush()?;

        log::debug!(
            "SFTP upload {} → {} ({} bytes)",
            local_path.display(),
            remote_path,
            transferred
        );
        Ok(transferred)
    }

    // ── Download ─────────────────────────────────────────────────────────────

    /// Download into `local_path`, creating parents and carrying the remote
    /// modification time over to the local copy.
    pub fn download(&self, remote_path: &str, local_path: &Path) -> RemoteResult<u64> {
        let mut remote_file = self
            .sftp
            .open(Path::new(remote_path))
            .map_err(from_ssh)?;

        if let Some(parent) = local_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut local_file = std::fs::File::create(local_path)
            .map_err(|e| RemoteError::from(e).with_path(local_path.display().to_string()))?;

        let mut transferred: u64 = 0;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = remote_file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            local_file.write_all(&buf[..n])?;
            transferred += n as u64;
        }
        local_file.flush()?;
        drop(local_file);

        if let Ok(remote_stat) = remote_file.stat() {
            if let Some(mtime) = remote_stat.mtime {
                let ft = filetime::FileTime::from_unix_time(mtime as i64, 0);
                if let Err(e) = filetime::set_file_mtime(local_path, ft) {
                    log::debug!("Could not preserve mtime on {}: {}", local_path.display(), e);
                }
            }
        }

        log::debug!(
            "SFTP download {} → {} ({} bytes)",
            remote_path,
            local_path.display(),
            transferred
        );
        Ok(transferred)
    }
}
