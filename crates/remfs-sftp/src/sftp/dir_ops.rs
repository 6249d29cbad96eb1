// ── Directory operations ─────────────────────────────────────────────────────

use crate::sftp::error::from_ssh;
use crate::sftp::file_ops::to_remote_entry;
use crate::sftp::session::SftpSession;
use log::info;
use remfs_core::{path as rpath, RemoteEntry, RemoteError, RemoteErrorKind, RemoteResult};
use std::path::Path;

const DIR_MODE: i32 = 0o755;

impl SftpSession {
    // ── List directory ───────────────────────────────────────────────────────

    pub fn list_directory(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>> {
        let raw_entries = self.sftp.readdir(Path::new(path)).map_err(from_ssh)?;

        Ok(raw_entries
            .into_iter()
            .filter_map(|(entry_path, stat)| {
                let name = entry_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if name.is_empty() || name == "." || name == ".." {
                    return None;
                }
                Some(to_remote_entry(name, &stat))
            })
            .collect())
    }

    // ── mkdir ────────────────────────────────────────────────────────────────

    /// Create one directory. Servers answer an existing target with a
    /// generic FAILURE, so a failed mkdir is followed by a stat to tell
    /// `AlreadyExists` apart.
    pub fn mkdir(&self, path: &str) -> RemoteResult<()> {
        if let Err(e) = self.sftp.mkdir(Path::new(path), DIR_MODE) {
            let err = from_ssh(e);
            if !err.is(RemoteErrorKind::AlreadyExists) && self.exists(path) {
                return Err(RemoteError::already_exists(err.message));
            }
            return Err(err);
        }
        info!("SFTP mkdir: {}", path);
        Ok(())
    }

    /// Create directory and all parent directories (like `mkdir -p`).
    pub fn mkdir_p(&self, path: &str) -> RemoteResult<()> {
        let mut current = String::from("/");
        for part in path.split('/').filter(|s| !s.is_empty()) {
            current = rpath::join(&current, part);

            if let Ok(stat) = self.sftp.stat(Path::new(&current)) {
                if stat.is_dir() {
                    continue;
                }
                return Err(RemoteError::already_exists(format!(
                    "'{}' exists and is not a directory",
                    current
                ))
                .with_path(current));
            }

            if let Err(e) = self.sftp.mkdir(Path::new(&current), DIR_MODE) {
                // Lost a race with another creator: fine as long as it is a directory now.
                let now_dir = self
                    .sftp
                    .stat(Path::new(&current))
                    .map(|s| s.is_dir())
                    .unwrap_or(false);
                if !now_dir {
                    return Err(from_ssh(e).with_path(current));
                }
            }
        }

        info!("SFTP mkdir -p: {}", path);
        Ok(())
    }

    // ── rmdir ────────────────────────────────────────────────────────────────

    pub fn rmdir(&self, path: &str) -> RemoteResult<()> {
        self.sftp.rmdir(Path::new(path)).map_err(from_ssh)?;
        info!("SFTP rmdir: {}", path);
        Ok(())
    }
}
