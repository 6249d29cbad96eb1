// ── File operations (rename, unlink, chmod, recursive delete) ────────────────

use crate::sftp::error::from_ssh;
use crate::sftp::session::SftpSession;
use chrono::{TimeZone, Utc};
use log::info;
use remfs_core::{EntryKind, RemoteEntry, RemoteResult};
use std::path::{Path, PathBuf};

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;

/// Compute a permissions string like "rwxr-xr-x" (no type character).
pub(crate) fn format_permissions(mode: u32) -> String {
    let mut s = String::with_capacity(9);

    // Owner
    s.push(if mode & 0o400 != 0 { 'r' } else { '-' });
    s.push(if mode & 0o200 != 0 { 'w' } else { '-' });
    s.push(match (mode & 0o4000 != 0, mode & 0o100 != 0) {
        (true, true) => 's',
        (true, false) => 'S',
        (false, true) => 'x',
        (false, false) => '-',
    });

    // Group
    s.push(if mode & 0o040 != 0 { 'r' } else { '-' });
    s.push(if mode & 0o020 != 0 { 'w' } else { '-' });
    s.push(match (mode & 0o2000 != 0, mode & 0o010 != 0) {
        (true, true) => 's',
        (true, false) => 'S',
        (false, true) => 'x',
        (false, false) => '-',
    });

    // Others
    s.push(if mode & 0o004 != 0 { 'r' } else { '-' });
    s.push(if mode & 0o002 != 0 { 'w' } else { '-' });
    s.push(match (mode & 0o1000 != 0, mode & 0o001 != 0) {
        (true, true) => 't',
        (true, false) => 'T',
        (false, true) => 'x',
        (false, false) => '-',
    });

    s
}

/// Directories by the type bits, everything else (symlinks, devices) is a file.
pub(crate) fn entry_kind_from_mode(mode: Option<u32>) -> EntryKind {
    match mode {
        Some(m) if m & S_IFMT == S_IFDIR => EntryKind::Directory,
        _ => EntryKind::File,
    }
}

pub(crate) fn to_remote_entry(name: String, stat: &ssh2::FileStat) -> RemoteEntry {
    RemoteEntry {
        name,
        kind: entry_kind_from_mode(stat.perm),
        size: stat.size.unwrap_or(0),
        modified: stat
            .mtime
            .and_then(|t| Utc.timestamp_opt(t as i64, 0).single()),
        permissions: stat.perm.map(format_permissions),
    }
}

fn empty_stat() -> ssh2::FileStat {
    ssh2::FileStat {
        size: None,
        uid: None,
        gid: None,
        perm: None,
        atime: None,
        mtime: None,
    }
}

impl SftpSession {
    // ── rename ───────────────────────────────────────────────────────────────

    pub fn rename(&self, old_path: &str, new_path: &str) -> RemoteResult<()> {
        self.sftp
            .rename(
                Path::new(old_path),
                Path::new(new_path),
                Some(ssh2::RenameFlags::OVERWRITE | ssh2::RenameFlags::ATOMIC | ssh2::RenameFlags::NATIVE),
            )
            .map_err(from_ssh)?;
        info!("SFTP rename: {} → {}", old_path, new_path);
        Ok(())
    }

    // ── unlink (delete file) ─────────────────────────────────────────────────

    pub fn delete_file(&self, path: &str) -> RemoteResult<()> {
        self.sftp.unlink(Path::new(path)).map_err(from_ssh)?;
        info!("SFTP deleted file: {}", path);
        Ok(())
    }

    // ── chmod ────────────────────────────────────────────────────────────────

    /// Set permission bits only; size/owner/times are left untouched.
    pub fn chmod(&self, path: &str, mode: u32) -> RemoteResult<()> {
        let mut stat = empty_stat();
        stat.perm = Some(mode & 0o7777);
        self.sftp
            .setstat(Path::new(path), stat)
            .map_err(from_ssh)?;
        info!("SFTP chmod {} → {:o}", path, mode);
        Ok(())
    }

    // ── Delete directory tree recursively ────────────────────────────────────

    pub fn delete_recursive(&self, path: &str) -> RemoteResult<u64> {
        // Parents precede their children in the collected list, so walking it
        // backwards deletes bottom-up.
        let entries = self.collect_tree(path)?;
        let mut count: u64 = 0;

        for (entry_path, is_dir) in entries.iter().rev() {
            if *is_dir {
                self.sftp.rmdir(entry_path).map_err(|e| {
                    from_ssh(e).with_path(entry_path.to_string_lossy().to_string())
                })?;
            } else {
                self.sftp.unlink(entry_path).map_err(|e| {
                    from_ssh(e).with_path(entry_path.to_string_lossy().to_string())
                })?;
            }
            count += 1;
        }

        self.sftp.rmdir(Path::new(path)).map_err(from_ssh)?;
        count += 1;

        info!("SFTP recursive delete: {} ({} items)", path, count);
        Ok(count)
    }

    fn collect_tree(&self, path: &str) -> RemoteResult<Vec<(PathBuf, bool)>> {
        let mut result = Vec::new();
        let mut stack: Vec<PathBuf> = vec![PathBuf::from(path)];

        while let Some(dir) = stack.pop() {
            let entries = self.sftp.readdir(&dir).map_err(|e| {
                from_ssh(e).with_path(dir.to_string_lossy().to_string())
            })?;

            for (entry_path, stat) in entries {
                let name = entry_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if name == "." || name == ".." {
                    continue;
                }
                let is_dir = entry_kind_from_mode(stat.perm) == EntryKind::Directory;
                if is_dir {
                    stack.push(entry_path.clone());
                }
                result.push((entry_path, is_dir));
            }
        }

        Ok(result)
    }

    pub(crate) fn exists(&self, path: &str) -> bool {
        self.sftp.stat(Path::new(path)).is_ok()
    }
}
