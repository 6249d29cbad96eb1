//! LIST / MLSD response parser.
//!
//! Supports three formats:
//! 1. **MLSD facts** (RFC 3659): `type=file;size=1234;modify=20260101120000; file.txt`
//! 2. **Unix-style** (`ls -l`): `-rwxr-xr-x 1 owner group 1234 Jan  1 12:00 file.txt`
//! 3. **Windows/IIS-style**: `01-01-26  12:00AM       1234 file.txt`
//!
//! Lines matching none of them (e.g. the `total 12` header) are dropped.

use crate::ftp::types::{FtpEntry, FtpEntryKind};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use remfs_core::{EntryKind, RemoteEntry};
use std::collections::HashMap;

lazy_static! {
    static ref UNIX_RE: Regex = Regex::new(
        r"(?x)
        ^([dlcbps-][rwxsStT-]{9})[+@.]?\s+ # permissions (+ ACL marker)
        (\d+)\s+                           # link count
        (\S+)\s+                           # owner
        (\S+)\s+                           # group
        (\d+)\s+                           # size
        (\w{3}\s+\d{1,2}\s+[\d:]+)\s+      # date
        (.+)$                              # filename (possibly with -> target)
        "
    )
    .expect("valid unix listing regex");
    static ref WINDOWS_RE: Regex = Regex::new(
        r"(?x)
        ^(\d{2}-\d{2}-\d{2,4})\s+          # date
        (\d{1,2}:\d{2}(?:AM|PM)?)\s+       # time
        (<DIR>|\d+)\s+                     # size or <DIR>
        (.+)$                              # filename
        "
    )
    .expect("valid windows listing regex");
}

/// Parse a full LIST or MLSD response body.
pub fn parse_listing(raw: &str) -> Vec<FtpEntry> {
    raw.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let parsed = parse_line(line);
            if parsed.is_none() {
                log::debug!("FTP listing: skipping unparseable line '{}'", line);
            }
            parsed
        })
        .filter(|e| e.name != "." && e.name != "..")
        .collect()
}

/// Collapse a raw entry into the shared model. Symlinks and unknown kinds
/// become files.
pub fn to_remote_entry(entry: FtpEntry) -> RemoteEntry {
    RemoteEntry {
        kind: match entry.kind {
            FtpEntryKind::Directory => EntryKind::Directory,
            _ => EntryKind::File,
        },
        name: entry.name,
        size: entry.size,
        modified: entry.modified,
        permissions: entry.permissions,
    }
}

fn parse_line(line: &str) -> Option<FtpEntry> {
    let trimmed = line.trim_start();
    if trimmed.contains(';') && trimmed.contains('=') {
        if let Some(e) = parse_mlsd(trimmed) {
            return Some(e);
        }
    }
    parse_unix(trimmed).or_else(|| parse_windows(trimmed))
}

// ─── MLSD parser ─────────────────────────────────────────────────────

/// `fact1=val1;fact2=val2; filename`
fn parse_mlsd(line: &str) -> Option<FtpEntry> {
    let (facts_str, name) = line.split_once("; ")?;
    if name.is_empty() {
        return None;
    }

    let mut facts: HashMap<String, String> = HashMap::new();
    for segment in facts_str.split(';') {
        if let Some((k, v)) = segment.trim().split_once('=') {
            facts.insert(k.to_lowercase(), v.to_string());
        }
    }

    let kind = match facts.get("type").map(|s| s.to_lowercase()).as_deref() {
        Some("dir") | Some("cdir") | Some("pdir") => FtpEntryKind::Directory,
        Some("file") => FtpEntryKind::File,
        Some(t) if t.starts_with("os.unix=sl") => FtpEntryKind::Symlink,
        _ => FtpEntryKind::Unknown,
    };

    // cdir/pdir describe the listed directory and its parent.
    if matches!(
        facts.get("type").map(|s| s.to_lowercase()).as_deref(),
        Some("cdir") | Some("pdir")
    ) {
        return Some(FtpEntry {
            name: ".".into(),
            kind,
            size: 0,
            modified: None,
            permissions: None,
            link_target: None,
            facts,
        });
    }

    let size = facts
        .get("size")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);
    let modified = facts.get("modify").and_then(|v| parse_mlsd_time(v));
    let permissions = facts
        .get("unix.mode")
        .and_then(|m| u32::from_str_radix(m, 8).ok())
        .map(remfs_core::mode_to_permissions);

    Some(FtpEntry {
        name: name.to_string(),
        kind,
        size,
        modified,
        permissions,
        link_target: None,
        facts,
    })
}

/// `YYYYMMDDHHmmSS[.fraction]`
fn parse_mlsd_time(s: &str) -> Option<DateTime<Utc>> {
    let base = s.get(..14).unwrap_or(s);
    NaiveDateTime::parse_from_str(base, "%Y%m%d%H%M%S")
        .ok()
        .map(|dt| Utc.from_utc_datetime(&dt))
}

// ─── Unix-style parser ───────────────────────────────────────────────

/// ```text
/// drwxr-xr-x   2 user group  4096 Jan  1 12:00 dirname
/// -rw-r--r--   1 user group  1234 Jan  1  2025 file.txt
/// lrwxrwxrwx   1 user group    42 Jan  1 12:00 link -> target
/// ```
fn parse_unix(line: &str) -> Option<FtpEntry> {
    let caps = UNIX_RE.captures(line)?;

    let perms = caps.get(1)?.as_str();
    let size = caps.get(5)?.as_str().parse::<u64>().unwrap_or(0);
    let date_str = caps.get(6)?.as_str();
    let name_raw = caps.get(7)?.as_str();

    let kind = match perms.as_bytes().first() {
        Some(b'd') => FtpEntryKind::Directory,
        Some(b'l') => FtpEntryKind::Symlink,
        Some(b'-') => FtpEntryKind::File,
        _ => FtpEntryKind::Unknown,
    };

    let (name, link_target) = match (kind == FtpEntryKind::Symlink, name_raw.split_once(" -> ")) {
        (true, Some((name, target))) => (name.to_string(), Some(target.to_string())),
        _ => (name_raw.to_string(), None),
    };

    Some(FtpEntry {
        name,
        kind,
        size,
        modified: parse_unix_date(date_str, Utc::now()),
        permissions: Some(perms[1..].to_string()),
        link_target,
        facts: HashMap::new(),
    })
}

/// "Jan  1 12:00" (within the last year) or "Jan  1  2025".
fn parse_unix_date(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let normalised = s.split_whitespace().collect::<Vec<_>>().join(" ");

    if normalised.contains(':') {
        let dt = NaiveDateTime::parse_from_str(
            &format!("{} {}", now.year(), normalised),
            "%Y %b %d %H:%M",
        )
        .ok()?;
        let dt = Utc.from_utc_datetime(&dt);
        // ls drops the year for recent files; a date "in the future" is last year's.
        if dt > now + chrono::Duration::days(1) {
            let last_year = NaiveDateTime::parse_from_str(
                &format!("{} {}", now.year() - 1, normalised),
                "%Y %b %d %H:%M",
            )
            .ok()?;
            return Some(Utc.from_utc_datetime(&last_year));
        }
        return Some(dt);
    }

    let date = NaiveDate::parse_from_str(&normalised, "%b %d %Y").ok()?;
    Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

// ─── Windows-style parser ────────────────────────────────────────────

/// ```text
/// 01-01-26  12:00AM       1234 file.txt
/// 01-01-26  12:00PM      <DIR> Directory Name
/// ```
fn parse_windows(line: &str) -> Option<FtpEntry> {
    let caps = WINDOWS_RE.captures(line)?;

    let date_str = caps.get(1)?.as_str();
    let time_str = caps.get(2)?.as_str();
    let size_or_dir = caps.get(3)?.as_str();
    let name = caps.get(4)?.as_str().to_string();

    let (kind, size) = if size_or_dir == "<DIR>" {
        (FtpEntryKind::Directory, 0)
    } else {
        (FtpEntryKind::File, size_or_dir.parse::<u64>().unwrap_or(0))
    };

    Some(FtpEntry {
        name,
        kind,
        size,
        modified: parse_windows_date(date_str, time_str),
        permissions: None,
        link_target: None,
        facts: HashMap::new(),
    })
}

fn parse_windows_date(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let combined = format!("{} {}", date, time);
    ["%m-%d-%y %I:%M%p", "%m-%d-%y %H:%M", "%m-%d-%Y %I:%M%p", "%m-%d-%Y %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&combined, fmt).ok())
        .map(|dt| Utc.from_utc_datetime(&dt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_file() {
        let line = "-rw-r--r--   1 user group  1234 Jan  1 12:00 readme.txt";
        let entries = parse_listing(line);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "readme.txt");
        assert_eq!(entries[0].kind, FtpEntryKind::File);
        assert_eq!(entries[0].size, 1234);
        assert_eq!(entries[0].permissions.as_deref(), Some("rw-r--r--"));
    }

    #[test]
    fn test_unix_dir_with_total_header() {
        let raw = "total 8\r\ndrwxr-xr-x   2 root root  4096 Mar  1 09:30 sub dir\r\n";
        let entries = parse_listing(raw);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, FtpEntryKind::Directory);
        assert_eq!(entries[0].name, "sub dir");
    }

    #[test]
    fn test_unix_symlink_normalizes_to_file() {
        let line = "lrwxrwxrwx   1 root root    22 Jan  5 08:00 link -> /var/target";
        let entries = parse_listing(line);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, FtpEntryKind::Symlink);
        assert_eq!(entries[0].name, "link");
        assert_eq!(entries[0].link_target.as_deref(), Some("/var/target"));
        let entry = to_remote_entry(entries[0].clone());
        assert!(!entry.is_directory());
    }

    #[test]
    fn test_unix_year_format() {
        let line = "-rw-r--r--   1 u g  10 Feb 29  2024 leap.txt";
        let entries = parse_listing(line);
        let modified = entries[0].modified.unwrap();
        assert_eq!((modified.year(), modified.month(), modified.day()), (2024, 2, 29));
    }

    #[test]
    fn test_recent_date_never_in_future() {
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        let dt = parse_unix_date("Dec 31 23:00", now).unwrap();
        assert_eq!(dt.year(), 2025);
        let dt = parse_unix_date("Jan  9 10:00", now).unwrap();
        assert_eq!(dt.year(), 2026);
    }

    #[test]
    fn test_mlsd() {
        let line = "type=file;size=1024;modify=20260101120000;unix.mode=0644; example.bin";
        let entries = parse_listing(line);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "example.bin");
        assert_eq!(entries[0].kind, FtpEntryKind::File);
        assert_eq!(entries[0].size, 1024);
        assert_eq!(entries[0].permissions.as_deref(), Some("rw-r--r--"));
        assert!(entries[0].modified.is_some());
    }

    #[test]
    fn test_mlsd_dir_and_name_with_spaces() {
        let line = "type=dir;modify=20250101000000; My Folder";
        let entry = to_remote_entry(parse_listing(line).remove(0));
        assert!(entry.is_directory());
        assert_eq!(entry.name, "My Folder");
    }

    #[test]
    fn test_filters_dots() {
        let raw = "type=cdir; /home\ntype=pdir; /\ntype=dir; .\ntype=file;size=10; real.txt";
        let entries = parse_listing(raw);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "real.txt");
    }

    #[test]
    fn test_windows_dir() {
        let line = "01-01-26  12:00AM      <DIR> My Documents";
        let entries = parse_listing(line);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, FtpEntryKind::Directory);
        assert_eq!(entries[0].name, "My Documents");
    }

    #[test]
    fn test_windows_file() {
        let line = "03-15-25  02:30PM            512 notes.txt";
        let entries = parse_listing(line);
        assert_eq!(entries[0].kind, FtpEntryKind::File);
        assert_eq!(entries[0].size, 512);
        assert!(entries[0].modified.is_some());
    }
}
