//! Normalized directory-listing entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One child of a listed directory. Symlinks and special files are reported
/// as `File`; `.` and `..` never appear.
///
/// On the wire the kind is flattened to an `isDirectory` flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "EntryWire", into = "EntryWire")]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// `rwxr-xr-x` style string, or whatever the server reported.
    pub permissions: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryWire {
    name: String,
    is_directory: bool,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    permission_bits: Option<String>,
}

impl From<EntryWire> for RemoteEntry {
    fn from(w: EntryWire) -> Self {
        Self {
            name: w.name,
            kind: if w.is_directory { EntryKind::Directory } else { EntryKind::File },
            size: w.size,
            modified: w.modified_time,
            permissions: w.permission_bits,
        }
    }
}

impl From<RemoteEntry> for EntryWire {
    fn from(e: RemoteEntry) -> Self {
        Self {
            is_directory: e.is_directory(),
            name: e.name,
            size: e.size,
            modified_time: e.modified,
            permission_bits: e.permissions,
        }
    }
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
            modified: None,
            permissions: None,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: 0,
            modified: None,
            permissions: None,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Listing order offered to callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortMode {
    #[default]
    Name,
    /// Directories first, then by name.
    Type,
    /// Newest first; entries without a timestamp last.
    Modified,
}

/// Sort in place. Directories always come before files.
pub fn sort_entries(entries: &mut [RemoteEntry], mode: SortMode) {
    entries.sort_by(|a, b| {
        let dir_cmp = b.is_directory().cmp(&a.is_directory());
        if dir_cmp != Ordering::Equal {
            return dir_cmp;
        }
        match mode {
            SortMode::Name | SortMode::Type => compare_names(&a.name, &b.name),
            SortMode::Modified => match (a.modified, b.modified) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => compare_names(&a.name, &b.name),
            },
        }
    });
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Convert a 9-character `rwxr-xr-x` string (a leading type character is
/// tolerated) into its octal mode, e.g. `0o755`.
pub fn permissions_to_octal(perms: &str) -> Option<u32> {
    let bits: Vec<char> = perms.chars().collect();
    let bits = match bits.len() {
        9 => &bits[..],
        10 => &bits[1..],
        _ => return None,
    };
    let mut mode = 0u32;
    for (i, c) in bits.iter().enumerate() {
        let expected = ['r', 'w', 'x'][i % 3];
        let set = match *c {
            '-' => false,
            c if c == expected => true,
            // setuid/setgid/sticky still imply execute
            's' | 't' if i % 3 == 2 => true,
            'S' | 'T' if i % 3 == 2 => false,
            _ => return None,
        };
        if set {
            mode |= 1 << (8 - i);
        }
    }
    Some(mode)
}

/// Render the low nine mode bits as `rwxr-xr-x`.
pub fn mode_to_permissions(mode: u32) -> String {
    (0..9)
        .map(|i| {
            if mode & (1 << (8 - i)) != 0 {
                ['r', 'w', 'x'][i % 3]
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn directories_sort_first_by_name() {
        let mut entries = vec![
            RemoteEntry::file("b.txt", 1),
            RemoteEntry::directory("zeta"),
            RemoteEntry::file("A.txt", 1),
            RemoteEntry::directory("Alpha"),
        ];
        sort_entries(&mut entries, SortMode::Name);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "zeta", "A.txt", "b.txt"]);
    }

    #[test]
    fn modified_sorts_newest_first() {
        let mut old = RemoteEntry::file("old", 1);
        old.modified = Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let mut new = RemoteEntry::file("new", 1);
        new.modified = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let undated = RemoteEntry::file("undated", 1);
        let mut entries = vec![undated, old, new];
        sort_entries(&mut entries, SortMode::Modified);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["new", "old", "undated"]);
    }

    #[test]
    fn wire_shape_uses_is_directory_flag() {
        let mut entry = RemoteEntry::directory("logs");
        entry.permissions = Some("rwxr-x---".into());
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["isDirectory"], serde_json::json!(true));
        assert_eq!(value["permissionBits"], serde_json::json!("rwxr-x---"));
        assert!(value.get("kind").is_none());

        let parsed: RemoteEntry =
            serde_json::from_str(r#"{"name":"a.txt","isDirectory":false,"size":3}"#).unwrap();
        assert_eq!(parsed, RemoteEntry::file("a.txt", 3));
    }

    #[test]
    fn permission_strings_round_trip() {
        assert_eq!(permissions_to_octal("rwxr-xr-x"), Some(0o755));
        assert_eq!(permissions_to_octal("-rw-r--r--"), Some(0o644));
        assert_eq!(permissions_to_octal("drwx------"), Some(0o700));
        assert_eq!(permissions_to_octal("rwsr-xr-x"), Some(0o755));
        assert_eq!(permissions_to_octal("rwx"), None);
        assert_eq!(permissions_to_octal("rwxr-xr-q"), None);
        assert_eq!(mode_to_permissions(0o640), "rw-r-----");
    }
}
