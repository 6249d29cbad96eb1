//! POSIX path helpers for remote paths and `connection:/path` addressing.
//!
//! Remote paths are always `/`-separated regardless of the local platform.

use crate::error::RemoteError;
use std::fmt;
use std::str::FromStr;

/// Join a child name onto a directory path.
pub fn join(base: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if base.is_empty() {
        return name.to_string();
    }
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Parent directory; the root is its own parent.
pub fn parent(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None if path.starts_with('/') => "/".to_string(),
        Some(pos) => trimmed[..pos].to_string(),
        None => ".".to_string(),
    }
}

/// Last path component, ignoring trailing slashes.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

/// Collapse duplicate slashes and resolve `.`/`..` segments. Relative input
/// is anchored at `/`.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("/{}", parts.join("/"))
}

/// A remote location: connection id plus absolute POSIX path.
/// Textual form is `id:/path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteAddress {
    pub connection_id: String,
    pub path: String,
}

impl RemoteAddress {
    pub fn new(connection_id: impl Into<String>, path: &str) -> Self {
        Self {
            connection_id: connection_id.into(),
            path: normalize(path),
        }
    }
}

impl fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.connection_id, self.path)
    }
}

impl FromStr for RemoteAddress {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, path) = s
            .split_once(':')
            .ok_or_else(|| RemoteError::invalid_input(format!("Missing ':' in address '{}'", s)))?;
        if id.is_empty() {
            return Err(RemoteError::invalid_input(format!(
                "Missing connection id in address '{}'",
                s
            )));
        }
        if !path.starts_with('/') {
            return Err(RemoteError::invalid_input(format!(
                "Remote path must be absolute in address '{}'",
                s
            )));
        }
        Ok(Self::new(id, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_handles_slashes() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/x", "a"), "/x/a");
        assert_eq!(join("/x/", "/a"), "/x/a");
    }

    #[test]
    fn parent_and_basename() {
        assert_eq!(parent("/a/b"), "/a");
        assert_eq!(parent("/a"), "/");
        assert_eq!(parent("/"), "/");
        assert_eq!(parent("/a/b/"), "/a");
        assert_eq!(basename("/a/b.txt"), "b.txt");
        assert_eq!(basename("/a/dir/"), "dir");
    }

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(normalize("/a//b/./c/../d"), "/a/b/d");
        assert_eq!(normalize("a/b"), "/a/b");
        assert_eq!(normalize("/.."), "/");
    }

    #[test]
    fn address_parses_and_prints() {
        let addr: RemoteAddress = "web:/var/www//html".parse().unwrap();
        assert_eq!(addr.connection_id, "web");
        assert_eq!(addr.path, "/var/www/html");
        assert_eq!(addr.to_string(), "web:/var/www/html");
        assert!("web".parse::<RemoteAddress>().is_err());
        assert!(":/x".parse::<RemoteAddress>().is_err());
        assert!("web:relative".parse::<RemoteAddress>().is_err());
    }
}
