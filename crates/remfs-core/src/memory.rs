//! In-memory `ProtocolClient` backend.
//!
//! Keeps a whole remote tree in a `BTreeMap` keyed by absolute path, so
//! listings come back in a stable, sorted order. Useful for dry runs and for
//! exercising the transfer/search/registry layers without a network.
//!
//! Behaviour mirrors the real variants where it matters to callers:
//! `mkdir` reports `AlreadyExists`, `chmod` on a legacy-flavoured instance is
//! `Unsupported`, and a closed or unreachable instance fails every call.

use crate::client::ProtocolClient;
use crate::config::Protocol;
use crate::entry::{mode_to_permissions, EntryKind, RemoteEntry};
use crate::error::{RemoteError, RemoteResult};
use crate::path;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct Node {
    /// `None` marks a directory.
    data: Option<Vec<u8>>,
    mode: u32,
    modified: DateTime<Utc>,
}

impl Node {
    fn dir() -> Self {
        Self {
            data: None,
            mode: 0o755,
            modified: Utc::now(),
        }
    }

    fn file(data: Vec<u8>) -> Self {
        Self {
            data: Some(data),
            mode: 0o644,
            modified: Utc::now(),
        }
    }

    fn is_dir(&self) -> bool {
        self.data.is_none()
    }
}

pub struct MemoryClient {
    protocol: Protocol,
    nodes: Mutex<BTreeMap<String, Node>>,
    reachable: AtomicBool,
    closed: AtomicBool,
    close_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl MemoryClient {
    pub fn new(protocol: Protocol) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::dir());
        Self {
            protocol,
            nodes: Mutex::new(nodes),
            reachable: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
        }
    }

    /// Add a directory (and any missing parents).
    pub fn with_dir(self, dir: &str) -> Self {
        self.insert_dir_all(&path::normalize(dir));
        self
    }

    /// Add a file (and any missing parent directories).
    pub fn with_file(self, file: &str, contents: impl Into<Vec<u8>>) -> Self {
        let file = path::normalize(file);
        self.insert_dir_all(&path::parent(&file));
        self.lock().insert(file, Node::file(contents.into()));
        self
    }

    pub fn file_contents(&self, file: &str) -> Option<Vec<u8>> {
        self.lock()
            .get(&path::normalize(file))
            .and_then(|n| n.data.clone())
    }

    pub fn exists(&self, target: &str) -> bool {
        self.lock().contains_key(&path::normalize(target))
    }

    pub fn is_dir(&self, target: &str) -> bool {
        self.lock()
            .get(&path::normalize(target))
            .map(Node::is_dir)
            .unwrap_or(false)
    }

    pub fn mode(&self, target: &str) -> Option<u32> {
        self.lock().get(&path::normalize(target)).map(|n| n.mode)
    }

    /// Simulate the host going away (probe and every other call fail).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn put_count(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // ── internals ────────────────────────────────────────────────

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Node>> {
        // A poisoned map still holds consistent nodes; every mutation is a
        // single insert/remove.
        self.nodes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert_dir_all(&self, dir: &str) {
        let mut nodes = self.lock();
        let mut current = String::from("/");
        for seg in dir.split('/').filter(|s| !s.is_empty()) {
            current = path::join(&current, seg);
            nodes.entry(current.clone()).or_insert_with(Node::dir);
        }
    }

    fn check_open(&self, op: &str) -> RemoteResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RemoteError::connection("client is closed").with_operation(op));
        }
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(RemoteError::connection("host unreachable").with_operation(op));
        }
        Ok(())
    }

    fn is_child(parent: &str, candidate: &str) -> bool {
        candidate != "/" && path::parent(candidate) == parent
    }

    fn is_descendant(root: &str, candidate: &str) -> bool {
        let prefix = if root.ends_with('/') {
            root.to_string()
        } else {
            format!("{}/", root)
        };
        candidate.starts_with(&prefix)
    }
}

#[async_trait]
impl ProtocolClient for MemoryClient {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    async fn list(&self, dir: &str) -> RemoteResult<Vec<RemoteEntry>> {
        self.check_open("list")?;
        let dir = path::normalize(dir);
        let nodes = self.lock();
        match nodes.get(&dir) {
            Some(n) if n.is_dir() => {}
            Some(_) => {
                return Err(RemoteError::protocol("not a directory")
                    .with_operation("list")
                    .with_path(dir))
            }
            None => {
                return Err(RemoteError::not_found("no such directory")
                    .with_operation("list")
                    .with_path(dir))
            }
        }
        Ok(nodes
            .iter()
            .filter(|(p, _)| Self::is_child(&dir, p))
            .map(|(p, n)| RemoteEntry {
                name: path::basename(p).to_string(),
                kind: if n.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                size: n.data.as_ref().map(|d| d.len() as u64).unwrap_or(0),
                modified: Some(n.modified),
                permissions: Some(mode_to_permissions(n.mode)),
            })
            .collect())
    }

    async fn get(&self, remote: &str, local: &Path) -> RemoteResult<u64> {
        self.check_open("get")?;
        let remote = path::normalize(remote);
        let data = match self.lock().get(&remote) {
            Some(Node { data: Some(d), .. }) => d.clone(),
            Some(_) => {
                return Err(RemoteError::protocol("is a directory")
                    .with_operation("get")
                    .with_path(remote))
            }
            None => {
                return Err(RemoteError::not_found("no such file")
                    .with_operation("get")
                    .with_path(remote))
            }
        };
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local, &data).await?;
        Ok(data.len() as u64)
    }

    async fn put(&self, local: &Path, remote: &str) -> RemoteResult<u64> {
        self.check_open("put")?;
        let data = tokio::fs::read(local)
            .await
            .map_err(|e| RemoteError::from(e).context("put", &local.display().to_string()))?;
        let remote = path::normalize(remote);
        let mut nodes = self.lock();
        match nodes.get(&path::parent(&remote)) {
            Some(n) if n.is_dir() => {}
            _ => {
                return Err(RemoteError::not_found("parent directory does not exist")
                    .with_operation("put")
                    .with_path(remote))
            }
        }
        if nodes.get(&remote).map(Node::is_dir).unwrap_or(false) {
            return Err(RemoteError::protocol("target is a directory")
                .with_operation("put")
                .with_path(remote));
        }
        let len = data.len() as u64;
        nodes.insert(remote, Node::file(data));
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        Ok(len)
    }

    async fn delete(&self, target: &str) -> RemoteResult<()> {
        self.check_open("delete")?;
        let target = path::normalize(target);
        let mut nodes = self.lock();
        match nodes.get(&target) {
            Some(n) if !n.is_dir() => {
                nodes.remove(&target);
                Ok(())
            }
            Some(_) => Err(RemoteError::protocol("is a directory")
                .with_operation("delete")
                .with_path(target)),
            None => Err(RemoteError::not_found("no such file")
                .with_operation("delete")
                .with_path(target)),
        }
    }

    async fn mkdir(&self, dir: &str, recursive: bool) -> RemoteResult<()> {
        self.check_open("mkdir")?;
        let dir = path::normalize(dir);
        {
            let mut nodes = self.lock();
            if let Some(existing) = nodes.get(&dir) {
                if recursive && existing.is_dir() {
                    return Ok(());
                }
                return Err(RemoteError::already_exists("file exists")
                    .with_operation("mkdir")
                    .with_path(dir));
            }
            if !recursive {
                return match nodes.get(&path::parent(&dir)) {
                    Some(n) if n.is_dir() => {
                        nodes.insert(dir, Node::dir());
                        Ok(())
                    }
                    _ => Err(RemoteError::not_found("parent directory does not exist")
                        .with_operation("mkdir")
                        .with_path(dir)),
                };
            }
        }
        self.insert_dir_all(&dir);
        Ok(())
    }

    async fn rmdir(&self, dir: &str, recursive: bool) -> RemoteResult<()> {
        self.check_open("rmdir")?;
        let dir = path::normalize(dir);
        if dir == "/" {
            return Err(RemoteError::permission_denied("refusing to remove the root")
                .with_operation("rmdir")
                .with_path(dir));
        }
        let mut nodes = self.lock();
        match nodes.get(&dir) {
            Some(n) if n.is_dir() => {}
            Some(_) => {
                return Err(RemoteError::protocol("not a directory")
                    .with_operation("rmdir")
                    .with_path(dir))
            }
            None => {
                return Err(RemoteError::not_found("no such directory")
                    .with_operation("rmdir")
                    .with_path(dir))
            }
        }
        let descendants: Vec<String> = nodes
            .keys()
            .filter(|p| Self::is_descendant(&dir, p))
            .cloned()
            .collect();
        if !descendants.is_empty() && !recursive {
            return Err(RemoteError::protocol("directory not empty")
                .with_operation("rmdir")
                .with_path(dir));
        }
        for p in descendants {
            nodes.remove(&p);
        }
        nodes.remove(&dir);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> RemoteResult<()> {
        self.check_open("rename")?;
        let from = path::normalize(from);
        let to = path::normalize(to);
        let mut nodes = self.lock();
        if !nodes.contains_key(&from) {
            return Err(RemoteError::not_found("no such file or directory")
                .with_operation("rename")
                .with_path(from));
        }
        if !nodes.get(&path::parent(&to)).map(Node::is_dir).unwrap_or(false) {
            return Err(RemoteError::not_found("target directory does not exist")
                .with_operation("rename")
                .with_path(to));
        }
        let moved: Vec<String> = nodes
            .keys()
            .filter(|p| **p == from || Self::is_descendant(&from, p))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let new = format!("{}{}", to, &old[from.len()..]);
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    async fn chmod(&self, target: &str, mode: u32) -> RemoteResult<()> {
        self.check_open("chmod")?;
        if self.protocol == Protocol::Legacy {
            return Err(RemoteError::unsupported("chmod is not available over FTP")
                .with_operation("chmod")
                .with_path(target));
        }
        let target = path::normalize(target);
        match self.lock().get_mut(&target) {
            Some(node) => {
                node.mode = mode & 0o7777;
                Ok(())
            }
            None => Err(RemoteError::not_found("no such file or directory")
                .with_operation("chmod")
                .with_path(target)),
        }
    }

    async fn probe(&self) -> RemoteResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RemoteError::transient("client is closed"));
        }
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(RemoteError::transient("liveness probe failed"));
        }
        Ok(())
    }

    async fn close(&self) -> RemoteResult<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
