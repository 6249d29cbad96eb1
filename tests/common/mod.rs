//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use remfs::{
    ClientFactory, ConnectionConfig, MemoryClient, Protocol, ProtocolClient, RemoteEntry,
    RemoteError, RemoteResult,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

type Seed = Box<dyn Fn(&ConnectionConfig) -> MemoryClient + Send + Sync>;

/// Hands out a fresh `MemoryClient` per connect and remembers each one.
pub struct MemoryFactory {
    seed: Seed,
    made: Mutex<Vec<Arc<MemoryClient>>>,
}

impl MemoryFactory {
    pub fn new() -> Self {
        Self::seeded(|config| MemoryClient::new(config.protocol))
    }

    pub fn seeded(seed: impl Fn(&ConnectionConfig) -> MemoryClient + Send + Sync + 'static) -> Self {
        Self {
            seed: Box::new(seed),
            made: Mutex::new(Vec::new()),
        }
    }

    pub fn made(&self) -> Vec<Arc<MemoryClient>> {
        self.made.lock().unwrap().clone()
    }

    pub fn last(&self) -> Arc<MemoryClient> {
        self.made().last().cloned().expect("no client created yet")
    }
}

#[async_trait]
impl ClientFactory for MemoryFactory {
    async fn connect(&self, config: &ConnectionConfig) -> RemoteResult<Arc<dyn ProtocolClient>> {
        let client = Arc::new((self.seed)(config));
        self.made.lock().unwrap().push(client.clone());
        Ok(client)
    }
}

pub fn secure(id: &str) -> ConnectionConfig {
    ConnectionConfig::new(id, Protocol::Secure, "sftp.example.org", "alice").with_password("pw")
}

pub fn legacy(id: &str) -> ConnectionConfig {
    ConnectionConfig::new(id, Protocol::Legacy, "ftp.example.org", "bob").with_password("pw")
}

/// A `MemoryClient` whose listings can be replaced per directory, or made to
/// fail, to imitate a misbehaving server.
pub struct ScriptedListings {
    pub inner: MemoryClient,
    /// `None` makes listing that directory fail.
    listings: HashMap<String, Option<Vec<RemoteEntry>>>,
}

impl ScriptedListings {
    pub fn new(inner: MemoryClient) -> Self {
        Self {
            inner,
            listings: HashMap::new(),
        }
    }

    pub fn listing(mut self, dir: &str, entries: Vec<RemoteEntry>) -> Self {
        self.listings.insert(dir.to_string(), Some(entries));
        self
    }

    pub fn unlistable(mut self, dir: &str) -> Self {
        self.listings.insert(dir.to_string(), None);
        self
    }
}

#[async_trait]
impl ProtocolClient for ScriptedListings {
    fn protocol(&self) -> Protocol {
        self.inner.protocol()
    }
    async fn list(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>> {
        match self.listings.get(path) {
            Some(Some(entries)) => Ok(entries.clone()),
            Some(None) => Err(RemoteError::permission_denied("Permission denied").with_path(path)),
            None => self.inner.list(path).await,
        }
    }
    async fn get(&self, remote: &str, local: &Path) -> RemoteResult<u64> {
        self.inner.get(remote, local).await
    }
    async fn put(&self, local: &Path, remote: &str) -> RemoteResult<u64> {
        self.inner.put(local, remote).await
    }
    async fn delete(&self, path: &str) -> RemoteResult<()> {
        self.inner.delete(path).await
    }
    async fn mkdir(&self, path: &str, recursive: bool) -> RemoteResult<()> {
        self.inner.mkdir(path, recursive).await
    }
    async fn rmdir(&self, path: &str, recursive: bool) -> RemoteResult<()> {
        self.inner.rmdir(path, recursive).await
    }
    async fn rename(&self, from: &str, to: &str) -> RemoteResult<()> {
        self.inner.rename(from, to).await
    }
    async fn chmod(&self, path: &str, mode: u32) -> RemoteResult<()> {
        self.inner.chmod(path, mode).await
    }
    async fn probe(&self) -> RemoteResult<()> {
        self.inner.probe().await
    }
    async fn close(&self) -> RemoteResult<()> {
        self.inner.close().await
    }
}
