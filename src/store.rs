//! Persistence of saved connections.
//!
//! A store keeps an ordered list of connection ids plus one secret entry per
//! id, keyed `connection-<id>`, holding the serialized `ConnectionConfig`.
//! Entries are kept as raw JSON strings so one corrupted entry does not make
//! the whole document unreadable.

use async_trait::async_trait;
use remfs_core::{ConnectionConfig, RemoteError, RemoteResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Key/value contract for connection configs and their secrets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn list_ids(&self) -> RemoteResult<Vec<String>>;

    /// `Ok(None)` for unknown ids; an entry that no longer parses is an
    /// `InvalidInput` error.
    async fn get(&self, id: &str) -> RemoteResult<Option<ConnectionConfig>>;

    /// Insert or replace. New ids are appended to the id list.
    async fn put(&self, id: &str, config: &ConnectionConfig) -> RemoteResult<()>;

    /// Remove the id and its entry; unknown ids are fine.
    async fn delete(&self, id: &str) -> RemoteResult<()>;
}

pub fn secret_key(id: &str) -> String {
    format!("connection-{}", id)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreDocument {
    #[serde(default)]
    connection_ids: Vec<String>,
    #[serde(default)]
    secrets: BTreeMap<String, String>,
}

impl StoreDocument {
    fn get(&self, id: &str) -> RemoteResult<Option<ConnectionConfig>> {
        let Some(raw) = self.secrets.get(&secret_key(id)) else {
            return Ok(None);
        };
        serde_json::from_str(raw).map(Some).map_err(|e| {
            RemoteError::invalid_input(format!("Stored connection '{}' is corrupted: {}", id, e))
        })
    }

    fn put(&mut self, id: &str, config: &ConnectionConfig) -> RemoteResult<()> {
        let raw = serde_json::to_string(config)
            .map_err(|e| RemoteError::io(format!("Failed to serialize connection '{}': {}", id, e)))?;
        if !self.connection_ids.iter().any(|x| x == id) {
            self.connection_ids.push(id.to_string());
        }
        self.secrets.insert(secret_key(id), raw);
        Ok(())
    }

    fn delete(&mut self, id: &str) {
        self.connection_ids.retain(|x| x != id);
        self.secrets.remove(&secret_key(id));
    }
}

// ── MemoryStore ──────────────────────────────────────────────────────────────

/// Volatile store, for tests and for callers that persist elsewhere.
#[derive(Default)]
pub struct MemoryStore {
    doc: Mutex<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plant a raw secret entry, bypassing serialization.
    pub async fn insert_raw(&self, id: &str, raw: &str) {
        let mut doc = self.doc.lock().await;
        if !doc.connection_ids.iter().any(|x| x == id) {
            doc.connection_ids.push(id.to_string());
        }
        doc.secrets.insert(secret_key(id), raw.to_string());
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn list_ids(&self) -> RemoteResult<Vec<String>> {
        Ok(self.doc.lock().await.connection_ids.clone())
    }

    async fn get(&self, id: &str) -> RemoteResult<Option<ConnectionConfig>> {
        self.doc.lock().await.get(id)
    }

    async fn put(&self, id: &str, config: &ConnectionConfig) -> RemoteResult<()> {
        self.doc.lock().await.put(id, config)
    }

    async fn delete(&self, id: &str) -> RemoteResult<()> {
        self.doc.lock().await.delete(id);
        Ok(())
    }
}

// ── JsonFileStore ────────────────────────────────────────────────────────────

/// One pretty-printed JSON file, rewritten after every mutation.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    doc: Mutex<StoreDocument>,
}

impl JsonFileStore {
    /// Open (or start) the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> RemoteResult<Self> {
        let path = path.into();
        let doc = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                RemoteError::invalid_input(format!("Connection store is not valid JSON: {}", e))
                    .with_path(path.display().to_string())
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreDocument::default(),
            Err(e) => {
                return Err(RemoteError::from(e).context("open store", &path.display().to_string()))
            }
        };
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `doc` next to the store and rename it into place, so a crash
    /// leaves either the old or the new file.
    async fn flush(&self, doc: &StoreDocument) -> RemoteResult<()> {
        let shown = self.path.display().to_string();
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RemoteError::from(e).context("write store", &shown))?;
        }
        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| RemoteError::io(format!("Failed to serialize store: {}", e)))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| RemoteError::from(e).context("write store", &shown))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(RemoteError::from(e).context("write store", &shown));
        }
        Ok(())
    }

    /// Apply `change` to a copy of the document and keep it only once it is
    /// on disk.
    async fn commit(
        &self,
        change: impl FnOnce(&mut StoreDocument) -> RemoteResult<()>,
    ) -> RemoteResult<()> {
        let mut doc = self.doc.lock().await;
        let mut next = doc.clone();
        change(&mut next)?;
        self.flush(&next).await?;
        *doc = next;
        Ok(())
    }
}

#[async_trait]
impl SecretStore for JsonFileStore {
    async fn list_ids(&self) -> RemoteResult<Vec<String>> {
        Ok(self.doc.lock().await.connection_ids.clone())
    }

    async fn get(&self, id: &str) -> RemoteResult<Option<ConnectionConfig>> {
        self.doc.lock().await.get(id)
    }

    async fn put(&self, id: &str, config: &ConnectionConfig) -> RemoteResult<()> {
        self.commit(|doc| doc.put(id, config)).await
    }

    async fn delete(&self, id: &str) -> RemoteResult<()> {
        self.commit(|doc| {
            doc.delete(id);
            Ok(())
        })
        .await
    }
}
