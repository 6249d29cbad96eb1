//! Remote files opened for local editing.
//!
//! Opening downloads the file into the edit directory and remembers where it
//! came from; each save uploads the local copy back. A save that arrives
//! while the previous upload for the same file is still running is dropped,
//! not queued, so the newest edit can be lost until the next save.

use remfs_core::{path, ProtocolClient, RemoteResult};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Clone)]
struct OpenFileSession {
    connection_id: String,
    remote_path: String,
    client: Arc<dyn ProtocolClient>,
}

/// Serializable view of one tracked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenFileInfo {
    pub local_path: PathBuf,
    pub connection_id: String,
    pub remote_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The path is not a tracked edit copy.
    NotTracked,
    /// An upload for this path was already running.
    Dropped,
    Uploaded(u64),
}

type InFlight = Arc<StdMutex<HashSet<PathBuf>>>;

/// Clears the in-flight mark when the upload finishes, whatever the outcome.
struct InFlightGuard {
    set: InFlight,
    path: PathBuf,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.path);
    }
}

pub struct OpenFileTracker {
    edit_dir: PathBuf,
    sessions: Mutex<HashMap<PathBuf, OpenFileSession>>,
    in_flight: InFlight,
}

/// Keep connection ids usable as a file-name prefix.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

impl OpenFileTracker {
    pub fn new(edit_dir: impl Into<PathBuf>) -> Self {
        Self {
            edit_dir: edit_dir.into(),
            sessions: Mutex::new(HashMap::new()),
            in_flight: Arc::new(StdMutex::new(HashSet::new())),
        }
    }

    pub fn edit_dir(&self) -> &Path {
        &self.edit_dir
    }

    /// Where `remote_path` of `connection_id` is placed for editing.
    pub fn local_path_for(&self, connection_id: &str, remote_path: &str) -> PathBuf {
        self.edit_dir.join(format!(
            "{}__{}",
            sanitize(connection_id),
            path::basename(remote_path)
        ))
    }

    /// Download `remote_path` into the edit directory and start tracking it.
    pub async fn open(
        &self,
        connection_id: &str,
        remote_path: &str,
        client: Arc<dyn ProtocolClient>,
    ) -> RemoteResult<PathBuf> {
        let local = self.local_path_for(connection_id, remote_path);
        tokio::fs::create_dir_all(&self.edit_dir).await?;
        client
            .get(remote_path, &local)
            .await
            .map_err(|e| e.context("open", remote_path))?;

        self.sessions.lock().await.insert(
            local.clone(),
            OpenFileSession {
                connection_id: connection_id.to_string(),
                remote_path: remote_path.to_string(),
                client,
            },
        );
        info!(connection_id, remote_path, local = %local.display(), "opened for editing");
        Ok(local)
    }

    /// Upload the local copy back to where it came from.
    pub async fn save(&self, local_path: &Path) -> RemoteResult<SaveOutcome> {
        let tracked = self.sessions.lock().await.get(local_path).cloned();
        let Some(session) = tracked else {
            debug!(local = %local_path.display(), "save of untracked file ignored");
            return Ok(SaveOutcome::NotTracked);
        };

        let _guard = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if !in_flight.insert(local_path.to_path_buf()) {
                warn!(local = %local_path.display(), "upload already in progress; dropping this save");
                return Ok(SaveOutcome::Dropped);
            }
            InFlightGuard {
                set: self.in_flight.clone(),
                path: local_path.to_path_buf(),
            }
        };

        let bytes = session
            .client
            .put(local_path, &session.remote_path)
            .await
            .map_err(|e| e.context("save", &session.remote_path))?;
        info!(
            connection_id = %session.connection_id,
            remote_path = %session.remote_path,
            bytes,
            "saved edit"
        );
        Ok(SaveOutcome::Uploaded(bytes))
    }

    /// Stop tracking; the remote file is left alone. Returns whether the
    /// path was tracked.
    pub async fn close(&self, local_path: &Path) -> bool {
        let removed = self.sessions.lock().await.remove(local_path).is_some();
        if removed {
            debug!(local = %local_path.display(), "edit session closed");
        }
        removed
    }

    pub async fn is_tracked(&self, local_path: &Path) -> bool {
        self.sessions.lock().await.contains_key(local_path)
    }

    pub async fn sessions(&self) -> Vec<OpenFileInfo> {
        let mut infos: Vec<OpenFileInfo> = self
            .sessions
            .lock()
            .await
            .iter()
            .map(|(local, s)| OpenFileInfo {
                local_path: local.clone(),
                connection_id: s.connection_id.clone(),
                remote_path: s.remote_path.clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.local_path.cmp(&b.local_path));
        infos
    }
}
