//! High-level orchestrator: owns the connection registry and the edit
//! tracker and exposes the command surface front ends call into.
//!
//! Remote locations are addressed as `RemoteAddress` (`connection-id:/path`);
//! every call resolves the connection through the registry, so a dropped
//! connection is transparently rebuilt on the next command.

use crate::conflict::ConflictPrompt;
use crate::open_files::{OpenFileInfo, OpenFileTracker, SaveOutcome};
use crate::registry::{ClientFactory, ConnectionRegistry, NativeClientFactory};
use crate::search;
use crate::settings::Settings;
use crate::store::{JsonFileStore, SecretStore};
use crate::transfer::{self, TransferContext, TransferReport};
use chrono::{DateTime, Utc};
use remfs_core::{
    path, permissions_to_octal, sort_entries, ConnectionConfig, EntryKind, ProtocolClient,
    RemoteAddress, RemoteEntry, RemoteError, RemoteResult, SortMode,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Thread-safe handle shared by front ends.
pub type RemoteFsServiceState = Arc<RemoteFsService>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListOptions {
    pub sort: SortMode,
    /// Glob matched against entry names, e.g. `*.log`.
    pub filter: Option<String>,
    pub show_hidden: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            sort: SortMode::Name,
            filter: None,
            show_hidden: true,
        }
    }
}

/// Details for one remote entry, with its permission bits in octal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub permissions: Option<String>,
    /// Three octal digits; `644` when the server reports no usable bits.
    pub octal: String,
}

pub struct RemoteFsService {
    registry: ConnectionRegistry,
    open_files: OpenFileTracker,
    settings: Settings,
}

impl RemoteFsService {
    pub fn new(
        settings: Settings,
        factory: Arc<dyn ClientFactory>,
        store: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            registry: ConnectionRegistry::new(factory, store),
            open_files: OpenFileTracker::new(settings.edit_dir.clone()),
            settings,
        }
    }

    /// Real SFTP/FTP clients with connections persisted at
    /// `settings.store_path`.
    pub async fn from_settings(settings: Settings) -> RemoteResult<RemoteFsServiceState> {
        let store = JsonFileStore::open(settings.store_path.clone()).await?;
        Ok(Arc::new(Self::new(
            settings,
            Arc::new(NativeClientFactory),
            Arc::new(store),
        )))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    async fn client(&self, connection_id: &str) -> RemoteResult<Arc<dyn ProtocolClient>> {
        self.registry.connect(connection_id).await
    }

    // ─── Connection lifecycle ────────────────────────────────────

    pub async fn connect(&self, connection_id: &str) -> RemoteResult<()> {
        self.client(connection_id).await.map(|_| ())
    }

    pub async fn disconnect(&self, connection_id: &str) {
        self.registry.disconnect(connection_id).await
    }

    pub async fn add_connection(&self, config: ConnectionConfig) -> RemoteResult<()> {
        let config = self.with_default_timeout(config);
        self.registry.add_connection(config).await.map(|_| ())
    }

    pub async fn update_connection(&self, config: ConnectionConfig) -> RemoteResult<()> {
        let config = self.with_default_timeout(config);
        self.registry.update_connection(config).await.map(|_| ())
    }

    pub async fn remove_connection(&self, connection_id: &str) -> RemoteResult<()> {
        self.registry.remove_connection(connection_id).await
    }

    /// Saved connections ordered by id.
    pub async fn list_connections(&self) -> RemoteResult<Vec<ConnectionConfig>> {
        let mut configs = self.registry.list_connections().await?;
        configs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(configs)
    }

    /// Close every live connection.
    pub async fn shutdown(&self) {
        self.registry.close_all().await
    }

    fn with_default_timeout(&self, mut config: ConnectionConfig) -> ConnectionConfig {
        if config.connect_timeout_secs == 0 {
            config.connect_timeout_secs = self.settings.default_connect_timeout_secs;
        }
        config
    }

    // ─── Directory operations ────────────────────────────────────

    pub async fn list(
        &self,
        dir: &RemoteAddress,
        options: &ListOptions,
    ) -> RemoteResult<Vec<RemoteEntry>> {
        let client = self.client(&dir.connection_id).await?;
        let mut entries = client.list(&dir.path).await?;

        if let Some(ref filter) = options.filter {
            let pattern = glob::Pattern::new(filter).map_err(|e| {
                RemoteError::invalid_input(format!("Invalid filter '{}': {}", filter, e))
            })?;
            entries.retain(|e| e.is_directory() || pattern.matches(&e.name));
        }
        if !options.show_hidden {
            entries.retain(|e| !e.name.starts_with('.'));
        }

        sort_entries(&mut entries, options.sort);
        Ok(entries)
    }

    pub async fn mkdir(&self, dir: &RemoteAddress, recursive: bool) -> RemoteResult<()> {
        let client = self.client(&dir.connection_id).await?;
        client.mkdir(&dir.path, recursive).await?;
        info!(%dir, "directory created");
        Ok(())
    }

    /// Rename in place: `new_name` is a bare name, not a path.
    pub async fn rename(&self, target: &RemoteAddress, new_name: &str) -> RemoteResult<String> {
        validate_name(new_name)?;
        let client = self.client(&target.connection_id).await?;
        let new_path = path::join(&path::parent(&target.path), new_name);
        client.rename(&target.path, &new_path).await?;
        Ok(new_path)
    }

    /// Move a file or directory into `target_dir`, keeping its name.
    pub async fn move_entry(&self, source: &RemoteAddress, target_dir: &str) -> RemoteResult<String> {
        if target_dir.trim().is_empty() {
            return Err(RemoteError::invalid_input("Destination folder must not be empty"));
        }
        let client = self.client(&source.connection_id).await?;
        let new_path = path::join(&path::normalize(target_dir), path::basename(&source.path));
        client.rename(&source.path, &new_path).await?;
        info!(from = %source, to = %new_path, "moved");
        Ok(new_path)
    }

    /// Delete a file, or a directory with everything below it.
    pub async fn delete(&self, target: &RemoteAddress) -> RemoteResult<()> {
        let client = self.client(&target.connection_id).await?;
        let entry = client.stat(&target.path).await?.ok_or_else(|| {
            RemoteError::not_found("No such file or directory")
                .with_operation("delete")
                .with_path(target.path.clone())
        })?;
        if entry.is_directory() {
            client.rmdir(&target.path, true).await?;
        } else {
            client.delete(&target.path).await?;
        }
        info!(%target, "deleted");
        Ok(())
    }

    /// `mode` is three octal digits, e.g. `"755"`.
    pub async fn chmod(&self, target: &RemoteAddress, mode: &str) -> RemoteResult<()> {
        let bits = parse_octal_mode(mode)?;
        let client = self.client(&target.connection_id).await?;
        client.chmod(&target.path, bits).await
    }

    pub async fn file_info(&self, target: &RemoteAddress) -> RemoteResult<FileInfo> {
        let client = self.client(&target.connection_id).await?;
        let entry = client.stat(&target.path).await?.ok_or_else(|| {
            RemoteError::not_found("No such file or directory")
                .with_operation("stat")
                .with_path(target.path.clone())
        })?;
        let octal = entry
            .permissions
            .as_deref()
            .and_then(permissions_to_octal)
            .map(|m| format!("{:03o}", m & 0o777))
            .unwrap_or_else(|| "644".to_string());
        Ok(FileInfo {
            path: target.path.clone(),
            kind: entry.kind,
            size: entry.size,
            modified: entry.modified,
            permissions: entry.permissions,
            octal,
        })
    }

    // ─── File operations ─────────────────────────────────────────

    /// Create an empty file named `name` inside `dir`.
    pub async fn create_file(&self, dir: &RemoteAddress, name: &str) -> RemoteResult<String> {
        validate_name(name)?;
        let client = self.client(&dir.connection_id).await?;
        let remote = path::join(&dir.path, name);
        if client.stat(&remote).await?.is_some() {
            return Err(RemoteError::already_exists("A file with that name already exists")
                .with_operation("create")
                .with_path(remote));
        }

        let scratch = self.scratch_path().await?;
        tokio::fs::write(&scratch, b"").await?;
        let result = client.put(&scratch, &remote).await;
        remove_scratch(&scratch).await;
        result?;
        Ok(remote)
    }

    /// Copy a file next to itself as `name-copy.ext`, `name-copy-1.ext`, …
    pub async fn duplicate_file(&self, source: &RemoteAddress) -> RemoteResult<String> {
        let client = self.client(&source.connection_id).await?;
        let dir = path::parent(&source.path);
        let existing: Vec<String> = client.list(&dir).await?.into_iter().map(|e| e.name).collect();

        match client.stat(&source.path).await?.map(|e| e.kind) {
            Some(EntryKind::File) => {}
            Some(EntryKind::Directory) => {
                return Err(RemoteError::invalid_input("Only files can be duplicated")
                    .with_path(source.path.clone()))
            }
            None => {
                return Err(RemoteError::not_found("No such file")
                    .with_operation("duplicate")
                    .with_path(source.path.clone()))
            }
        }

        let new_path = path::join(&dir, &duplicate_name(path::basename(&source.path), &existing));
        let scratch = self.scratch_path().await?;
        let result = async {
            client.get(&source.path, &scratch).await?;
            client.put(&scratch, &new_path).await
        }
        .await;
        remove_scratch(&scratch).await;
        result?;
        info!(from = %source, to = %new_path, "duplicated");
        Ok(new_path)
    }

    pub async fn upload_file(&self, local: &Path, remote: &RemoteAddress) -> RemoteResult<u64> {
        let client = self.client(&remote.connection_id).await?;
        client.put(local, &remote.path).await
    }

    /// Upload several local files into `dir`. Names already taken get a
    /// `-copy` suffix (`a-copy.txt`, `a-copy-2.txt`, …). Returns the names
    /// used, in input order.
    pub async fn upload_files(&self, locals: &[PathBuf], dir: &RemoteAddress) -> RemoteResult<Vec<String>> {
        let client = self.client(&dir.connection_id).await?;
        let mut taken: Vec<String> = client.list(&dir.path).await?.into_iter().map(|e| e.name).collect();
        let mut uploaded = Vec::with_capacity(locals.len());

        for local in locals {
            let original = local
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    RemoteError::invalid_input("Local path has no file name")
                        .with_path(local.display().to_string())
                })?;
            let name = upload_name(&original, &taken);
            client.put(local, &path::join(&dir.path, &name)).await?;
            taken.push(name.clone());
            uploaded.push(name);
        }
        Ok(uploaded)
    }

    pub async fn download_file(&self, remote: &RemoteAddress, local: &Path) -> RemoteResult<u64> {
        let client = self.client(&remote.connection_id).await?;
        client.get(&remote.path, local).await
    }

    // ─── Tree transfers & search ─────────────────────────────────

    pub async fn upload_tree(
        &self,
        local_root: &Path,
        remote_root: &RemoteAddress,
        ctx: &TransferContext,
    ) -> RemoteResult<TransferReport> {
        let client = self.client(&remote_root.connection_id).await?;
        transfer::upload_tree(client.as_ref(), local_root, &remote_root.path, ctx).await
    }

    pub async fn download_tree(
        &self,
        remote_root: &RemoteAddress,
        local_root: &Path,
        ctx: &TransferContext,
    ) -> RemoteResult<TransferReport> {
        let client = self.client(&remote_root.connection_id).await?;
        transfer::download_tree(client.as_ref(), &remote_root.path, local_root, ctx).await
    }

    /// Transfer context with a fresh cancel token and no progress sink.
    pub fn transfer_context(&self, prompt: Arc<dyn ConflictPrompt>) -> TransferContext {
        TransferContext::new(prompt)
    }

    pub async fn search(&self, root: &RemoteAddress, keyword: &str) -> RemoteResult<Vec<String>> {
        if keyword.trim().is_empty() {
            return Err(RemoteError::invalid_input("Search keyword must not be empty"));
        }
        let client = self.client(&root.connection_id).await?;
        Ok(search::search(client.as_ref(), &root.path, keyword).await)
    }

    // ─── Editing ─────────────────────────────────────────────────

    pub async fn open_for_edit(&self, target: &RemoteAddress) -> RemoteResult<PathBuf> {
        let client = self.client(&target.connection_id).await?;
        self.open_files
            .open(&target.connection_id, &target.path, client)
            .await
    }

    pub async fn save_edit(&self, local: &Path) -> RemoteResult<SaveOutcome> {
        self.open_files.save(local).await
    }

    pub async fn close_edit(&self, local: &Path) -> bool {
        self.open_files.close(local).await
    }

    pub async fn open_files(&self) -> Vec<OpenFileInfo> {
        self.open_files.sessions().await
    }

    // ─── Scratch files ───────────────────────────────────────────

    async fn scratch_path(&self) -> RemoteResult<PathBuf> {
        let dir = self.settings.edit_dir.join(".scratch");
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir.join(Uuid::new_v4().to_string()))
    }
}

async fn remove_scratch(scratch: &Path) {
    if let Err(e) = tokio::fs::remove_file(scratch).await {
        tracing::debug!(path = %scratch.display(), error = %e, "could not remove scratch file");
    }
}

fn validate_name(name: &str) -> RemoteResult<()> {
    if name.trim().is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(RemoteError::invalid_input(format!("Invalid name '{}'", name)));
    }
    Ok(())
}

/// Accepts exactly three octal digits.
pub fn parse_octal_mode(mode: &str) -> RemoteResult<u32> {
    if mode.len() != 3 || !mode.chars().all(|c| ('0'..='7').contains(&c)) {
        return Err(RemoteError::invalid_input(format!(
            "Invalid mode '{}': enter a 3-digit octal number (0-7)",
            mode
        )));
    }
    u32::from_str_radix(mode, 8)
        .map_err(|e| RemoteError::invalid_input(format!("Invalid mode '{}': {}", mode, e)))
}

/// Split `name.ext` into (`name`, `.ext`). Leading dots belong to the stem.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 => name.split_at(i),
        _ => (name, ""),
    }
}

/// `a.txt` → `a-copy.txt`, then `a-copy-1.txt`, `a-copy-2.txt`, …
pub fn duplicate_name(name: &str, existing: &[String]) -> String {
    let (stem, ext) = split_extension(name);
    let mut candidate = format!("{}-copy{}", stem, ext);
    let mut counter = 1;
    while existing.iter().any(|e| *e == candidate) {
        candidate = format!("{}-copy-{}{}", stem, counter, ext);
        counter += 1;
    }
    candidate
}

/// `a.txt` if free, else `a-copy.txt`, then `a-copy-2.txt`, `a-copy-3.txt`, …
pub fn upload_name(name: &str, existing: &[String]) -> String {
    if !existing.iter().any(|e| e == name) {
        return name.to_string();
    }
    let (stem, ext) = split_extension(name);
    let mut counter = 1;
    loop {
        let candidate = if counter > 1 {
            format!("{}-copy-{}{}", stem, counter, ext)
        } else {
            format!("{}-copy{}", stem, ext)
        };
        if !existing.iter().any(|e| *e == candidate) {
            return candidate;
        }
        counter += 1;
    }
}
