//! Recursive directory-tree upload and download.
//!
//! A job first walks the whole source to count files, then copies depth-first
//! in listing order. Cancellation is checked before each directory and each
//! file, never in the middle of one. Every copied file advances the progress
//! percentage; skipped conflicts are counted separately.

use crate::conflict::{ConflictPrompt, ConflictResolver, Resolution};
use crate::progress::{percent, CancelToken, NoProgress, ProgressSink, ProgressUpdate};
use futures::future::BoxFuture;
use futures::FutureExt;
use remfs_core::{path, ProtocolClient, RemoteError, RemoteErrorKind, RemoteResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransferDirection {
    Upload,
    Download,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransferStatus {
    Completed,
    Cancelled,
}

/// Outcome of a tree transfer that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReport {
    pub job_id: String,
    pub direction: TransferDirection,
    pub total_files: u64,
    pub completed_files: u64,
    pub skipped_files: u64,
    pub status: TransferStatus,
}

impl TransferReport {
    pub fn is_cancelled(&self) -> bool {
        self.status == TransferStatus::Cancelled
    }

    /// Turn a cancelled report into a `Cancelled` error.
    pub fn into_result(self) -> RemoteResult<Self> {
        match self.status {
            TransferStatus::Completed => Ok(self),
            TransferStatus::Cancelled => Err(RemoteError::cancelled(format!(
                "Transfer {} cancelled after {} of {} files",
                self.job_id, self.completed_files, self.total_files
            ))),
        }
    }
}

/// Caller-side hooks for one job: cancellation, progress and the conflict
/// prompt. The conflict state itself is created fresh for every job.
#[derive(Clone)]
pub struct TransferContext {
    pub cancel: CancelToken,
    pub progress: Arc<dyn ProgressSink>,
    pub prompt: Arc<dyn ConflictPrompt>,
}

impl TransferContext {
    pub fn new(prompt: Arc<dyn ConflictPrompt>) -> Self {
        Self {
            cancel: CancelToken::new(),
            progress: Arc::new(NoProgress),
            prompt,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

// ── Entry points ─────────────────────────────────────────────────────────────

/// Copy the local directory `local_root` to `remote_root`.
pub async fn upload_tree(
    client: &dyn ProtocolClient,
    local_root: &Path,
    remote_root: &str,
    ctx: &TransferContext,
) -> RemoteResult<TransferReport> {
    let meta = tokio::fs::metadata(local_root)
        .await
        .map_err(|e| RemoteError::from(e).context("upload", &local_root.display().to_string()))?;
    if !meta.is_dir() {
        return Err(RemoteError::invalid_input("Upload source is not a directory")
            .with_operation("upload")
            .with_path(local_root.display().to_string()));
    }

    let total = count_local_files(local_root).await?;
    let mut job = Job::new(TransferDirection::Upload, client, ctx, total);
    info!(job_id = %job.id, source = %local_root.display(), destination = remote_root, total, "upload started");

    let outcome = job.run_upload(local_root, remote_root).await;
    job.finish(outcome)
}

/// Copy the remote directory `remote_root` into `local_root`.
pub async fn download_tree(
    client: &dyn ProtocolClient,
    remote_root: &str,
    local_root: &Path,
    ctx: &TransferContext,
) -> RemoteResult<TransferReport> {
    let total = count_remote_files(client, remote_root).await?;
    let mut job = Job::new(TransferDirection::Download, client, ctx, total);
    info!(job_id = %job.id, source = remote_root, destination = %local_root.display(), total, "download started");

    let outcome = job.run_download(remote_root, local_root).await;
    job.finish(outcome)
}

// ── Pre-walk ─────────────────────────────────────────────────────────────────

struct LocalEntry {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

/// Children of a local directory, sorted by name. Symlinks are followed.
async fn read_local_dir(dir: &Path) -> RemoteResult<Vec<LocalEntry>> {
    let ctx = |e: std::io::Error| RemoteError::from(e).context("read_dir", &dir.display().to_string());
    let mut reader = tokio::fs::read_dir(dir).await.map_err(ctx)?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(ctx)? {
        let path = entry.path();
        let is_dir = tokio::fs::metadata(&path)
            .await
            .map_err(|e| RemoteError::from(e).context("stat", &path.display().to_string()))?
            .is_dir();
        entries.push(LocalEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            is_dir,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

async fn count_local_files(root: &Path) -> RemoteResult<u64> {
    let mut count = 0;
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in read_local_dir(&dir).await? {
            if entry.is_dir {
                pending.push(entry.path);
            } else {
                count += 1;
            }
        }
    }
    Ok(count)
}

async fn count_remote_files(client: &dyn ProtocolClient, root: &str) -> RemoteResult<u64> {
    let mut count = 0;
    let mut pending = vec![root.to_string()];
    while let Some(dir) = pending.pop() {
        let entries = client.list(&dir).await.map_err(|e| e.context("list", &dir))?;
        for entry in entries.iter().filter(|e| is_safe_name(&dir, &e.name)) {
            if entry.is_directory() {
                pending.push(path::join(&dir, &entry.name));
            } else {
                count += 1;
            }
        }
    }
    Ok(count)
}

/// Whether a listed name can be joined onto a local directory without
/// escaping it. Anything else is skipped with a warning.
fn is_safe_name(dir: &str, name: &str) -> bool {
    let safe = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);
    if !safe {
        warn!(dir, name, "ignoring listed entry with an unsafe name");
    }
    safe
}

// ── Job ──────────────────────────────────────────────────────────────────────

struct Job<'a> {
    id: String,
    direction: TransferDirection,
    client: &'a dyn ProtocolClient,
    cancel: &'a CancelToken,
    progress: &'a dyn ProgressSink,
    resolver: ConflictResolver,
    total: u64,
    completed: u64,
    skipped: u64,
}

impl<'a> Job<'a> {
    fn new(
        direction: TransferDirection,
        client: &'a dyn ProtocolClient,
        ctx: &'a TransferContext,
        total: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            direction,
            client,
            cancel: &ctx.cancel,
            progress: ctx.progress.as_ref(),
            resolver: ConflictResolver::new(ctx.prompt.clone()),
            total,
            completed: 0,
            skipped: 0,
        }
    }

    fn check_cancel(&self, at: &str) -> RemoteResult<()> {
        if self.cancel.is_cancelled() {
            return Err(RemoteError::cancelled("Transfer cancelled").with_path(at));
        }
        Ok(())
    }

    fn advance(&mut self, name: &str) {
        self.completed += 1;
        let verb = match self.direction {
            TransferDirection::Upload => "Uploading",
            TransferDirection::Download => "Downloading",
        };
        self.progress.report(ProgressUpdate {
            job_id: self.id.clone(),
            message: format!("{} {}", verb, name),
            percent: percent(self.completed, self.total),
            completed: self.completed,
            total: self.total,
        });
    }

    fn skip(&mut self, destination: &str) {
        self.skipped += 1;
        debug!(job_id = %self.id, destination, "skipped existing file");
    }

    fn report(&self, status: TransferStatus) -> TransferReport {
        TransferReport {
            job_id: self.id.clone(),
            direction: self.direction,
            total_files: self.total,
            completed_files: self.completed,
            skipped_files: self.skipped,
            status,
        }
    }

    fn finish(self, outcome: RemoteResult<()>) -> RemoteResult<TransferReport> {
        match outcome {
            Ok(()) => {
                info!(job_id = %self.id, completed = self.completed, skipped = self.skipped, "transfer completed");
                Ok(self.report(TransferStatus::Completed))
            }
            Err(e) if e.is(RemoteErrorKind::Cancelled) => {
                info!(job_id = %self.id, completed = self.completed, total = self.total, "transfer cancelled");
                Ok(self.report(TransferStatus::Cancelled))
            }
            Err(e) => {
                error!(job_id = %self.id, error = %e, completed = self.completed, "transfer failed");
                Err(e)
            }
        }
    }

    // ── Upload walk ──────────────────────────────────────────────────────────

    async fn run_upload(&mut self, local_root: &Path, remote_root: &str) -> RemoteResult<()> {
        self.check_cancel(remote_root)?;
        self.client
            .mkdir(remote_root, true)
            .await
            .map_err(|e| e.context("mkdir", remote_root))?;
        self.upload_dir(local_root.to_path_buf(), remote_root.to_string())
            .await
    }

    async fn ensure_remote_dir(&self, dir: &str) -> RemoteResult<()> {
        match self.client.mkdir(dir, false).await {
            Ok(()) => Ok(()),
            Err(e) if e.is(RemoteErrorKind::AlreadyExists) => Ok(()),
            Err(e) => Err(e.context("mkdir", dir)),
        }
    }

    fn upload_dir<'b>(&'b mut self, local: PathBuf, remote: String) -> BoxFuture<'b, RemoteResult<()>> {
        async move {
            for entry in read_local_dir(&local).await? {
                let target = path::join(&remote, &entry.name);
                self.check_cancel(&target)?;

                if entry.is_dir {
                    self.ensure_remote_dir(&target).await?;
                    self.upload_dir(entry.path, target).await?;
                    continue;
                }

                if self.resolver.resolve(self.client, &target).await == Resolution::Skip {
                    self.skip(&target);
                    continue;
                }
                self.client
                    .put(&entry.path, &target)
                    .await
                    .map_err(|e| e.context("put", &target))?;
                self.advance(&entry.name);
            }
            Ok(())
        }
        .boxed()
    }

    // ── Download walk ────────────────────────────────────────────────────────

    async fn run_download(&mut self, remote_root: &str, local_root: &Path) -> RemoteResult<()> {
        self.check_cancel(remote_root)?;
        tokio::fs::create_dir_all(local_root)
            .await
            .map_err(|e| RemoteError::from(e).context("mkdir", &local_root.display().to_string()))?;
        self.download_dir(remote_root.to_string(), local_root.to_path_buf())
            .await
    }

    fn download_dir<'b>(&'b mut self, remote: String, local: PathBuf) -> BoxFuture<'b, RemoteResult<()>> {
        async move {
            let entries = self
                .client
                .list(&remote)
                .await
                .map_err(|e| e.context("list", &remote))?;

            for entry in entries.into_iter().filter(|e| is_safe_name(&remote, &e.name)) {
                let source = path::join(&remote, &entry.name);
                let target = local.join(&entry.name);
                let target_display = target.display().to_string();
                self.check_cancel(&source)?;

                if entry.is_directory() {
                    tokio::fs::create_dir_all(&target)
                        .await
                        .map_err(|e| RemoteError::from(e).context("mkdir", &target_display))?;
                    self.download_dir(source, target).await?;
                    continue;
                }

                let exists = tokio::fs::try_exists(&target).await.unwrap_or(false);
                if self.resolver.decide(&target_display, exists).await == Resolution::Skip {
                    self.skip(&target_display);
                    continue;
                }
                self.client
                    .get(&source, &target)
                    .await
                    .map_err(|e| e.context("get", &source))?;
                self.advance(&entry.name);
            }
            Ok(())
        }
        .boxed()
    }
}
