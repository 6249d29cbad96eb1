//! The uniform capability set every protocol variant implements.

use crate::config::Protocol;
use crate::entry::RemoteEntry;
use crate::error::RemoteResult;
use crate::path;
use async_trait::async_trait;
use std::path::Path;

/// An open, authenticated remote session.
///
/// Implementations serialize their own commands: callers may share one
/// `Arc<dyn ProtocolClient>` between tasks and each call still runs to
/// completion before the next one starts on the wire.
///
/// Paths are absolute POSIX strings. `close` is idempotent; any other call
/// after `close` fails with a `Connection` error.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Children of `path`, without `.`/`..`.
    async fn list(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>>;

    /// Download `remote` into `local`, returning the byte count.
    async fn get(&self, remote: &str, local: &Path) -> RemoteResult<u64>;

    /// Upload `local` to `remote` (truncating), returning the byte count.
    async fn put(&self, local: &Path, remote: &str) -> RemoteResult<u64>;

    /// Delete a single file.
    async fn delete(&self, path: &str) -> RemoteResult<()>;

    /// Create a directory. Without `recursive`, an existing target fails with
    /// `AlreadyExists`; with it, missing parents are created and an existing
    /// directory is fine.
    async fn mkdir(&self, path: &str, recursive: bool) -> RemoteResult<()>;

    /// Remove a directory; with `recursive`, its whole subtree bottom-up.
    async fn rmdir(&self, path: &str, recursive: bool) -> RemoteResult<()>;

    async fn rename(&self, from: &str, to: &str) -> RemoteResult<()>;

    /// Set permission bits. Fails with `Unsupported` when the variant has no
    /// equivalent, never silently ignores the request.
    async fn chmod(&self, path: &str, mode: u32) -> RemoteResult<()>;

    /// Cheap liveness check; failure means the session should be rebuilt.
    async fn probe(&self) -> RemoteResult<()>;

    async fn close(&self) -> RemoteResult<()>;

    /// Look up a single entry by listing its parent.
    async fn stat(&self, target: &str) -> RemoteResult<Option<RemoteEntry>> {
        let name = path::basename(target);
        let entries = self.list(&path::parent(target)).await?;
        Ok(entries.into_iter().find(|e| e.name == name))
    }
}
