//! `LegacyClient`: the FTP variant of `ProtocolClient`.

use crate::ftp::client::FtpClient;
use crate::ftp::parser::to_remote_entry;
use crate::ftp::types::FtpSettings;
use async_trait::async_trait;
use remfs_core::{
    ConnectionConfig, Protocol, ProtocolClient, RemoteEntry, RemoteError, RemoteResult,
};
use std::path::Path;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

/// One FTP control connection. The mutex keeps each command/reply exchange
/// (and any data channel it opens) exclusive to one caller.
pub struct LegacyClient {
    session: Mutex<Option<FtpClient>>,
    host: String,
}

impl LegacyClient {
    pub async fn connect(config: &ConnectionConfig) -> RemoteResult<Self> {
        let settings = FtpSettings::from_config(config);
        let client = FtpClient::connect(settings)
            .await
            .map_err(|e| e.context("connect", &config.address()))?;
        Ok(Self {
            session: Mutex::new(Some(client)),
            host: config.host.clone(),
        })
    }

    async fn session(&self, op: &str) -> RemoteResult<MappedMutexGuard<'_, FtpClient>> {
        MutexGuard::try_map(self.session.lock().await, |s| s.as_mut()).map_err(|_| {
            RemoteError::connection(format!("FTP session to {} is closed", self.host))
                .with_operation(op)
        })
    }
}

#[async_trait]
impl ProtocolClient for LegacyClient {
    fn protocol(&self) -> Protocol {
        Protocol::Legacy
    }

    async fn list(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>> {
        let mut s = self.session("list").await?;
        let entries = s.list(path).await.map_err(|e| e.context("list", path))?;
        Ok(entries.into_iter().map(to_remote_entry).collect())
    }

    async fn get(&self, remote: &str, local: &Path) -> RemoteResult<u64> {
        let mut s = self.session("get").await?;
        s.download(remote, local)
            .await
            .map_err(|e| e.context("get", remote))
    }

    async fn put(&self, local: &Path, remote: &str) -> RemoteResult<u64> {
        let mut s = self.session("put").await?;
        s.upload(local, remote)
            .await
            .map_err(|e| e.context("put", remote))
    }

    async fn delete(&self, path: &str) -> RemoteResult<()> {
        let mut s = self.session("delete").await?;
        s.delete(path).await.map_err(|e| e.context("delete", path))
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> RemoteResult<()> {
        let mut s = self.session("mkdir").await?;
        let result = if recursive {
            s.mkdir_all(path).await
        } else {
            s.mkdir(path).await
        };
        result.map_err(|e| e.context("mkdir", path))
    }

    async fn rmdir(&self, path: &str, recursive: bool) -> RemoteResult<()> {
        let mut s = self.session("rmdir").await?;
        let result = if recursive {
            s.rmdir_recursive(path).await
        } else {
            s.rmdir(path).await
        };
        result.map_err(|e| e.context("rmdir", path))
    }

    async fn rename(&self, from: &str, to: &str) -> RemoteResult<()> {
        let mut s = self.session("rename").await?;
        s.rename(from, to)
            .await
            .map_err(|e| e.context("rename", from))
    }

    async fn chmod(&self, path: &str, mode: u32) -> RemoteResult<()> {
        let mut s = self.session("chmod").await?;
        s.chmod(path, mode).await.map_err(|e| e.context("chmod", path))
    }

    async fn probe(&self) -> RemoteResult<()> {
        let mut s = self
            .session("probe")
            .await
            .map_err(|e| RemoteError::transient(e.message))?;
        s.noop()
            .await
            .map_err(|e| RemoteError::transient(format!("NOOP failed: {}", e.message)))
    }

    async fn close(&self) -> RemoteResult<()> {
        if let Some(mut client) = self.session.lock().await.take() {
            client.quit().await;
        }
        Ok(())
    }
}
