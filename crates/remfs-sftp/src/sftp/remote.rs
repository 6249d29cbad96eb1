//! `SecureClient`: the SFTP variant of `ProtocolClient`.

use crate::sftp::session::SftpSession;
use crate::sftp::types::SftpSettings;
use async_trait::async_trait;
use remfs_core::{
    ConnectionConfig, Protocol, ProtocolClient, RemoteEntry, RemoteError, RemoteResult,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// One SSH session with its SFTP channel. libssh2 calls block, so each
/// operation takes the session lock and runs on the blocking pool while
/// holding it.
pub struct SecureClient {
    inner: Arc<Mutex<Option<SftpSession>>>,
    host: String,
}

impl SecureClient {
    pub async fn connect(config: &ConnectionConfig) -> RemoteResult<Self> {
        let settings = SftpSettings::from_config(config);
        let session = tokio::task::spawn_blocking(move || SftpSession::connect(&settings))
            .await
            .map_err(|e| RemoteError::io(format!("SFTP connect task failed: {}", e)))?
            .map_err(|e| e.context("connect", &config.address()))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Some(session))),
            host: config.host.clone(),
        })
    }

    async fn run<T, F>(&self, op: &'static str, path: &str, f: F) -> RemoteResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SftpSession) -> RemoteResult<T> + Send + 'static,
    {
        let guard = self.inner.clone().lock_owned().await;
        if guard.is_none() {
            return Err(
                RemoteError::connection(format!("SFTP session to {} is closed", self.host))
                    .with_operation(op),
            );
        }

        let result = tokio::task::spawn_blocking(move || match guard.as_ref() {
            Some(session) => f(session),
            None => Err(RemoteError::connection("SFTP session is closed")),
        })
        .await
        .map_err(|e| RemoteError::io(format!("SFTP {} task failed: {}", op, e)))?;

        result.map_err(|e| e.context(op, path))
    }
}

#[async_trait]
impl ProtocolClient for SecureClient {
    fn protocol(&self) -> Protocol {
        Protocol::Secure
    }

    async fn list(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>> {
        let p = path.to_string();
        self.run("list", path, move |s| s.list_directory(&p)).await
    }

    async fn get(&self, remote: &str, local: &Path) -> RemoteResult<u64> {
        let r = remote.to_string();
        let l = local.to_path_buf();
        self.run("get", remote, move |s| s.download(&r, &l)).await
    }

    async fn put(&self, local: &Path, remote: &str) -> RemoteResult<u64> {
        let l: PathBuf = local.to_path_buf();
        let r = remote.to_string();
        self.run("put", remote, move |s| s.upload(&l, &r)).await
    }

    async fn delete(&self, path: &str) -> RemoteResult<()> {
        let p = path.to_string();
        self.run("delete", path, move |s| s.delete_file(&p)).await
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> RemoteResult<()> {
        let p = path.to_string();
        self.run("mkdir", path, move |s| {
            if recursive {
                s.mkdir_p(&p)
            } else {
                s.mkdir(&p)
            }
        })
        .await
    }

    async fn rmdir(&self, path: &str, recursive: bool) -> RemoteResult<()> {
        let p = path.to_string();
        self.run("rmdir", path, move |s| {
            if recursive {
                s.delete_recursive(&p).map(|_| ())
            } else {
                s.rmdir(&p)
            }
        })
        .await
    }

    async fn rename(&self, from: &str, to: &str) -> RemoteResult<()> {
        let f = from.to_string();
        let t = to.to_string();
        self.run("rename", from, move |s| s.rename(&f, &t)).await
    }

    async fn chmod(&self, path: &str, mode: u32) -> RemoteResult<()> {
        let p = path.to_string();
        self.run("chmod", path, move |s| s.chmod(&p, mode)).await
    }

    async fn probe(&self) -> RemoteResult<()> {
        self.run("probe", ".", |s| s.probe())
            .await
            .map_err(|e| RemoteError::transient(e.message))
    }

    async fn close(&self) -> RemoteResult<()> {
        let taken = self.inner.lock().await.take();
        if let Some(session) = taken {
            if let Err(e) = tokio::task::spawn_blocking(move || session.disconnect()).await {
                log::warn!("SFTP disconnect task for {} failed: {}", self.host, e);
            }
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "e2e"))]
mod e2e {
    use super::*;

    fn config_from_env() -> Option<ConnectionConfig> {
        let host = std::env::var("REMFS_SFTP_E2E_HOST").ok()?;
        let user = std::env::var("REMFS_SFTP_E2E_USER").ok()?;
        let password = std::env::var("REMFS_SFTP_E2E_PASSWORD").ok()?;
        Some(ConnectionConfig::new("e2e", Protocol::Secure, host, user).with_password(password))
    }

    #[tokio::test]
    async fn round_trip_against_live_server() {
        let Some(config) = config_from_env() else {
            eprintln!("REMFS_SFTP_E2E_* not set; skipping");
            return;
        };
        let client = SecureClient::connect(&config).await.unwrap();
        client.probe().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("up.txt");
        std::fs::write(&local, b"hello").unwrap();

        let remote = "/tmp/remfs-e2e-up.txt";
        assert_eq!(client.put(&local, remote).await.unwrap(), 5);
        let back = dir.path().join("down.txt");
        assert_eq!(client.get(remote, &back).await.unwrap(), 5);
        assert_eq!(std::fs::read(&back).unwrap(), b"hello");
        client.delete(remote).await.unwrap();

        client.close().await.unwrap();
        client.close().await.unwrap();
        assert!(client.list("/").await.is_err());
    }
}
