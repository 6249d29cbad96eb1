//! Live-connection registry: at most one open client per connection id,
//! reused while its liveness probe passes and rebuilt when it fails.

use crate::store::SecretStore;
use async_trait::async_trait;
use remfs_core::{ConnectionConfig, Protocol, ProtocolClient, RemoteError, RemoteResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Opens a new authenticated client for a config.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> RemoteResult<Arc<dyn ProtocolClient>>;
}

/// Dispatches on `config.protocol` to the SFTP and FTP clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeClientFactory;

#[async_trait]
impl ClientFactory for NativeClientFactory {
    async fn connect(&self, config: &ConnectionConfig) -> RemoteResult<Arc<dyn ProtocolClient>> {
        let client: Arc<dyn ProtocolClient> = match config.protocol {
            Protocol::Secure => Arc::new(remfs_sftp::SecureClient::connect(config).await?),
            Protocol::Legacy => Arc::new(remfs_ftp::LegacyClient::connect(config).await?),
        };
        Ok(client)
    }
}

type Slot = Arc<Mutex<Option<Arc<dyn ProtocolClient>>>>;

pub struct ConnectionRegistry {
    factory: Arc<dyn ClientFactory>,
    store: Arc<dyn SecretStore>,
    /// One slot per id ever seen. Slots are kept after disconnect so that a
    /// concurrent caller never ends up holding an orphaned slot.
    slots: Mutex<HashMap<String, Slot>>,
}

impl ConnectionRegistry {
    pub fn new(factory: Arc<dyn ClientFactory>, store: Arc<dyn SecretStore>) -> Self {
        Self {
            factory,
            store,
            slots: Mutex::new(HashMap::new()),
        }
    }

    async fn slot(&self, id: &str) -> Slot {
        self.slots
            .lock()
            .await
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    async fn open(&self, config: &ConnectionConfig) -> RemoteResult<Arc<dyn ProtocolClient>> {
        info!(id = %config.id, protocol = %config.protocol, host = %config.host, "connecting");
        self.factory.connect(config).await.map_err(|e| {
            let mut err = RemoteError::connection(e.message);
            err.operation = e.operation;
            err.path = e.path;
            err.context("connect", &config.id)
        })
    }

    // ── Connection lifecycle ─────────────────────────────────────────────────

    /// Return the live client for `config.id`, probing it first and
    /// reconnecting from scratch when the probe fails.
    pub async fn ensure_connected(
        &self,
        config: &ConnectionConfig,
    ) -> RemoteResult<Arc<dyn ProtocolClient>> {
        let slot = self.slot(&config.id).await;
        let mut current = slot.lock().await;

        if let Some(client) = current.as_ref() {
            match client.probe().await {
                Ok(()) => {
                    debug!(id = %config.id, "reusing live connection");
                    return Ok(client.clone());
                }
                Err(e) => {
                    warn!(id = %config.id, error = %e, "liveness probe failed; reconnecting");
                    if let Err(close_err) = client.close().await {
                        warn!(id = %config.id, error = %close_err, "closing stale connection failed");
                    }
                    *current = None;
                }
            }
        }

        let client = self.open(config).await?;
        *current = Some(client.clone());
        Ok(client)
    }

    /// Look the config up in the store and make sure it is connected.
    pub async fn connect(&self, id: &str) -> RemoteResult<Arc<dyn ProtocolClient>> {
        let config = self.get_config(id).await?;
        self.ensure_connected(&config).await
    }

    /// Close and forget the live client for `id`. Unknown ids and close
    /// failures are not errors.
    pub async fn disconnect(&self, id: &str) {
        let slot = match self.slots.lock().await.get(id) {
            Some(slot) => slot.clone(),
            None => return,
        };
        let taken = slot.lock().await.take();
        if let Some(client) = taken {
            match client.close().await {
                Ok(()) => info!(id, "disconnected"),
                Err(e) => warn!(id, error = %e, "close failed during disconnect"),
            }
        }
    }

    /// Close every live client.
    pub async fn close_all(&self) {
        let ids: Vec<String> = self.slots.lock().await.keys().cloned().collect();
        for id in ids {
            self.disconnect(&id).await;
        }
    }

    pub async fn is_connected(&self, id: &str) -> bool {
        let slot = match self.slots.lock().await.get(id) {
            Some(slot) => slot.clone(),
            None => return false,
        };
        let connected = slot.lock().await.is_some();
        connected
    }

    // ── Saved connections ────────────────────────────────────────────────────

    /// Validate, persist, then connect.
    pub async fn add_connection(
        &self,
        config: ConnectionConfig,
    ) -> RemoteResult<Arc<dyn ProtocolClient>> {
        config.validate()?;
        self.store.put(&config.id, &config).await?;
        info!(id = %config.id, "connection saved");
        self.ensure_connected(&config).await
    }

    /// Replace the parameters of a connection. The old client is closed and a
    /// new one opened; the config is persisted only once that connect worked.
    pub async fn update_connection(
        &self,
        config: ConnectionConfig,
    ) -> RemoteResult<Arc<dyn ProtocolClient>> {
        config.validate()?;
        let slot = self.slot(&config.id).await;
        let mut current = slot.lock().await;

        if let Some(old) = current.take() {
            if let Err(e) = old.close().await {
                warn!(id = %config.id, error = %e, "closing previous connection failed");
            }
        }

        let client = self.open(&config).await?;
        self.store.put(&config.id, &config).await?;
        *current = Some(client.clone());
        info!(id = %config.id, "connection updated");
        Ok(client)
    }

    pub async fn remove_connection(&self, id: &str) -> RemoteResult<()> {
        self.disconnect(id).await;
        self.store.delete(id).await?;
        info!(id, "connection removed");
        Ok(())
    }

    /// Every stored config. Entries that cannot be read are skipped.
    pub async fn list_connections(&self) -> RemoteResult<Vec<ConnectionConfig>> {
        let mut configs = Vec::new();
        for id in self.store.list_ids().await? {
            match self.store.get(&id).await {
                Ok(Some(config)) => configs.push(config),
                Ok(None) => warn!(%id, "listed connection has no stored entry"),
                Err(e) => warn!(%id, error = %e, "skipping unreadable connection"),
            }
        }
        Ok(configs)
    }

    pub async fn get_config(&self, id: &str) -> RemoteResult<ConnectionConfig> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| RemoteError::not_found(format!("No saved connection '{}'", id)))
    }
}
