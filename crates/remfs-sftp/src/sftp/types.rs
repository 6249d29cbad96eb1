// ── SFTP settings ────────────────────────────────────────────────────────────

use remfs_core::{ConnectionConfig, Credential};
use std::fmt;

/// Everything the SFTP session needs from a `ConnectionConfig`.
#[derive(Clone)]
pub struct SftpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credential: Credential,
    /// Directory the session considers "home" for logging.
    pub initial_directory: Option<String>,
    pub timeout_secs: u64,
    /// Upper bound for a single blocking libssh2 call once connected.
    pub io_timeout_secs: u64,
    pub keepalive_interval_secs: u64,
    /// Try the SSH agent before default key files when no credential is set.
    pub use_agent: bool,
}

impl SftpSettings {
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            credential: config.credential.clone(),
            initial_directory: config.root.clone(),
            timeout_secs: config.connect_timeout_secs,
            io_timeout_secs: 120,
            keepalive_interval_secs: config.keepalive_secs,
            use_agent: true,
        }
    }
}

impl fmt::Debug for SftpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SftpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("credential", &self.credential)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Chunk size for streamed reads/writes (1 MiB).
pub const CHUNK_SIZE: usize = 1024 * 1024;
