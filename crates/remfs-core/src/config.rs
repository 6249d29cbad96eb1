//! Connection configuration.

use crate::error::{RemoteError, RemoteResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which protocol family a connection speaks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// SFTP over SSH.
    #[serde(rename = "sftp")]
    Secure,
    /// Plaintext FTP.
    #[serde(rename = "ftp")]
    Legacy,
}

impl Protocol {
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Secure => 22,
            Protocol::Legacy => 21,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Secure => "sftp",
            Protocol::Legacy => "ftp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secret material used to authenticate.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Credential {
    /// No secret supplied: anonymous login for legacy, default `~/.ssh`
    /// identities for secure.
    #[default]
    Anonymous,
    Password {
        password: String,
    },
    /// PEM-encoded private key text.
    #[serde(rename_all = "camelCase")]
    PrivateKey {
        private_key: String,
        #[serde(default)]
        passphrase: Option<String>,
    },
}

impl Credential {
    pub fn password(&self) -> Option<&str> {
        match self {
            Credential::Password { password } => Some(password),
            _ => None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Anonymous => f.write_str("Anonymous"),
            Credential::Password { .. } => f.write_str("Password(***)"),
            Credential::PrivateKey { passphrase, .. } => f
                .debug_struct("PrivateKey")
                .field("private_key", &"***")
                .field("passphrase", &passphrase.as_ref().map(|_| "***"))
                .finish(),
        }
    }
}

/// Advisory permission hints attached to a connection. Nothing enforces
/// these; front ends use them to grey out actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionHints {
    #[serde(default = "default_true")]
    pub read: bool,
    #[serde(default = "default_true")]
    pub write: bool,
    #[serde(default = "default_true")]
    pub execute: bool,
}

impl Default for PermissionHints {
    fn default() -> Self {
        Self {
            read: true,
            write: true,
            execute: true,
        }
    }
}

/// Everything needed to open one remote connection. Looked up by `id` only.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub credential: Credential,
    /// Initial remote directory.
    #[serde(default)]
    pub root: Option<String>,
    /// Passive data channel (legacy only).
    #[serde(default = "default_true")]
    pub passive: bool,
    #[serde(default)]
    pub permissions: PermissionHints,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Keepalive interval for secure sessions (0 = disabled).
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
    /// Emulate chmod on legacy servers via `SITE CHMOD`.
    #[serde(default)]
    pub site_chmod: bool,
}

fn default_true() -> bool {
    true
}
fn default_connect_timeout() -> u64 {
    15
}
fn default_keepalive() -> u64 {
    60
}

impl ConnectionConfig {
    pub fn new(
        id: impl Into<String>,
        protocol: Protocol,
        host: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            protocol,
            host: host.into(),
            port: protocol.default_port(),
            username: username.into(),
            credential: Credential::Anonymous,
            root: None,
            passive: true,
            permissions: PermissionHints::default(),
            connect_timeout_secs: default_connect_timeout(),
            keepalive_secs: default_keepalive(),
            site_chmod: false,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.credential = Credential::Password {
            password: password.into(),
        };
        self
    }

    pub fn with_private_key(mut self, pem: impl Into<String>, passphrase: Option<String>) -> Self {
        self.credential = Credential::PrivateKey {
            private_key: pem.into(),
            passphrase,
        };
        self
    }

    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }

    pub fn with_site_chmod(mut self, enabled: bool) -> Self {
        self.site_chmod = enabled;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// `host:port` for socket connects.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> RemoteResult<()> {
        if self.id.trim().is_empty() {
            return Err(RemoteError::invalid_input("Connection id must not be empty"));
        }
        if self.id.contains(':') {
            return Err(RemoteError::invalid_input(format!(
                "Connection id '{}' must not contain ':'",
                self.id
            )));
        }
        if self.host.trim().is_empty() {
            return Err(RemoteError::invalid_input("Host must not be empty"));
        }
        if self.username.trim().is_empty() {
            return Err(RemoteError::invalid_input("Username must not be empty"));
        }
        if self.port == 0 {
            return Err(RemoteError::invalid_input("Port must be non-zero"));
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("id", &self.id)
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("credential", &self.credential)
            .field("root", &self.root)
            .field("passive", &self.passive)
            .field("site_chmod", &self.site_chmod)
            .finish()
    }
}
