//! Shared types for the FTP crate.

use chrono::{DateTime, Utc};
use remfs_core::{ConnectionConfig, Credential};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─── Settings ────────────────────────────────────────────────────────

/// How the data channel is opened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DataChannelMode {
    /// PASV: the server listens, we connect.
    #[default]
    Passive,
    /// PORT: we listen, the server connects back.
    Active,
}

/// Everything the FTP client needs from a `ConnectionConfig`.
#[derive(Clone)]
pub struct FtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub data_channel_mode: DataChannelMode,
    /// Directory to CWD into after login.
    pub initial_directory: Option<String>,
    pub connect_timeout_sec: u64,
    /// Upper bound for each reply on the control channel.
    pub control_timeout_sec: u64,
    pub data_timeout_sec: u64,
    /// Send `OPTS UTF8 ON` when the server advertises UTF8.
    pub utf8: bool,
    /// Allow chmod via `SITE CHMOD`.
    pub site_chmod: bool,
}

impl FtpSettings {
    pub fn from_config(config: &ConnectionConfig) -> Self {
        let (username, password) = match &config.credential {
            Credential::Password { password } => (config.username.clone(), password.clone()),
            // FTP has no key auth; anonymous login by convention.
            Credential::Anonymous | Credential::PrivateKey { .. } => {
                (config.username.clone(), "anonymous@".to_string())
            }
        };
        Self {
            host: config.host.clone(),
            port: config.port,
            username,
            password,
            data_channel_mode: if config.passive {
                DataChannelMode::Passive
            } else {
                DataChannelMode::Active
            },
            initial_directory: config.root.clone(),
            connect_timeout_sec: config.connect_timeout_secs,
            control_timeout_sec: if config.connect_timeout_secs > 0 {
                config.connect_timeout_secs
            } else {
                default_data_timeout()
            },
            data_timeout_sec: default_data_timeout(),
            utf8: true,
            site_chmod: config.site_chmod,
        }
    }
}

fn default_data_timeout() -> u64 {
    30
}

impl std::fmt::Debug for FtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("data_channel_mode", &self.data_channel_mode)
            .field("initial_directory", &self.initial_directory)
            .field("site_chmod", &self.site_chmod)
            .finish()
    }
}

// ─── Directory Listing ───────────────────────────────────────────────

/// Type of a raw listing entry, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FtpEntryKind {
    File,
    Directory,
    Symlink,
    Unknown,
}

/// One entry parsed from LIST or MLSD output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpEntry {
    pub name: String,
    pub kind: FtpEntryKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub permissions: Option<String>,
    pub link_target: Option<String>,
    /// MLSD fact map (e.g. "type" → "file", "size" → "1234").
    #[serde(default)]
    pub facts: HashMap<String, String>,
}

// ─── FTP Response ────────────────────────────────────────────────────

/// A single FTP reply (may be multi-line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FtpResponse {
    pub code: u16,
    pub lines: Vec<String>,
}

impl FtpResponse {
    /// Full reply text (all lines joined).
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// 1xx–3xx.
    pub fn is_success(&self) -> bool {
        self.code < 400
    }

    /// 1xx.
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// 2xx.
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 3xx.
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }
}

// ─── Server Capabilities ─────────────────────────────────────────────

/// Parsed FEAT response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerFeatures {
    pub mlsd: bool,
    pub size: bool,
    pub rest_stream: bool,
    pub utf8: bool,
    pub raw_features: Vec<String>,
}
