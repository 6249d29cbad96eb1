//! Runtime settings, persisted as one camelCase JSON document.

use remfs_core::{RemoteError, RemoteResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Where files opened for editing are downloaded.
    pub edit_dir: PathBuf,
    /// JSON secret store holding saved connections.
    pub store_path: PathBuf,
    pub log: LogSettings,
    /// Applied to configs that arrive without an explicit timeout.
    pub default_connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `REMFS_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: cfg!(feature = "logs-json"),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        let cache = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        let data = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            edit_dir: cache.join("remfs").join("edits"),
            store_path: data.join("remfs").join("connections.json"),
            log: LogSettings::default(),
            default_connect_timeout_secs: 15,
        }
    }
}

impl Settings {
    /// Read settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> RemoteResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RemoteError::from(e).context("load settings", &path.display().to_string()))?;
        serde_json::from_str(&raw).map_err(|e| {
            RemoteError::invalid_input(format!("Invalid settings file: {}", e))
                .with_path(path.display().to_string())
        })
    }

    pub fn save(&self, path: &Path) -> RemoteResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RemoteError::io(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(path, json)
            .map_err(|e| RemoteError::from(e).context("save settings", &path.display().to_string()))
    }
}
