//! Daemon settings file
//!
//! JSON file under the user config dir. Missing keys fall back to defaults and
//! a missing file is created on first load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::constants;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Socket the UI sends commands to (defaults to the runtime dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_socket: Option<PathBuf>,

    /// Backend socket for save/sync; `None` uses the runtime dir default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_socket: Option<PathBuf>,

    /// Run without a backend; saves and syncs become no-ops
    #[serde(default)]
    pub offline: bool,

    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_save_debounce_ms() -> u64 {
    constants::persistence::SAVE_DEBOUNCE_MS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            command_socket: None,
            backend_socket: None,
            offline: false,
            save_debounce_ms: default_save_debounce_ms(),
        }
    }
}

impl Settings {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::config::APP_DIR);
        path.push(constants::config::FILENAME);
        path
    }

    /// Load from the default location, writing defaults if the file is missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Settings file not found, creating default");
            let settings = Settings::default();
            settings.save_to(path)?;
            return Ok(settings);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON from {:?}", path))?;

        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings to JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write settings to {:?}", path))?;

        info!(path = %path.display(), "Saved settings");
        Ok(())
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn command_socket_path(&self) -> Result<PathBuf> {
        match &self.command_socket {
            Some(path) => Ok(path.clone()),
            None => crate::ipc::default_socket_path(constants::ipc::COMMAND_SOCKET),
        }
    }

    /// `None` when running offline
    pub fn backend_socket_path(&self) -> Result<Option<PathBuf>> {
        if self.offline {
            return Ok(None);
        }
        match &self.backend_socket {
            Some(path) => Ok(Some(path.clone())),
            None => crate::ipc::default_socket_path(constants::ipc::BACKEND_SOCKET).map(Some),
        }
    }
}
