// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{app_info, storage};
use crate::errors::{AppError, AppResult};
use crate::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Bumped when a field changes meaning
pub const CONFIG_VERSION: u32 = 1;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema version of the stored file
    pub version: u32,
    /// Camera session settings
    pub session: SessionConfig,
    /// Folder created under the pictures/videos directories
    pub save_folder: String,
    /// Base URL of the remote API
    pub api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            session: SessionConfig::default(),
            save_folder: storage::DEFAULT_SAVE_FOLDER.to_string(),
            api_base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl Config {
    /// `<config dir>/snapshoot/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(app_info::APP_NAME).join(CONFIG_FILE))
    }

    /// Load from the default location
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory, using defaults");
                Self::default()
            }
        }
    }

    /// Load from a file
    ///
    /// A missing file gives the defaults. So does an unreadable or corrupt
    /// one, with a warning.
    pub fn load_from(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str::<Config>(&text) {
            Ok(config) => {
                if config.version != CONFIG_VERSION {
                    warn!(
                        found = config.version,
                        expected = CONFIG_VERSION,
                        "Config version mismatch"
                    );
                }
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt config, using defaults");
                Self::default()
            }
        }
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<PathBuf> {
        let path = Self::default_path()
            .ok_or_else(|| AppError::Config("No config directory".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }
}
