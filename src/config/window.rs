//! Per-user window geometry, kept as JSON in the user configuration directory.
//!
//! Read once at startup and written once at shutdown. A missing or unreadable
//! file falls back to the defaults.

use super::{defaults, error::ConfigError};
use crate::log;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Educe, Serialize, Deserialize)]
#[educe(Default)]
pub struct WindowConfig {
    #[serde(default = "defaults::window::x")]
    #[educe(Default = defaults::window::x())]
    pub x: i32,

    #[serde(default = "defaults::window::y")]
    #[educe(Default = defaults::window::y())]
    pub y: i32,
}

impl WindowConfig {
    /// `<user config dir>/arttool/config.meta`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("arttool").join("config.meta"))
    }

    pub fn load(path: &Path) -> Self {
        let Ok(text) = fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            log!("warn"; "ignoring {}: {}", path.display(), e);
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ConfigError::Io(dir.to_path_buf(), e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        fs::write(path, json).map_err(|e| ConfigError::Io(path.to_path_buf(), e))
    }
}
