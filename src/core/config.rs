use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::error::ConfigError;

/// Default backend address (local FastAPI-style RAG service)
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the RAG backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// RAG index used when none is given on the command line
    #[serde(default)]
    pub default_rag: Option<String>,

    /// Directory (under the home dir) holding the session database
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Redraw interval for pending tool-activity timers, in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default)]
    pub debug: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

fn default_data_dir() -> String {
    ".ragline".into()
}

fn default_tick_interval_ms() -> u64 {
    100
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_rag: None,
            data_dir: default_data_dir(),
            tick_interval_ms: default_tick_interval_ms(),
            debug: false,
        }
    }
}

impl AppConfig {
    /// Load config from ~/.ragline/config.json, falling back to defaults
    /// when the file does not exist. RAGLINE_BASE_URL overrides the file.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|e| ConfigError::File(e.to_string()))?;
                serde_json::from_str(&raw).map_err(|e| ConfigError::Invalid(e.to_string()))?
            }
            _ => Self::default(),
        };

        if let Ok(url) = std::env::var("RAGLINE_BASE_URL") {
            if !url.is_empty() {
                config.base_url = url;
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_file_path()
            .ok_or_else(|| ConfigError::File("cannot resolve home directory".into()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::File(e.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::File(e.to_string()))?;
        Ok(())
    }

    /// Directory holding the session database
    pub fn data_path(&self) -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(&self.data_dir)
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".ragline").join("config.json"))
    }
}
