//! Config schema types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PushmillConfig {
    pub api: ApiConfig,
    pub enrich: EnrichConfig,
    pub storage: StorageConfig,
}

/// Backend API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the pushmill backend.
    pub base_url: String,
    /// Workspace API key. Usually absent on device, where the token is
    /// provisioned at runtime instead of shipped in a config file.
    pub key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.pushmill.io".into(),
            key: None,
        }
    }
}

/// Enrichment engine knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    /// Directory for downloaded attachments. Defaults to the system temp dir.
    pub media_dir: Option<PathBuf>,
    /// Per-download timeout in seconds.
    pub download_timeout_secs: u64,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            media_dir: None,
            download_timeout_secs: 25,
        }
    }
}

impl EnrichConfig {
    /// Media directory with the default applied.
    pub fn resolved_media_dir(&self) -> PathBuf {
        self.media_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("pushmill-media"))
    }
}

/// Key/value store location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Store path with the default applied.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        directories::ProjectDirs::from("", "", "pushmill")
            .map(|dirs| dirs.data_dir().join("pushmill.db"))
            .unwrap_or_else(|| PathBuf::from("pushmill.db"))
    }
}
