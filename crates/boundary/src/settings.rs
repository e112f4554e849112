// ABOUTME: Persistent settings for the relay boundary: a JSON file holding the backend URL.
// ABOUTME: Missing files read as empty settings; an empty URL counts as unset.

use std::path::{Path, PathBuf};

use pagerelay_collector::PageRelayError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings file name inside the PageRelay config directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// User settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,
}

impl Settings {
    /// The backend URL, treating an empty string as unset.
    pub fn backend_url(&self) -> Option<&str> {
        self.backend_url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// File-backed settings store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/pagerelay/settings.json`, when the platform has a config dir.
    pub fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pagerelay").join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the settings; a missing file yields defaults.
    pub async fn load(&self) -> Result<Settings, PageRelayError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings file yet");
                return Ok(Settings::default());
            }
            Err(e) => {
                return Err(PageRelayError::settings(
                    self.path.display().to_string(),
                    "Load",
                    Some(anyhow::anyhow!("read failed: {}", e)),
                ))
            }
        };
        serde_json::from_str(&text).map_err(|e| {
            PageRelayError::settings(
                self.path.display().to_string(),
                "Load",
                Some(anyhow::anyhow!("invalid settings JSON: {}", e)),
            )
        })
    }

    /// Writes the settings, creating the parent directory if needed.
    pub async fn save(&self, settings: &Settings) -> Result<(), PageRelayError> {
        let err = |e: anyhow::Error| {
            PageRelayError::settings(self.path.display().to_string(), "Save", Some(e))
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| err(anyhow::anyhow!("creating directory failed: {}", e)))?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| err(anyhow::anyhow!("serializing failed: {}", e)))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| err(anyhow::anyhow!("write failed: {}", e)))
    }

    /// The stored backend URL, if set.
    pub async fn backend_url(&self) -> Result<Option<String>, PageRelayError> {
        Ok(self.load().await?.backend_url().map(str::to_string))
    }

    pub async fn set_backend_url(&self, url: &str) -> Result<(), PageRelayError> {
        let mut settings = self.load().await?;
        settings.backend_url = Some(url.to_string());
        self.save(&settings).await
    }

    pub async fn clear(&self) -> Result<(), PageRelayError> {
        let mut settings = self.load().await?;
        settings.backend_url = None;
        self.save(&settings).await
    }
}
