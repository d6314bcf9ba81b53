//! Settings store backed by persistent storage

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::storage::{keys, Storage};
use crate::state::{SessionType, Settings, SettingsPatch};

/// Holds the current settings and writes every change through to storage
pub struct SettingsStore {
    storage: Arc<dyn Storage>,
    settings: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            settings: RwLock::new(Settings::default()),
        }
    }

    /// Load persisted settings, keeping defaults when absent or unreadable
    pub async fn load(&self) -> Settings {
        let loaded = match self.storage.get(keys::SETTINGS).await {
            Ok(Some(value)) => match serde_json::from_value::<Settings>(value) {
                Ok(settings) if settings.validate().is_ok() => settings,
                Ok(_) => {
                    warn!("Persisted settings are out of range, using defaults");
                    Settings::default()
                }
                Err(e) => {
                    warn!("Failed to parse persisted settings: {}", e);
                    Settings::default()
                }
            },
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!("Failed to load settings: {}", e);
                Settings::default()
            }
        };

        *self.settings.write().await = loaded.clone();
        loaded
    }

    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Configured length of a session of the given type, in seconds
    pub async fn total_duration_for(&self, session_type: SessionType) -> u64 {
        self.settings.read().await.total_duration_for(session_type)
    }

    /// Merge a partial update, validate it and persist the result
    pub async fn update(&self, patch: SettingsPatch) -> Result<Settings, String> {
        let mut settings = self.settings.write().await;
        let updated = settings.merged(&patch);
        updated.validate()?;

        self.persist(&updated).await?;
        *settings = updated.clone();
        info!("Settings updated");
        Ok(updated)
    }

    /// Restore and persist the default settings
    pub async fn reset(&self) -> Result<Settings, String> {
        let mut settings = self.settings.write().await;
        let defaults = Settings::default();
        self.persist(&defaults).await?;
        *settings = defaults.clone();
        info!("Settings reset to defaults");
        Ok(defaults)
    }

    async fn persist(&self, settings: &Settings) -> Result<(), String> {
        let value = serde_json::to_value(settings)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        self.storage.set(keys::SETTINGS, value).await
    }
}
