use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::Settings;
use crate::providers::SettingsProvider;

use super::JsonFileStore;

const SETTINGS_KEY: &str = "settings";

/// User settings, re-read from the store on every `get_settings` when
/// persisted.
pub struct SettingsStorage {
    settings: RwLock<Settings>,
    persistence: Option<Arc<JsonFileStore>>,
}

impl SettingsStorage {
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
            persistence: None,
        }
    }

    /// Falls back to defaults when no settings were saved before or the saved
    /// document cannot be read.
    pub async fn load(persistence: Arc<JsonFileStore>) -> Self {
        let settings = match persistence.load::<Settings>(SETTINGS_KEY).await {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                log::error!("Could not load settings, using defaults: {e}");
                Settings::default()
            }
        };

        Self {
            settings: RwLock::new(settings),
            persistence: Some(persistence),
        }
    }
}

#[async_trait]
impl SettingsProvider for SettingsStorage {
    async fn get_settings(&self) -> anyhow::Result<Settings> {
        let Some(persistence) = &self.persistence else {
            return Ok(self.settings.read().await.clone());
        };

        let mut current = self.settings.write().await;
        *current = persistence
            .load::<Settings>(SETTINGS_KEY)
            .await?
            .unwrap_or_default();
        Ok(current.clone())
    }

    async fn save_settings(&self, settings: Settings) -> anyhow::Result<()> {
        let mut current = self.settings.write().await;
        if let Some(persistence) = &self.persistence {
            persistence.save(SETTINGS_KEY, &settings).await?;
        }
        *current = settings;
        Ok(())
    }

    /// Forgets the saved document; a missing document reads as defaults.
    async fn reset_to_defaults(&self) -> anyhow::Result<Settings> {
        let mut current = self.settings.write().await;
        if let Some(persistence) = &self.persistence {
            persistence.delete(SETTINGS_KEY).await?;
        }
        *current = Settings::default();
        Ok(current.clone())
    }
}
