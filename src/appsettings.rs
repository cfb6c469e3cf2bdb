use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Daily prayer times as "HH:MM" strings.
#[derive(Deserialize, Debug, Clone)]
pub struct TimetableSettings {
    pub fajr: String,
    pub dhuhr: String,
    pub asr: String,
    pub maghrib: String,
    pub isha: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct StorageSettings {
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct NotificationSettings {
    pub app_name: String,
    pub icon: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            app_name: "Azan Alarm".to_string(),
            icon: "/appicon.png".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AudioSettings {
    pub enabled: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    pub timetable: TimetableSettings,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub audio: AudioSettings,
}

impl AppSettings {
    /// Layers `appsettings` (or `path`), an optional `appsettings.local` and
    /// `APP__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("appsettings").required(true),
        };

        let settings = Config::builder()
            .add_source(base)
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    pub fn timezone(&self) -> anyhow::Result<Option<Tz>> {
        self.timezone
            .as_deref()
            .map(|name| {
                name.parse::<Tz>()
                    .map_err(|e| anyhow::anyhow!("Invalid timezone {name:?}: {e}"))
            })
            .transpose()
    }

    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.storage.data_dir {
            return Ok(dir.clone());
        }

        directories::ProjectDirs::from("", "", "azan_alarm")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .context("Could not determine a config directory for storage.")
    }
}
