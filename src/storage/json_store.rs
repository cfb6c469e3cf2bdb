use std::path::PathBuf;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json for key {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Keyed JSON documents, one `<key>.json` file per key inside `data_dir`.
pub struct JsonFileStore {
    data_dir: PathBuf,
    lock: RwLock<()>,
}

impl JsonFileStore {
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|source| StorageError::Io {
                key: data_dir.display().to_string(),
                source,
            })?;

        log::info!("Opened storage in {}", data_dir.display());

        Ok(Self {
            data_dir,
            lock: RwLock::new(()),
        })
    }

    pub async fn save<T: Serialize + Sync>(&self, key: &str, data: &T) -> Result<(), StorageError> {
        let _guard = self.lock.write().await;
        let json = serde_json::to_vec_pretty(data).map_err(|source| StorageError::Json {
            key: key.to_string(),
            source,
        })?;

        tokio::fs::write(self.path_for(key), json)
            .await
            .map_err(|source| StorageError::Io {
                key: key.to_string(),
                source,
            })
    }

    /// Returns `Ok(None)` when nothing was stored under `key` yet.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let _guard = self.lock.read().await;
        let bytes = match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Io {
                    key: key.to_string(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Json {
                key: key.to_string(),
                source,
            })
    }

    /// Removing a key that was never stored is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.write().await;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::models::Settings;

    #[tokio::test]
    async fn saved_documents_load_back() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        let mut settings = Settings::default();
        settings.language = "ar".to_string();

        store.save("settings", &settings).await.unwrap();
        let loaded: Option<Settings> = store.load("settings").await.unwrap();

        assert_eq!(loaded, Some(settings));
        assert!(dir.path().join("settings.json").is_file());
    }

    #[tokio::test]
    async fn missing_key_loads_as_none_and_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();

        let loaded: Option<Settings> = store.load("settings").await.unwrap();
        assert_eq!(loaded, None);

        store.save("settings", &Settings::default()).await.unwrap();
        store.delete("settings").await.unwrap();
        store.delete("settings").await.unwrap();
        let loaded: Option<Settings> = store.load("settings").await.unwrap();
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn malformed_document_is_a_json_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("settings.json"), b"{ not json")
            .await
            .unwrap();

        let result: Result<Option<Settings>, _> = store.load("settings").await;

        assert!(matches!(result, Err(StorageError::Json { .. })));
    }
}
