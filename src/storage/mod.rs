mod alarm_storage;
mod json_store;
mod settings_storage;

pub use alarm_storage::AlarmStorage;
pub use json_store::{JsonFileStore, StorageError};
pub use settings_storage::SettingsStorage;
