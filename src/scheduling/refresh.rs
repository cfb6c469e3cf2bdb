use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::cache::ProviderCache;

use super::ticker::TickHandler;

pub const STORAGE_REFRESH_PERIOD: Duration = Duration::from_secs(5);

/// Reloads alarms and settings on every tick, picking up edits made by other
/// processes sharing the same storage.
pub struct StorageRefresher {
    cache: Arc<ProviderCache>,
}

impl StorageRefresher {
    pub fn new(cache: Arc<ProviderCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl TickHandler for StorageRefresher {
    async fn on_tick(&mut self, _now: NaiveDateTime) {
        tokio::join!(self.cache.refresh_alarms(), self.cache.refresh_settings());
    }
}
