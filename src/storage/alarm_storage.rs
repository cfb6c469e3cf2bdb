use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{Alarm, AlarmId, NewAlarm};
use crate::providers::AlarmRepository;

use super::JsonFileStore;

const ALARMS_KEY: &str = "alarms";

struct AlarmStore {
    next_id: AlarmId,
    alarms: BTreeMap<AlarmId, Alarm>,
}

impl AlarmStore {
    fn new(alarms: Vec<Alarm>) -> Self {
        let next_id = alarms.iter().map(|alarm| alarm.id).max().unwrap_or(0) + 1;
        Self {
            next_id,
            alarms: alarms.into_iter().map(|alarm| (alarm.id, alarm)).collect(),
        }
    }

    fn snapshot(&self) -> Vec<Alarm> {
        self.alarms.values().cloned().collect()
    }

    fn replace(&mut self, alarms: Vec<Alarm>) {
        *self = Self::new(alarms);
    }
}

/// Alarm repository keeping the list in memory and, when backed by a
/// [`JsonFileStore`], writing the whole list through on every change.
///
/// A persisted repository re-reads the file before every operation, so
/// changes written by another process are picked up.
pub struct AlarmStorage {
    store: RwLock<AlarmStore>,
    persistence: Option<Arc<JsonFileStore>>,
}

impl AlarmStorage {
    pub fn in_memory() -> Self {
        Self {
            store: RwLock::new(AlarmStore::new(Vec::new())),
            persistence: None,
        }
    }

    pub async fn load(persistence: Arc<JsonFileStore>) -> anyhow::Result<Self> {
        let alarms = read_alarms(&persistence).await?;
        log::info!("Loaded {} alarms from storage", alarms.len());

        Ok(Self {
            store: RwLock::new(AlarmStore::new(alarms)),
            persistence: Some(persistence),
        })
    }

    async fn reload(&self, store: &mut AlarmStore) -> anyhow::Result<()> {
        if let Some(persistence) = &self.persistence {
            store.replace(read_alarms(persistence).await?);
        }
        Ok(())
    }

    async fn persist(&self, store: &AlarmStore) -> anyhow::Result<()> {
        if let Some(persistence) = &self.persistence {
            persistence.save(ALARMS_KEY, &store.snapshot()).await?;
        }
        Ok(())
    }
}

async fn read_alarms(persistence: &JsonFileStore) -> anyhow::Result<Vec<Alarm>> {
    Ok(persistence.load(ALARMS_KEY).await?.unwrap_or_default())
}

#[async_trait]
impl AlarmRepository for AlarmStorage {
    async fn get_alarms(&self) -> anyhow::Result<Vec<Alarm>> {
        if self.persistence.is_none() {
            return Ok(self.store.read().await.snapshot());
        }

        let mut store = self.store.write().await;
        self.reload(&mut store).await?;
        Ok(store.snapshot())
    }

    async fn create_alarm(&self, alarm: NewAlarm) -> anyhow::Result<Alarm> {
        let mut store = self.store.write().await;
        self.reload(&mut store).await?;
        let now = Utc::now().timestamp_millis();
        let id = store.next_id;
        let created = Alarm {
            id,
            prayer: alarm.prayer,
            offset_minutes: alarm.offset_minutes,
            label: alarm.label,
            sound_path: alarm.sound_path,
            is_active: alarm.is_active,
            repeat_days: alarm.repeat_days,
            vibration_enabled: alarm.vibration_enabled,
            created_at: now,
            updated_at: now,
        };

        store.alarms.insert(id, created.clone());
        store.next_id += 1;
        self.persist(&store).await?;

        log::info!("Created alarm with id {id}");
        Ok(created)
    }

    async fn update_alarm(&self, mut alarm: Alarm) -> anyhow::Result<()> {
        let mut store = self.store.write().await;
        self.reload(&mut store).await?;
        let Some(existing) = store.alarms.get_mut(&alarm.id) else {
            anyhow::bail!("Alarm with id {} does not exist", alarm.id);
        };

        alarm.created_at = existing.created_at;
        alarm.updated_at = Utc::now().timestamp_millis();
        *existing = alarm;
        self.persist(&store).await
    }

    async fn delete_alarm(&self, id: AlarmId) -> anyhow::Result<()> {
        let mut store = self.store.write().await;
        self.reload(&mut store).await?;
        if store.alarms.remove(&id).is_none() {
            log::warn!("Tried to delete unknown alarm {id}");
            return Ok(());
        }
        self.persist(&store).await
    }

    async fn toggle_alarm(&self, id: AlarmId, active: bool) -> anyhow::Result<()> {
        let mut store = self.store.write().await;
        self.reload(&mut store).await?;
        let Some(existing) = store.alarms.get_mut(&id) else {
            anyhow::bail!("Alarm with id {id} does not exist");
        };

        existing.is_active = active;
        existing.updated_at = Utc::now().timestamp_millis();
        self.persist(&store).await
    }
}
