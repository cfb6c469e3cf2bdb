//! Interfaces of the collaborators the alarm engine consumes. All calls are
//! fallible and may overlap with an outstanding call of the same kind.

use async_trait::async_trait;

use crate::models::{Alarm, AlarmId, NewAlarm, NextPrayer, PrayerTimes, Settings};

#[async_trait]
pub trait PrayerTimeProvider: Send + Sync {
    async fn today_prayer_times(&self) -> anyhow::Result<PrayerTimes>;

    /// `None` when no upcoming prayer could be determined at all.
    async fn next_prayer(&self) -> anyhow::Result<Option<NextPrayer>>;
}

#[async_trait]
pub trait AlarmRepository: Send + Sync {
    async fn get_alarms(&self) -> anyhow::Result<Vec<Alarm>>;
    async fn create_alarm(&self, alarm: NewAlarm) -> anyhow::Result<Alarm>;
    async fn update_alarm(&self, alarm: Alarm) -> anyhow::Result<()>;
    async fn delete_alarm(&self, id: AlarmId) -> anyhow::Result<()>;
    async fn toggle_alarm(&self, id: AlarmId, active: bool) -> anyhow::Result<()>;
}

#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn get_settings(&self) -> anyhow::Result<Settings>;
    async fn save_settings(&self, settings: Settings) -> anyhow::Result<()>;
    async fn reset_to_defaults(&self) -> anyhow::Result<Settings>;
}
