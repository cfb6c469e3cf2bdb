use std::sync::Arc;

use tokio::sync::watch;

use crate::models::{Alarm, AlarmId, NewAlarm, NextPrayer, PrayerTimes, Settings};
use crate::providers::{AlarmRepository, PrayerTimeProvider, SettingsProvider};

/// Latest known provider data, published through `watch` channels.
///
/// A failed refresh is logged and leaves the previous snapshot in place.
pub struct ProviderCache {
    prayer_provider: Arc<dyn PrayerTimeProvider>,
    alarm_repository: Arc<dyn AlarmRepository>,
    settings_provider: Arc<dyn SettingsProvider>,
    prayer_times: watch::Sender<Option<PrayerTimes>>,
    next_prayer: watch::Sender<Option<NextPrayer>>,
    alarms: watch::Sender<Vec<Alarm>>,
    settings: watch::Sender<Settings>,
}

impl ProviderCache {
    pub fn new(
        prayer_provider: Arc<dyn PrayerTimeProvider>,
        alarm_repository: Arc<dyn AlarmRepository>,
        settings_provider: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self {
            prayer_provider,
            alarm_repository,
            settings_provider,
            prayer_times: watch::channel(None).0,
            next_prayer: watch::channel(None).0,
            alarms: watch::channel(Vec::new()).0,
            settings: watch::channel(Settings::default()).0,
        }
    }

    pub fn prayer_times(&self) -> watch::Receiver<Option<PrayerTimes>> {
        self.prayer_times.subscribe()
    }

    pub fn next_prayer(&self) -> watch::Receiver<Option<NextPrayer>> {
        self.next_prayer.subscribe()
    }

    pub fn alarms(&self) -> watch::Receiver<Vec<Alarm>> {
        self.alarms.subscribe()
    }

    pub fn settings(&self) -> watch::Receiver<Settings> {
        self.settings.subscribe()
    }

    pub async fn refresh_all(&self) {
        tokio::join!(
            self.refresh_prayer_data(),
            self.refresh_alarms(),
            self.refresh_settings()
        );
    }

    /// Reloads today's prayer times and the next prayer.
    pub async fn refresh_prayer_data(&self) {
        let (today, next) = tokio::join!(
            self.prayer_provider.today_prayer_times(),
            self.prayer_provider.next_prayer()
        );

        match today {
            Ok(times) => {
                self.prayer_times.send_replace(Some(times));
            }
            Err(e) => log::error!("Could not load prayer times: {e:#}"),
        }

        match next {
            Ok(next) => {
                self.next_prayer.send_replace(next);
            }
            Err(e) => log::error!("Could not load next prayer: {e:#}"),
        }
    }

    pub async fn refresh_alarms(&self) {
        match self.alarm_repository.get_alarms().await {
            Ok(alarms) => {
                replace_if_changed(&self.alarms, alarms);
            }
            Err(e) => log::error!("Could not load alarms: {e:#}"),
        }
    }

    pub async fn refresh_settings(&self) {
        match self.settings_provider.get_settings().await {
            Ok(settings) => {
                replace_if_changed(&self.settings, settings);
            }
            Err(e) => log::error!("Could not load settings: {e:#}"),
        }
    }

    pub async fn create_alarm(&self, alarm: NewAlarm) -> anyhow::Result<Alarm> {
        let created = self.alarm_repository.create_alarm(alarm).await?;
        self.refresh_alarms().await;
        Ok(created)
    }

    pub async fn update_alarm(&self, alarm: Alarm) -> anyhow::Result<()> {
        self.alarm_repository.update_alarm(alarm).await?;
        self.refresh_alarms().await;
        Ok(())
    }

    pub async fn delete_alarm(&self, id: AlarmId) -> anyhow::Result<()> {
        self.alarm_repository.delete_alarm(id).await?;
        self.refresh_alarms().await;
        Ok(())
    }

    pub async fn toggle_alarm(&self, id: AlarmId, active: bool) -> anyhow::Result<()> {
        self.alarm_repository.toggle_alarm(id, active).await?;
        self.refresh_alarms().await;
        Ok(())
    }

    pub async fn save_settings(&self, settings: Settings) -> anyhow::Result<()> {
        self.settings_provider.save_settings(settings.clone()).await?;
        self.settings.send_replace(settings);
        Ok(())
    }

    pub async fn reset_settings(&self) -> anyhow::Result<Settings> {
        let settings = self.settings_provider.reset_to_defaults().await?;
        self.settings.send_replace(settings.clone());
        Ok(settings)
    }
}

/// Subscribers are only woken when the value actually differs.
fn replace_if_changed<T: PartialEq>(sender: &watch::Sender<T>, value: T) {
    sender.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        *current = value;
        true
    });
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::models::Prayer;
    use crate::storage::{AlarmStorage, SettingsStorage};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[derive(Default)]
    struct FlakyPrayerProvider {
        failing: AtomicBool,
    }

    #[async_trait]
    impl PrayerTimeProvider for FlakyPrayerProvider {
        async fn today_prayer_times(&self) -> anyhow::Result<PrayerTimes> {
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("Provider offline");
            }
            Ok(PrayerTimes {
                fajr: Some(at(5, 0)),
                ..PrayerTimes::default()
            })
        }

        async fn next_prayer(&self) -> anyhow::Result<Option<NextPrayer>> {
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("Provider offline");
            }
            Ok(Some(NextPrayer {
                prayer: Prayer::Fajr,
                time: at(5, 0),
                remaining_seconds: 60,
            }))
        }
    }

    fn cache_with(provider: Arc<FlakyPrayerProvider>) -> ProviderCache {
        ProviderCache::new(
            provider,
            Arc::new(AlarmStorage::in_memory()),
            Arc::new(SettingsStorage::in_memory(Settings::default())),
        )
    }

    #[tokio::test]
    async fn snapshots_start_empty() {
        let cache = cache_with(Arc::default());

        assert_eq!(*cache.prayer_times().borrow(), None);
        assert_eq!(*cache.next_prayer().borrow(), None);
        assert!(cache.alarms().borrow().is_empty());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let provider = Arc::new(FlakyPrayerProvider::default());
        let cache = cache_with(Arc::clone(&provider));

        cache.refresh_prayer_data().await;
        provider.failing.store(true, Ordering::SeqCst);
        cache.refresh_prayer_data().await;

        assert_eq!((*cache.prayer_times().borrow()).as_ref().and_then(|t| t.fajr), Some(at(5, 0)));
        assert_eq!(
            (*cache.next_prayer().borrow()).as_ref().map(|next| next.prayer),
            Some(Prayer::Fajr)
        );
    }

    #[tokio::test]
    async fn alarm_changes_are_published_to_subscribers() {
        let cache = cache_with(Arc::default());
        let mut alarms = cache.alarms();

        let created = cache.create_alarm(NewAlarm::new(Prayer::Asr, 5)).await.unwrap();
        assert!(alarms.has_changed().unwrap());
        assert_eq!(alarms.borrow_and_update().as_slice(), [created.clone()]);

        cache.toggle_alarm(created.id, false).await.unwrap();
        assert!(!alarms.borrow_and_update()[0].is_active);

        cache.delete_alarm(created.id).await.unwrap();
        assert!(alarms.borrow().is_empty());
    }

    #[tokio::test]
    async fn failed_alarm_change_is_reported() {
        let cache = cache_with(Arc::default());

        assert!(cache.toggle_alarm(42, true).await.is_err());
    }

    #[tokio::test]
    async fn settings_reset_publishes_defaults() {
        let cache = cache_with(Arc::default());
        let mut changed = Settings::default();
        changed.enable_notifications = false;

        cache.save_settings(changed).await.unwrap();
        assert!(!cache.settings().borrow().enable_notifications);

        let reset = cache.reset_settings().await.unwrap();
        assert!(reset.enable_notifications);
        assert!(cache.settings().borrow().enable_notifications);
    }

    #[tokio::test]
    async fn unchanged_refresh_does_not_wake_subscribers() {
        let cache = cache_with(Arc::default());
        cache.create_alarm(NewAlarm::new(Prayer::Isha, 0)).await.unwrap();
        let mut alarms = cache.alarms();
        let mut settings = cache.settings();
        alarms.borrow_and_update();
        settings.borrow_and_update();

        cache.refresh_alarms().await;
        cache.refresh_settings().await;

        assert!(!alarms.has_changed().unwrap());
        assert!(!settings.has_changed().unwrap());
    }
}
