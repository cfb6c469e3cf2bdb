use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;

use crate::appsettings::{AppSettings, AudioSettings};
use crate::cache::ProviderCache;
use crate::clock::{Clock, SystemClock};
use crate::delivery::{
    AlertChannel, DesktopNotifications, NotificationDispatcher, ToneEngine,
};
use crate::scheduling::{
    AlarmEngine, CountdownPublisher, STORAGE_REFRESH_PERIOD, StorageRefresher, Ticker,
};
use crate::storage::{AlarmStorage, JsonFileStore, SettingsStorage};
use crate::timetable::{DailyTimetable, TimetablePrayerProvider};

/// Builds the provider cache over persistent storage and the configured
/// timetable, and loads the initial snapshots.
pub async fn open_cache(settings: &AppSettings, clock: Arc<dyn Clock>) -> anyhow::Result<Arc<ProviderCache>> {
    let timetable = DailyTimetable::from_settings(&settings.timetable)?;
    let data_dir = settings.data_dir()?;
    let store = Arc::new(
        JsonFileStore::open(&data_dir)
            .await
            .with_context(|| format!("Could not open storage at {}", data_dir.display()))?,
    );

    let alarms = AlarmStorage::load(Arc::clone(&store)).await?;
    let user_settings = SettingsStorage::load(store).await;

    let cache = Arc::new(ProviderCache::new(
        Arc::new(TimetablePrayerProvider::new(timetable, clock)),
        Arc::new(alarms),
        Arc::new(user_settings),
    ));
    cache.refresh_all().await;
    Ok(cache)
}

pub fn system_clock(settings: &AppSettings) -> anyhow::Result<Arc<dyn Clock>> {
    Ok(Arc::new(SystemClock::new(settings.timezone()?)))
}

fn tone_engine(audio: &AudioSettings) -> ToneEngine {
    if !audio.enabled {
        log::info!("Alert tone is disabled in configuration");
        return ToneEngine::unavailable();
    }

    #[cfg(feature = "audio")]
    {
        use crate::delivery::{AudioOutput, RodioAudioOutput};
        return ToneEngine::new(|| Ok(Arc::new(RodioAudioOutput::open()?) as Arc<dyn AudioOutput>));
    }

    #[cfg(not(feature = "audio"))]
    {
        log::warn!("Built without audio support, alerts will be silent");
        ToneEngine::unavailable()
    }
}

/// The running alarm daemon: the alert engine, the countdown and the storage
/// refresher, each driven by its own ticker.
pub struct Application {
    cache: Arc<ProviderCache>,
    tone: Arc<ToneEngine>,
    countdown: watch::Receiver<String>,
    engine_ticker: Ticker,
    countdown_ticker: Ticker,
    refresh_ticker: Ticker,
}

impl Application {
    pub async fn start(settings: &AppSettings) -> anyhow::Result<Self> {
        let clock = system_clock(settings)?;
        let cache = open_cache(settings, Arc::clone(&clock)).await?;

        let notifications = DesktopNotifications::new(settings.notifications.app_name.clone());
        let dispatcher = NotificationDispatcher::new(
            Arc::new(notifications),
            settings.notifications.icon.clone(),
        );

        Ok(Self::with_channels(
            cache,
            clock,
            Arc::new(tone_engine(&settings.audio)),
            Arc::new(dispatcher),
        )
        .await)
    }

    /// Resolves notification permission, then starts the tickers.
    pub async fn with_channels(
        cache: Arc<ProviderCache>,
        clock: Arc<dyn Clock>,
        tone: Arc<ToneEngine>,
        notifications: Arc<NotificationDispatcher>,
    ) -> Self {
        notifications.prepare().await;

        let channels: Vec<Arc<dyn AlertChannel>> = vec![Arc::clone(&tone) as _, notifications as _];
        let engine = AlarmEngine::new(&cache, channels);
        let countdown = CountdownPublisher::new(Arc::clone(&cache));
        let countdown_display = countdown.subscribe();

        let mut engine_ticker = Ticker::new("engine", Arc::clone(&clock));
        let mut countdown_ticker = Ticker::new("countdown", Arc::clone(&clock));
        let mut refresh_ticker = Ticker::with_period("storage", clock, STORAGE_REFRESH_PERIOD);
        engine_ticker.start(engine);
        countdown_ticker.start(countdown);
        refresh_ticker.start(StorageRefresher::new(Arc::clone(&cache)));
        log::info!("Alarm engine is running");

        Self {
            cache,
            tone,
            countdown: countdown_display,
            engine_ticker,
            countdown_ticker,
            refresh_ticker,
        }
    }

    pub fn cache(&self) -> &Arc<ProviderCache> {
        &self.cache
    }

    /// `HH:MM:SS` until the next prayer, updated every second.
    pub fn countdown(&self) -> watch::Receiver<String> {
        self.countdown.clone()
    }

    /// Stops the tickers and silences any tone still playing.
    pub async fn shutdown(mut self) {
        self.engine_ticker.stop().await;
        self.countdown_ticker.stop().await;
        self.refresh_ticker.stop().await;
        self.tone.cancel();
        log::info!("Alarm engine stopped");
    }
}
