use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::watch;

use crate::cache::ProviderCache;
use crate::delivery::{Alert, AlertChannel};
use crate::models::{Alarm, PrayerTimes, Settings};

use super::matcher::{self, TriggerEvent, TriggerGuard};
use super::ticker::TickHandler;

/// Checks every tick whether an alert is due and fans it out to the delivery
/// channels.
pub struct AlarmEngine {
    guard: TriggerGuard,
    prayer_times: watch::Receiver<Option<PrayerTimes>>,
    alarms: watch::Receiver<Vec<Alarm>>,
    settings: watch::Receiver<Settings>,
    channels: Vec<Arc<dyn AlertChannel>>,
}

impl AlarmEngine {
    pub fn new(cache: &ProviderCache, channels: Vec<Arc<dyn AlertChannel>>) -> Self {
        Self {
            guard: TriggerGuard::default(),
            prayer_times: cache.prayer_times(),
            alarms: cache.alarms(),
            settings: cache.settings(),
            channels,
        }
    }

    pub fn last_trigger_minute(&self) -> Option<&str> {
        self.guard.last_minute()
    }

    fn check(&mut self, now: NaiveDateTime) -> Option<(TriggerEvent, Alert)> {
        let prayer_times = self.prayer_times.borrow();
        let alarms = self.alarms.borrow();
        let settings = self.settings.borrow();

        let event = matcher::evaluate(
            now,
            (*prayer_times).as_ref(),
            &alarms,
            &settings,
            &mut self.guard,
        )?;
        let alert = Alert::from_event(&event, &settings);
        Some((event, alert))
    }

    fn deliver(&self, alert: Alert) {
        let alert = Arc::new(alert);
        for channel in &self.channels {
            let channel = Arc::clone(channel);
            let alert = Arc::clone(&alert);
            tokio::spawn(async move {
                if let Err(e) = channel.deliver(&alert).await {
                    log::error!("Could not deliver alert via {}: {e:#}", channel.name());
                }
            });
        }
    }
}

#[async_trait]
impl TickHandler for AlarmEngine {
    async fn on_tick(&mut self, now: NaiveDateTime) {
        let Some((event, alert)) = self.check(now) else {
            return;
        };

        match &event {
            TriggerEvent::Builtin { prayer } => {
                log::info!("{prayer} prayer time reached at {now}");
            }
            TriggerEvent::Custom { alarm } => {
                log::info!("Alarm {} triggered at {now}", alarm.id);
            }
        }

        self.deliver(alert);
    }
}
