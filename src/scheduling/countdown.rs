use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::watch;

use crate::cache::ProviderCache;
use crate::models::NextPrayer;

use super::ticker::TickHandler;

pub const NO_COUNTDOWN: &str = "--:--:--";

/// Formats whole seconds as zero-padded `HH:MM:SS`. Hours are not wrapped at
/// 24; negative input is clamped to zero.
pub fn format_remaining(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Publishes the time left until the next prayer once per tick.
///
/// When the countdown reaches zero it publishes `00:00:00` and asks the cache
/// to reload prayer data, once per target time.
pub struct CountdownPublisher {
    cache: Arc<ProviderCache>,
    next_prayer: watch::Receiver<Option<NextPrayer>>,
    display: watch::Sender<String>,
    refreshed_for: Option<NaiveDateTime>,
}

impl CountdownPublisher {
    pub fn new(cache: Arc<ProviderCache>) -> Self {
        let next_prayer = cache.next_prayer();
        Self {
            cache,
            next_prayer,
            display: watch::channel(NO_COUNTDOWN.to_string()).0,
            refreshed_for: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.display.subscribe()
    }

    fn publish(&self, text: String) {
        self.display.send_if_modified(|current| {
            if *current == text {
                return false;
            }
            *current = text;
            true
        });
    }
}

#[async_trait]
impl TickHandler for CountdownPublisher {
    async fn on_tick(&mut self, now: NaiveDateTime) {
        let target = (*self.next_prayer.borrow()).as_ref().map(|next| next.time);
        let Some(target) = target else {
            self.publish(NO_COUNTDOWN.to_string());
            return;
        };

        let remaining = (target - now).num_seconds();
        if remaining > 0 {
            self.publish(format_remaining(remaining));
            return;
        }

        if self.refreshed_for == Some(target) {
            return;
        }

        self.publish(format_remaining(0));
        self.refreshed_for = Some(target);
        log::info!("Reached next prayer at {target}, refreshing prayer data");

        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move { cache.refresh_prayer_data().await });
    }
}
