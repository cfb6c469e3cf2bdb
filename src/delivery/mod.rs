mod desktop;
mod notification;
mod pattern;
mod tone;

#[cfg(feature = "audio")]
mod audio;

use async_trait::async_trait;

use crate::models::Settings;
use crate::scheduling::TriggerEvent;

#[cfg(feature = "audio")]
pub use audio::RodioAudioOutput;
pub use desktop::DesktopNotifications;
pub use notification::{AlertNotification, NotificationDispatcher, NotificationPlatform, Permission};
pub use pattern::TonePattern;
pub use tone::{AudioError, AudioOutput, OutputState, ToneEngine, ToneId, UnavailableAudioOutput};

/// What the user is told when a trigger fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub vibration: bool,
    pub sound_path: Option<String>,
}

impl Alert {
    pub fn from_event(event: &TriggerEvent, settings: &Settings) -> Self {
        let (vibration, sound_path) = match event {
            TriggerEvent::Builtin { .. } => (settings.enable_vibration, None),
            TriggerEvent::Custom { alarm } => (alarm.vibration_enabled, alarm.sound_path.clone()),
        };

        Self {
            title: event.title(),
            body: event.display_label(),
            vibration,
            sound_path,
        }
    }
}

#[async_trait]
pub trait AlertChannel: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn deliver(&self, alert: &Alert) -> anyhow::Result<()>;
}
