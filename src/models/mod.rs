pub mod alarm;
pub mod prayer;
pub mod settings;

pub use alarm::{Alarm, AlarmId, NewAlarm, RecurrenceDay};
pub use prayer::{NextPrayer, Prayer, PrayerTimes};
pub use settings::Settings;
