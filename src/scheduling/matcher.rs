use chrono::{Datelike, NaiveDateTime};

use crate::models::alarm::recurrence_day_from_sunday_index;
use crate::models::{Alarm, Prayer, PrayerTimes, Settings};

/// Minute of the last successful trigger, formatted as "HH:MM".
///
/// Equal minutes never trigger twice. The guard is only ever overwritten by
/// a later trigger, the passing minute boundary is what re-arms it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerGuard(Option<String>);

impl TriggerGuard {
    pub fn last_minute(&self) -> Option<&str> {
        self.0.as_deref()
    }

    fn is_armed_for(&self, minute: &str) -> bool {
        self.0.as_deref() != Some(minute)
    }

    fn fire(&mut self, minute: String) {
        self.0 = Some(minute);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    Builtin { prayer: Prayer },
    Custom { alarm: Alarm },
}

impl TriggerEvent {
    pub fn title(&self) -> String {
        match self {
            TriggerEvent::Builtin { prayer } => format!("{prayer} prayer time"),
            TriggerEvent::Custom { alarm } => format!("{} alarm", alarm.prayer),
        }
    }

    pub fn display_label(&self) -> String {
        match self {
            TriggerEvent::Builtin { prayer } => format!("At {prayer} time"),
            TriggerEvent::Custom { alarm } => alarm.display_label(),
        }
    }
}

pub fn minute_key(time: &NaiveDateTime) -> String {
    time.format("%H:%M").to_string()
}

/// Decides whether `now` matches a built-in prayer notification or a custom
/// alarm. Built-in prayer times are checked first; the first match wins and
/// arms `guard` for the current minute.
pub fn evaluate(
    now: NaiveDateTime,
    prayer_times: Option<&PrayerTimes>,
    alarms: &[Alarm],
    settings: &Settings,
    guard: &mut TriggerGuard,
) -> Option<TriggerEvent> {
    let current = minute_key(&now);
    if !guard.is_armed_for(&current) {
        return None;
    }

    let event = match_builtin(&current, prayer_times, settings)
        .or_else(|| match_custom(&now, &current, prayer_times, alarms))?;

    guard.fire(current);
    Some(event)
}

fn match_builtin(
    current: &str,
    prayer_times: Option<&PrayerTimes>,
    settings: &Settings,
) -> Option<TriggerEvent> {
    if !settings.enable_notifications {
        return None;
    }

    prayer_times?
        .iter()
        .find(|(_, time)| minute_key(time) == current)
        .map(|(prayer, _)| TriggerEvent::Builtin { prayer })
}

fn match_custom(
    now: &NaiveDateTime,
    current: &str,
    prayer_times: Option<&PrayerTimes>,
    alarms: &[Alarm],
) -> Option<TriggerEvent> {
    let today = recurrence_day_from_sunday_index(now.weekday().num_days_from_sunday());

    alarms
        .iter()
        .filter(|alarm| alarm.is_active && alarm.is_due_on(today))
        .find(|alarm| {
            prayer_times
                .and_then(|times| times.get(alarm.prayer))
                .is_some_and(|anchor| minute_key(&alarm.alarm_time(anchor)) == current)
        })
        .map(|alarm| TriggerEvent::Custom {
            alarm: alarm.clone(),
        })
}
