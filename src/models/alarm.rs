use chrono::{NaiveDateTime, TimeDelta, Weekday};
use serde::{Deserialize, Serialize};

use super::prayer::Prayer;

pub type AlarmId = i64;

/// Weekday number used by `repeat_days`: 1 is Monday, 7 is Sunday.
pub type RecurrenceDay = u8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub id: AlarmId,
    pub prayer: Prayer,
    pub offset_minutes: i32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub sound_path: Option<String>,
    pub is_active: bool,
    /// Empty means every day.
    #[serde(default)]
    pub repeat_days: Vec<RecurrenceDay>,
    pub vibration_enabled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Alarm {
    /// Human readable label, derived from the anchor prayer and offset when no
    /// explicit label was given.
    pub fn display_label(&self) -> String {
        if let Some(label) = self.label.as_deref().filter(|label| !label.is_empty()) {
            return label.to_string();
        }

        let prayer = self.prayer.display_name();
        if self.offset_minutes == 0 {
            return format!("At {prayer} time");
        }

        let direction = if self.offset_minutes < 0 { "before" } else { "after" };
        format!("{} min {direction} {prayer}", self.offset_minutes.unsigned_abs())
    }

    pub fn is_due_on(&self, day: RecurrenceDay) -> bool {
        self.repeat_days.is_empty() || self.repeat_days.contains(&day)
    }

    /// Applies the signed offset to the anchor prayer's time.
    pub fn alarm_time(&self, anchor: NaiveDateTime) -> NaiveDateTime {
        anchor + TimeDelta::minutes(i64::from(self.offset_minutes))
    }
}

/// Alarm as submitted by a client, before the repository assigns identity
/// and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlarm {
    pub prayer: Prayer,
    pub offset_minutes: i32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub sound_path: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub repeat_days: Vec<RecurrenceDay>,
    pub vibration_enabled: bool,
}

impl NewAlarm {
    pub fn new(prayer: Prayer, offset_minutes: i32) -> Self {
        Self {
            prayer,
            offset_minutes,
            label: None,
            sound_path: None,
            is_active: true,
            repeat_days: Vec::new(),
            vibration_enabled: true,
        }
    }
}

/// Maps a Sunday-based weekday index (0 = Sunday) onto a recurrence day.
pub fn recurrence_day_from_sunday_index(index: u32) -> RecurrenceDay {
    match index {
        0 => 7,
        day => day as RecurrenceDay,
    }
}

pub fn recurrence_day(weekday: Weekday) -> RecurrenceDay {
    recurrence_day_from_sunday_index(weekday.num_days_from_sunday())
}

pub fn day_name(day: RecurrenceDay) -> Option<&'static str> {
    match day {
        1 => Some("Monday"),
        2 => Some("Tuesday"),
        3 => Some("Wednesday"),
        4 => Some("Thursday"),
        5 => Some("Friday"),
        6 => Some("Saturday"),
        7 => Some("Sunday"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alarm(prayer: Prayer, offset_minutes: i32) -> Alarm {
        Alarm {
            id: 1,
            prayer,
            offset_minutes,
            label: None,
            sound_path: None,
            is_active: true,
            repeat_days: vec![],
            vibration_enabled: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn display_label_is_derived_from_prayer_and_offset() {
        assert_eq!(alarm(Prayer::Fajr, -10).display_label(), "10 min before Fajr");
        assert_eq!(alarm(Prayer::Dhuhr, 0).display_label(), "At Dhuhr time");
        assert_eq!(alarm(Prayer::Isha, 25).display_label(), "25 min after Isha");
    }

    #[test]
    fn explicit_label_wins_unless_empty() {
        let mut labelled = alarm(Prayer::Asr, 5);
        labelled.label = Some("Prepare for Asr".to_string());
        assert_eq!(labelled.display_label(), "Prepare for Asr");

        labelled.label = Some(String::new());
        assert_eq!(labelled.display_label(), "5 min after Asr");
    }

    #[test]
    fn sunday_is_recurrence_day_seven() {
        assert_eq!(recurrence_day_from_sunday_index(0), 7);
        assert_eq!(recurrence_day_from_sunday_index(1), 1);
        assert_eq!(recurrence_day_from_sunday_index(6), 6);
        assert_eq!(recurrence_day(Weekday::Sun), 7);
        assert_eq!(recurrence_day(Weekday::Mon), 1);
    }

    #[test]
    fn empty_repeat_days_means_every_day() {
        let daily = alarm(Prayer::Maghrib, 0);
        assert!((1..=7).all(|day| daily.is_due_on(day)));

        let mut weekly = daily.clone();
        weekly.repeat_days = vec![1, 3, 5];
        assert!(weekly.is_due_on(3));
        assert!(!weekly.is_due_on(2));
    }

    #[test]
    fn alarm_json_uses_camel_case_fields() {
        let json = serde_json::to_value(alarm(Prayer::Fajr, -10)).unwrap();
        assert_eq!(json["offsetMinutes"], -10);
        assert_eq!(json["isActive"], true);
        assert_eq!(json["prayer"], "fajr");
    }
}
