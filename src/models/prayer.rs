use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    /// All five daily prayers in the order they occur.
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Today's five prayer timestamps in local wall-clock time.
///
/// Any entry may be missing when the provider could not compute it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerTimes {
    pub fajr: Option<NaiveDateTime>,
    pub dhuhr: Option<NaiveDateTime>,
    pub asr: Option<NaiveDateTime>,
    pub maghrib: Option<NaiveDateTime>,
    pub isha: Option<NaiveDateTime>,
}

impl PrayerTimes {
    pub fn get(&self, prayer: Prayer) -> Option<NaiveDateTime> {
        match prayer {
            Prayer::Fajr => self.fajr,
            Prayer::Dhuhr => self.dhuhr,
            Prayer::Asr => self.asr,
            Prayer::Maghrib => self.maghrib,
            Prayer::Isha => self.isha,
        }
    }

    /// Present prayer times in chronological prayer order.
    pub fn iter(&self) -> impl Iterator<Item = (Prayer, NaiveDateTime)> + '_ {
        Prayer::ALL
            .into_iter()
            .filter_map(|prayer| self.get(prayer).map(|time| (prayer, time)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextPrayer {
    pub prayer: Prayer,
    pub time: NaiveDateTime,
    pub remaining_seconds: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn iter_skips_missing_prayers_and_keeps_order() {
        let times = PrayerTimes {
            fajr: Some(at(5, 0)),
            dhuhr: None,
            asr: Some(at(15, 30)),
            maghrib: Some(at(18, 10)),
            isha: None,
        };

        let prayers: Vec<Prayer> = times.iter().map(|(prayer, _)| prayer).collect();

        assert_eq!(prayers, vec![Prayer::Fajr, Prayer::Asr, Prayer::Maghrib]);
    }

    #[test]
    fn prayer_serializes_lowercase() {
        let json = serde_json::to_string(&Prayer::Maghrib).unwrap();
        assert_eq!(json, "\"maghrib\"");
    }
}
