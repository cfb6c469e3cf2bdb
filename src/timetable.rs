use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use crate::appsettings::TimetableSettings;
use crate::clock::Clock;
use crate::models::{NextPrayer, Prayer, PrayerTimes};
use crate::providers::PrayerTimeProvider;

/// Fixed wall-clock time for each prayer, repeated every day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTimetable {
    times: [NaiveTime; 5],
}

impl DailyTimetable {
    pub fn new(
        fajr: NaiveTime,
        dhuhr: NaiveTime,
        asr: NaiveTime,
        maghrib: NaiveTime,
        isha: NaiveTime,
    ) -> Self {
        Self {
            times: [fajr, dhuhr, asr, maghrib, isha],
        }
    }

    pub fn from_settings(settings: &TimetableSettings) -> anyhow::Result<Self> {
        let parse = |prayer: Prayer, value: &str| {
            NaiveTime::parse_from_str(value, "%H:%M")
                .with_context(|| format!("Invalid {prayer} time in timetable: {value:?}"))
        };

        Ok(Self::new(
            parse(Prayer::Fajr, &settings.fajr)?,
            parse(Prayer::Dhuhr, &settings.dhuhr)?,
            parse(Prayer::Asr, &settings.asr)?,
            parse(Prayer::Maghrib, &settings.maghrib)?,
            parse(Prayer::Isha, &settings.isha)?,
        ))
    }

    pub fn time_of(&self, prayer: Prayer) -> NaiveTime {
        self.times[prayer as usize]
    }

    pub fn on(&self, date: NaiveDate) -> PrayerTimes {
        let at = |prayer| Some(date.and_time(self.time_of(prayer)));
        PrayerTimes {
            fajr: at(Prayer::Fajr),
            dhuhr: at(Prayer::Dhuhr),
            asr: at(Prayer::Asr),
            maghrib: at(Prayer::Maghrib),
            isha: at(Prayer::Isha),
        }
    }

    /// First prayer strictly after `now`, rolling over to tomorrow's fajr once
    /// isha has passed.
    pub fn next_after(&self, now: NaiveDateTime) -> NextPrayer {
        let upcoming = self
            .on(now.date())
            .iter()
            .find(|(_, time)| *time > now);

        let (prayer, time) = upcoming.unwrap_or_else(|| {
            let tomorrow = now.date() + TimeDelta::days(1);
            (Prayer::Fajr, tomorrow.and_time(self.time_of(Prayer::Fajr)))
        });

        NextPrayer {
            prayer,
            time,
            remaining_seconds: (time - now).num_seconds(),
        }
    }
}

/// Prayer-time provider serving a configured daily timetable.
pub struct TimetablePrayerProvider {
    timetable: DailyTimetable,
    clock: Arc<dyn Clock>,
}

impl TimetablePrayerProvider {
    pub fn new(timetable: DailyTimetable, clock: Arc<dyn Clock>) -> Self {
        Self { timetable, clock }
    }
}

#[async_trait]
impl PrayerTimeProvider for TimetablePrayerProvider {
    async fn today_prayer_times(&self) -> anyhow::Result<PrayerTimes> {
        Ok(self.timetable.on(self.clock.now().date()))
    }

    async fn next_prayer(&self) -> anyhow::Result<Option<NextPrayer>> {
        Ok(Some(self.timetable.next_after(self.clock.now())))
    }
}
