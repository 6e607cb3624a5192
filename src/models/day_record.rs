#![allow(dead_code)]
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::PrayerType;

/// One row of the prayer log: a calendar date and five completion flags.
///
/// Absence of a record for a date means "nothing logged", which is distinct
/// from a record with all five flags false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: String,
    pub fajr: bool,
    pub dhuhr: bool,
    pub asr: bool,
    pub maghrib: bool,
    pub isha: bool,
}

impl DayRecord {
    pub fn empty(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            fajr: false,
            dhuhr: false,
            asr: false,
            maghrib: false,
            isha: false,
        }
    }

    pub fn get(&self, prayer: PrayerType) -> bool {
        match prayer {
            PrayerType::Fajr => self.fajr,
            PrayerType::Dhuhr => self.dhuhr,
            PrayerType::Asr => self.asr,
            PrayerType::Maghrib => self.maghrib,
            PrayerType::Isha => self.isha,
        }
    }

    pub fn set(&mut self, prayer: PrayerType, done: bool) {
        match prayer {
            PrayerType::Fajr => self.fajr = done,
            PrayerType::Dhuhr => self.dhuhr = done,
            PrayerType::Asr => self.asr = done,
            PrayerType::Maghrib => self.maghrib = done,
            PrayerType::Isha => self.isha = done,
        }
    }

    /// A day counts toward a streak only when all five prayers are logged.
    pub fn is_complete(&self) -> bool {
        PrayerType::all().iter().all(|p| self.get(*p))
    }

    pub fn completed_count(&self) -> u8 {
        PrayerType::all().iter().filter(|p| self.get(**p)).count() as u8
    }

    /// Parse the stored `YYYY-MM-DD` string. `None` for malformed dates.
    pub fn date_naive(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_requires_all_five() {
        let mut rec = DayRecord::empty("2025-08-25");
        assert!(!rec.is_complete());
        for p in PrayerType::all() {
            rec.set(p, true);
        }
        assert!(rec.is_complete());
        rec.set(PrayerType::Asr, false);
        assert!(!rec.is_complete());
        assert_eq!(rec.completed_count(), 4);
    }

    #[test]
    fn malformed_date_parses_to_none() {
        assert!(DayRecord::empty("not-a-date").date_naive().is_none());
        assert!(DayRecord::empty("2025-08-25").date_naive().is_some());
    }
}
