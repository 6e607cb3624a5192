use anyhow::{Result, anyhow};
use chrono::{Duration, FixedOffset, NaiveDate, NaiveTime};
use rusqlite::Connection;
use salah::prelude::*;

use crate::config::SalahConfig;
use crate::db::repository::CacheRepo;
use crate::models::PrayerType;

/// One day's computed prayer times in local wall-clock time.
#[derive(Debug, Clone)]
pub struct DailyTimes {
    pub fajr: NaiveTime,
    pub sunrise: NaiveTime,
    pub dhuhr: NaiveTime,
    pub asr: NaiveTime,
    pub maghrib: NaiveTime,
    pub isha: NaiveTime,
}

impl DailyTimes {
    pub fn for_prayer(&self, prayer: PrayerType) -> NaiveTime {
        match prayer {
            PrayerType::Fajr => self.fajr,
            PrayerType::Dhuhr => self.dhuhr,
            PrayerType::Asr => self.asr,
            PrayerType::Maghrib => self.maghrib,
            PrayerType::Isha => self.isha,
        }
    }
}

/// Opaque oracle around the `salah` crate: coordinates and calculation
/// parameters in, local times out, with a per-date SQLite cache.
pub struct PrayerCalculator {
    lat: f64,
    lng: f64,
    method: String,
    madhab: String,
    tz_offset_minutes: i32,
}

impl PrayerCalculator {
    /// Coordinates come from the location provider; calculation parameters
    /// from config. Method and madhab are validated here so later failures
    /// can only be astronomical.
    pub fn new(lat: f64, lng: f64, salah_cfg: &SalahConfig) -> Result<Self> {
        parse_method(&salah_cfg.calc_method)?;
        parse_madhab(&salah_cfg.madhab)?;
        Ok(Self {
            lat,
            lng,
            method: salah_cfg.calc_method.clone(),
            madhab: salah_cfg.madhab.clone(),
            tz_offset_minutes: salah_cfg.timezone_offset,
        })
    }

    fn compute(&self, date: NaiveDate) -> Result<DailyTimes> {
        let coords = Coordinates::new(self.lat, self.lng);
        let params = Configuration::with(parse_method(&self.method)?, parse_madhab(&self.madhab)?);

        let times = PrayerSchedule::new()
            .on(date)
            .for_location(coords)
            .with_configuration(params)
            .calculate()
            .map_err(|e| anyhow!("Prayer calculation failed: {}", e))?;

        let offset = FixedOffset::east_opt(self.tz_offset_minutes * 60)
            .ok_or_else(|| anyhow!("Invalid timezone offset: {}", self.tz_offset_minutes))?;
        let to_local =
            |utc: chrono::DateTime<chrono::Utc>| -> NaiveTime { utc.with_timezone(&offset).time() };

        Ok(DailyTimes {
            fajr: to_local(times.time(Prayer::Fajr)),
            sunrise: to_local(times.time(Prayer::Sunrise)),
            dhuhr: to_local(times.time(Prayer::Dhuhr)),
            asr: to_local(times.time(Prayer::Asr)),
            maghrib: to_local(times.time(Prayer::Maghrib)),
            isha: to_local(times.time(Prayer::Isha)),
        })
    }

    /// Cache hit, or compute and fill the cache.
    pub fn cached_or_compute(&self, conn: &Connection, date: NaiveDate) -> Result<DailyTimes> {
        let date_str = date.format("%Y-%m-%d").to_string();
        if let Some(cached) = CacheRepo::get_times_for_date(conn, &date_str)? {
            return Ok(cached);
        }
        let times = self.compute(date)?;
        CacheRepo::store_times(conn, &date_str, &times)?;
        Ok(times)
    }

    /// Precompute times for `from` through `days_ahead` days after it.
    pub fn warm_cache(&self, conn: &Connection, from: NaiveDate, days_ahead: u32) -> Result<()> {
        for i in 0..=(days_ahead as i64) {
            self.cached_or_compute(conn, from + Duration::days(i))?;
        }
        Ok(())
    }

    /// The next prayer after `now_time`, with seconds until it. Rolls over
    /// to tomorrow's Fajr once Isha has passed.
    pub fn next_prayer(
        &self,
        conn: &Connection,
        now_date: NaiveDate,
        now_time: NaiveTime,
    ) -> Result<(PrayerType, i64)> {
        let today = self.cached_or_compute(conn, now_date)?;

        for prayer in PrayerType::all() {
            let time = today.for_prayer(prayer);
            if time > now_time {
                return Ok((prayer, (time - now_time).num_seconds()));
            }
        }

        let tomorrow = now_date
            .succ_opt()
            .ok_or_else(|| anyhow!("Date out of range: {}", now_date))?;
        let fajr = self.cached_or_compute(conn, tomorrow)?.fajr;
        let secs = (tomorrow.and_time(fajr) - now_date.and_time(now_time)).num_seconds();
        Ok((PrayerType::Fajr, secs))
    }
}

fn parse_method(s: &str) -> Result<Method> {
    match s {
        "MuslimWorldLeague" => Ok(Method::MuslimWorldLeague),
        "Egyptian" => Ok(Method::Egyptian),
        "Karachi" => Ok(Method::Karachi),
        "UmmAlQura" => Ok(Method::UmmAlQura),
        "Dubai" => Ok(Method::Dubai),
        "MoonsightingCommittee" => Ok(Method::MoonsightingCommittee),
        "NorthAmerica" => Ok(Method::NorthAmerica),
        "Kuwait" => Ok(Method::Kuwait),
        "Qatar" => Ok(Method::Qatar),
        "Singapore" => Ok(Method::Singapore),
        "Tehran" => Ok(Method::Tehran),
        "Turkey" => Ok(Method::Turkey),
        "Other" => Ok(Method::Other),
        _ => Err(anyhow!("Unknown calculation method: '{}'", s)),
    }
}

fn parse_madhab(s: &str) -> Result<Madhab> {
    match s {
        "Hanafi" => Ok(Madhab::Hanafi),
        "Shafi" | "Shafi'i" => Ok(Madhab::Shafi),
        _ => Err(anyhow!("Unknown madhab: '{}'", s)),
    }
}

pub const CALC_METHODS: &[&str] = &[
    "MuslimWorldLeague",
    "Egyptian",
    "Karachi",
    "UmmAlQura",
    "Dubai",
    "MoonsightingCommittee",
    "NorthAmerica",
    "Kuwait",
    "Qatar",
    "Singapore",
    "Tehran",
    "Turkey",
    "Other",
];

pub const MADHABS: &[&str] = &["Shafi", "Hanafi"];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SalahConfig;

    #[test]
    fn rejects_unknown_method_and_madhab_up_front() {
        let mut cfg = SalahConfig::default();
        cfg.calc_method = "Lunar".to_string();
        assert!(PrayerCalculator::new(21.4225, 39.8262, &cfg).is_err());

        let mut cfg = SalahConfig::default();
        cfg.madhab = "Unknown".to_string();
        assert!(PrayerCalculator::new(21.4225, 39.8262, &cfg).is_err());

        assert!(PrayerCalculator::new(21.4225, 39.8262, &SalahConfig::default()).is_ok());
    }

    #[test]
    fn every_listed_method_parses() {
        for m in CALC_METHODS {
            assert!(parse_method(m).is_ok(), "method {} should parse", m);
        }
        for m in MADHABS {
            assert!(parse_madhab(m).is_ok(), "madhab {} should parse", m);
        }
    }
}
