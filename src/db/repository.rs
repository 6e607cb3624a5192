use anyhow::{Result, anyhow};
use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::models::{DailyStats, DayRecord, PrayerType, ReminderSetting};
use crate::prayer_times::DailyTimes;
use crate::reminders::scheduler::ReminderStore;

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| anyhow!("Bad time '{}': {}", s, e))
}

const INSTANT_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ─── Day log ─────────────────────────────────────────────────────────────────

pub struct DayLogRepo;

impl DayLogRepo {
    /// Set one prayer's flag for a date, creating the row when absent.
    pub fn upsert(conn: &Connection, date: &str, prayer: PrayerType, completed: bool) -> Result<()> {
        // Column names come from the fixed PrayerType enum, never from input.
        let sql = format!(
            "INSERT INTO prayer_log (date, {col}) VALUES (?1, ?2)
             ON CONFLICT(date) DO UPDATE SET {col} = ?2, updated_at = datetime('now')",
            col = prayer.as_str()
        );
        conn.execute(&sql, params![date, completed as i32])?;
        Ok(())
    }

    pub fn get_by_date(conn: &Connection, date: &str) -> Result<Option<DayRecord>> {
        conn.query_row(
            "SELECT date, fajr, dhuhr, asr, maghrib, isha FROM prayer_log WHERE date = ?1",
            params![date],
            row_to_record,
        )
        .optional()
        .map_err(anyhow::Error::from)
    }

    /// The full log, oldest first. Streak computation re-sorts anyway.
    pub fn list_all(conn: &Connection) -> Result<Vec<DayRecord>> {
        let mut stmt = conn.prepare(
            "SELECT date, fajr, dhuhr, asr, maghrib, isha FROM prayer_log ORDER BY date ASC",
        )?;
        let rows = stmt.query_map([], row_to_record)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(anyhow::Error::from)
    }

    pub fn get_range(conn: &Connection, start: &str, end: &str) -> Result<Vec<DayRecord>> {
        let mut stmt = conn.prepare(
            "SELECT date, fajr, dhuhr, asr, maghrib, isha FROM prayer_log
             WHERE date >= ?1 AND date <= ?2 ORDER BY date ASC",
        )?;
        let rows = stmt.query_map(params![start, end], row_to_record)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(anyhow::Error::from)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<DayRecord> {
    Ok(DayRecord {
        date: row.get::<_, String>(0)?,
        fajr: row.get::<_, i32>(1)? != 0,
        dhuhr: row.get::<_, i32>(2)? != 0,
        asr: row.get::<_, i32>(3)? != 0,
        maghrib: row.get::<_, i32>(4)? != 0,
        isha: row.get::<_, i32>(5)? != 0,
    })
}

// ─── Reminder settings ───────────────────────────────────────────────────────

pub struct ReminderRepo;

impl ReminderRepo {
    /// Settings keyed by prayer. Rows that fail to parse are skipped with a
    /// warning rather than failing the whole load.
    pub fn list(conn: &Connection) -> Result<BTreeMap<PrayerType, ReminderSetting>> {
        let mut stmt = conn.prepare("SELECT prayer, time, enabled FROM prayer_reminders")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i32>(2)?,
            ))
        })?;

        let mut settings = BTreeMap::new();
        for r in rows {
            let (prayer, time, enabled) = r?;
            match (PrayerType::from_str(&prayer), parse_time(&time)) {
                (Ok(p), Ok(t)) => {
                    settings.insert(
                        p,
                        ReminderSetting {
                            time: t,
                            enabled: enabled != 0,
                        },
                    );
                }
                _ => log::warn!("Skipping unreadable reminder row for '{}'", prayer),
            }
        }
        Ok(settings)
    }

    pub fn upsert(
        conn: &Connection,
        prayer: PrayerType,
        time: NaiveTime,
        enabled: bool,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO prayer_reminders (prayer, time, enabled) VALUES (?1, ?2, ?3)
             ON CONFLICT(prayer) DO UPDATE SET time = ?2, enabled = ?3",
            params![
                prayer.as_str(),
                time.format("%H:%M").to_string(),
                enabled as i32
            ],
        )?;
        Ok(())
    }
}

/// `ReminderStore` backed by the `prayer_reminders` table.
pub struct SqliteReminderStore<'a> {
    pub conn: &'a Connection,
}

impl ReminderStore for SqliteReminderStore<'_> {
    fn list(&self) -> Result<BTreeMap<PrayerType, ReminderSetting>> {
        ReminderRepo::list(self.conn)
    }

    fn upsert(&mut self, prayer: PrayerType, setting: &ReminderSetting) -> Result<()> {
        ReminderRepo::upsert(self.conn, prayer, setting.time, setting.enabled)
    }
}

// ─── Pending notifications ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PendingNotification {
    pub id: i64,
    pub fire_at: NaiveDateTime,
    pub title: String,
    pub body: String,
    pub repeat_daily: bool,
}

pub struct NotificationRepo;

// Returns `rusqlite::Result` rather than `anyhow::Result`: the notification
// gateway wraps these into its own typed error.
impl NotificationRepo {
    pub fn insert(
        conn: &Connection,
        fire_at: NaiveDateTime,
        title: &str,
        body: &str,
        repeat_daily: bool,
    ) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO pending_notifications (fire_at, title, body, repeat_daily)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                fire_at.format(INSTANT_FMT).to_string(),
                title,
                body,
                repeat_daily as i32
            ],
        )?;
        Ok(())
    }

    pub fn clear_all(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute("DELETE FROM pending_notifications", [])?;
        Ok(())
    }

    pub fn list(conn: &Connection) -> rusqlite::Result<Vec<PendingNotification>> {
        let mut stmt = conn.prepare(
            "SELECT id, fire_at, title, body, repeat_daily FROM pending_notifications
             ORDER BY fire_at, id",
        )?;
        let rows = stmt.query_map([], row_to_notification)?;
        rows.collect()
    }

    pub fn due(conn: &Connection, now: NaiveDateTime) -> rusqlite::Result<Vec<PendingNotification>> {
        let mut stmt = conn.prepare(
            "SELECT id, fire_at, title, body, repeat_daily FROM pending_notifications
             WHERE fire_at <= ?1 ORDER BY fire_at, id",
        )?;
        let rows =
            stmt.query_map(params![now.format(INSTANT_FMT).to_string()], row_to_notification)?;
        rows.collect()
    }

    pub fn reschedule(conn: &Connection, id: i64, fire_at: NaiveDateTime) -> rusqlite::Result<()> {
        conn.execute(
            "UPDATE pending_notifications SET fire_at = ?1 WHERE id = ?2",
            params![fire_at.format(INSTANT_FMT).to_string(), id],
        )?;
        Ok(())
    }

    pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<()> {
        conn.execute("DELETE FROM pending_notifications WHERE id = ?1", params![id])?;
        Ok(())
    }
}

fn row_to_notification(row: &Row<'_>) -> rusqlite::Result<PendingNotification> {
    let fire_at: String = row.get(1)?;
    let fire_at = NaiveDateTime::parse_from_str(&fire_at, INSTANT_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(PendingNotification {
        id: row.get(0)?,
        fire_at,
        title: row.get(2)?,
        body: row.get(3)?,
        repeat_daily: row.get::<_, i32>(4)? != 0,
    })
}

// ─── Cached prayer times ─────────────────────────────────────────────────────

pub struct CacheRepo;

impl CacheRepo {
    pub fn get_times_for_date(conn: &Connection, date: &str) -> Result<Option<DailyTimes>> {
        let row = conn
            .query_row(
                "SELECT fajr, sunrise, dhuhr, asr, maghrib, isha
                 FROM prayer_times_cache WHERE date = ?1",
                params![date],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((fajr, sunrise, dhuhr, asr, maghrib, isha)) => Ok(Some(DailyTimes {
                fajr: parse_time(&fajr)?,
                sunrise: parse_time(&sunrise)?,
                dhuhr: parse_time(&dhuhr)?,
                asr: parse_time(&asr)?,
                maghrib: parse_time(&maghrib)?,
                isha: parse_time(&isha)?,
            })),
        }
    }

    pub fn store_times(conn: &Connection, date: &str, times: &DailyTimes) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO prayer_times_cache
                (date, fajr, sunrise, dhuhr, asr, maghrib, isha)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                date,
                times.fajr.format("%H:%M").to_string(),
                times.sunrise.format("%H:%M").to_string(),
                times.dhuhr.format("%H:%M").to_string(),
                times.asr.format("%H:%M").to_string(),
                times.maghrib.format("%H:%M").to_string(),
                times.isha.format("%H:%M").to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn clear_all(conn: &Connection) -> Result<()> {
        conn.execute("DELETE FROM prayer_times_cache", [])?;
        Ok(())
    }
}

// ─── Stats ───────────────────────────────────────────────────────────────────

pub struct StatsRepo;

impl StatsRepo {
    pub fn daily_stats_range(conn: &Connection, start: &str, end: &str) -> Result<Vec<DailyStats>> {
        let mut stmt = conn.prepare(
            "SELECT date, (fajr + dhuhr + asr + maghrib + isha) AS done
             FROM prayer_log WHERE date >= ?1 AND date <= ?2 ORDER BY date",
        )?;
        let rows = stmt.query_map(params![start, end], |row| {
            Ok(DailyStats {
                date: row.get(0)?,
                prayers_done: row.get::<_, i32>(1)? as u8,
                prayers_total: 5,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(anyhow::Error::from)
    }
}

// ─── App meta ────────────────────────────────────────────────────────────────

pub struct MetaRepo;

impl MetaRepo {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM app_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(anyhow::Error::from)
    }

    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO app_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }
}
