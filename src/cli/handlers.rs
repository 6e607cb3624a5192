use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, Duration, Local, NaiveDate};
use rusqlite::Connection;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use crate::cli::args::RemindCommands;
use crate::config::AppConfig;
use crate::db::repository::{
    CacheRepo, DayLogRepo, MetaRepo, NotificationRepo, SqliteReminderStore, StatsRepo,
};
use crate::location::{ConfigLocation, LocationProvider};
use crate::models::{DayRecord, PrayerType};
use crate::prayer_times::{CALC_METHODS, DailyTimes, MADHABS, PrayerCalculator};
use crate::reminders::{ReminderScheduler, SqliteNotifier, ToggleOutcome, deliver_due};
use crate::streak;
use crate::utils::format::{format_duration_secs, format_time, parse_hm, progress_bar};

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! print_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        print!("\x1b[0m");
    }};
}

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GOLD: &str = "\x1b[38;2;196;160;68m";

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| anyhow!("Expected a date like 2025-08-27, got '{}'", s))
}

fn today_string() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

// ─── Setup wizard ────────────────────────────────────────────────────────────

pub fn handle_setup(conn: &Connection, config: &mut AppConfig, reset: bool) -> Result<()> {
    if !reset {
        if let Some(done) = MetaRepo::get(conn, "setup_done")? {
            if done == "1" {
                println!("Mihrab is already configured. Use --reset to reconfigure.");
                return Ok(());
            }
        }
    }

    println!();
    println_colored!(GOLD, "  Mihrab setup");
    println_colored!(DIM, "  Press Enter to keep the value in brackets.");
    println!();

    config.location.name = prompt_default("Location name", &config.location.name)?;
    config.location.latitude = prompt_parsed("Latitude", config.location.latitude)?;
    config.location.longitude = prompt_parsed("Longitude", config.location.longitude)?;

    println_colored!(DIM, "  Calculation methods: {}", CALC_METHODS.join(", "));
    loop {
        let method = prompt_default("Calculation method", &config.salah.calc_method)?;
        if CALC_METHODS.contains(&method.as_str()) {
            config.salah.calc_method = method;
            break;
        }
        println_colored!(RED, "  Unknown method '{}'", method);
    }

    println_colored!(DIM, "  Madhabs (affects Asr): {}", MADHABS.join(", "));
    loop {
        let madhab = prompt_default("Madhab", &config.salah.madhab)?;
        if MADHABS.contains(&madhab.as_str()) {
            config.salah.madhab = madhab;
            break;
        }
        println_colored!(RED, "  Unknown madhab '{}'", madhab);
    }

    loop {
        let offset = prompt_default(
            "UTC offset (e.g. +3, -5:30)",
            &format_tz_offset(config.salah.timezone_offset),
        )?;
        match parse_tz_offset(&offset) {
            Ok(minutes) => {
                config.salah.timezone_offset = minutes;
                break;
            }
            Err(e) => println_colored!(RED, "  {}", e),
        }
    }

    config.save().context("Saving config")?;
    // Times cached for the old location are no longer valid
    CacheRepo::clear_all(conn)?;
    MetaRepo::set(conn, "setup_done", "1")?;

    println!();
    println_colored!(GREEN, "  ✓ Setup complete");
    println!();
    Ok(())
}

// ─── Daily log ───────────────────────────────────────────────────────────────

pub fn handle_log(conn: &Connection, prayer_str: &str, date: Option<&str>, undo: bool) -> Result<()> {
    let prayer = PrayerType::from_str(prayer_str).map_err(|_| {
        anyhow!(
            "Unknown prayer '{}'. Use: fajr, dhuhr, asr, maghrib, isha",
            prayer_str
        )
    })?;
    let date = match date {
        Some(s) => parse_date(s)?.format("%Y-%m-%d").to_string(),
        None => today_string(),
    };

    DayLogRepo::upsert(conn, &date, prayer, !undo)?;

    if undo {
        println_colored!(DIM, "  ○ {} cleared for {}", prayer.display_name(), date);
    } else {
        println_colored!(GREEN, "  ✓ {} completed for {}", prayer.display_name(), date);
    }

    if let Some(record) = DayLogRepo::get_by_date(conn, &date)? {
        println_colored!(
            DIM,
            "  {}/5 prayers logged on {}",
            record.completed_count(),
            date
        );
    }
    Ok(())
}

fn print_record_chips(record: &DayRecord) {
    for prayer in PrayerType::all() {
        if record.get(prayer) {
            print_colored!(GREEN, "  ✓ {:<8}", prayer.display_name());
        } else {
            print_colored!(DIM, "  ✗ {:<8}", prayer.display_name());
        }
    }
    println!();
}

pub fn handle_day(conn: &Connection, date: Option<&str>) -> Result<()> {
    let date = match date {
        Some(s) => parse_date(s)?.format("%Y-%m-%d").to_string(),
        None => today_string(),
    };

    println!();
    println_colored!(GOLD, "  Prayers on {}", date);
    println!();
    match DayLogRepo::get_by_date(conn, &date)? {
        Some(record) => {
            print_record_chips(&record);
            if record.is_complete() {
                println!();
                println_colored!(GREEN, "  All five completed — may it be accepted.");
            }
        }
        None => println_colored!(DIM, "  Nothing logged."),
    }
    println!();
    Ok(())
}

// ─── Calendar ────────────────────────────────────────────────────────────────

fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| anyhow!("Invalid month: {}-{:02}", year, month))?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| anyhow!("Invalid month: {}-{:02}", year, month))?;
    Ok((first, next_first - Duration::days(1)))
}

pub fn handle_calendar(conn: &Connection, month: Option<&str>) -> Result<()> {
    let today = Local::now().date_naive();
    let (year, month) = match month {
        Some(s) => {
            let mut parts = s.splitn(2, '-');
            let y: i32 = parts.next().unwrap_or("").parse().map_err(|_| {
                anyhow!("Expected a month like 2025-08, got '{}'", s)
            })?;
            let m: u32 = parts.next().unwrap_or("").parse().map_err(|_| {
                anyhow!("Expected a month like 2025-08, got '{}'", s)
            })?;
            (y, m)
        }
        None => (today.year(), today.month()),
    };
    let (first, last) = month_bounds(year, month)?;

    let records = DayLogRepo::get_range(
        conn,
        &first.format("%Y-%m-%d").to_string(),
        &last.format("%Y-%m-%d").to_string(),
    )?;
    let by_date: std::collections::HashMap<String, &DayRecord> =
        records.iter().map(|r| (r.date.clone(), r)).collect();

    println!();
    println_colored!(GOLD, "  {} {}", month_name(month), year);
    println!();
    println_colored!(DIM, "  Mo Tu We Th Fr Sa Su");

    print!("  ");
    for _ in 0..first.weekday().num_days_from_monday() {
        print!("   ");
    }

    let mut day = first;
    loop {
        let key = day.format("%Y-%m-%d").to_string();
        let glyph = match by_date.get(&key).map(|r| r.completed_count()) {
            Some(5) => format!("{}●\x1b[0m", GREEN),
            Some(3..=4) => format!("{}◕\x1b[0m", AMBER),
            Some(1..=2) => format!("{}◑\x1b[0m", AMBER),
            Some(_) => format!("{}○\x1b[0m", RED),
            None => format!("{}·\x1b[0m", DIM),
        };
        if day == today {
            print!("[{}]", glyph);
        } else {
            print!(" {} ", glyph);
        }

        if day.weekday().num_days_from_monday() == 6 {
            println!();
            print!("  ");
        }
        match day.succ_opt() {
            Some(next) if next <= last => day = next,
            _ => break,
        }
    }
    println!();
    println!();
    println_colored!(DIM, "  ● all five   ◕◑ partial   ○ none   · not logged   [x] today");
    println!();
    Ok(())
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        _ => "December",
    }
}

// ─── Streaks & stats ─────────────────────────────────────────────────────────

pub fn handle_streaks(conn: &Connection) -> Result<()> {
    let records = DayLogRepo::list_all(conn)?;
    let streak = streak::compute(&records, Local::now().date_naive());

    println!();
    println_colored!(GOLD, "  Streaks & Consistency");
    println!();
    println_colored!(BOLD, "  🔥 Current streak:  {} days", streak.current);
    println_colored!(BOLD, "  🏆 Longest streak:  {} days", streak.longest);
    println!();
    println_colored!(DIM, "  Keep your streak going for more motivation!");
    println!();
    Ok(())
}

pub fn handle_stats(conn: &Connection, week: bool) -> Result<()> {
    let today = Local::now().date_naive();
    let today_str = today.format("%Y-%m-%d").to_string();
    let week_start = today - Duration::days(6);
    let week_start_str = week_start.format("%Y-%m-%d").to_string();

    let records = DayLogRepo::list_all(conn)?;
    let streak = streak::compute(&records, today);
    let daily = StatsRepo::daily_stats_range(conn, &week_start_str, &today_str)?;
    let done_this_week: u32 = daily.iter().map(|d| d.prayers_done as u32).sum();

    println!();
    println_colored!(GOLD, "  Statistics");
    println!();
    println_colored!(
        BOLD,
        "  Streak:     {} days current  |  {} days longest",
        streak.current,
        streak.longest
    );
    println!(
        "  This week:  {}/35 prayers  {}",
        done_this_week,
        progress_bar(done_this_week, 35, 10)
    );

    if week {
        println!();
        println_colored!(DIM, "  Last 7 days  (● = 5/5, ◕ = 3-4, ◑ = 1-2, ○ = 0/5)");
        println!();
        print!("  ");
        for stat in &daily {
            let icon = match stat.prayers_done {
                5 => format!("{}●\x1b[0m ", GREEN),
                3 | 4 => format!("{}◕\x1b[0m ", AMBER),
                1 | 2 => format!("{}◑\x1b[0m ", AMBER),
                _ => format!("{}○\x1b[0m ", DIM),
            };
            print!("{}", icon);
        }
        println!();
    }

    println!();
    Ok(())
}

// ─── Prayer times ────────────────────────────────────────────────────────────

pub fn handle_times(conn: &Connection, config: &AppConfig) -> Result<()> {
    let today = Local::now().date_naive();
    let now_time = Local::now().time();

    let location = ConfigLocation::from_config(config);
    let (lat, lng) = location.current_position().context("Reading location")?;
    let calc = PrayerCalculator::new(lat, lng, &config.salah)?;
    let times = calc.cached_or_compute(conn, today)?;

    println!();
    println_colored!(
        GOLD,
        "  Prayer Times — {} ({})",
        config.location.name,
        today.format("%Y-%m-%d")
    );
    println!();

    let rows = [
        ("Fajr", times.fajr),
        ("Sunrise", times.sunrise),
        ("Dhuhr", times.dhuhr),
        ("Asr", times.asr),
        ("Maghrib", times.maghrib),
        ("Isha", times.isha),
    ];
    for (name, time) in &rows {
        if *time < now_time {
            println_colored!(DIM, "  {:<10}  {}", name, format_time(*time));
        } else {
            println_colored!(BOLD, "  {:<10}  {}", name, format_time(*time));
        }
    }

    let (next, secs) = calc.next_prayer(conn, today, now_time)?;
    println!();
    println_colored!(
        AMBER,
        "  Next: {} in {}",
        next.display_name(),
        format_duration_secs(secs)
    );
    println!();
    Ok(())
}

// ─── Reminders ───────────────────────────────────────────────────────────────

/// Today's computed times for seeding defaults. Any failure (bad coordinates,
/// bad method, astronomy) warns once and the caller falls back to the clock.
fn reminder_default_times(
    conn: &Connection,
    config: &AppConfig,
    location: &impl LocationProvider,
) -> Option<DailyTimes> {
    let attempt = || -> Result<DailyTimes> {
        let (lat, lng) = location.current_position()?;
        let calc = PrayerCalculator::new(lat, lng, &config.salah)?;
        calc.cached_or_compute(conn, Local::now().date_naive())
    };
    match attempt() {
        Ok(times) => Some(times),
        Err(e) => {
            println_colored!(AMBER, "  ! Could not compute prayer times: {}", e);
            println_colored!(AMBER, "    Using the current time for new reminder defaults.");
            None
        }
    }
}

pub fn handle_remind(conn: &Connection, config: &AppConfig, action: &RemindCommands) -> Result<()> {
    let now = Local::now().naive_local();
    let mut store = SqliteReminderStore { conn };
    let mut notifier = SqliteNotifier::new(conn, config.notifications.allow);

    let mut scheduler = ReminderScheduler::load(&store)?;
    let defaults = reminder_default_times(conn, config, &ConfigLocation::from_config(config));
    scheduler.fill_defaults(|p| {
        defaults
            .as_ref()
            .map(|t| t.for_prayer(p))
            .unwrap_or_else(|| now.time())
    });

    match action {
        RemindCommands::List => {
            println!();
            println_colored!(GOLD, "  Reminders");
            println!();
            for (prayer, setting) in scheduler.settings() {
                if setting.enabled {
                    println_colored!(
                        GREEN,
                        "  ✓ {:<8}  {}",
                        prayer.display_name(),
                        format_time(setting.time)
                    );
                } else {
                    println_colored!(
                        DIM,
                        "  ○ {:<8}  {}",
                        prayer.display_name(),
                        format_time(setting.time)
                    );
                }
            }
            let pending = NotificationRepo::list(conn)?;
            println!();
            println_colored!(DIM, "  {} notification(s) scheduled", pending.len());
            println!();
        }

        RemindCommands::Toggle { prayer } => {
            let prayer = PrayerType::from_str(prayer)
                .map_err(|_| anyhow!("Unknown prayer '{}'", prayer))?;
            match scheduler.toggle(prayer, now, &mut store, &mut notifier)? {
                ToggleOutcome::Enabled { fire_at } => {
                    println_colored!(
                        GREEN,
                        "  ✓ {} reminder on — next at {}",
                        prayer.display_name(),
                        fire_at.format("%Y-%m-%d %H:%M")
                    );
                }
                ToggleOutcome::EnabledWithoutPermission => {
                    println_colored!(AMBER, "  ! Notification permission denied.");
                    println_colored!(
                        AMBER,
                        "    Set [notifications] allow = true in the config, then run `mihrab remind sync`."
                    );
                }
                ToggleOutcome::Disabled => {
                    println_colored!(DIM, "  ○ {} reminder off", prayer.display_name());
                }
            }
        }

        RemindCommands::SetTime { prayer, time } => {
            let prayer = PrayerType::from_str(prayer)
                .map_err(|_| anyhow!("Unknown prayer '{}'", prayer))?;
            let time = parse_hm(time)?;
            let scheduled = scheduler.set_time(prayer, time, now, &mut store, &mut notifier)?;

            println_colored!(
                GREEN,
                "  ✓ {} reminder time set to {}",
                prayer.display_name(),
                format_time(time)
            );
            for (p, fire_at) in &scheduled {
                println_colored!(
                    DIM,
                    "    {} rescheduled for {}",
                    p.display_name(),
                    fire_at.format("%Y-%m-%d %H:%M")
                );
            }
        }

        RemindCommands::Check => {
            let fired = deliver_due(conn, now)?;
            if fired.is_empty() {
                println_colored!(DIM, "  No reminders due.");
            } else {
                for n in &fired {
                    println_colored!(BOLD, "  • {}", n.title);
                    println!("    {}", n.body);
                }
            }
        }

        RemindCommands::Sync => {
            let report = scheduler.sync(now, &mut notifier)?;
            if report.permission_denied {
                println_colored!(AMBER, "  ! Notification permission denied; nothing scheduled.");
            } else if report.scheduled.is_empty() {
                println_colored!(DIM, "  No reminders enabled.");
            } else {
                println_colored!(GREEN, "  ✓ {} reminder(s) rescheduled", report.scheduled.len());
                for (p, fire_at) in &report.scheduled {
                    println_colored!(
                        DIM,
                        "    {} at {}",
                        p.display_name(),
                        fire_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
    }
    Ok(())
}

// ─── Overview (no subcommand) ────────────────────────────────────────────────

pub fn handle_overview(conn: &Connection, config: &AppConfig) -> Result<()> {
    let today = Local::now().date_naive();
    let today_str = today.format("%Y-%m-%d").to_string();

    println!();
    println_colored!(GOLD, "  Mihrab — {}", today_str);
    println!();

    match DayLogRepo::get_by_date(conn, &today_str)? {
        Some(record) => print_record_chips(&record),
        None => println_colored!(DIM, "  Nothing logged today yet."),
    }

    let records = DayLogRepo::list_all(conn)?;
    let streak = streak::compute(&records, today);
    println!();
    println_colored!(
        BOLD,
        "  🔥 {} day streak (longest {})",
        streak.current,
        streak.longest
    );

    // Next prayer is informational; failures here must not break the overview
    let location = ConfigLocation::from_config(config);
    if let Ok((lat, lng)) = location.current_position() {
        if let Ok(calc) = PrayerCalculator::new(lat, lng, &config.salah) {
            if let Ok((next, secs)) = calc.next_prayer(conn, today, Local::now().time()) {
                println_colored!(
                    AMBER,
                    "  Next: {} in {}",
                    next.display_name(),
                    format_duration_secs(secs)
                );
            }
        }
    }
    println!();
    Ok(())
}

// ─── Export ──────────────────────────────────────────────────────────────────

#[derive(serde::Serialize)]
struct WeeklySummary {
    generated: String,
    location: String,
    current_streak: u32,
    longest_streak: u32,
    days: Vec<crate::models::DailyStats>,
}

pub fn handle_export(conn: &Connection, config: &AppConfig, json: bool) -> Result<()> {
    let today = Local::now().date_naive();
    let week_start = today - Duration::days(6);
    let today_str = today.format("%Y-%m-%d").to_string();
    let week_start_str = week_start.format("%Y-%m-%d").to_string();

    let records = DayLogRepo::list_all(conn)?;
    let streak = streak::compute(&records, today);
    let daily = StatsRepo::daily_stats_range(conn, &week_start_str, &today_str)?;

    if json {
        let summary = WeeklySummary {
            generated: today_str,
            location: config.location.name.clone(),
            current_streak: streak.current,
            longest_streak: streak.longest,
            days: daily,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("# mihrab — Weekly Summary");
    println!("# {}", today_str);
    println!();
    println!("Location: {}", config.location.name);
    println!("Method:   {}", config.salah.calc_method);
    println!();
    println!("## Prayer Completion (last 7 days)");
    for stat in &daily {
        println!(
            "  {}  {}/5  {}",
            stat.date,
            stat.prayers_done,
            progress_bar(stat.prayers_done as u32, 5, 5)
        );
    }
    println!();
    println!("## Summary");
    println!(
        "  Streak: {} days (longest: {})",
        streak.current, streak.longest
    );
    Ok(())
}

// ─── Prompt helpers ──────────────────────────────────────────────────────────

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().lock().read_line(&mut buf)?;
    Ok(buf.trim_end_matches('\n').trim_end_matches('\r').to_string())
}

/// Prompt showing the current value; empty input keeps it.
fn prompt_default(label: &str, current: &str) -> Result<String> {
    let answer = prompt(&format!("  {} [{}]: ", label, current))?;
    if answer.trim().is_empty() {
        Ok(current.to_string())
    } else {
        Ok(answer.trim().to_string())
    }
}

fn prompt_parsed<T: std::str::FromStr + std::fmt::Display + Copy>(
    label: &str,
    current: T,
) -> Result<T> {
    loop {
        let answer = prompt_default(label, &current.to_string())?;
        match answer.parse() {
            Ok(v) => return Ok(v),
            Err(_) => println_colored!(RED, "  Could not parse '{}'", answer),
        }
    }
}

/// Parse a UTC offset string into total minutes.
/// Accepts: "5:30", "+5:30", "-5:30", "5", "+5", "5.5"
fn parse_tz_offset(s: &str) -> Result<i32> {
    let s = s.trim().trim_start_matches('+');
    let negative = s.starts_with('-');
    let s = s.trim_start_matches('-');
    let sign = if negative { -1 } else { 1 };

    let minutes = if s.contains(':') {
        let mut parts = s.splitn(2, ':');
        let hours: i32 = parts.next().unwrap_or("0").parse()?;
        let mins: i32 = parts.next().unwrap_or("0").parse()?;
        hours * 60 + mins
    } else if s.contains('.') {
        let hours: f64 = s.parse()?;
        (hours * 60.0).round() as i32
    } else {
        let hours: i32 = s.parse()?;
        hours * 60
    };

    Ok(sign * minutes)
}

/// Format total minutes as "+H:MM" string
fn format_tz_offset(minutes: i32) -> String {
    let sign = if minutes < 0 { "-" } else { "+" };
    let abs = minutes.abs();
    let h = abs / 60;
    let m = abs % 60;
    if m == 0 {
        format!("{}{}", sign, h)
    } else {
        format!("{}{}:{:02}", sign, h, m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tz_offset_parsing_round_trips() {
        assert_eq!(parse_tz_offset("+5:30").unwrap(), 330);
        assert_eq!(parse_tz_offset("-5:30").unwrap(), -330);
        assert_eq!(parse_tz_offset("3").unwrap(), 180);
        assert_eq!(parse_tz_offset("5.5").unwrap(), 330);
        assert_eq!(format_tz_offset(330), "+5:30");
        assert_eq!(format_tz_offset(-330), "-5:30");
        assert_eq!(format_tz_offset(180), "+3");
    }

    #[test]
    fn month_bounds_handle_december_rollover() {
        let (first, last) = month_bounds(2025, 12).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());

        let (_, feb_last) = month_bounds(2024, 2).unwrap();
        assert_eq!(feb_last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        assert!(month_bounds(2025, 13).is_err());
    }
}
