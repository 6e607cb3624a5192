use anyhow::{Result, anyhow};
use chrono::NaiveTime;

/// Format a duration in seconds to "Xh Ym" or "Ym" string
pub fn format_duration_secs(secs: i64) -> String {
    if secs <= 0 {
        return "now".to_string();
    }
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Format a NaiveTime to "HH:MM"
pub fn format_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Parse user-supplied "HH:MM" (or "H:MM") into a time of day.
pub fn parse_hm(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| anyhow!("Expected a time like 05:30, got '{}'", s))
}

/// Create a simple ASCII progress bar
pub fn progress_bar(filled: u32, total: u32, width: usize) -> String {
    if total == 0 {
        return "░".repeat(width);
    }
    let ratio = (filled as f64 / total as f64).min(1.0);
    let filled_count = (ratio * width as f64).round() as usize;
    let empty_count = width.saturating_sub(filled_count);
    format!("{}{}", "█".repeat(filled_count), "░".repeat(empty_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hm_accepts_leading_zero_and_not_nonsense() {
        assert_eq!(parse_hm("05:30").unwrap(), NaiveTime::from_hms_opt(5, 30, 0).unwrap());
        assert_eq!(parse_hm(" 5:30 ").unwrap(), NaiveTime::from_hms_opt(5, 30, 0).unwrap());
        assert!(parse_hm("25:00").is_err());
        assert!(parse_hm("five thirty").is_err());
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration_secs(-5), "now");
        assert_eq!(format_duration_secs(90), "1m");
        assert_eq!(format_duration_secs(3700), "1h 1m");
    }
}
