//! Consecutive-day streak calculation over the prayer log.
//!
//! A day counts only when all five prayers are logged; partially-logged days
//! and absent days both simply fail to extend a run. The current streak is
//! the contiguous run of complete days ending on `today` or yesterday — the
//! one-day grace keeps the counter alive before today's log is finished —
//! and is 0 otherwise.

use chrono::NaiveDate;

use crate::models::{DayRecord, Streak};

/// Compute `{current, longest}` from the full day log.
///
/// Input order does not matter; duplicate dates collapse to one occurrence
/// and records with malformed dates are skipped. Pure in its inputs: `today`
/// is passed in rather than read from the clock.
pub fn compute(records: &[DayRecord], today: NaiveDate) -> Streak {
    let mut dates: Vec<NaiveDate> = records
        .iter()
        .filter(|r| r.is_complete())
        .filter_map(|r| r.date_naive())
        .collect();
    dates.sort_unstable();
    dates.dedup();

    Streak {
        current: current_run(&dates, today),
        longest: longest_run(&dates),
    }
}

fn longest_run(sorted: &[NaiveDate]) -> u32 {
    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;

    for &d in sorted {
        run = match prev {
            Some(p) if p.succ_opt() == Some(d) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(d);
    }
    longest
}

fn current_run(sorted: &[NaiveDate], today: NaiveDate) -> u32 {
    let Some(&latest) = sorted.last() else {
        return 0;
    };

    // Run must end today or yesterday. A latest date in the future (clock
    // skew, imported data) does not count either.
    let lag = (today - latest).num_days();
    if !(0..=1).contains(&lag) {
        return 0;
    }

    let mut run = 1u32;
    let mut expected = latest;
    for &d in sorted.iter().rev().skip(1) {
        match expected.pred_opt() {
            Some(prev_day) if d == prev_day => {
                run += 1;
                expected = prev_day;
            }
            _ => break,
        }
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrayerType;

    fn complete(date: &str) -> DayRecord {
        let mut rec = DayRecord::empty(date);
        for p in PrayerType::all() {
            rec.set(p, true);
        }
        rec
    }

    fn partial(date: &str, prayers: &[PrayerType]) -> DayRecord {
        let mut rec = DayRecord::empty(date);
        for p in prayers {
            rec.set(*p, true);
        }
        rec
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn empty_log_is_zero_zero() {
        let s = compute(&[], day("2025-08-27"));
        assert_eq!(s, Streak { current: 0, longest: 0 });
    }

    #[test]
    fn single_complete_day_today() {
        let s = compute(&[complete("2025-08-27")], day("2025-08-27"));
        assert_eq!(s, Streak { current: 1, longest: 1 });
    }

    #[test]
    fn single_complete_day_yesterday_keeps_grace() {
        let s = compute(&[complete("2025-08-26")], day("2025-08-27"));
        assert_eq!(s, Streak { current: 1, longest: 1 });
    }

    #[test]
    fn single_complete_day_two_days_ago_is_stale() {
        let s = compute(&[complete("2025-08-25")], day("2025-08-27"));
        assert_eq!(s, Streak { current: 0, longest: 1 });
    }

    #[test]
    fn three_consecutive_days_ending_today() {
        let records = [
            complete("2025-08-25"),
            complete("2025-08-26"),
            complete("2025-08-27"),
        ];
        let s = compute(&records, day("2025-08-27"));
        assert_eq!(s, Streak { current: 3, longest: 3 });
    }

    #[test]
    fn gap_resets_both_streaks() {
        let records = [complete("2025-08-25"), complete("2025-08-27")];
        let s = compute(&records, day("2025-08-27"));
        assert_eq!(s, Streak { current: 1, longest: 1 });
    }

    #[test]
    fn partial_day_breaks_run_like_a_missing_day() {
        let records = [
            complete("2025-08-25"),
            partial("2025-08-26", &[PrayerType::Fajr]),
            complete("2025-08-27"),
        ];
        let s = compute(&records, day("2025-08-27"));
        assert_eq!(s.longest, 1);
        assert_eq!(s.current, 1);
    }

    #[test]
    fn old_long_run_beats_short_current_run() {
        let records = [
            complete("2025-08-10"),
            complete("2025-08-11"),
            complete("2025-08-12"),
            complete("2025-08-13"),
            complete("2025-08-27"),
        ];
        let s = compute(&records, day("2025-08-27"));
        assert_eq!(s, Streak { current: 1, longest: 4 });
    }

    #[test]
    fn input_order_does_not_matter() {
        let records = [
            complete("2025-08-27"),
            complete("2025-08-25"),
            complete("2025-08-26"),
        ];
        let s = compute(&records, day("2025-08-27"));
        assert_eq!(s, Streak { current: 3, longest: 3 });
    }

    #[test]
    fn duplicate_dates_collapse() {
        let records = [
            complete("2025-08-26"),
            complete("2025-08-26"),
            complete("2025-08-27"),
        ];
        let s = compute(&records, day("2025-08-27"));
        assert_eq!(s, Streak { current: 2, longest: 2 });
    }

    #[test]
    fn malformed_dates_are_skipped() {
        let records = [complete("garbage"), complete("2025-08-27")];
        let s = compute(&records, day("2025-08-27"));
        assert_eq!(s, Streak { current: 1, longest: 1 });
    }

    #[test]
    fn future_latest_date_yields_no_current_streak() {
        let records = [complete("2025-08-29")];
        let s = compute(&records, day("2025-08-27"));
        assert_eq!(s, Streak { current: 0, longest: 1 });
    }

    #[test]
    fn recompute_is_idempotent() {
        let records = [complete("2025-08-26"), complete("2025-08-27")];
        let today = day("2025-08-27");
        assert_eq!(compute(&records, today), compute(&records, today));
    }

    #[test]
    fn current_never_exceeds_longest() {
        let records = [
            complete("2025-08-20"),
            complete("2025-08-21"),
            complete("2025-08-26"),
            complete("2025-08-27"),
        ];
        let s = compute(&records, day("2025-08-27"));
        assert!(s.current <= s.longest);
        assert_eq!(s, Streak { current: 2, longest: 2 });
    }
}
