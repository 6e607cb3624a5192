//! Per-prayer reminder settings and the scheduling policy.
//!
//! The notification backend only exposes a global cancel, never a per-item
//! cancel, so disabling one prayer or editing one time means wiping the whole
//! channel and re-issuing every schedule that should remain. `cancel_all` on
//! the gateway is acknowledged (it returns only once the wipe is done), which
//! lets every reschedule happen strictly after it with no timing heuristics.

use anyhow::Result;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;

use crate::models::{PrayerType, ReminderSetting};
use crate::reminders::notifier::NotifyError;

/// Persistence seam for reminder settings (upsert semantics, keyed by prayer).
pub trait ReminderStore {
    fn list(&self) -> Result<BTreeMap<PrayerType, ReminderSetting>>;
    fn upsert(&mut self, prayer: PrayerType, setting: &ReminderSetting) -> Result<()>;
}

/// Platform seam for delivering one-shot, optionally daily-repeating alerts.
pub trait NotificationGateway {
    fn request_permission(&mut self) -> Result<bool, NotifyError>;

    /// Wipe every scheduled notification. Must not return before the wipe
    /// has taken effect; callers reschedule immediately afterwards.
    fn cancel_all(&mut self) -> Result<(), NotifyError>;

    fn schedule_at(
        &mut self,
        fire_at: NaiveDateTime,
        title: &str,
        body: &str,
        repeat_daily: bool,
    ) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Enabled { fire_at: NaiveDateTime },
    /// The setting stays enabled in data but nothing is scheduled; `sync`
    /// reconciles once permission is granted.
    EnabledWithoutPermission,
    Disabled,
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub scheduled: Vec<(PrayerType, NaiveDateTime)>,
    pub permission_denied: bool,
}

/// In-memory snapshot of the per-prayer settings, driving the store and the
/// notification gateway. The map may hold fewer than five entries until
/// defaults are filled in; every operation tolerates missing keys.
pub struct ReminderScheduler {
    settings: BTreeMap<PrayerType, ReminderSetting>,
}

impl ReminderScheduler {
    pub fn load(store: &impl ReminderStore) -> Result<Self> {
        Ok(Self {
            settings: store.list()?,
        })
    }

    pub fn settings(&self) -> &BTreeMap<PrayerType, ReminderSetting> {
        &self.settings
    }

    /// Insert a disabled default for every prayer not yet present. Defaults
    /// are not persisted; the first toggle or time edit writes them through.
    pub fn fill_defaults(&mut self, mut default_time: impl FnMut(PrayerType) -> NaiveTime) {
        for prayer in PrayerType::all() {
            self.settings
                .entry(prayer)
                .or_insert_with(|| ReminderSetting::disabled_at(default_time(prayer)));
        }
    }

    /// Flip one prayer's enabled flag and make the scheduled notifications
    /// match. Store writes are best-effort: a failure is logged and the
    /// in-memory state stays authoritative for this run.
    pub fn toggle(
        &mut self,
        prayer: PrayerType,
        now: NaiveDateTime,
        store: &mut impl ReminderStore,
        notifier: &mut impl NotificationGateway,
    ) -> Result<ToggleOutcome, NotifyError> {
        let setting = self
            .settings
            .entry(prayer)
            .or_insert_with(|| ReminderSetting::disabled_at(now.time()));
        setting.enabled = !setting.enabled;
        let snapshot = *setting;

        if let Err(e) = store.upsert(prayer, &snapshot) {
            log::warn!("Failed to persist reminder for {}: {}", prayer, e);
        }

        if snapshot.enabled {
            if notifier.request_permission()? {
                let fire_at = schedule_one(notifier, prayer, snapshot.time, now)?;
                Ok(ToggleOutcome::Enabled { fire_at })
            } else {
                Ok(ToggleOutcome::EnabledWithoutPermission)
            }
        } else {
            notifier.cancel_all()?;
            self.reschedule_enabled(notifier, now, Some(prayer))?;
            Ok(ToggleOutcome::Disabled)
        }
    }

    /// Change one prayer's reminder time, then re-issue every enabled
    /// schedule (including this prayer's) at the latest times.
    pub fn set_time(
        &mut self,
        prayer: PrayerType,
        new_time: NaiveTime,
        now: NaiveDateTime,
        store: &mut impl ReminderStore,
        notifier: &mut impl NotificationGateway,
    ) -> Result<Vec<(PrayerType, NaiveDateTime)>, NotifyError> {
        let setting = self
            .settings
            .entry(prayer)
            .or_insert_with(|| ReminderSetting::disabled_at(new_time));
        setting.time = new_time;
        let snapshot = *setting;

        if let Err(e) = store.upsert(prayer, &snapshot) {
            log::warn!("Failed to persist reminder for {}: {}", prayer, e);
        }

        notifier.cancel_all()?;
        self.reschedule_enabled(notifier, now, None)
    }

    /// Reconciliation pass: make the scheduled set agree with the enabled
    /// settings, e.g. at startup or after a permission grant.
    pub fn sync(
        &self,
        now: NaiveDateTime,
        notifier: &mut impl NotificationGateway,
    ) -> Result<SyncReport, NotifyError> {
        notifier.cancel_all()?;

        if !self.settings.values().any(|s| s.enabled) {
            return Ok(SyncReport::default());
        }
        if !notifier.request_permission()? {
            return Ok(SyncReport {
                scheduled: Vec::new(),
                permission_denied: true,
            });
        }
        Ok(SyncReport {
            scheduled: self.reschedule_enabled(notifier, now, None)?,
            permission_denied: false,
        })
    }

    fn reschedule_enabled(
        &self,
        notifier: &mut impl NotificationGateway,
        now: NaiveDateTime,
        skip: Option<PrayerType>,
    ) -> Result<Vec<(PrayerType, NaiveDateTime)>, NotifyError> {
        let mut scheduled = Vec::new();
        for (&prayer, setting) in &self.settings {
            if Some(prayer) == skip || !setting.enabled {
                continue;
            }
            let fire_at = schedule_one(notifier, prayer, setting.time, now)?;
            scheduled.push((prayer, fire_at));
        }
        Ok(scheduled)
    }
}

fn schedule_one(
    notifier: &mut impl NotificationGateway,
    prayer: PrayerType,
    time: NaiveTime,
    now: NaiveDateTime,
) -> Result<NaiveDateTime, NotifyError> {
    let fire_at = next_occurrence(time, now);
    notifier.schedule_at(
        fire_at,
        &notification_title(prayer),
        &notification_body(prayer),
        true,
    )?;
    log::info!("Scheduled {} reminder for {}", prayer, fire_at);
    Ok(fire_at)
}

/// Today at `time`, or tomorrow when that instant is not strictly in the
/// future.
pub fn next_occurrence(time: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let candidate = now.date().and_time(time);
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}

pub fn notification_title(prayer: PrayerType) -> String {
    format!("Prayer Reminder: {}", prayer)
}

pub fn notification_body(prayer: PrayerType) -> String {
    format!("It's time for {} prayer.", prayer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::{NaiveDate, NaiveDateTime};

    #[derive(Default)]
    struct FakeStore {
        rows: BTreeMap<PrayerType, ReminderSetting>,
        fail_writes: bool,
    }

    impl ReminderStore for FakeStore {
        fn list(&self) -> Result<BTreeMap<PrayerType, ReminderSetting>> {
            Ok(self.rows.clone())
        }

        fn upsert(&mut self, prayer: PrayerType, setting: &ReminderSetting) -> Result<()> {
            if self.fail_writes {
                return Err(anyhow!("disk full"));
            }
            self.rows.insert(prayer, *setting);
            Ok(())
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    enum Call {
        RequestPermission,
        CancelAll,
        Schedule { fire_at: NaiveDateTime, title: String },
    }

    struct FakeNotifier {
        permission: bool,
        calls: Vec<Call>,
        /// What would actually fire: cleared by cancel_all, grown by schedule_at.
        active: Vec<(NaiveDateTime, String)>,
    }

    impl FakeNotifier {
        fn granting() -> Self {
            Self {
                permission: true,
                calls: Vec::new(),
                active: Vec::new(),
            }
        }

        fn denying() -> Self {
            Self {
                permission: false,
                ..Self::granting()
            }
        }
    }

    impl NotificationGateway for FakeNotifier {
        fn request_permission(&mut self) -> Result<bool, NotifyError> {
            self.calls.push(Call::RequestPermission);
            Ok(self.permission)
        }

        fn cancel_all(&mut self) -> Result<(), NotifyError> {
            self.calls.push(Call::CancelAll);
            self.active.clear();
            Ok(())
        }

        fn schedule_at(
            &mut self,
            fire_at: NaiveDateTime,
            title: &str,
            _body: &str,
            _repeat_daily: bool,
        ) -> Result<(), NotifyError> {
            self.calls.push(Call::Schedule {
                fire_at,
                title: title.to_string(),
            });
            self.active.push((fire_at, title.to_string()));
            Ok(())
        }
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn scheduler_with(entries: &[(PrayerType, ReminderSetting)]) -> ReminderScheduler {
        ReminderScheduler {
            settings: entries.iter().copied().collect(),
        }
    }

    fn enabled(h: u32, m: u32) -> ReminderSetting {
        ReminderSetting {
            time: hm(h, m),
            enabled: true,
        }
    }

    #[test]
    fn next_occurrence_later_today_stays_today() {
        let now = at("2025-08-27 12:00:00");
        assert_eq!(next_occurrence(hm(19, 30), now), at("2025-08-27 19:30:00"));
    }

    #[test]
    fn next_occurrence_already_passed_rolls_to_tomorrow() {
        let now = at("2025-08-27 12:00:00");
        assert_eq!(next_occurrence(hm(5, 30), now), at("2025-08-28 05:30:00"));
    }

    #[test]
    fn next_occurrence_exactly_now_rolls_to_tomorrow() {
        let now = at("2025-08-27 12:00:00");
        // Must be strictly in the future
        assert_eq!(next_occurrence(hm(12, 0), now), at("2025-08-28 12:00:00"));
    }

    #[test]
    fn toggle_on_schedules_that_prayer_only() {
        let mut sched = scheduler_with(&[(
            PrayerType::Fajr,
            ReminderSetting::disabled_at(hm(5, 30)),
        )]);
        let mut store = FakeStore::default();
        let mut notifier = FakeNotifier::granting();
        let now = at("2025-08-27 12:00:00");

        let outcome = sched
            .toggle(PrayerType::Fajr, now, &mut store, &mut notifier)
            .unwrap();

        assert_eq!(
            outcome,
            ToggleOutcome::Enabled {
                fire_at: at("2025-08-28 05:30:00")
            }
        );
        assert_eq!(notifier.active.len(), 1);
        assert!(notifier.active[0].1.contains("Fajr"));
        assert!(store.rows[&PrayerType::Fajr].enabled);
    }

    #[test]
    fn toggle_on_with_denied_permission_keeps_setting_enabled_but_inert() {
        let mut sched = scheduler_with(&[(
            PrayerType::Dhuhr,
            ReminderSetting::disabled_at(hm(13, 0)),
        )]);
        let mut store = FakeStore::default();
        let mut notifier = FakeNotifier::denying();

        let outcome = sched
            .toggle(PrayerType::Dhuhr, at("2025-08-27 08:00:00"), &mut store, &mut notifier)
            .unwrap();

        assert_eq!(outcome, ToggleOutcome::EnabledWithoutPermission);
        assert!(notifier.active.is_empty());
        // Enabled in data; sync reconciles later
        assert!(store.rows[&PrayerType::Dhuhr].enabled);
        assert!(sched.settings()[&PrayerType::Dhuhr].enabled);
    }

    #[test]
    fn toggle_off_cancels_everything_then_reschedules_the_rest() {
        let mut sched = scheduler_with(&[
            (PrayerType::Fajr, enabled(5, 30)),
            (PrayerType::Maghrib, enabled(18, 45)),
        ]);
        let mut store = FakeStore::default();
        let mut notifier = FakeNotifier::granting();
        let now = at("2025-08-27 12:00:00");

        let outcome = sched
            .toggle(PrayerType::Fajr, now, &mut store, &mut notifier)
            .unwrap();

        assert_eq!(outcome, ToggleOutcome::Disabled);
        assert_eq!(notifier.active.len(), 1);
        assert!(notifier.active[0].1.contains("Maghrib"));

        let cancel_idx = notifier.calls.iter().position(|c| *c == Call::CancelAll).unwrap();
        let schedule_idx = notifier
            .calls
            .iter()
            .position(|c| matches!(c, Call::Schedule { .. }))
            .unwrap();
        assert!(cancel_idx < schedule_idx);
    }

    #[test]
    fn set_time_reschedules_every_enabled_prayer_at_latest_times() {
        let mut sched = scheduler_with(&[
            (PrayerType::Fajr, enabled(5, 30)),
            (PrayerType::Isha, enabled(20, 0)),
            (PrayerType::Asr, ReminderSetting::disabled_at(hm(16, 0))),
        ]);
        let mut store = FakeStore::default();
        let mut notifier = FakeNotifier::granting();
        let now = at("2025-08-27 12:00:00");

        let scheduled = sched
            .set_time(PrayerType::Isha, hm(20, 30), now, &mut store, &mut notifier)
            .unwrap();

        assert_eq!(scheduled.len(), 2);
        assert!(scheduled.contains(&(PrayerType::Fajr, at("2025-08-28 05:30:00"))));
        assert!(scheduled.contains(&(PrayerType::Isha, at("2025-08-27 20:30:00"))));
        assert_eq!(store.rows[&PrayerType::Isha].time, hm(20, 30));

        // Disabled prayers stay unscheduled
        assert!(notifier.active.iter().all(|(_, t)| !t.contains("Asr")));
    }

    #[test]
    fn no_schedule_is_issued_before_the_cancel_in_every_rewrite_path() {
        let mut sched = scheduler_with(&[
            (PrayerType::Fajr, enabled(5, 30)),
            (PrayerType::Isha, enabled(20, 0)),
        ]);
        let mut store = FakeStore::default();
        let mut notifier = FakeNotifier::granting();
        let now = at("2025-08-27 12:00:00");

        sched
            .set_time(PrayerType::Fajr, hm(5, 45), now, &mut store, &mut notifier)
            .unwrap();
        sched
            .toggle(PrayerType::Isha, now, &mut store, &mut notifier)
            .unwrap();

        let mut cancel_seen = false;
        for call in &notifier.calls {
            match call {
                Call::CancelAll => cancel_seen = true,
                Call::Schedule { .. } => assert!(cancel_seen, "schedule before cancel"),
                Call::RequestPermission => {}
            }
        }
    }

    #[test]
    fn toggle_off_then_on_leaves_the_prayer_scheduled() {
        let mut sched = scheduler_with(&[(PrayerType::Fajr, enabled(5, 30))]);
        let mut store = FakeStore::default();
        let mut notifier = FakeNotifier::granting();
        let now = at("2025-08-27 12:00:00");

        sched.toggle(PrayerType::Fajr, now, &mut store, &mut notifier).unwrap();
        assert!(notifier.active.is_empty());

        sched.toggle(PrayerType::Fajr, now, &mut store, &mut notifier).unwrap();
        assert_eq!(notifier.active.len(), 1);
        assert!(notifier.active[0].1.contains("Fajr"));
        assert!(store.rows[&PrayerType::Fajr].enabled);
    }

    #[test]
    fn store_write_failure_is_logged_and_swallowed() {
        let mut sched = scheduler_with(&[(
            PrayerType::Asr,
            ReminderSetting::disabled_at(hm(16, 15)),
        )]);
        let mut store = FakeStore {
            fail_writes: true,
            ..FakeStore::default()
        };
        let mut notifier = FakeNotifier::granting();

        let outcome = sched
            .toggle(PrayerType::Asr, at("2025-08-27 08:00:00"), &mut store, &mut notifier)
            .unwrap();

        assert!(matches!(outcome, ToggleOutcome::Enabled { .. }));
        assert!(sched.settings()[&PrayerType::Asr].enabled);
        assert!(store.rows.is_empty());
    }

    #[test]
    fn toggle_tolerates_a_partially_loaded_map() {
        let mut sched = scheduler_with(&[]);
        let mut store = FakeStore::default();
        let mut notifier = FakeNotifier::granting();
        let now = at("2025-08-27 12:00:00");

        let outcome = sched
            .toggle(PrayerType::Isha, now, &mut store, &mut notifier)
            .unwrap();

        // Default seeded from the wall clock, flipped on, rolled to tomorrow
        // because "now" itself is not strictly in the future.
        assert_eq!(
            outcome,
            ToggleOutcome::Enabled {
                fire_at: at("2025-08-28 12:00:00")
            }
        );
    }

    #[test]
    fn fill_defaults_only_touches_missing_prayers() {
        let mut sched = scheduler_with(&[(PrayerType::Fajr, enabled(5, 10))]);
        sched.fill_defaults(|_| hm(12, 0));

        assert_eq!(sched.settings().len(), 5);
        assert_eq!(sched.settings()[&PrayerType::Fajr], enabled(5, 10));
        assert_eq!(
            sched.settings()[&PrayerType::Isha],
            ReminderSetting::disabled_at(hm(12, 0))
        );
    }

    #[test]
    fn sync_reconciles_schedules_with_enabled_settings() {
        let sched = scheduler_with(&[
            (PrayerType::Fajr, enabled(5, 30)),
            (PrayerType::Dhuhr, ReminderSetting::disabled_at(hm(13, 0))),
            (PrayerType::Isha, enabled(20, 0)),
        ]);
        let mut notifier = FakeNotifier::granting();
        // Stale leftover from a previous run
        notifier.active.push((at("2025-08-27 09:00:00"), "stale".into()));

        let report = sched.sync(at("2025-08-27 12:00:00"), &mut notifier).unwrap();

        assert!(!report.permission_denied);
        assert_eq!(report.scheduled.len(), 2);
        assert_eq!(notifier.active.len(), 2);
        assert!(notifier.active.iter().all(|(_, t)| t != "stale"));
    }

    #[test]
    fn sync_with_denied_permission_cancels_and_reports() {
        let sched = scheduler_with(&[(PrayerType::Fajr, enabled(5, 30))]);
        let mut notifier = FakeNotifier::denying();
        notifier.active.push((at("2025-08-27 09:00:00"), "stale".into()));

        let report = sched.sync(at("2025-08-27 12:00:00"), &mut notifier).unwrap();

        assert!(report.permission_denied);
        assert!(report.scheduled.is_empty());
        assert!(notifier.active.is_empty());
    }

    #[test]
    fn sync_with_nothing_enabled_skips_the_permission_prompt() {
        let sched = scheduler_with(&[(
            PrayerType::Fajr,
            ReminderSetting::disabled_at(hm(5, 30)),
        )]);
        let mut notifier = FakeNotifier::granting();

        let report = sched.sync(at("2025-08-27 12:00:00"), &mut notifier).unwrap();

        assert!(report.scheduled.is_empty());
        assert!(!notifier.calls.contains(&Call::RequestPermission));
    }
}
