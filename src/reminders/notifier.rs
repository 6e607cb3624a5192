//! SQLite-backed implementation of the notification gateway.
//!
//! Scheduled notifications are rows in `pending_notifications`; delivery
//! happens when `deliver_due` sweeps the table (the `remind check` command).
//! Like the mobile platforms this models, the backend offers no per-item
//! cancel: the scheduler wipes the table and re-issues what should remain.

use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use thiserror::Error;

use crate::db::repository::{NotificationRepo, PendingNotification};
use crate::reminders::scheduler::NotificationGateway;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification permission denied")]
    PermissionDenied,
    #[error("notification storage failed")]
    Storage(#[from] rusqlite::Error),
}

pub struct SqliteNotifier<'a> {
    conn: &'a Connection,
    allow: bool,
}

impl<'a> SqliteNotifier<'a> {
    /// `allow` mirrors the platform permission state; here it comes from the
    /// `[notifications] allow` config switch.
    pub fn new(conn: &'a Connection, allow: bool) -> Self {
        Self { conn, allow }
    }
}

impl NotificationGateway for SqliteNotifier<'_> {
    fn request_permission(&mut self) -> Result<bool, NotifyError> {
        Ok(self.allow)
    }

    fn cancel_all(&mut self) -> Result<(), NotifyError> {
        // The DELETE has committed by the time this returns, which is the
        // acknowledgment the scheduler's rewrite policy relies on.
        NotificationRepo::clear_all(self.conn)?;
        Ok(())
    }

    fn schedule_at(
        &mut self,
        fire_at: NaiveDateTime,
        title: &str,
        body: &str,
        repeat_daily: bool,
    ) -> Result<(), NotifyError> {
        if !self.allow {
            return Err(NotifyError::PermissionDenied);
        }
        NotificationRepo::insert(self.conn, fire_at, title, body, repeat_daily)?;
        Ok(())
    }
}

/// Collect everything due at `now`. Daily repeats are advanced to their next
/// strictly-future occurrence (skipping any whole days missed while the app
/// was not running); one-shots are removed.
pub fn deliver_due(
    conn: &Connection,
    now: NaiveDateTime,
) -> Result<Vec<PendingNotification>, NotifyError> {
    let due = NotificationRepo::due(conn, now)?;

    for n in &due {
        if n.repeat_daily {
            let mut next = n.fire_at;
            while next <= now {
                next += Duration::days(1);
            }
            NotificationRepo::reschedule(conn, n.id, next)?;
        } else {
            NotificationRepo::delete(conn, n.id)?;
        }
    }
    Ok(due)
}
