use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Per-prayer reminder setting. The date component of a reminder is never
/// stored; scheduling always normalizes to the next occurrence of `time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSetting {
    pub time: NaiveTime,
    pub enabled: bool,
}

impl ReminderSetting {
    /// The default for a prayer the user has never touched.
    pub fn disabled_at(time: NaiveTime) -> Self {
        Self {
            time,
            enabled: false,
        }
    }
}
