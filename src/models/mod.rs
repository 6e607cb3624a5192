pub mod day_record;
pub mod prayer;
pub mod reminder;
pub mod stats;

pub use day_record::DayRecord;
pub use prayer::PrayerType;
pub use reminder::ReminderSetting;
pub use stats::{DailyStats, Streak};
