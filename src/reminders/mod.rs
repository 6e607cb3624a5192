pub mod notifier;
pub mod scheduler;

pub use notifier::{NotifyError, SqliteNotifier, deliver_due};
pub use scheduler::{ReminderScheduler, SyncReport, ToggleOutcome};
