use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "mihrab",
    version,
    author,
    about = "A terminal companion for tracking daily prayers, streaks, and reminders"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// First-run setup (location, calculation method, madhab)
    Setup {
        /// Reset existing configuration
        #[arg(long)]
        reset: bool,
    },
    /// Mark a prayer as completed
    Log {
        /// Prayer name (fajr, dhuhr, asr, maghrib, isha)
        prayer: String,
        /// Date to log for (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// Clear the completion flag instead of setting it
        #[arg(long)]
        undo: bool,
    },
    /// Show one day's log
    Day {
        /// Date to show (YYYY-MM-DD, defaults to today)
        date: Option<String>,
    },
    /// Month calendar of completion history
    Calendar {
        /// Month to show (YYYY-MM, defaults to the current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Show current and longest streaks
    Streaks,
    /// Show statistics
    Stats {
        /// Show ASCII heatmap for the last 7 days
        #[arg(long)]
        week: bool,
    },
    /// Show today's prayer times and countdown to next prayer
    Times,
    /// Prayer reminder management
    Remind {
        #[command(subcommand)]
        action: RemindCommands,
    },
    /// Export a weekly summary to stdout
    Export {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum RemindCommands {
    /// Show all reminder settings
    List,
    /// Enable or disable a prayer's reminder
    Toggle {
        /// Prayer name
        prayer: String,
    },
    /// Change a prayer's reminder time
    SetTime {
        /// Prayer name
        prayer: String,
        /// Time of day, e.g. 05:30
        time: String,
    },
    /// Print any reminders that have come due
    Check,
    /// Re-issue notification schedules to match the enabled settings
    Sync,
}
