use serde::{Deserialize, Serialize};

/// Completion counts for one logged date, for heatmaps and summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: String,
    pub prayers_done: u8,
    pub prayers_total: u8,
}

/// Derived from the day log on demand; never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub current: u32,
    pub longest: u32,
}
