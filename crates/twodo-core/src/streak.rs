//! Shared daily streak.
//!
//! A duo's streak advances at most once per calendar day, whichever member
//! completes a quest. The caller supplies `today`; nothing here reads a clock.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Streak fields of a duo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakState {
    /// Consecutive days with at least one completion.
    pub current_streak: u32,
    /// Highest `current_streak` ever reached.
    pub best_streak: u32,
    /// Day of the last streak-advancing completion.
    pub last_streak_date: Option<NaiveDate>,
}

impl StreakState {
    /// Whether the streak was already credited on `today`.
    #[must_use]
    pub fn credited_on(&self, today: NaiveDate) -> bool {
        self.last_streak_date == Some(today)
    }
}

/// Streak after a completion on `today`.
///
/// Same day: unchanged. Next day: +1. Anything else (no prior date, a gap, or
/// a date in the future): reset to 1.
#[must_use]
pub fn advance_streak(today: NaiveDate, prior: &StreakState) -> StreakState {
    if prior.credited_on(today) {
        return *prior;
    }
    let current = match prior.last_streak_date {
        Some(last) if (today - last).num_days() == 1 => prior.current_streak.saturating_add(1),
        _ => 1,
    };
    StreakState {
        current_streak: current,
        best_streak: prior.best_streak.max(current),
        last_streak_date: Some(today),
    }
}
