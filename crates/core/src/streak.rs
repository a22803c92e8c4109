//! Daily activity streaks.
//!
//! A streak counts consecutive calendar days with at least one answered
//! question. Only date deltas matter, never wall-clock time.

use chrono::{Days, NaiveDate};
use serde::Serialize;

/// How an activity on `today` changed the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTransition {
    /// Already active today; the streak was credited earlier.
    AlreadyCounted,
    /// Last activity was yesterday; the streak grew by one.
    Extended,
    /// First activity ever, or a gap of two or more days.
    Restarted,
}

/// Computes the streak after an activity on `today`.
#[must_use]
pub fn advance(
    last_active: Option<NaiveDate>,
    current: u32,
    today: NaiveDate,
) -> (StreakTransition, u32) {
    let yesterday = today.checked_sub_days(Days::new(1));
    match last_active {
        Some(last) if last == today => (StreakTransition::AlreadyCounted, current),
        Some(last) if Some(last) == yesterday => {
            (StreakTransition::Extended, current.saturating_add(1))
        }
        _ => (StreakTransition::Restarted, 1),
    }
}
