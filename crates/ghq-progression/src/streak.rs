//! Consecutive-day activity streaks.

use chrono::{DateTime, Utc};

/// Compute the streak value after an XP-earning activity at `now`.
///
/// The streak counts consecutive **calendar days** (UTC) with at least one
/// activity, not rolling 24-hour windows:
///
/// * No prior activity: the streak starts at 1.
/// * Same day as the last activity: unchanged.
/// * Exactly the next day: incremented.
/// * A gap of more than one day: reset to 1 — the day of reactivation itself
///   counts, so a comeback never shows 0.
///
/// A `last_active_at` on a later day than `now` (clock skew between app
/// servers) is treated the same as "already active today".
pub fn next_streak(current: i32, last_active_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i32 {
    let Some(last) = last_active_at else {
        return 1;
    };

    let days_since = (now.date_naive() - last.date_naive()).num_days();
    match days_since {
        d if d <= 0 => current.max(1),
        1 => current + 1,
        _ => 1,
    }
}
