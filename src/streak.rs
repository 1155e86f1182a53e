//! Consecutive-day completion streaks.
//!
//! Days are calendar dates in the reference offset, never rolling 24h
//! windows. The current streak is the run ending at the most recent
//! completion date, and only counts while that date is today or yesterday.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
}

/// Compute streaks from completion timestamps in any order.
pub fn compute_streaks(
    completions: &[DateTime<Utc>],
    today: NaiveDate,
    offset: FixedOffset,
) -> Streaks {
    let mut days: Vec<NaiveDate> = completions
        .iter()
        .map(|at| at.with_timezone(&offset).date_naive())
        .collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let Some(&most_recent) = days.first() else {
        return Streaks::default();
    };

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut current = None;
    let mut previous: Option<NaiveDate> = None;

    for day in days {
        let continues = previous.is_some_and(|prev| prev - day == Duration::days(1));
        if continues {
            run += 1;
        } else {
            if previous.is_some() && current.is_none() {
                current = Some(run);
            }
            longest = longest.max(run);
            run = 1;
        }
        previous = Some(day);
    }
    longest = longest.max(run);
    let anchored_run = current.unwrap_or(run);

    let active = today - most_recent <= Duration::days(1) && most_recent <= today;
    Streaks {
        current: if active { anchored_run } else { 0 },
        longest,
    }
}
