//! Streak computation over qualifying calendar days.
//!
//! A day qualifies when it had at least one scheduled occurrence and every
//! scheduled occurrence that day is completed. Consecutiveness is literal
//! calendar-day adjacency between days present in the qualifying set: a
//! day with zero scheduled items is absent from the set and breaks a
//! streak exactly like a missed day would.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};

use crate::model::OccurrenceInstance;

/// Bounded lookback window for the longest-streak scan.
pub const STREAK_LOOKBACK_DAYS: u64 = 365;

/// Days on which everything scheduled was completed, ascending.
pub fn qualifying_days(instances: &[OccurrenceInstance]) -> Vec<NaiveDate> {
    let mut per_day: BTreeMap<NaiveDate, (u32, u32)> = BTreeMap::new();
    for instance in instances {
        let (total, completed) = per_day.entry(instance.occurrence_date).or_insert((0, 0));
        *total += 1;
        if instance.completed {
            *completed += 1;
        }
    }
    per_day
        .into_iter()
        .filter(|(_, (total, completed))| *total > 0 && completed == total)
        .map(|(day, _)| day)
        .collect()
}

/// Count of consecutive qualifying days walking backward from `today`.
///
/// Today participates only if it already qualifies; otherwise the walk
/// starts at yesterday, so an unfinished "today" cannot prematurely zero
/// an otherwise-intact streak.
pub fn current_streak(instances: &[OccurrenceInstance], today: NaiveDate) -> u32 {
    let qualifying = qualifying_days(instances);
    let mut day = if qualifying.binary_search(&today).is_ok() {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) => yesterday,
            None => return 0,
        }
    };

    let mut streak = 0u32;
    while qualifying.binary_search(&day).is_ok() {
        streak += 1;
        day = match day.checked_sub_days(Days::new(1)) {
            Some(prev) => prev,
            None => break,
        };
    }
    streak
}

/// Longest run of adjacent qualifying days within the lookback window
/// ending at `today`.
pub fn longest_streak(instances: &[OccurrenceInstance], today: NaiveDate) -> u32 {
    let window_start = today
        .checked_sub_days(Days::new(STREAK_LOOKBACK_DAYS - 1))
        .unwrap_or(NaiveDate::MIN);

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for day in qualifying_days(instances) {
        if day < window_start || day > today {
            continue;
        }
        let adjacent = prev
            .and_then(|p| p.checked_add_days(Days::new(1)))
            .is_some_and(|next| next == day);
        run = if adjacent { run + 1 } else { 1 };
        longest = longest.max(run);
        prev = Some(day);
    }
    longest
}
