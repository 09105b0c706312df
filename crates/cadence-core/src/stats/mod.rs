//! Statistics over materialized occurrence instances.
//!
//! All analytics consume the same [`OccurrenceInstance`] projections the
//! expander produces, so the charts and the calendar can never disagree
//! about what was scheduled. Every function here tolerates empty input by
//! returning zeroed/empty aggregates.
//!
//! [`OccurrenceInstance`]: crate::model::OccurrenceInstance

mod buckets;
mod streaks;
mod weekday;

pub use buckets::{bucket_by_day, bucket_by_iso_week, Bucket, IsoWeekKey};
pub use streaks::{current_streak, longest_streak, qualifying_days, STREAK_LOOKBACK_DAYS};
pub use weekday::{weekday_breakdown, FailureDays, PeakDays, WeekdayBreakdown};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::OccurrenceInstance;

/// Combined statistics report for a window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// Total scheduled occurrences in the window.
    pub total: u32,
    /// Completed occurrences in the window.
    pub completed: u32,
    /// Overall completion ratio; 0 when nothing was scheduled.
    pub completion_rate: f64,
    pub peak_days: PeakDays,
    pub failure_days: FailureDays,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Build the combined report over a window's instances.
///
/// `today` is the evaluation day for streak walking; callers pass it in
/// so the report is deterministic.
pub fn summarize(instances: &[OccurrenceInstance], today: NaiveDate) -> Summary {
    let total = instances.len() as u32;
    let completed = instances.iter().filter(|i| i.completed).count() as u32;
    let completion_rate = if total > 0 {
        completed as f64 / total as f64
    } else {
        0.0
    };
    let breakdown = weekday_breakdown(instances);

    Summary {
        total,
        completed,
        completion_rate,
        peak_days: breakdown.peak_days(),
        failure_days: breakdown.failure_days(),
        current_streak: current_streak(instances, today),
        longest_streak: longest_streak(instances, today),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn instance(id: &str, day: NaiveDate, completed: bool) -> OccurrenceInstance {
        OccurrenceInstance {
            source_id: id.to_string(),
            occurrence_date: day,
            is_singular: false,
            completed,
        }
    }

    #[test]
    fn summarize_empty_input_is_zeroed() {
        let summary = summarize(&[], date(2024, 1, 15));
        assert_eq!(summary.total, 0);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.completion_rate, 0.0);
        assert_eq!(summary.peak_days, PeakDays::NoPeak);
        assert_eq!(summary.failure_days, FailureDays::NoData);
        assert_eq!(summary.current_streak, 0);
        assert_eq!(summary.longest_streak, 0);
    }

    #[test]
    fn summarize_combines_counters() {
        let instances = vec![
            instance("a", date(2024, 1, 15), true),
            instance("b", date(2024, 1, 15), true),
            instance("a", date(2024, 1, 16), false),
            instance("b", date(2024, 1, 16), true),
        ];
        let summary = summarize(&instances, date(2024, 1, 16));
        assert_eq!(summary.total, 4);
        assert_eq!(summary.completed, 3);
        assert!((summary.completion_rate - 0.75).abs() < 1e-9);
        // Jan 15 qualifies, Jan 16 does not; today is skipped, not zeroing.
        assert_eq!(summary.current_streak, 1);
        assert_eq!(summary.longest_streak, 1);
    }
}
