//! Day-of-week aggregation: peak days and failure days.
//!
//! Weekday numbering follows the rest of the engine: 0=Sunday .. 6=Saturday.

use serde::{Deserialize, Serialize};

use crate::model::OccurrenceInstance;
use crate::recurrence::weekday_index;

/// Per-weekday completion counters over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayBreakdown {
    /// Completed occurrences per weekday, 0=Sunday.
    pub completed: [u32; 7],
    /// Incomplete occurrences per weekday, 0=Sunday.
    pub incomplete: [u32; 7],
}

/// Weekday(s) with the most completions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeakDays {
    /// No weekday has any completion.
    NoPeak,
    /// Weekday numbers sharing the maximum completion count, ascending.
    Days { days: Vec<u8> },
}

/// Weekday(s) with the most incomplete occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureDays {
    /// Nothing was scheduled at all in the window.
    NoData,
    /// Everything scheduled was completed; distinct from `NoData`.
    AllComplete,
    /// Weekday numbers sharing the maximum incomplete count, ascending.
    Days { days: Vec<u8> },
}

impl WeekdayBreakdown {
    /// Record one instance.
    pub fn record(&mut self, weekday: u8, completed: bool) {
        let idx = (weekday.min(6)) as usize;
        if completed {
            self.completed[idx] += 1;
        } else {
            self.incomplete[idx] += 1;
        }
    }

    /// Total scheduled occurrences across all weekdays.
    pub fn scheduled(&self) -> u32 {
        self.completed.iter().sum::<u32>() + self.incomplete.iter().sum::<u32>()
    }

    /// Weekday(s) with the maximum completion count, if that maximum is
    /// positive.
    pub fn peak_days(&self) -> PeakDays {
        match days_at_positive_max(&self.completed) {
            Some(days) => PeakDays::Days { days },
            None => PeakDays::NoPeak,
        }
    }

    /// Weekday(s) with the maximum incomplete count. Reports `AllComplete`
    /// when items were scheduled but none missed, and `NoData` when the
    /// window held no scheduled items at all.
    pub fn failure_days(&self) -> FailureDays {
        if self.scheduled() == 0 {
            return FailureDays::NoData;
        }
        match days_at_positive_max(&self.incomplete) {
            Some(days) => FailureDays::Days { days },
            None => FailureDays::AllComplete,
        }
    }
}

/// Indices holding the array maximum, provided that maximum is > 0.
fn days_at_positive_max(counts: &[u32; 7]) -> Option<Vec<u8>> {
    let max = counts.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return None;
    }
    Some(
        counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == max)
            .map(|(i, _)| i as u8)
            .collect(),
    )
}

/// Aggregate a window's instances by weekday.
pub fn weekday_breakdown(instances: &[OccurrenceInstance]) -> WeekdayBreakdown {
    let mut breakdown = WeekdayBreakdown::default();
    for instance in instances {
        breakdown.record(weekday_index(instance.occurrence_date), instance.completed);
    }
    breakdown
}
