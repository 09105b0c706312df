//! Master records and materialized occurrence instances.
//!
//! Master records (`MasterActivity`, `HabitSlot`) are read-only snapshots
//! supplied by the external CRUD layer. `OccurrenceInstance` is a derived
//! projection for a queried window and is never persisted directly.

use chrono::{Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::recurrence::RecurrenceRule;

/// An inclusive calendar-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range; `end` must not precede `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering a single day.
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Whether the range contains the given day (inclusive on both ends).
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of days in the range.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Iterate every day in the range in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |d| {
            d.checked_add_days(Days::new(1)).filter(|next| *next <= end)
        })
    }
}

/// A recurring (or one-off) activity definition.
///
/// `anchor_date` is immutable post-creation from this engine's point of
/// view; `recurrence` may be changed by the CRUD layer between snapshots.
/// `completed` is the legacy flag mirrored for `None`-recurrence
/// activities; the completion overlay is the source of truth and the two
/// must never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterActivity {
    pub id: String,
    pub title: String,
    pub anchor_date: NaiveDate,
    /// Optional time-of-day; enables starting-soon reminders.
    #[serde(default)]
    pub time_of_day: Option<NaiveTime>,
    pub recurrence: RecurrenceRule,
    /// Legacy completion flag, meaningful only for `None` recurrence.
    #[serde(default)]
    pub completed: bool,
}

impl MasterActivity {
    /// Whether this activity occurs exactly once, on its anchor date.
    pub fn is_singular(&self) -> bool {
        !self.recurrence.is_recurring()
    }
}

/// A daily habit slot.
///
/// Implicitly recurs every calendar day from `anchor_date`, unbounded,
/// with no rule object and no skip conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitSlot {
    pub habit_id: String,
    pub slot_id: String,
    pub title: String,
    pub anchor_date: NaiveDate,
    /// Optional time-of-day; enables starting-soon reminders.
    #[serde(default)]
    pub time_of_day: Option<NaiveTime>,
}

/// A concrete calendar-day materialization of a master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceInstance {
    pub source_id: String,
    pub occurrence_date: NaiveDate,
    /// True for `None`-recurrence activities (single anchor occurrence).
    pub is_singular: bool,
    pub completed: bool,
}
