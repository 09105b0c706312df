//! Recurrence rules for master records.
//!
//! A rule describes how an activity repeats on the calendar:
//! - **None**: a one-off on its anchor date
//! - **Daily**: every calendar day from the anchor
//! - **Weekly**: on a fixed set of weekdays
//! - **Monthly**: on a fixed day-of-month
//!
//! Weekdays use the backend's numbering: 0=Sunday .. 6=Saturday. All
//! recurring variants carry an optional inclusive end date. Degenerate
//! rules (empty weekday set, day-of-month outside 1..=31) are not errors;
//! they expand to zero occurrences.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Index of a date's weekday in the 0=Sunday .. 6=Saturday numbering.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// A set of weekdays, 0=Sunday .. 6=Saturday.
///
/// Serialized as a plain list of day numbers to match the wire shape of
/// the surrounding application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<u8>", into = "Vec<u8>")]
pub struct WeekdaySet {
    bits: u8,
}

impl WeekdaySet {
    /// The empty set.
    pub fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Build a set from day numbers; values outside 0..=6 are ignored.
    pub fn from_days<I: IntoIterator<Item = u8>>(days: I) -> Self {
        let mut bits = 0u8;
        for day in days {
            if day <= 6 {
                bits |= 1 << day;
            }
        }
        Self { bits }
    }

    /// Whether the set contains the given day number.
    pub fn contains(&self, day: u8) -> bool {
        day <= 6 && self.bits & (1 << day) != 0
    }

    /// Whether the set contains the weekday of the given date.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.contains(weekday_index(date))
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Number of weekdays in the set.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Day numbers in ascending order.
    pub fn days(&self) -> Vec<u8> {
        (0u8..=6).filter(|d| self.contains(*d)).collect()
    }
}

impl From<Vec<u8>> for WeekdaySet {
    fn from(days: Vec<u8>) -> Self {
        Self::from_days(days)
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.days()
    }
}

/// Recurrence rule attached to a master activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceRule {
    /// One-off: the activity occurs only on its anchor date.
    None,
    /// Every calendar day from the anchor date.
    Daily {
        #[serde(default)]
        end_date: Option<NaiveDate>,
    },
    /// On the given weekdays.
    Weekly {
        days_of_week: WeekdaySet,
        #[serde(default)]
        end_date: Option<NaiveDate>,
    },
    /// On the given day of the month. Months shorter than `day_of_month`
    /// are skipped entirely, never clamped.
    Monthly {
        day_of_month: u8,
        #[serde(default)]
        end_date: Option<NaiveDate>,
    },
}

/// Outcome of checking a rule for degenerate shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleValidity {
    /// Rule can produce occurrences.
    Valid,
    /// Weekly rule with no weekdays selected.
    EmptyWeekdaySet,
    /// Monthly rule whose day can never fall inside a month.
    DayOfMonthOutOfRange(u8),
}

impl RuleValidity {
    /// Whether the rule expands to zero occurrences by construction.
    pub fn is_degenerate(&self) -> bool {
        !matches!(self, RuleValidity::Valid)
    }
}

impl RecurrenceRule {
    /// Inclusive end date, if the rule carries one.
    pub fn end_date(&self) -> Option<NaiveDate> {
        match self {
            RecurrenceRule::None => None,
            RecurrenceRule::Daily { end_date }
            | RecurrenceRule::Weekly { end_date, .. }
            | RecurrenceRule::Monthly { end_date, .. } => *end_date,
        }
    }

    /// Whether the rule produces more than a single anchor occurrence.
    pub fn is_recurring(&self) -> bool {
        !matches!(self, RecurrenceRule::None)
    }

    /// Check for degenerate shapes that expand to nothing.
    pub fn validity(&self) -> RuleValidity {
        match self {
            RecurrenceRule::Weekly { days_of_week, .. } if days_of_week.is_empty() => {
                RuleValidity::EmptyWeekdaySet
            }
            RecurrenceRule::Monthly { day_of_month, .. }
                if *day_of_month < 1 || *day_of_month > 31 =>
            {
                RuleValidity::DayOfMonthOutOfRange(*day_of_month)
            }
            _ => RuleValidity::Valid,
        }
    }

    /// Human-readable label for UI chips.
    pub fn describe(&self) -> String {
        const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
        match self {
            RecurrenceRule::None => "Once".to_string(),
            RecurrenceRule::Daily { .. } => "Every day".to_string(),
            RecurrenceRule::Weekly { days_of_week, .. } => {
                if days_of_week.is_empty() {
                    "Weekly (no days selected)".to_string()
                } else {
                    let names: Vec<&str> = days_of_week
                        .days()
                        .into_iter()
                        .map(|d| DAY_NAMES[d as usize])
                        .collect();
                    format!("Weekly on {}", names.join(", "))
                }
            }
            RecurrenceRule::Monthly { day_of_month, .. } => {
                format!("Monthly on day {}", day_of_month)
            }
        }
    }
}
