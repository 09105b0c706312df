//! Occurrence expansion: the single recurrence walker.
//!
//! Given a master record and an inclusive date window, `expand_*` returns
//! the ascending calendar days the record occurs on. `materialize` layers
//! the completion overlay on top and produces renderer-ready
//! [`OccurrenceInstance`] sequences. Every consumer (calendar window,
//! statistics, reminder scout) goes through this module so recurrence
//! semantics cannot drift between views.
//!
//! Expansion is pure: no wall clock, identical inputs give identical
//! output. Iteration is capped at [`EXPANSION_STEP_CAP`] steps; hitting
//! the cap truncates output rather than erroring.

use chrono::{Datelike, Days, NaiveDate};
use tracing::warn;

use crate::model::{DateRange, HabitSlot, MasterActivity, OccurrenceInstance};
use crate::overlay::CompletionOverlay;
use crate::recurrence::{RecurrenceRule, RuleValidity};

/// Hard bound on expansion loop steps (two leap years of days).
pub const EXPANSION_STEP_CAP: usize = 2 * 366;

/// Expand an activity's occurrence dates within `range`, ascending.
///
/// Degenerate rules (empty weekly set, out-of-range monthly day) produce
/// an empty result and log a warning; they are never an error.
pub fn expand_activity(activity: &MasterActivity, range: DateRange) -> Vec<NaiveDate> {
    match activity.recurrence.validity() {
        RuleValidity::Valid => {}
        RuleValidity::EmptyWeekdaySet => {
            warn!(id = %activity.id, "weekly rule has no weekdays selected; expands to nothing");
            return Vec::new();
        }
        RuleValidity::DayOfMonthOutOfRange(day) => {
            warn!(id = %activity.id, day, "monthly day-of-month out of range; expands to nothing");
            return Vec::new();
        }
    }

    let anchor = activity.anchor_date;
    match &activity.recurrence {
        RecurrenceRule::None => {
            if range.contains(anchor) {
                vec![anchor]
            } else {
                Vec::new()
            }
        }
        RecurrenceRule::Daily { end_date } => {
            walk_days(anchor, range, *end_date, |_| true)
        }
        RecurrenceRule::Weekly {
            days_of_week,
            end_date,
        } => walk_days(anchor, range, *end_date, |day| days_of_week.contains_date(day)),
        RecurrenceRule::Monthly {
            day_of_month,
            end_date,
        } => expand_monthly(anchor, range, *day_of_month, *end_date),
    }
}

/// Expand a habit slot's occurrence dates within `range`, ascending.
///
/// Slots recur every day from their anchor, unbounded.
pub fn expand_habit_slot(slot: &HabitSlot, range: DateRange) -> Vec<NaiveDate> {
    walk_days(slot.anchor_date, range, None, |_| true)
}

/// Day-stepping walk shared by the daily and weekly variants.
fn walk_days<F>(
    anchor: NaiveDate,
    range: DateRange,
    end_date: Option<NaiveDate>,
    include: F,
) -> Vec<NaiveDate>
where
    F: Fn(NaiveDate) -> bool,
{
    let lower = anchor.max(range.start);
    let upper = match end_date {
        Some(end) => range.end.min(end),
        None => range.end,
    };

    let mut out = Vec::new();
    let mut day = lower;
    let mut steps = 0usize;
    while day <= upper {
        if steps >= EXPANSION_STEP_CAP {
            break;
        }
        steps += 1;
        if include(day) {
            out.push(day);
        }
        day = match day.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
    }
    out
}

/// Monthly expansion: one candidate per month overlapping the window.
///
/// A month shorter than `day_of_month` contributes nothing; there is no
/// clamping to the month's last day and no rollover into the next month.
fn expand_monthly(
    anchor: NaiveDate,
    range: DateRange,
    day_of_month: u8,
    end_date: Option<NaiveDate>,
) -> Vec<NaiveDate> {
    let lower = anchor.max(range.start);
    let upper = match end_date {
        Some(end) => range.end.min(end),
        None => range.end,
    };
    if lower > upper {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut year = lower.year();
    let mut month = lower.month();
    let mut steps = 0usize;
    loop {
        if steps >= EXPANSION_STEP_CAP {
            break;
        }
        steps += 1;

        let month_start = match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(d) => d,
            None => break,
        };
        if month_start > upper {
            break;
        }
        // None when the month is shorter than day_of_month: skip it.
        if let Some(target) = NaiveDate::from_ymd_opt(year, month, day_of_month as u32) {
            if target >= lower && target <= upper {
                out.push(target);
            }
        }

        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
    out
}

/// Whether an activity's occurrence on `date` counts as completed.
///
/// The overlay entry wins; for singular activities the legacy flag on the
/// master record fills in when no overlay entry exists.
pub fn occurrence_completed(
    activity: &MasterActivity,
    overlay: &CompletionOverlay,
    date: NaiveDate,
) -> bool {
    overlay
        .entry(&activity.id, date)
        .unwrap_or(activity.is_singular() && activity.completed)
}

/// Whether a habit slot's occurrence on `date` counts as completed.
pub fn slot_completed(slot: &HabitSlot, overlay: &CompletionOverlay, date: NaiveDate) -> bool {
    overlay.get(&slot.slot_id, date)
}

/// Materialize all occurrence instances for a window, overlay applied.
///
/// Output is ordered by date, then by source id for determinism. Habit
/// slot instances use `slot_id` as their `source_id`.
pub fn materialize(
    activities: &[MasterActivity],
    habits: &[HabitSlot],
    overlay: &CompletionOverlay,
    range: DateRange,
) -> Vec<OccurrenceInstance> {
    let mut instances = Vec::new();

    for activity in activities {
        let singular = activity.is_singular();
        for date in expand_activity(activity, range) {
            instances.push(OccurrenceInstance {
                source_id: activity.id.clone(),
                occurrence_date: date,
                is_singular: singular,
                completed: occurrence_completed(activity, overlay, date),
            });
        }
    }

    for slot in habits {
        for date in expand_habit_slot(slot, range) {
            instances.push(OccurrenceInstance {
                source_id: slot.slot_id.clone(),
                occurrence_date: date,
                is_singular: false,
                completed: slot_completed(slot, overlay, date),
            });
        }
    }

    instances.sort_by(|a, b| {
        a.occurrence_date
            .cmp(&b.occurrence_date)
            .then_with(|| a.source_id.cmp(&b.source_id))
    });
    instances
}
