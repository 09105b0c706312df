//! Sparse per-occurrence completion overlay.
//!
//! The overlay maps `(source_id, date)` to a completion flag layered on
//! top of expansion output; absent entries read as incomplete. Writes are
//! optimistic: every mutation returns a [`CompletionWrite`] capturing the
//! prior state so the caller can roll back if remote persistence fails.
//! The overlay itself performs no I/O.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::OverlayError;
use crate::expand::expand_activity;
use crate::model::{DateRange, HabitSlot, MasterActivity};

/// Record of one overlay mutation, sufficient to undo it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionWrite {
    pub source_id: String,
    pub date: NaiveDate,
    /// Value written by this mutation.
    pub value: bool,
    /// Overlay entry before the write; `None` if the key was absent.
    pub prior: Option<bool>,
    /// Legacy `completed` flag before the write, when one was mirrored.
    pub legacy_prior: Option<bool>,
    /// True when the expander would never generate this date for the
    /// source. The write is still applied; callers may surface it.
    pub anomalous: bool,
}

/// In-memory sparse completion store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionOverlay {
    entries: HashMap<String, HashMap<NaiveDate, bool>>,
}

impl CompletionOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completion flag for an occurrence; absent entries are incomplete.
    pub fn get(&self, source_id: &str, date: NaiveDate) -> bool {
        self.entry(source_id, date).unwrap_or(false)
    }

    /// Raw entry lookup, distinguishing "absent" from "explicitly false".
    pub fn entry(&self, source_id: &str, date: NaiveDate) -> Option<bool> {
        self.entries
            .get(source_id)
            .and_then(|days| days.get(&date))
            .copied()
    }

    /// Number of stored entries across all sources.
    pub fn len(&self) -> usize {
        self.entries.values().map(|days| days.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|days| days.is_empty())
    }

    /// Write an entry, returning the undo record.
    ///
    /// This is the raw write: no anomaly check, and it never touches a
    /// master record, so it could let the overlay disagree with a
    /// singular activity's legacy `completed` flag. It stays
    /// crate-private; callers go through
    /// [`set_occurrence_completion`](Self::set_occurrence_completion) and
    /// [`set_slot_completion`](Self::set_slot_completion), which keep the
    /// two in agreement.
    pub(crate) fn set(&mut self, source_id: &str, date: NaiveDate, value: bool) -> CompletionWrite {
        let prior = self
            .entries
            .entry(source_id.to_string())
            .or_default()
            .insert(date, value);
        CompletionWrite {
            source_id: source_id.to_string(),
            date,
            value,
            prior,
            legacy_prior: None,
            anomalous: false,
        }
    }

    /// Undo a write: restore the prior entry (or remove the key if the
    /// entry was absent before). The legacy flag, if one was mirrored,
    /// must be restored via [`revert_activity`](Self::revert_activity).
    pub fn revert(&mut self, write: &CompletionWrite) {
        match write.prior {
            Some(prev) => {
                self.entries
                    .entry(write.source_id.clone())
                    .or_default()
                    .insert(write.date, prev);
            }
            None => {
                if let Some(days) = self.entries.get_mut(&write.source_id) {
                    days.remove(&write.date);
                }
            }
        }
    }

    /// The sole mutation entry point for activity occurrences.
    ///
    /// For `None`-recurrence activities the legacy `completed` flag on the
    /// master record is updated together with the overlay entry, keeping
    /// the two in agreement. Writes for dates the expander would never
    /// generate are applied but flagged anomalous and logged.
    pub fn set_occurrence_completion(
        &mut self,
        activity: &mut MasterActivity,
        date: NaiveDate,
        value: bool,
    ) -> CompletionWrite {
        let anomalous = expand_activity(activity, DateRange::single(date)).is_empty();
        if anomalous {
            warn!(
                id = %activity.id,
                %date,
                "completion set for a date the expander never generates"
            );
        }

        let mut write = self.set(&activity.id, date, value);
        write.anomalous = anomalous;
        if activity.is_singular() {
            write.legacy_prior = Some(activity.completed);
            activity.completed = value;
        }
        write
    }

    /// Mutation entry point for habit slot occurrences (keyed by slot id).
    pub fn set_slot_completion(
        &mut self,
        slot: &HabitSlot,
        date: NaiveDate,
        value: bool,
    ) -> CompletionWrite {
        let anomalous = date < slot.anchor_date;
        if anomalous {
            warn!(
                slot = %slot.slot_id,
                %date,
                "completion set before the slot's anchor date"
            );
        }
        let mut write = self.set(&slot.slot_id, date, value);
        write.anomalous = anomalous;
        write
    }

    /// Undo an activity write, restoring overlay entry and legacy flag.
    pub fn revert_activity(&mut self, activity: &mut MasterActivity, write: &CompletionWrite) {
        self.revert(write);
        if let Some(prev) = write.legacy_prior {
            activity.completed = prev;
        }
    }

    /// Optimistic-update-then-reconcile: apply the write, hand the undo
    /// record to `persist`, and roll everything back if persistence
    /// fails. Returns the persisted value on success.
    pub fn commit_occurrence_completion<F>(
        &mut self,
        activity: &mut MasterActivity,
        date: NaiveDate,
        value: bool,
        persist: F,
    ) -> Result<bool, OverlayError>
    where
        F: FnOnce(&CompletionWrite) -> Result<(), Box<dyn std::error::Error + Send + Sync>>,
    {
        let write = self.set_occurrence_completion(activity, date, value);
        match persist(&write) {
            Ok(()) => Ok(value),
            Err(source) => {
                self.revert_activity(activity, &write);
                Err(OverlayError::PersistFailed {
                    source_id: activity.id.clone(),
                    date,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::{RecurrenceRule, WeekdaySet};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn singular(id: &str, anchor: NaiveDate) -> MasterActivity {
        MasterActivity {
            id: id.to_string(),
            title: id.to_string(),
            anchor_date: anchor,
            time_of_day: None,
            recurrence: RecurrenceRule::None,
            completed: false,
        }
    }

    fn weekly(id: &str, anchor: NaiveDate, days: &[u8]) -> MasterActivity {
        MasterActivity {
            recurrence: RecurrenceRule::Weekly {
                days_of_week: WeekdaySet::from_days(days.iter().copied()),
                end_date: None,
            },
            ..singular(id, anchor)
        }
    }

    #[test]
    fn absent_entry_reads_false() {
        let overlay = CompletionOverlay::new();
        assert!(!overlay.get("a1", date(2024, 1, 1)));
        assert_eq!(overlay.entry("a1", date(2024, 1, 1)), None);
    }

    #[test]
    fn set_and_revert_restore_absent_key() {
        let mut overlay = CompletionOverlay::new();
        let write = overlay.set("a1", date(2024, 1, 1), true);
        assert!(overlay.get("a1", date(2024, 1, 1)));
        assert_eq!(write.prior, None);

        overlay.revert(&write);
        assert_eq!(overlay.entry("a1", date(2024, 1, 1)), None);
        assert!(overlay.is_empty());
    }

    #[test]
    fn revert_restores_prior_value() {
        let mut overlay = CompletionOverlay::new();
        overlay.set("a1", date(2024, 1, 1), true);
        let write = overlay.set("a1", date(2024, 1, 1), false);
        assert_eq!(write.prior, Some(true));

        overlay.revert(&write);
        assert!(overlay.get("a1", date(2024, 1, 1)));
    }

    #[test]
    fn toggling_one_occurrence_leaves_siblings_untouched() {
        // 2024-01-01 is a Monday; weekly on Mon/Wed
        let mut activity = weekly("w1", date(2024, 1, 1), &[1, 3]);
        let mut overlay = CompletionOverlay::new();
        overlay.set_occurrence_completion(&mut activity, date(2024, 1, 1), true);
        overlay.set_occurrence_completion(&mut activity, date(2024, 1, 3), true);

        overlay.set_occurrence_completion(&mut activity, date(2024, 1, 1), false);

        assert!(!overlay.get("w1", date(2024, 1, 1)));
        assert!(overlay.get("w1", date(2024, 1, 3)));
        assert!(!overlay.get("w1", date(2024, 1, 8)));
    }

    #[test]
    fn singular_write_mirrors_legacy_flag() {
        let mut activity = singular("a1", date(2024, 3, 10));
        let mut overlay = CompletionOverlay::new();

        let write = overlay.set_occurrence_completion(&mut activity, date(2024, 3, 10), true);
        assert!(activity.completed);
        assert!(overlay.get("a1", date(2024, 3, 10)));
        assert_eq!(write.legacy_prior, Some(false));
        assert!(!write.anomalous);

        overlay.revert_activity(&mut activity, &write);
        assert!(!activity.completed);
        assert_eq!(overlay.entry("a1", date(2024, 3, 10)), None);
    }

    #[test]
    fn recurring_write_never_touches_legacy_flag() {
        let mut activity = weekly("w1", date(2024, 1, 1), &[1]);
        let mut overlay = CompletionOverlay::new();
        let write = overlay.set_occurrence_completion(&mut activity, date(2024, 1, 1), true);
        assert!(!activity.completed);
        assert_eq!(write.legacy_prior, None);
    }

    #[test]
    fn never_generated_date_is_flagged_anomalous() {
        let mut activity = weekly("w1", date(2024, 1, 1), &[1]);
        let mut overlay = CompletionOverlay::new();
        // 2024-01-02 is a Tuesday, not in the rule's weekday set.
        let write = overlay.set_occurrence_completion(&mut activity, date(2024, 1, 2), true);
        assert!(write.anomalous);
        // The overlay never rejects the write.
        assert!(overlay.get("w1", date(2024, 1, 2)));
    }

    #[test]
    fn slot_write_before_anchor_is_anomalous() {
        let slot = HabitSlot {
            habit_id: "h1".to_string(),
            slot_id: "s1".to_string(),
            title: "Water".to_string(),
            anchor_date: date(2024, 3, 10),
            time_of_day: None,
        };
        let mut overlay = CompletionOverlay::new();
        let write = overlay.set_slot_completion(&slot, date(2024, 3, 9), true);
        assert!(write.anomalous);
        let write = overlay.set_slot_completion(&slot, date(2024, 3, 10), true);
        assert!(!write.anomalous);
    }

    #[test]
    fn commit_rolls_back_on_persist_failure() {
        let mut activity = singular("a1", date(2024, 3, 10));
        let mut overlay = CompletionOverlay::new();
        overlay.set_occurrence_completion(&mut activity, date(2024, 3, 10), true);
        assert!(activity.completed);

        let result = overlay.commit_occurrence_completion(
            &mut activity,
            date(2024, 3, 10),
            false,
            |_write| Err("network unreachable".into()),
        );

        assert!(matches!(result, Err(OverlayError::PersistFailed { .. })));
        // Rolled back to the last confirmed state on both sides.
        assert!(overlay.get("a1", date(2024, 3, 10)));
        assert!(activity.completed);
    }

    #[test]
    fn commit_returns_persisted_value_on_success() {
        let mut activity = singular("a1", date(2024, 3, 10));
        let mut overlay = CompletionOverlay::new();
        let value = overlay
            .commit_occurrence_completion(&mut activity, date(2024, 3, 10), true, |_| Ok(()))
            .unwrap();
        assert!(value);
        assert!(activity.completed);
    }
}
