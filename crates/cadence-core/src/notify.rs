//! Reminder evaluation for upcoming and starting-soon occurrences.
//!
//! The scout owns the only mutable state in the engine: the set of
//! reminder keys already dispatched today and the day marker that resets
//! it at local-midnight rollover. Evaluation is driven by the host on a
//! polling interval; `now` is always passed in, so ticks are fully
//! deterministic under test.
//!
//! Dispatch is external. `evaluate` offers reminders without recording
//! them; the host calls [`NotificationScout::confirm_dispatched`] after
//! delivery succeeds, so a failed delivery is re-offered on the next tick
//! instead of being silently swallowed.

use std::collections::HashSet;

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::expand::{expand_activity, occurrence_completed, slot_completed};
use crate::model::{DateRange, HabitSlot, MasterActivity};
use crate::overlay::CompletionOverlay;
use crate::recurrence::RecurrenceRule;

/// What a reminder is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReminderKind {
    /// The occurrence starts within its lead window.
    StartingSoon,
    /// The occurrence is `days_before` days away.
    Advance { days_before: u8 },
}

/// Dedup key: one reminder per entity, occurrence day and kind per day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderKey {
    pub entity_id: String,
    pub occurrence_date: NaiveDate,
    pub kind: ReminderKind,
}

/// A reminder offered to the host's dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub key: ReminderKey,
    pub title: String,
    pub body: String,
}

/// Everything the formatter may draw on when building title and body.
#[derive(Debug, Clone)]
pub struct ReminderContext<'a> {
    pub entity_id: &'a str,
    pub title: &'a str,
    pub occurrence_date: NaiveDate,
    pub kind: ReminderKind,
    /// Minutes until start, for starting-soon reminders.
    pub minutes_until: Option<i64>,
}

/// Caller-suppliable (title, body) builder.
pub type ReminderFormatter = Box<dyn Fn(&ReminderContext<'_>) -> (String, String) + Send>;

/// Scout configuration: lead windows and advance schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoutConfig {
    /// Starting-soon window for activities, minutes before start.
    pub activity_lead_minutes: i64,
    /// Starting-soon window for habit slots, minutes before start.
    pub slot_lead_minutes: i64,
    /// Days-before leads for weekly recurrences.
    pub weekly_advance_days: Vec<u8>,
    /// Days-before leads for monthly recurrences.
    pub monthly_advance_days: Vec<u8>,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            activity_lead_minutes: 5,
            slot_lead_minutes: 10,
            weekly_advance_days: vec![1],
            monthly_advance_days: vec![7, 2, 1],
        }
    }
}

/// Stateful reminder scout.
pub struct NotificationScout {
    config: ScoutConfig,
    /// Keys confirmed dispatched since the last day rollover.
    dispatched: HashSet<ReminderKey>,
    last_checked_day: Option<NaiveDate>,
    formatter: Option<ReminderFormatter>,
}

impl NotificationScout {
    /// Create a scout with default lead windows.
    pub fn new() -> Self {
        Self::with_config(ScoutConfig::default())
    }

    /// Create with custom config.
    pub fn with_config(config: ScoutConfig) -> Self {
        Self {
            config,
            dispatched: HashSet::new(),
            last_checked_day: None,
            formatter: None,
        }
    }

    /// Replace the default (title, body) formatting.
    pub fn with_formatter(mut self, formatter: ReminderFormatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    /// Record a key as dispatched; it will not be offered again today.
    ///
    /// Call this only after delivery succeeded, so a failed dispatch is
    /// retried on the next tick.
    pub fn confirm_dispatched(&mut self, key: &ReminderKey) {
        self.dispatched.insert(key.clone());
    }

    /// One evaluation tick.
    ///
    /// Resets the dedup set when `now` has crossed into a new calendar
    /// day (marker and set are updated together, never partially), then
    /// offers every due, uncompleted, not-yet-confirmed reminder.
    pub fn evaluate(
        &mut self,
        now: NaiveDateTime,
        activities: &[MasterActivity],
        habits: &[HabitSlot],
        overlay: &CompletionOverlay,
    ) -> Vec<Reminder> {
        let today = now.date();
        if self.last_checked_day != Some(today) {
            self.dispatched = HashSet::new();
            self.last_checked_day = Some(today);
        }

        let mut offered = Vec::new();
        self.collect_starting_soon(now, activities, habits, overlay, &mut offered);
        self.collect_advance(today, activities, overlay, &mut offered);
        offered
    }

    fn collect_starting_soon(
        &self,
        now: NaiveDateTime,
        activities: &[MasterActivity],
        habits: &[HabitSlot],
        overlay: &CompletionOverlay,
        out: &mut Vec<Reminder>,
    ) {
        let today = now.date();

        for activity in activities {
            let Some(time) = activity.time_of_day else {
                continue;
            };
            if expand_activity(activity, DateRange::single(today)).is_empty() {
                continue;
            }
            if occurrence_completed(activity, overlay, today) {
                continue;
            }
            // Compare in seconds: minute truncation would leak the window
            // by up to 59 seconds on both edges.
            let seconds_until = (today.and_time(time) - now).num_seconds();
            if !(0..=self.config.activity_lead_minutes * 60).contains(&seconds_until) {
                continue;
            }
            self.offer(
                out,
                ReminderKey {
                    entity_id: activity.id.clone(),
                    occurrence_date: today,
                    kind: ReminderKind::StartingSoon,
                },
                &activity.title,
                Some(seconds_until / 60),
            );
        }

        for slot in habits {
            let Some(time) = slot.time_of_day else {
                continue;
            };
            if today < slot.anchor_date {
                continue;
            }
            if slot_completed(slot, overlay, today) {
                continue;
            }
            let seconds_until = (today.and_time(time) - now).num_seconds();
            if !(0..=self.config.slot_lead_minutes * 60).contains(&seconds_until) {
                continue;
            }
            self.offer(
                out,
                ReminderKey {
                    entity_id: slot.slot_id.clone(),
                    occurrence_date: today,
                    kind: ReminderKind::StartingSoon,
                },
                &slot.title,
                Some(seconds_until / 60),
            );
        }
    }

    fn collect_advance(
        &self,
        today: NaiveDate,
        activities: &[MasterActivity],
        overlay: &CompletionOverlay,
        out: &mut Vec<Reminder>,
    ) {
        for activity in activities {
            let leads = match &activity.recurrence {
                RecurrenceRule::Weekly { .. } => &self.config.weekly_advance_days,
                RecurrenceRule::Monthly { .. } => &self.config.monthly_advance_days,
                _ => continue,
            };
            for &lead in leads {
                let Some(target) = today.checked_add_days(Days::new(lead as u64)) else {
                    continue;
                };
                if expand_activity(activity, DateRange::single(target)).is_empty() {
                    continue;
                }
                if occurrence_completed(activity, overlay, target) {
                    continue;
                }
                self.offer(
                    out,
                    ReminderKey {
                        entity_id: activity.id.clone(),
                        occurrence_date: target,
                        kind: ReminderKind::Advance { days_before: lead },
                    },
                    &activity.title,
                    None,
                );
            }
        }
    }

    fn offer(
        &self,
        out: &mut Vec<Reminder>,
        key: ReminderKey,
        title: &str,
        minutes_until: Option<i64>,
    ) {
        if self.dispatched.contains(&key) {
            return;
        }
        let context = ReminderContext {
            entity_id: &key.entity_id,
            title,
            occurrence_date: key.occurrence_date,
            kind: key.kind,
            minutes_until,
        };
        let (title, body) = match &self.formatter {
            Some(format) => format(&context),
            None => default_format(&context),
        };
        out.push(Reminder { key, title, body });
    }
}

impl Default for NotificationScout {
    fn default() -> Self {
        Self::new()
    }
}

fn default_format(context: &ReminderContext<'_>) -> (String, String) {
    match context.kind {
        ReminderKind::StartingSoon => {
            let body = match context.minutes_until {
                Some(0) => "Starting now".to_string(),
                Some(1) => "Starting in 1 minute".to_string(),
                Some(minutes) => format!("Starting in {} minutes", minutes),
                None => "Starting soon".to_string(),
            };
            (context.title.to_string(), body)
        }
        ReminderKind::Advance { days_before } => {
            let body = if days_before == 1 {
                format!("Coming up tomorrow ({})", context.occurrence_date)
            } else {
                format!(
                    "Coming up in {} days ({})",
                    days_before, context.occurrence_date
                )
            };
            (context.title.to_string(), body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::WeekdaySet;
    use chrono::NaiveTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(day: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
        day.and_time(NaiveTime::from_hms_opt(h, min, 0).unwrap())
    }

    fn timed_daily(id: &str, anchor: NaiveDate, h: u32, min: u32) -> MasterActivity {
        MasterActivity {
            id: id.to_string(),
            title: id.to_string(),
            anchor_date: anchor,
            time_of_day: NaiveTime::from_hms_opt(h, min, 0),
            recurrence: RecurrenceRule::Daily { end_date: None },
            completed: false,
        }
    }

    fn slot(id: &str, anchor: NaiveDate, h: u32, min: u32) -> HabitSlot {
        HabitSlot {
            habit_id: "h1".to_string(),
            slot_id: id.to_string(),
            title: id.to_string(),
            anchor_date: anchor,
            time_of_day: NaiveTime::from_hms_opt(h, min, 0),
        }
    }

    #[test]
    fn starting_soon_fires_inside_activity_window() {
        let mut scout = NotificationScout::new();
        let activity = timed_daily("a1", date(2024, 1, 1), 9, 0);
        let overlay = CompletionOverlay::new();

        // 4 minutes before: inside the 5-minute window.
        let offered = scout.evaluate(at(date(2024, 1, 15), 8, 56), &[activity.clone()], &[], &overlay);
        assert_eq!(offered.len(), 1);
        assert_eq!(offered[0].key.kind, ReminderKind::StartingSoon);
        assert_eq!(offered[0].title, "a1");

        // 6 minutes before: outside.
        let mut scout = NotificationScout::new();
        let offered = scout.evaluate(at(date(2024, 1, 15), 8, 54), &[activity.clone()], &[], &overlay);
        assert!(offered.is_empty());

        // After the scheduled instant: no fire.
        let mut scout = NotificationScout::new();
        let offered = scout.evaluate(at(date(2024, 1, 15), 9, 1), &[activity], &[], &overlay);
        assert!(offered.is_empty());
    }

    #[test]
    fn starting_soon_window_is_second_precise() {
        let activity = timed_daily("a1", date(2024, 1, 1), 9, 0);
        let overlay = CompletionOverlay::new();
        let day = date(2024, 1, 15);
        let at_secs = |h, m, s| day.and_time(NaiveTime::from_hms_opt(h, m, s).unwrap());

        // 30 seconds past the scheduled instant: a negative sub-minute
        // delta must not round to "starting now".
        let mut scout = NotificationScout::new();
        assert!(scout
            .evaluate(at_secs(9, 0, 30), &[activity.clone()], &[], &overlay)
            .is_empty());

        // 5.5 minutes early: still outside a 5-minute window.
        let mut scout = NotificationScout::new();
        assert!(scout
            .evaluate(at_secs(8, 54, 30), &[activity.clone()], &[], &overlay)
            .is_empty());

        // Both boundaries are inclusive: exactly 5 minutes before and
        // exactly on the instant.
        let mut scout = NotificationScout::new();
        assert_eq!(
            scout
                .evaluate(at_secs(8, 55, 0), &[activity.clone()], &[], &overlay)
                .len(),
            1
        );
        let mut scout = NotificationScout::new();
        let offered = scout.evaluate(at_secs(9, 0, 0), &[activity], &[], &overlay);
        assert_eq!(offered.len(), 1);
        assert_eq!(offered[0].body, "Starting now");
    }

    #[test]
    fn slot_window_is_second_precise() {
        let s = slot("s1", date(2024, 1, 1), 9, 0);
        let overlay = CompletionOverlay::new();
        let day = date(2024, 1, 15);
        let at_secs = |h, m, sec| day.and_time(NaiveTime::from_hms_opt(h, m, sec).unwrap());

        // 10.5 minutes early: outside the 10-minute slot window.
        let mut scout = NotificationScout::new();
        assert!(scout
            .evaluate(at_secs(8, 49, 30), &[], &[s.clone()], &overlay)
            .is_empty());

        // 15 seconds past the instant: no fire.
        let mut scout = NotificationScout::new();
        assert!(scout
            .evaluate(at_secs(9, 0, 15), &[], &[s], &overlay)
            .is_empty());
    }

    #[test]
    fn slots_use_the_wider_window() {
        let mut scout = NotificationScout::new();
        let s = slot("s1", date(2024, 1, 1), 9, 0);
        let overlay = CompletionOverlay::new();

        // 8 minutes before: inside the 10-minute slot window.
        let offered = scout.evaluate(at(date(2024, 1, 15), 8, 52), &[], &[s], &overlay);
        assert_eq!(offered.len(), 1);
    }

    #[test]
    fn completed_occurrence_never_fires() {
        let mut scout = NotificationScout::new();
        let activity = timed_daily("a1", date(2024, 1, 1), 9, 0);
        let mut overlay = CompletionOverlay::new();
        overlay.set("a1", date(2024, 1, 15), true);

        let offered = scout.evaluate(at(date(2024, 1, 15), 8, 58), &[activity], &[], &overlay);
        assert!(offered.is_empty());
    }

    #[test]
    fn confirmed_key_is_deduped_within_the_day() {
        let mut scout = NotificationScout::new();
        let activity = timed_daily("a1", date(2024, 1, 1), 9, 0);
        let overlay = CompletionOverlay::new();

        let offered = scout.evaluate(at(date(2024, 1, 15), 8, 56), &[activity.clone()], &[], &overlay);
        assert_eq!(offered.len(), 1);
        scout.confirm_dispatched(&offered[0].key);

        let again = scout.evaluate(at(date(2024, 1, 15), 8, 57), &[activity], &[], &overlay);
        assert!(again.is_empty());
    }

    #[test]
    fn unconfirmed_key_is_offered_again() {
        let mut scout = NotificationScout::new();
        let activity = timed_daily("a1", date(2024, 1, 1), 9, 0);
        let overlay = CompletionOverlay::new();

        let first = scout.evaluate(at(date(2024, 1, 15), 8, 56), &[activity.clone()], &[], &overlay);
        assert_eq!(first.len(), 1);
        // Delivery failed: no confirm. The next tick re-offers.
        let second = scout.evaluate(at(date(2024, 1, 15), 8, 57), &[activity], &[], &overlay);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].key, second[0].key);
    }

    #[test]
    fn dedup_set_resets_at_day_rollover() {
        let mut scout = NotificationScout::new();
        // Weekly on Mondays; 2024-01-08 is a Monday.
        let activity = MasterActivity {
            id: "w1".to_string(),
            title: "Gym".to_string(),
            anchor_date: date(2024, 1, 1),
            time_of_day: None,
            recurrence: RecurrenceRule::Weekly {
                days_of_week: WeekdaySet::from_days([1]),
                end_date: None,
            },
            completed: false,
        };
        let overlay = CompletionOverlay::new();

        // Sunday: 1-day advance reminder for Monday.
        let sunday = scout.evaluate(at(date(2024, 1, 7), 10, 0), &[activity.clone()], &[], &overlay);
        assert_eq!(sunday.len(), 1);
        assert_eq!(
            sunday[0].key.kind,
            ReminderKind::Advance { days_before: 1 }
        );
        scout.confirm_dispatched(&sunday[0].key);

        // Later the same day: deduped.
        let later = scout.evaluate(at(date(2024, 1, 7), 18, 0), &[activity.clone()], &[], &overlay);
        assert!(later.is_empty());

        // Next Sunday: a fresh day, the set has been reset.
        let next_week = scout.evaluate(at(date(2024, 1, 14), 10, 0), &[activity], &[], &overlay);
        assert_eq!(next_week.len(), 1);
    }

    #[test]
    fn monthly_advance_fires_at_each_lead() {
        let mut scout = NotificationScout::new();
        let activity = MasterActivity {
            id: "m1".to_string(),
            title: "Rent".to_string(),
            anchor_date: date(2024, 1, 1),
            time_of_day: None,
            recurrence: RecurrenceRule::Monthly {
                day_of_month: 15,
                end_date: None,
            },
            completed: false,
        };
        let overlay = CompletionOverlay::new();

        for (day, lead) in [(8u32, 7u8), (13, 2), (14, 1)] {
            let offered = scout.evaluate(at(date(2024, 1, day), 10, 0), &[activity.clone()], &[], &overlay);
            assert_eq!(offered.len(), 1, "lead {} should fire", lead);
            assert_eq!(
                offered[0].key.kind,
                ReminderKind::Advance { days_before: lead }
            );
            assert_eq!(offered[0].key.occurrence_date, date(2024, 1, 15));
        }

        // A day with no configured lead distance stays quiet.
        let quiet = scout.evaluate(at(date(2024, 1, 10), 10, 0), &[activity], &[], &overlay);
        assert!(quiet.is_empty());
    }

    #[test]
    fn custom_formatter_is_used() {
        let mut scout = NotificationScout::new().with_formatter(Box::new(|ctx| {
            (format!("!{}", ctx.title), "custom".to_string())
        }));
        let activity = timed_daily("a1", date(2024, 1, 1), 9, 0);
        let overlay = CompletionOverlay::new();

        let offered = scout.evaluate(at(date(2024, 1, 15), 8, 58), &[activity], &[], &overlay);
        assert_eq!(offered[0].title, "!a1");
        assert_eq!(offered[0].body, "custom");
    }
}
