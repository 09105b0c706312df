//! # Cadence Core Library
//!
//! This library provides the recurrence and analytics engine for Cadence,
//! an activity and habit tracker. The surrounding application (CRUD
//! persistence, auth, rendering, notification delivery) supplies read-only
//! snapshots and consumes derived views; everything here is in-memory and
//! works in local calendar days by design.
//!
//! ## Architecture
//!
//! - **Expansion**: one pure recurrence walker materializes calendar-day
//!   occurrences for any requested window; every consumer (calendar,
//!   statistics, reminders) shares it
//! - **Overlay**: sparse per-occurrence completion state with optimistic
//!   writes and rollback records for failed remote persistence
//! - **Statistics**: completion buckets, weekday peak/failure days, and
//!   streaks over the same materialized instances
//! - **Reminders**: a stateful scout with per-day dedup and confirm-after-
//!   dispatch semantics; the wall clock is always passed in
//!
//! ## Key Components
//!
//! - [`RecurrenceRule`]: how a master record repeats
//! - [`expand::materialize`]: window expansion with the overlay applied
//! - [`CompletionOverlay`]: the sole mutation surface
//! - [`stats::summarize`]: combined analytics report
//! - [`NotificationScout`]: reminder evaluation ticks

pub mod error;
pub mod expand;
pub mod model;
pub mod notify;
pub mod overlay;
pub mod recurrence;
pub mod stats;

pub use error::{CoreError, OverlayError, Result, ValidationError};
pub use expand::{expand_activity, expand_habit_slot, materialize, EXPANSION_STEP_CAP};
pub use model::{DateRange, HabitSlot, MasterActivity, OccurrenceInstance};
pub use notify::{NotificationScout, Reminder, ReminderKey, ReminderKind, ScoutConfig};
pub use overlay::{CompletionOverlay, CompletionWrite};
pub use recurrence::{RecurrenceRule, RuleValidity, WeekdaySet};
pub use stats::{
    bucket_by_day, bucket_by_iso_week, current_streak, longest_streak, summarize, Bucket,
    FailureDays, PeakDays, Summary, WeekdayBreakdown,
};
