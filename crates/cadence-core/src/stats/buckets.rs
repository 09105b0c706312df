//! Day and ISO-week completion buckets for chart rendering.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::OccurrenceInstance;

/// Completion counters for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub total: u32,
    pub completed: u32,
}

impl Bucket {
    /// Record one instance into the bucket.
    pub fn record(&mut self, completed: bool) {
        self.total += 1;
        if completed {
            self.completed += 1;
        }
    }

    /// Completion ratio; an empty bucket is 0, never NaN.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// ISO week key; ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IsoWeekKey {
    pub year: i32,
    pub week: u32,
}

impl IsoWeekKey {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }
}

/// Group instances into per-day buckets, ordered by date.
pub fn bucket_by_day(instances: &[OccurrenceInstance]) -> BTreeMap<NaiveDate, Bucket> {
    let mut buckets: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();
    for instance in instances {
        buckets
            .entry(instance.occurrence_date)
            .or_default()
            .record(instance.completed);
    }
    buckets
}

/// Group instances into per-ISO-week buckets, ordered chronologically.
pub fn bucket_by_iso_week(instances: &[OccurrenceInstance]) -> BTreeMap<IsoWeekKey, Bucket> {
    let mut buckets: BTreeMap<IsoWeekKey, Bucket> = BTreeMap::new();
    for instance in instances {
        buckets
            .entry(IsoWeekKey::of(instance.occurrence_date))
            .or_default()
            .record(instance.completed);
    }
    buckets
}
