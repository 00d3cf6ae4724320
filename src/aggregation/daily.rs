//! Finalized per-day aggregates and the cache that holds them.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate};

use crate::calendar::days_before;
use crate::models::DailyAggregate;
use crate::samples::SortedSampleSet;

use super::{TirThresholds, WindowAggregator, MAX_PERIOD_DAYS};

/// Runs the calendar-day window over `samples` and freezes the result.
pub fn aggregate_day(
    samples: &SortedSampleSet,
    date: NaiveDate,
    offset: FixedOffset,
    aggregator: &WindowAggregator,
) -> DailyAggregate {
    let snapshot = aggregator.calendar_day(samples, date, offset);
    DailyAggregate::from_snapshot(date, &snapshot)
}

/// Cache of finalized days, keyed by local date.
///
/// Only days strictly before "today" are ever stored. Entries are tied to the
/// thresholds they were classified with and are dropped when those change.
#[derive(Debug, Clone, Default)]
pub struct DailyHistory {
    days: BTreeMap<NaiveDate, DailyAggregate>,
    thresholds: TirThresholds,
}

impl DailyHistory {
    pub fn new(thresholds: TirThresholds) -> Self {
        Self {
            days: BTreeMap::new(),
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &TirThresholds {
        &self.thresholds
    }

    /// Returns `true` if the thresholds changed and the cache was cleared.
    pub fn set_thresholds(&mut self, thresholds: TirThresholds) -> bool {
        if self.thresholds == thresholds {
            return false;
        }
        self.thresholds = thresholds;
        self.days.clear();
        true
    }

    /// Stores an aggregate computed elsewhere, replacing any entry for that date.
    pub fn insert(&mut self, aggregate: DailyAggregate) {
        self.days.insert(aggregate.date, aggregate);
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyAggregate> {
        self.days.get(&date)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn aggregates(&self) -> impl Iterator<Item = &DailyAggregate> {
        self.days.values()
    }

    /// Computes `dates` from `samples` and stores them, overwriting existing
    /// entries. Dates on or after `today` are ignored. Returns how many were stored.
    pub fn record_days(
        &mut self,
        samples: &SortedSampleSet,
        dates: impl IntoIterator<Item = NaiveDate>,
        today: NaiveDate,
        offset: FixedOffset,
    ) -> usize {
        let aggregator = WindowAggregator::new(self.thresholds);
        let mut stored = 0;
        for date in dates.into_iter().filter(|date| *date < today) {
            self.insert(aggregate_day(samples, date, offset, &aggregator));
            stored += 1;
        }
        stored
    }

    /// Dates in `[today - lookback, today)` with no entry, oldest first.
    /// `lookback` is capped at [`MAX_PERIOD_DAYS`].
    pub fn missing_days(&self, today: NaiveDate, lookback: u32) -> Vec<NaiveDate> {
        (1..=lookback.min(MAX_PERIOD_DAYS))
            .rev()
            .map(|back| days_before(today, back))
            .filter(|date| !self.days.contains_key(date))
            .collect()
    }

    /// Drops entries older than `date`.
    pub fn prune_before(&mut self, date: NaiveDate) {
        self.days = self.days.split_off(&date);
    }
}
