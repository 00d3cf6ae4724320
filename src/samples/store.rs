use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};

use crate::calendar::retention_start;
use crate::models::{GlucoseSample, TimeWindow};

pub const DEFAULT_RETENTION_DAYS: u32 = 3;
pub const MAX_RETENTION_DAYS: u32 = 31;

/// Deduplicated samples in ascending timestamp order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedSampleSet {
    samples: Vec<GlucoseSample>,
}

impl SortedSampleSet {
    /// Collapses samples that land on the same whole second (rounded to nearest),
    /// keeping the last one seen, and drops readings that are not finite numbers.
    pub fn from_raw(raw: impl IntoIterator<Item = GlucoseSample>) -> Self {
        let mut by_second: BTreeMap<i64, GlucoseSample> = BTreeMap::new();
        for sample in raw {
            if !sample.value_mgdl.is_finite() {
                continue;
            }
            by_second.insert(sample.second_key(), sample);
        }
        Self {
            samples: by_second.into_values().collect(),
        }
    }

    pub fn as_slice(&self) -> &[GlucoseSample] {
        &self.samples
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlucoseSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&GlucoseSample> {
        self.samples.last()
    }

    pub fn earliest(&self) -> Option<&GlucoseSample> {
        self.samples.first()
    }

    /// Samples inside `window`, honouring its open/closed end.
    pub fn within(&self, window: &TimeWindow) -> &[GlucoseSample] {
        let lo = self
            .samples
            .partition_point(|s| s.timestamp < window.start);
        let hi = if window.is_half_open() {
            self.samples.partition_point(|s| s.timestamp < window.end)
        } else {
            self.samples.partition_point(|s| s.timestamp <= window.end)
        };
        &self.samples[lo..hi.max(lo)]
    }
}

/// Holds the recent raw buffer (a few calendar days). Every ingest replaces the
/// buffer wholesale; there is no merging with what was there before.
#[derive(Debug, Clone)]
pub struct SampleStore {
    current: SortedSampleSet,
    retention_days: u32,
    last_ingest_at: Option<DateTime<Utc>>,
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_DAYS)
    }
}

impl SampleStore {
    pub fn new(retention_days: u32) -> Self {
        Self {
            current: SortedSampleSet::default(),
            retention_days: retention_days.clamp(1, MAX_RETENTION_DAYS),
            last_ingest_at: None,
        }
    }

    pub fn ingest(&mut self, raw: Vec<GlucoseSample>) -> &SortedSampleSet {
        self.current = SortedSampleSet::from_raw(raw);
        &self.current
    }

    /// Ingest and remember when; `at` is only bookkeeping for callers.
    pub fn ingest_at(&mut self, raw: Vec<GlucoseSample>, at: DateTime<Utc>) -> &SortedSampleSet {
        self.last_ingest_at = Some(at);
        self.ingest(raw)
    }

    pub fn samples(&self) -> &SortedSampleSet {
        &self.current
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    pub fn set_retention_days(&mut self, days: u32) {
        self.retention_days = days.clamp(1, MAX_RETENTION_DAYS);
    }

    pub fn last_ingest_at(&self) -> Option<DateTime<Utc>> {
        self.last_ingest_at
    }

    /// The `[start, now]` range the provider should be asked for.
    pub fn fetch_range(
        &self,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        (retention_start(now, offset, self.retention_days), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Offset, TimeZone};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    #[test]
    fn ingest_sorts_and_dedups_last_wins() {
        let base = at(10);
        let raw = vec![
            GlucoseSample::new(at(20), 140.0),
            GlucoseSample::new(base, 100.0),
            GlucoseSample::new(base + Duration::milliseconds(300), 105.0),
            GlucoseSample::new(at(15), 120.0),
        ];

        let mut store = SampleStore::default();
        let set = store.ingest(raw);

        let values: Vec<f64> = set.iter().map(|s| s.value_mgdl).collect();
        assert_eq!(values, vec![105.0, 120.0, 140.0]);
    }

    #[test]
    fn ingest_replaces_previous_buffer() {
        let mut store = SampleStore::default();
        store.ingest(vec![GlucoseSample::new(at(0), 90.0)]);
        store.ingest(vec![GlucoseSample::new(at(5), 95.0)]);

        assert_eq!(store.samples().len(), 1);
        assert_eq!(store.samples().latest().unwrap().value_mgdl, 95.0);
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let set = SortedSampleSet::from_raw(vec![
            GlucoseSample::new(at(0), f64::NAN),
            GlucoseSample::new(at(5), 110.0),
        ]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn within_respects_window_ends() {
        let set = SortedSampleSet::from_raw((0..=288).map(|i| GlucoseSample::new(at(i * 5), 100.0)));

        let day = TimeWindow::calendar_day(at(0));
        assert_eq!(set.within(&day).len(), 288);

        let rolling = TimeWindow::rolling_24h(at(1440));
        assert_eq!(set.within(&rolling).len(), 289);

        let before = TimeWindow::calendar_day(at(-2880));
        assert!(set.within(&before).is_empty());
    }

    #[test]
    fn fetch_range_starts_at_retention_midnight() {
        let store = SampleStore::default();
        let now = Utc.with_ymd_and_hms(2024, 5, 3, 13, 0, 0).unwrap();
        let (start, end) = store.fetch_range(now, Utc.fix());

        assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(end, now);
    }

    #[test]
    fn retention_is_bounded() {
        let mut store = SampleStore::new(u32::MAX);
        assert_eq!(store.retention_days(), MAX_RETENTION_DAYS);
        store.set_retention_days(0);
        assert_eq!(store.retention_days(), 1);
    }
}
