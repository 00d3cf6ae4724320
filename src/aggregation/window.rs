use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::calendar::{local_midnight, start_of_day};
use crate::models::{GlucoseStatistics, SampleMoments, TimeWindow, WindowSnapshot};
use crate::samples::SortedSampleSet;

use super::{coverage::coverage_for_count, statistics::compute_statistics, tir::classify_tir, TirThresholds};

/// Runs coverage, TIR and statistics over one window at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowAggregator {
    thresholds: TirThresholds,
}

impl WindowAggregator {
    pub fn new(thresholds: TirThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &TirThresholds {
        &self.thresholds
    }

    pub fn aggregate(&self, window: TimeWindow, samples: &SortedSampleSet) -> WindowSnapshot {
        let in_window = samples.within(&window);
        let coverage = coverage_for_count(window.expected_minutes(), in_window.len());
        let tir = classify_tir(in_window, &coverage, &self.thresholds);

        // A zero-length window reports "no data" rather than statistics over
        // readings it has no time to hold.
        let (statistics, moments) = if coverage.is_degenerate() {
            (GlucoseStatistics::EMPTY, SampleMoments::default())
        } else {
            (compute_statistics(in_window), SampleMoments::from_samples(in_window))
        };

        WindowSnapshot {
            window,
            sample_count: in_window.len(),
            coverage,
            tir,
            statistics,
            moments,
        }
    }

    /// Local midnight up to wall-clock `now`.
    pub fn today_so_far(
        &self,
        samples: &SortedSampleSet,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> WindowSnapshot {
        let window = TimeWindow::today_so_far(local_midnight(now, offset), now);
        self.aggregate(window, samples)
    }

    /// 24 hours ending at the newest sample in the buffer, not at `now`, so a
    /// delayed sensor sync does not make the window look empty. `now` is only
    /// used as the anchor when the buffer holds nothing.
    pub fn rolling_last_24h(&self, samples: &SortedSampleSet, now: DateTime<Utc>) -> WindowSnapshot {
        let anchor = samples.latest().map(|s| s.timestamp).unwrap_or(now);
        self.aggregate(TimeWindow::rolling_24h(anchor), samples)
    }

    pub fn calendar_day(
        &self,
        samples: &SortedSampleSet,
        date: NaiveDate,
        offset: FixedOffset,
    ) -> WindowSnapshot {
        let window = TimeWindow::calendar_day(start_of_day(date, offset));
        self.aggregate(window, samples)
    }
}
