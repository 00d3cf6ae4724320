//! Multi-day summaries stitched from finalized days and the live today window.
//!
//! Today is contributed only by the today-so-far window. The rolling-24h
//! window overlaps yesterday's calendar day and must never be used here.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::calendar::days_before;
use crate::models::{
    CoverageResult, DailyAggregate, PeriodSummary, SampleMoments, TirBucketMinutes,
    WindowSnapshot, MINUTES_PER_DAY,
};

/// Longest period the settings accept.
pub const MAX_PERIOD_DAYS: u32 = 366;

pub fn build_period<'a>(
    days: u32,
    history: impl IntoIterator<Item = &'a DailyAggregate>,
    today: &WindowSnapshot,
    today_date: NaiveDate,
) -> PeriodSummary {
    let days = days.max(1);
    let past_days = days - 1;
    let first_day = days_before(today_date, past_days);

    let selected: BTreeMap<NaiveDate, &DailyAggregate> = history
        .into_iter()
        .filter(|aggregate| aggregate.date >= first_day && aggregate.date < today_date)
        .map(|aggregate| (aggregate.date, aggregate))
        .collect();

    let mut tir = TirBucketMinutes::default();
    let mut moments = SampleMoments::default();
    let mut coverage_minutes: u32 = 0;
    let mut expected_minutes: u32 = 0;
    for aggregate in selected.values() {
        tir.accumulate(&aggregate.tir);
        moments.merge(&aggregate.moments);
        coverage_minutes = coverage_minutes.saturating_add(aggregate.coverage.coverage_minutes);
        expected_minutes = expected_minutes.saturating_add(aggregate.coverage.expected_minutes);
    }

    // Days with no entry still count as a full day of expected time.
    let calendar_floor = past_days.saturating_mul(MINUTES_PER_DAY);
    expected_minutes = expected_minutes.max(calendar_floor);

    tir.accumulate(&today.tir);
    moments.merge(&today.moments);
    coverage_minutes = coverage_minutes.saturating_add(today.coverage.coverage_minutes);
    expected_minutes = expected_minutes.saturating_add(today.coverage.expected_minutes);

    PeriodSummary {
        days,
        first_day,
        today: today_date,
        history_days: u32::try_from(selected.len()).unwrap_or(u32::MAX),
        coverage: CoverageResult::new(expected_minutes, coverage_minutes),
        tir,
        statistics: moments.statistics(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::WindowAggregator;
    use crate::calendar::start_of_day;
    use crate::models::{GlucoseSample, GlucoseStatistics};
    use crate::samples::SortedSampleSet;
    use chrono::{Duration, Offset, Utc};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn history_day(day: u32, coverage: u32, in_range: u32, high: u32) -> DailyAggregate {
        DailyAggregate {
            date: date(day),
            coverage: CoverageResult::new(MINUTES_PER_DAY, coverage),
            tir: TirBucketMinutes {
                in_range,
                high,
                ..Default::default()
            },
            moments: SampleMoments {
                count: u64::from(coverage / 5),
                sum: f64::from(coverage / 5) * 120.0,
                sum_sq: f64::from(coverage / 5) * 120.0 * 120.0,
                ..Default::default()
            },
        }
    }

    fn today_snapshot(hours: i64, samples: i64, value: f64) -> WindowSnapshot {
        let midnight = start_of_day(date(10), Utc.fix());
        let raw = (0..samples)
            .map(|i| GlucoseSample::new(midnight + Duration::minutes(i * 5), value))
            .collect::<Vec<_>>();
        WindowAggregator::default().today_so_far(
            &SortedSampleSet::from_raw(raw),
            midnight + Duration::hours(hours),
            Utc.fix(),
        )
    }

    #[test]
    fn seven_days_sum_history_plus_today_exactly() {
        let history: Vec<DailyAggregate> =
            (4..=9).map(|d| history_day(d, 1200, 1000, 200)).collect();
        let today = today_snapshot(13, 60, 110.0);

        let period = build_period(7, &history, &today, date(10));

        let expected_tir = 6 * 1200 + today.tir.total();
        assert_eq!(period.tir.total(), expected_tir);
        assert_eq!(period.tir.in_range, 6 * 1000 + 300);
        assert_eq!(period.tir.high, 6 * 200);
        assert_eq!(period.coverage.coverage_minutes, 6 * 1200 + 300);
        assert_eq!(period.coverage.expected_minutes, 6 * 1440 + 780);
        assert_eq!(period.history_days, 6);
        assert_eq!(period.first_day, date(4));
        assert!(period.coverage.is_partial);
    }

    #[test]
    fn missing_days_keep_calendar_expectation() {
        let history = vec![history_day(8, 1440, 1440, 0), history_day(9, 1440, 1440, 0)];
        let today = today_snapshot(6, 0, 0.0);

        let period = build_period(7, &history, &today, date(10));

        assert_eq!(period.history_days, 2);
        assert_eq!(period.coverage.expected_minutes, 6 * 1440 + 360);
        assert_eq!(period.coverage.coverage_minutes, 2 * 1440);
        let ratio = f64::from(2 * 1440) / f64::from(6 * 1440 + 360);
        assert!((period.coverage.coverage_ratio - ratio).abs() < 1e-12);
    }

    #[test]
    fn ignores_days_outside_the_period_and_today_itself() {
        let history = vec![
            history_day(2, 1440, 1440, 0),
            history_day(3, 1440, 1440, 0),
            history_day(9, 600, 600, 0),
            history_day(10, 1440, 0, 1440),
        ];
        let today = today_snapshot(1, 12, 100.0);

        let period = build_period(7, &history, &today, date(10));

        assert_eq!(period.history_days, 1);
        assert_eq!(period.tir.high, 0);
        assert_eq!(period.tir.in_range, 600 + 60);
    }

    #[test]
    fn duplicate_dates_count_once() {
        let history = vec![history_day(9, 600, 600, 0), history_day(9, 600, 600, 0)];
        let today = today_snapshot(1, 0, 0.0);

        let period = build_period(2, &history, &today, date(10));

        assert_eq!(period.tir.in_range, 600);
    }

    #[test]
    fn oversized_period_saturates() {
        let history = vec![history_day(9, 1440, 1440, 0)];
        let today = today_snapshot(1, 12, 100.0);

        let period = build_period(u32::MAX, &history, &today, date(10));

        assert_eq!(period.first_day, NaiveDate::MIN);
        assert_eq!(period.history_days, 1);
        assert_eq!(period.coverage.expected_minutes, u32::MAX);
        assert_eq!(period.tir.in_range, 1440 + 60);
    }

    #[test]
    fn one_day_period_at_midnight_is_empty() {
        let today = today_snapshot(0, 0, 0.0);

        let period = build_period(1, std::iter::empty(), &today, date(10));

        assert_eq!(period.coverage.expected_minutes, 0);
        assert_eq!(period.coverage.coverage_ratio, 0.0);
        assert!(!period.coverage.is_partial);
        assert_eq!(period.statistics, GlucoseStatistics::EMPTY);
    }

    #[test]
    fn pooled_statistics_span_history_and_today() {
        let history = vec![history_day(9, 10, 10, 0)];
        let today = today_snapshot(1, 2, 150.0);

        let period = build_period(2, &history, &today, date(10));

        // two readings at 120 and two at 150
        assert_eq!(period.statistics.mean_mgdl, Some(135.0));
        assert!((period.statistics.sd_mgdl.unwrap() - 15.0).abs() < 1e-9);
    }
}
