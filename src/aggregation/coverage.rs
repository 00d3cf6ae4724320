use crate::models::{CoverageResult, GlucoseSample, TimeWindow, SAMPLE_INTERVAL_MINUTES};

/// Coverage of `window` by `samples`.
///
/// Each sample inside the window is credited with the nominal interval; the
/// actual gaps between readings are not measured.
pub fn compute_coverage(window: &TimeWindow, samples: &[GlucoseSample]) -> CoverageResult {
    let in_window = samples
        .iter()
        .filter(|s| window.contains(s.timestamp))
        .count();
    coverage_for_count(window.expected_minutes(), in_window)
}

/// Coverage for `sample_count` samples already known to be inside the window.
pub fn coverage_for_count(expected_minutes: u32, sample_count: usize) -> CoverageResult {
    let nominal = u64::try_from(sample_count)
        .unwrap_or(u64::MAX)
        .saturating_mul(u64::from(SAMPLE_INTERVAL_MINUTES));
    let capped = u32::try_from(nominal.min(u64::from(expected_minutes))).unwrap_or(expected_minutes);
    CoverageResult::new(expected_minutes, capped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn midnight() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn today_at_one_pm_with_sixty_samples() {
        let now = midnight() + Duration::hours(13);
        let window = TimeWindow::today_so_far(midnight(), now);
        let samples: Vec<GlucoseSample> = (0..60)
            .map(|i| GlucoseSample::new(midnight() + Duration::minutes(i * 5), 110.0))
            .collect();

        let coverage = compute_coverage(&window, &samples);

        assert_eq!(coverage.expected_minutes, 780);
        assert_eq!(coverage.coverage_minutes, 300);
        assert!((coverage.coverage_ratio - 300.0 / 780.0).abs() < 1e-12);
        assert!((coverage.coverage_ratio - 0.3846).abs() < 1e-4);
        assert!(coverage.is_partial);
    }

    #[test]
    fn full_day_is_complete() {
        let window = TimeWindow::calendar_day(midnight());
        let samples: Vec<GlucoseSample> = (0..288)
            .map(|i| GlucoseSample::new(midnight() + Duration::minutes(i * 5), 100.0))
            .collect();

        let coverage = compute_coverage(&window, &samples);

        assert_eq!(coverage.coverage_minutes, 1440);
        assert_eq!(coverage.coverage_ratio, 1.0);
        assert!(!coverage.is_partial);
    }

    #[test]
    fn empty_window_is_partial_zero() {
        let window = TimeWindow::calendar_day(midnight());
        let coverage = compute_coverage(&window, &[]);

        assert_eq!(coverage.coverage_minutes, 0);
        assert_eq!(coverage.coverage_ratio, 0.0);
        assert!(coverage.is_partial);
    }

    #[test]
    fn degenerate_today_at_midnight() {
        let window = TimeWindow::today_so_far(midnight(), midnight());
        let samples = [GlucoseSample::new(midnight(), 100.0)];
        let coverage = compute_coverage(&window, &samples);

        assert_eq!(coverage.expected_minutes, 0);
        assert_eq!(coverage.coverage_minutes, 0);
        assert_eq!(coverage.coverage_ratio, 0.0);
        assert!(!coverage.is_partial);
    }

    #[test]
    fn samples_outside_window_do_not_count() {
        let window = TimeWindow::calendar_day(midnight());
        let samples = [
            GlucoseSample::new(midnight() - Duration::minutes(5), 100.0),
            GlucoseSample::new(midnight() + Duration::days(1), 100.0),
            GlucoseSample::new(midnight() + Duration::hours(6), 100.0),
        ];

        assert_eq!(compute_coverage(&window, &samples).coverage_minutes, 5);
    }

    #[test]
    fn coverage_never_exceeds_expected() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let elapsed = rng.gen_range(0..=1440);
            let window = TimeWindow::today_so_far(midnight(), midnight() + Duration::minutes(elapsed));
            let count = rng.gen_range(0..600);
            let samples: Vec<GlucoseSample> = (0..count)
                .map(|_| {
                    let offset = rng.gen_range(-60..1500);
                    GlucoseSample::new(midnight() + Duration::minutes(offset), 120.0)
                })
                .collect();

            let coverage = compute_coverage(&window, &samples);
            assert!(coverage.coverage_minutes <= coverage.expected_minutes);
            assert!((0.0..=1.0).contains(&coverage.coverage_ratio));
        }
    }
}
