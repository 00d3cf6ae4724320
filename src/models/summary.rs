//! Derived summary types: coverage, time-in-range buckets, statistics and the
//! per-window, per-day and per-period snapshots built from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{sample::GlucoseSample, window::TimeWindow};

/// GMI (%) = 3.31 + 0.02392 × mean glucose in mg/dL.
const GMI_INTERCEPT: f64 = 3.31;
const GMI_SLOPE: f64 = 0.02392;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageResult {
    pub expected_minutes: u32,
    /// Always `<= expected_minutes`.
    pub coverage_minutes: u32,
    /// Always within `[0, 1]`.
    pub coverage_ratio: f64,
    pub is_partial: bool,
}

impl CoverageResult {
    pub fn new(expected_minutes: u32, coverage_minutes: u32) -> Self {
        let coverage_minutes = coverage_minutes.min(expected_minutes);
        let ratio = f64::from(coverage_minutes) / f64::from(expected_minutes.max(1));
        Self {
            expected_minutes,
            coverage_minutes,
            coverage_ratio: ratio.clamp(0.0, 1.0),
            is_partial: coverage_minutes < expected_minutes,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.expected_minutes == 0
    }
}

/// The five clinical glycemic bands, ordered from lowest to highest glucose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GlycemicBand {
    VeryLow,
    Low,
    InRange,
    High,
    VeryHigh,
}

impl GlycemicBand {
    pub const ALL: [GlycemicBand; 5] = [
        GlycemicBand::VeryLow,
        GlycemicBand::Low,
        GlycemicBand::InRange,
        GlycemicBand::High,
        GlycemicBand::VeryHigh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GlycemicBand::VeryLow => "veryLow",
            GlycemicBand::Low => "low",
            GlycemicBand::InRange => "inRange",
            GlycemicBand::High => "high",
            GlycemicBand::VeryHigh => "veryHigh",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TirBucketMinutes {
    pub very_low: u32,
    pub low: u32,
    pub in_range: u32,
    pub high: u32,
    pub very_high: u32,
}

impl TirBucketMinutes {
    pub fn total(&self) -> u32 {
        GlycemicBand::ALL
            .iter()
            .fold(0u32, |acc, band| acc.saturating_add(self.minutes(*band)))
    }

    pub fn minutes(&self, band: GlycemicBand) -> u32 {
        match band {
            GlycemicBand::VeryLow => self.very_low,
            GlycemicBand::Low => self.low,
            GlycemicBand::InRange => self.in_range,
            GlycemicBand::High => self.high,
            GlycemicBand::VeryHigh => self.very_high,
        }
    }

    pub fn minutes_mut(&mut self, band: GlycemicBand) -> &mut u32 {
        match band {
            GlycemicBand::VeryLow => &mut self.very_low,
            GlycemicBand::Low => &mut self.low,
            GlycemicBand::InRange => &mut self.in_range,
            GlycemicBand::High => &mut self.high,
            GlycemicBand::VeryHigh => &mut self.very_high,
        }
    }

    pub fn accumulate(&mut self, other: &TirBucketMinutes) {
        for band in GlycemicBand::ALL {
            let slot = self.minutes_mut(band);
            *slot = slot.saturating_add(other.minutes(band));
        }
    }

    /// Each band as a share of `coverage_minutes`. `None` when nothing was covered.
    pub fn percentages(&self, coverage_minutes: u32) -> Option<TirPercentages> {
        if coverage_minutes == 0 {
            return None;
        }
        let denom = f64::from(coverage_minutes);
        let pct = |minutes: u32| f64::from(minutes) / denom * 100.0;
        Some(TirPercentages {
            very_low: pct(self.very_low),
            low: pct(self.low),
            in_range: pct(self.in_range),
            high: pct(self.high),
            very_high: pct(self.very_high),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TirPercentages {
    pub very_low: f64,
    pub low: f64,
    pub in_range: f64,
    pub high: f64,
    pub very_high: f64,
}

/// `None` means "no data", which the presentation layer must render
/// differently from a zero value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlucoseStatistics {
    pub mean_mgdl: Option<f64>,
    pub sd_mgdl: Option<f64>,
    pub cv_percent: Option<f64>,
    pub gmi_percent: Option<f64>,
}

impl GlucoseStatistics {
    pub const EMPTY: GlucoseStatistics = GlucoseStatistics {
        mean_mgdl: None,
        sd_mgdl: None,
        cv_percent: None,
        gmi_percent: None,
    };

    /// Derives CV and GMI from a mean and a standard deviation.
    pub fn from_mean_sd(mean_mgdl: Option<f64>, sd_mgdl: Option<f64>) -> Self {
        let cv_percent = match (mean_mgdl, sd_mgdl) {
            (Some(mean), Some(sd)) if mean > 0.0 => Some(sd / mean * 100.0),
            _ => None,
        };
        Self {
            mean_mgdl,
            sd_mgdl,
            cv_percent,
            gmi_percent: mean_mgdl.map(|mean| GMI_INTERCEPT + GMI_SLOPE * mean),
        }
    }
}

/// Running sums that let statistics be pooled across windows without keeping
/// the raw samples around.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleMoments {
    pub count: u64,
    pub sum: f64,
    pub sum_sq: f64,
    /// Extremes let a constant series report an exact zero spread.
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl SampleMoments {
    pub fn from_samples(samples: &[GlucoseSample]) -> Self {
        samples.iter().fold(Self::default(), |mut acc, sample| {
            acc.count += 1;
            acc.sum += sample.value_mgdl;
            acc.sum_sq += sample.value_mgdl * sample.value_mgdl;
            acc.min = Some(acc.min.map_or(sample.value_mgdl, |m| m.min(sample.value_mgdl)));
            acc.max = Some(acc.max.map_or(sample.value_mgdl, |m| m.max(sample.value_mgdl)));
            acc
        })
    }

    pub fn merge(&mut self, other: &SampleMoments) {
        // Extremes survive only if both sides tracked them.
        let (min, max) = if !self.has_extremes() || !other.has_extremes() {
            (None, None)
        } else {
            (
                combine(self.min, other.min, f64::min),
                combine(self.max, other.max, f64::max),
            )
        };
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.min = min;
        self.max = max;
    }

    fn has_extremes(&self) -> bool {
        self.count == 0 || (self.min.is_some() && self.max.is_some())
    }

    /// The single value every pooled sample shares, if there is one.
    fn constant_value(&self) -> Option<f64> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min == max => Some(min),
            _ => None,
        }
    }

    /// Population statistics over the pooled samples, with the same
    /// sample-count rules as the per-window calculation.
    pub fn statistics(&self) -> GlucoseStatistics {
        if self.count == 0 {
            return GlucoseStatistics::EMPTY;
        }
        if let Some(value) = self.constant_value() {
            return GlucoseStatistics::from_mean_sd(Some(value), (self.count >= 2).then_some(0.0));
        }
        let n = self.count as f64;
        let mean = self.sum / n;
        let sd = (self.count >= 2).then(|| (self.sum_sq / n - mean * mean).max(0.0).sqrt());
        GlucoseStatistics::from_mean_sd(Some(mean), sd)
    }
}

fn combine(a: Option<f64>, b: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, b) => a.or(b),
    }
}

/// Everything derived for one window, produced atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
    pub window: TimeWindow,
    pub sample_count: usize,
    pub coverage: CoverageResult,
    pub tir: TirBucketMinutes,
    pub statistics: GlucoseStatistics,
    pub moments: SampleMoments,
}

impl WindowSnapshot {
    pub fn tir_percentages(&self) -> Option<TirPercentages> {
        self.tir.percentages(self.coverage.coverage_minutes)
    }
}

/// One finalized calendar day. Immutable once the day is fully in the past.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub coverage: CoverageResult,
    pub tir: TirBucketMinutes,
    pub moments: SampleMoments,
}

impl DailyAggregate {
    pub fn from_snapshot(date: NaiveDate, snapshot: &WindowSnapshot) -> Self {
        Self {
            date,
            coverage: snapshot.coverage,
            tir: snapshot.tir,
            moments: snapshot.moments,
        }
    }
}

/// N-day summary: N-1 finalized days plus the live today window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub days: u32,
    pub first_day: NaiveDate,
    pub today: NaiveDate,
    /// Past days that had a history entry; the rest count as zero coverage.
    pub history_days: u32,
    pub coverage: CoverageResult,
    pub tir: TirBucketMinutes,
    pub statistics: GlucoseStatistics,
}

impl PeriodSummary {
    pub fn tir_percentages(&self) -> Option<TirPercentages> {
        self.tir.percentages(self.coverage.coverage_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_caps_and_clamps() {
        let capped = CoverageResult::new(1440, 2000);
        assert_eq!(capped.coverage_minutes, 1440);
        assert_eq!(capped.coverage_ratio, 1.0);
        assert!(!capped.is_partial);

        let degenerate = CoverageResult::new(0, 0);
        assert_eq!(degenerate.coverage_ratio, 0.0);
        assert!(!degenerate.is_partial);
        assert!(degenerate.is_degenerate());
    }

    #[test]
    fn cv_is_none_for_non_positive_mean() {
        let stats = GlucoseStatistics::from_mean_sd(Some(0.0), Some(4.0));
        assert_eq!(stats.cv_percent, None);
        assert_eq!(stats.sd_mgdl, Some(4.0));
    }

    #[test]
    fn gmi_tracks_mean() {
        let stats = GlucoseStatistics::from_mean_sd(Some(154.0), None);
        let gmi = stats.gmi_percent.unwrap();
        assert!((gmi - 6.99368).abs() < 1e-9);
        assert_eq!(GlucoseStatistics::from_mean_sd(None, None).gmi_percent, None);
    }

    #[test]
    fn percentages_need_coverage() {
        let buckets = TirBucketMinutes {
            in_range: 300,
            high: 100,
            ..Default::default()
        };
        assert!(buckets.percentages(0).is_none());

        let pct = buckets.percentages(400).unwrap();
        assert_eq!(pct.in_range, 75.0);
        assert_eq!(pct.high, 25.0);
    }

    #[test]
    fn pooled_moments_match_population_sd() {
        let mut moments = SampleMoments {
            count: 2,
            sum: 100.0 + 120.0,
            sum_sq: 100.0 * 100.0 + 120.0 * 120.0,
            ..Default::default()
        };
        moments.merge(&SampleMoments {
            count: 2,
            sum: 140.0 + 160.0,
            sum_sq: 140.0 * 140.0 + 160.0 * 160.0,
            ..Default::default()
        });

        let stats = moments.statistics();
        assert_eq!(stats.mean_mgdl, Some(130.0));
        // population variance of {100,120,140,160} = 500
        assert!((stats.sd_mgdl.unwrap() - 500f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn single_pooled_sample_has_no_sd() {
        let moments = SampleMoments {
            count: 1,
            sum: 90.0,
            sum_sq: 8100.0,
            ..Default::default()
        };
        let stats = moments.statistics();
        assert_eq!(stats.mean_mgdl, Some(90.0));
        assert_eq!(stats.sd_mgdl, None);
        assert_eq!(stats.cv_percent, None);
    }

    #[test]
    fn pooled_constant_fraction_has_zero_sd() {
        use chrono::{Duration, TimeZone, Utc};
        let day = |offset: i64| {
            let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::days(offset);
            (0..288)
                .map(|i| GlucoseSample::new(start + Duration::minutes(i * 5), 123.7))
                .collect::<Vec<_>>()
        };
        let mut moments = SampleMoments::from_samples(&day(0));
        moments.merge(&SampleMoments::default());
        moments.merge(&SampleMoments::from_samples(&day(1)));

        let stats = moments.statistics();
        assert_eq!(stats.mean_mgdl, Some(123.7));
        assert_eq!(stats.sd_mgdl, Some(0.0));
        assert_eq!(stats.cv_percent, Some(0.0));
    }

    #[test]
    fn untracked_extremes_fall_back_to_sums() {
        let mut moments = SampleMoments {
            count: 2,
            sum: 240.0,
            sum_sq: 2.0 * 120.0 * 120.0,
            ..Default::default()
        };
        moments.merge(&SampleMoments {
            count: 1,
            sum: 90.0,
            sum_sq: 8100.0,
            min: Some(90.0),
            max: Some(90.0),
        });

        assert_eq!(moments.min, None);
        let stats = moments.statistics();
        assert_eq!(stats.mean_mgdl, Some(110.0));
        assert!(stats.sd_mgdl.unwrap() > 0.0);
    }
}
