//! Time-in-range classification.
//!
//! Bucket minutes are accumulated per sample without any cap while coverage
//! is capped at the window's expected minutes, so the two can disagree.
//! [`reconcile_buckets`] trims the buckets back under coverage, eroding the
//! extreme-high end first and the very-low band last.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::models::{
    summary::GlycemicBand, CoverageResult, GlucoseSample, TirBucketMinutes,
    SAMPLE_INTERVAL_MINUTES,
};

/// Order in which overflow minutes are removed during reconciliation.
pub const TRIM_ORDER: [GlycemicBand; 5] = [
    GlycemicBand::VeryHigh,
    GlycemicBand::High,
    GlycemicBand::InRange,
    GlycemicBand::Low,
    GlycemicBand::VeryLow,
];

/// Band edges in mg/dL. Lower bounds are inclusive, upper bounds of the
/// in-range and high bands are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TirThresholds {
    pub very_low_below: f64,
    pub low_below: f64,
    pub in_range_max: f64,
    pub high_max: f64,
}

impl Default for TirThresholds {
    fn default() -> Self {
        Self {
            very_low_below: 54.0,
            low_below: 70.0,
            in_range_max: 180.0,
            high_max: 250.0,
        }
    }
}

impl TirThresholds {
    pub fn validate(&self) -> Result<()> {
        let edges = [
            self.very_low_below,
            self.low_below,
            self.in_range_max,
            self.high_max,
        ];
        if edges.iter().any(|edge| !edge.is_finite() || *edge <= 0.0) {
            bail!("TIR thresholds must be positive finite numbers: {self:?}");
        }
        if edges.windows(2).any(|pair| pair[0] >= pair[1]) {
            bail!("TIR thresholds must be strictly increasing: {self:?}");
        }
        Ok(())
    }

    pub fn classify(&self, value_mgdl: f64) -> GlycemicBand {
        if value_mgdl < self.very_low_below {
            GlycemicBand::VeryLow
        } else if value_mgdl < self.low_below {
            GlycemicBand::Low
        } else if value_mgdl <= self.in_range_max {
            GlycemicBand::InRange
        } else if value_mgdl <= self.high_max {
            GlycemicBand::High
        } else {
            GlycemicBand::VeryHigh
        }
    }
}

/// Credits every sample with the nominal interval in its band.
pub fn accumulate_buckets(samples: &[GlucoseSample], thresholds: &TirThresholds) -> TirBucketMinutes {
    samples
        .iter()
        .fold(TirBucketMinutes::default(), |mut buckets, sample| {
            let slot = buckets.minutes_mut(thresholds.classify(sample.value_mgdl));
            *slot = slot.saturating_add(SAMPLE_INTERVAL_MINUTES);
            buckets
        })
}

/// Removes overflow above `coverage_minutes` following [`TRIM_ORDER`].
/// Returns the number of minutes removed.
pub fn reconcile_buckets(buckets: &mut TirBucketMinutes, coverage_minutes: u32) -> u32 {
    let total = buckets.total();
    if total <= coverage_minutes {
        return 0;
    }

    let overflow = total - coverage_minutes;
    let mut remaining = overflow;
    for band in TRIM_ORDER {
        if remaining == 0 {
            break;
        }
        let slot = buckets.minutes_mut(band);
        let taken = (*slot).min(remaining);
        *slot -= taken;
        remaining -= taken;
    }
    overflow - remaining
}

/// Buckets for samples already filtered to the window that produced `coverage`.
pub fn classify_tir(
    samples: &[GlucoseSample],
    coverage: &CoverageResult,
    thresholds: &TirThresholds,
) -> TirBucketMinutes {
    let mut buckets = accumulate_buckets(samples, thresholds);
    reconcile_buckets(&mut buckets, coverage.coverage_minutes);
    buckets
}
