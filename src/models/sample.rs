//! Glucose sample data model.
//!
//! A sample is a single CGM reading. Samples are immutable once stored and the
//! whole buffer is replaced on every refresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Nominal CGM cadence. Every sample is credited with this many minutes of
/// coverage and time-in-range, regardless of the real gap to its neighbours.
pub const SAMPLE_INTERVAL_MINUTES: u32 = 5;

pub const MINUTES_PER_DAY: u32 = 1440;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlucoseSample {
    pub timestamp: DateTime<Utc>,
    pub value_mgdl: f64,
}

impl GlucoseSample {
    pub fn new(timestamp: DateTime<Utc>, value_mgdl: f64) -> Self {
        Self {
            timestamp,
            value_mgdl,
        }
    }

    /// Dedup key: the timestamp rounded to the nearest whole second.
    pub fn second_key(&self) -> i64 {
        let secs = self.timestamp.timestamp();
        if self.timestamp.timestamp_subsec_nanos() >= 500_000_000 {
            secs + 1
        } else {
            secs
        }
    }
}
