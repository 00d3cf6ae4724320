//! Time windows over which statistics are computed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::sample::MINUTES_PER_DAY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowKind {
    /// 24 hours ending at the most recent sample.
    Rolling24h,
    /// Local midnight up to wall-clock now.
    TodaySoFar,
    /// Local midnight to the following midnight.
    CalendarDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub kind: WindowKind,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn rolling_24h(anchor: DateTime<Utc>) -> Self {
        Self {
            kind: WindowKind::Rolling24h,
            start: anchor - Duration::hours(24),
            end: anchor,
        }
    }

    pub fn today_so_far(midnight: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            kind: WindowKind::TodaySoFar,
            start: midnight,
            end: now,
        }
    }

    pub fn calendar_day(start: DateTime<Utc>) -> Self {
        Self {
            kind: WindowKind::CalendarDay,
            start,
            end: start + Duration::days(1),
        }
    }

    /// Minutes of data the window should hold if the sensor never missed a reading.
    ///
    /// Full days are always 1440 minutes (DST transitions are not special-cased);
    /// today-so-far is the whole minutes elapsed since midnight.
    pub fn expected_minutes(&self) -> u32 {
        match self.kind {
            WindowKind::Rolling24h | WindowKind::CalendarDay => MINUTES_PER_DAY,
            WindowKind::TodaySoFar => {
                let elapsed = (self.end - self.start).num_minutes().max(0);
                u32::try_from(elapsed).unwrap_or(u32::MAX)
            }
        }
    }

    /// Calendar windows exclude their end so adjacent days never share a sample.
    pub fn is_half_open(&self) -> bool {
        self.kind == WindowKind::CalendarDay
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        if instant < self.start {
            return false;
        }
        if self.is_half_open() {
            instant < self.end
        } else {
            instant <= self.end
        }
    }
}
