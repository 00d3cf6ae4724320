//! Local calendar arithmetic.
//!
//! Instants are kept in UTC; calendar days are resolved against the user's
//! local offset as reported by a [`Clock`].

use chrono::{DateTime, Days, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    /// Local UTC offset used to locate midnight.
    fn offset(&self) -> FixedOffset;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        Local::now().offset().fix()
    }
}

/// A clock pinned to one instant; advance it explicitly.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub now: DateTime<Utc>,
    pub offset: FixedOffset,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }

    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Utc.fix())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let utc = local_midnight
        .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
        .unwrap_or(local_midnight);
    Utc.from_utc_datetime(&utc)
}

pub fn local_midnight(instant: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    start_of_day(local_date(instant, offset), offset)
}

/// Saturates at the earliest representable date.
pub fn days_before(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

/// First instant of the raw-sample buffer: midnight `days - 1` days before today,
/// so the buffer spans `days` calendar days including today.
pub fn retention_start(now: DateTime<Utc>, offset: FixedOffset, days: u32) -> DateTime<Utc> {
    let today = local_date(now, offset);
    start_of_day(days_before(today, days.saturating_sub(1)), offset)
}
