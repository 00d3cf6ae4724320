pub mod sample;
pub mod summary;
pub mod window;

pub use sample::{GlucoseSample, MINUTES_PER_DAY, SAMPLE_INTERVAL_MINUTES};
pub use summary::{
    CoverageResult, DailyAggregate, GlucoseStatistics, PeriodSummary, SampleMoments,
    TirBucketMinutes, TirPercentages, WindowSnapshot,
};
pub use window::{TimeWindow, WindowKind};
