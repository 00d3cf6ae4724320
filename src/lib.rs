//! Continuous-glucose-monitor aggregation: coverage, time in range and
//! multi-day summaries over a short raw buffer plus a per-day history cache.

pub mod aggregation;
pub mod calendar;
pub mod engine;
pub mod models;
pub mod overlay;
pub mod samples;
pub mod settings;
mod utils;

pub use aggregation::{DailyHistory, TirThresholds, WindowAggregator};
pub use calendar::{Clock, FixedClock, SystemClock};
pub use engine::{
    run_pipeline, EngineSnapshot, GlucoseController, PipelineInput, RefreshOutcome,
    RefreshTrigger,
};
pub use models::{
    CoverageResult, DailyAggregate, GlucoseSample, GlucoseStatistics, PeriodSummary,
    TimeWindow, TirBucketMinutes, WindowSnapshot,
};
pub use samples::{GlucoseDataProvider, SampleStore};
pub use settings::{EngineSettings, GlucoseUnit, SettingsStore};

/// Sets up `env_logger` from `RUST_LOG`, defaulting to `info`. Safe to call
/// more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
