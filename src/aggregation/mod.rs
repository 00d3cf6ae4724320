pub mod coverage;
pub mod daily;
pub mod period;
pub mod statistics;
pub mod tir;
pub mod window;

pub use coverage::{compute_coverage, coverage_for_count};
pub use daily::{aggregate_day, DailyHistory};
pub use period::{build_period, MAX_PERIOD_DAYS};
pub use statistics::compute_statistics;
pub use tir::{classify_tir, reconcile_buckets, TirThresholds};
pub use window::WindowAggregator;
