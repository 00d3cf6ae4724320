//! The full ingest → aggregate → publish pass, as one synchronous call.
//!
//! Stages run in a fixed order: ingest the raw buffer, rebuild the daily
//! history cache, compute today-so-far, compute rolling-24h, then stitch the
//! period summaries. Later stages only read what earlier stages produced in
//! this same call.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregation::{build_period, DailyHistory, WindowAggregator};
use crate::calendar::{days_before, local_date, retention_start};
use crate::models::{GlucoseSample, PeriodSummary, WindowSnapshot};
use crate::overlay::{compute_overlay, CarbEntry, DailyOverlay, InsulinDelivery};
use crate::samples::SampleStore;
use crate::settings::EngineSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshTrigger {
    AppStart,
    PullToRefresh,
    Navigation,
}

impl RefreshTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshTrigger::AppStart => "app-start",
            RefreshTrigger::PullToRefresh => "pull-to-refresh",
            RefreshTrigger::Navigation => "navigation",
        }
    }
}

/// Samples fetched for past days that are not in the history cache yet.
#[derive(Debug, Clone, Default)]
pub struct Backfill {
    pub dates: Vec<NaiveDate>,
    pub samples: Vec<GlucoseSample>,
}

#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// What asked for this pass; `None` for internal recomputes.
    pub trigger: Option<RefreshTrigger>,
    pub now: DateTime<Utc>,
    pub offset: FixedOffset,
    /// Fresh raw buffer; `None` keeps the samples already stored.
    pub samples: Option<Vec<GlucoseSample>>,
    pub backfill: Option<Backfill>,
    pub insulin: Vec<InsulinDelivery>,
    pub carbs: Vec<CarbEntry>,
}

impl PipelineInput {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset, samples: Vec<GlucoseSample>) -> Self {
        Self {
            trigger: None,
            now,
            offset,
            samples: Some(samples),
            backfill: None,
            insulin: Vec::new(),
            carbs: Vec::new(),
        }
    }

    /// Recompute over whatever is cached.
    pub fn cached(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            samples: None,
            ..Self::new(now, offset, Vec::new())
        }
    }
}

/// Everything the presentation layer reads, swapped in as one value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub generated_at: DateTime<Utc>,
    pub trigger: Option<RefreshTrigger>,
    pub today_date: NaiveDate,
    pub latest_sample: Option<GlucoseSample>,
    pub buffered_samples: usize,
    pub today: WindowSnapshot,
    pub rolling_24h: WindowSnapshot,
    pub periods: Vec<PeriodSummary>,
    pub overlay: DailyOverlay,
}

impl EngineSnapshot {
    pub fn period(&self, days: u32) -> Option<&PeriodSummary> {
        self.periods.iter().find(|p| p.days == days)
    }
}

pub fn run_pipeline(
    store: &mut SampleStore,
    history: &mut DailyHistory,
    settings: &EngineSettings,
    input: PipelineInput,
) -> EngineSnapshot {
    let PipelineInput {
        trigger,
        now,
        offset,
        samples,
        backfill,
        insulin,
        carbs,
    } = input;
    let today_date = local_date(now, offset);

    store.set_retention_days(settings.retention_days);
    if let Some(raw) = samples {
        store.ingest_at(raw, now);
    }
    let buffer = store.samples();

    history.set_thresholds(settings.thresholds);
    if let Some(backfill) = backfill {
        let fetched = crate::samples::SortedSampleSet::from_raw(backfill.samples);
        history.record_days(&fetched, backfill.dates, today_date, offset);
    }
    // Past days still inside the raw buffer are rebuilt every pass so late
    // sensor syncs land in them; older days stay frozen.
    if store.last_ingest_at().is_some() {
        let first_buffered = local_date(retention_start(now, offset, store.retention_days()), offset);
        let buffered_days = first_buffered
            .iter_days()
            .take_while(|date| *date < today_date);
        history.record_days(buffer, buffered_days, today_date, offset);
    }
    history.prune_before(days_before(today_date, settings.history_lookback()));

    let aggregator = WindowAggregator::new(settings.thresholds);
    let today = aggregator.today_so_far(buffer, now, offset);
    let rolling_24h = aggregator.rolling_last_24h(buffer, now);

    let periods = settings
        .periods
        .iter()
        .map(|days| build_period(*days, history.aggregates(), &today, today_date))
        .collect();

    let overlay = compute_overlay(&today.window, &insulin, &carbs);

    EngineSnapshot {
        generated_at: now,
        trigger,
        today_date,
        latest_sample: buffer.latest().copied(),
        buffered_samples: buffer.len(),
        today,
        rolling_24h,
        periods,
        overlay,
    }
}
