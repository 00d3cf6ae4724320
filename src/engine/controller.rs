use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::aggregation::DailyHistory;
use crate::calendar::{local_date, local_midnight, start_of_day, Clock, SystemClock};
use crate::models::GlucoseSample;
use crate::overlay::{CarbEntry, InsulinDelivery};
use crate::samples::{GlucoseDataProvider, SampleStore};
use crate::settings::{EngineSettings, SettingsStore};

use super::pipeline::{run_pipeline, Backfill, EngineSnapshot, PipelineInput, RefreshTrigger};

const ENABLE_LOGS: bool = true;
use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot went out. `fetch_failed` means it was computed over the
    /// previously cached buffer.
    Published { sequence: u64, fetch_failed: bool },
    /// A later refresh started before this one finished; nothing was published.
    Superseded { sequence: u64 },
}

struct EngineState {
    store: SampleStore,
    history: DailyHistory,
}

struct FetchPlan {
    now: DateTime<Utc>,
    offset: FixedOffset,
    buffer_start: DateTime<Utc>,
    today_start: DateTime<Utc>,
    backfill_dates: Vec<NaiveDate>,
}

struct Fetched {
    samples: Option<Vec<GlucoseSample>>,
    backfill: Option<Backfill>,
    insulin: Vec<InsulinDelivery>,
    carbs: Vec<CarbEntry>,
}

/// Owns the sample buffer and history cache, and publishes one
/// [`EngineSnapshot`] per completed refresh. Cheap to clone; clones share state.
pub struct GlucoseController<P, C = SystemClock> {
    provider: Arc<P>,
    clock: Arc<C>,
    settings: Arc<SettingsStore>,
    state: Arc<Mutex<EngineState>>,
    publisher: Arc<watch::Sender<Arc<EngineSnapshot>>>,
    sequence: Arc<AtomicU64>,
    in_flight: Arc<Mutex<Option<CancellationToken>>>,
}

impl<P, C> Clone for GlucoseController<P, C> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            clock: Arc::clone(&self.clock),
            settings: Arc::clone(&self.settings),
            state: Arc::clone(&self.state),
            publisher: Arc::clone(&self.publisher),
            sequence: Arc::clone(&self.sequence),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<P: GlucoseDataProvider, C: Clock> GlucoseController<P, C> {
    pub fn new(provider: Arc<P>, clock: C, settings: Arc<SettingsStore>) -> Self {
        let current = settings.current();
        let mut store = SampleStore::new(current.retention_days);
        let mut history = DailyHistory::new(current.thresholds);
        let initial = run_pipeline(
            &mut store,
            &mut history,
            &current,
            PipelineInput::cached(clock.now(), clock.offset()),
        );
        let (publisher, _) = watch::channel(Arc::new(initial));

        Self {
            provider,
            clock: Arc::new(clock),
            settings,
            state: Arc::new(Mutex::new(EngineState { store, history })),
            publisher: Arc::new(publisher),
            sequence: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<EngineSnapshot>> {
        self.publisher.subscribe()
    }

    /// The last published snapshot.
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        Arc::clone(&self.publisher.borrow())
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub async fn cached_days(&self) -> usize {
        self.state.lock().await.history.len()
    }

    /// Fetch, aggregate and publish. Starting a refresh cancels any refresh
    /// still in flight, so results always go out in request order.
    pub async fn refresh(&self, trigger: RefreshTrigger) -> RefreshOutcome {
        let (sequence, token) = self.begin_request().await;
        log_info!("refresh #{} started ({})", sequence, trigger.as_str());

        let settings = self.settings.current();
        let plan = self.plan(&settings).await;

        let fetched = tokio::select! {
            _ = token.cancelled() => {
                log_debug!("refresh #{} cancelled while fetching", sequence);
                return RefreshOutcome::Superseded { sequence };
            }
            fetched = self.fetch(&plan) => fetched,
        };

        let mut state = self.state.lock().await;
        if token.is_cancelled() || self.sequence.load(Ordering::SeqCst) != sequence {
            log_debug!("refresh #{} superseded before publishing", sequence);
            return RefreshOutcome::Superseded { sequence };
        }

        let fetch_failed = fetched.samples.is_none();
        let input = PipelineInput {
            trigger: Some(trigger),
            now: plan.now,
            offset: plan.offset,
            samples: fetched.samples,
            backfill: fetched.backfill,
            insulin: fetched.insulin,
            carbs: fetched.carbs,
        };
        let EngineState { store, history } = &mut *state;
        let snapshot = run_pipeline(store, history, &settings, input);
        let buffered = snapshot.buffered_samples;
        self.publisher.send_replace(Arc::new(snapshot));
        drop(state);

        log_info!(
            "refresh #{} published ({} buffered samples{})",
            sequence,
            buffered,
            if fetch_failed { ", stale" } else { "" }
        );
        RefreshOutcome::Published {
            sequence,
            fetch_failed,
        }
    }

    async fn begin_request(&self) -> (u64, CancellationToken) {
        let mut in_flight = self.in_flight.lock().await;
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        if let Some(previous) = in_flight.replace(token.clone()) {
            previous.cancel();
        }
        (sequence, token)
    }

    async fn plan(&self, settings: &EngineSettings) -> FetchPlan {
        let now = self.clock.now();
        let offset = self.clock.offset();
        let today = local_date(now, offset);

        let mut state = self.state.lock().await;
        state.store.set_retention_days(settings.retention_days);
        if state.history.set_thresholds(settings.thresholds) {
            log_info!("glycemic thresholds changed, daily history cleared");
        }
        let (buffer_start, _) = state.store.fetch_range(now, offset);
        let first_buffered = local_date(buffer_start, offset);
        // Days inside the buffer are rebuilt from it; only older gaps need a fetch.
        let backfill_dates = state
            .history
            .missing_days(today, settings.history_lookback())
            .into_iter()
            .filter(|date| *date < first_buffered)
            .collect();

        FetchPlan {
            now,
            offset,
            buffer_start,
            today_start: local_midnight(now, offset),
            backfill_dates,
        }
    }

    async fn fetch(&self, plan: &FetchPlan) -> Fetched {
        let backfill = async {
            let Some(first) = plan.backfill_dates.first() else {
                return None;
            };
            let start = start_of_day(*first, plan.offset);
            match self.provider.fetch_samples(start, plan.buffer_start).await {
                Ok(samples) => {
                    log_debug!(
                        "backfilled {} days from {} samples",
                        plan.backfill_dates.len(),
                        samples.len()
                    );
                    Some(Backfill {
                        dates: plan.backfill_dates.clone(),
                        samples,
                    })
                }
                Err(err) => {
                    log_warn!("history backfill failed: {:#}", err);
                    None
                }
            }
        };

        let (samples, backfill, insulin, carbs) = tokio::join!(
            self.provider.fetch_samples(plan.buffer_start, plan.now),
            backfill,
            self.provider.fetch_insulin(plan.today_start, plan.now),
            self.provider.fetch_carbs(plan.today_start, plan.now),
        );

        let samples = match samples {
            Ok(samples) => Some(samples),
            Err(err) => {
                log_warn!("glucose fetch failed, keeping cached samples: {:#}", err);
                None
            }
        };
        let insulin = insulin.unwrap_or_else(|err| {
            log_warn!("insulin fetch failed: {:#}", err);
            Vec::new()
        });
        let carbs = carbs.unwrap_or_else(|err| {
            log_warn!("carb fetch failed: {:#}", err);
            Vec::new()
        });

        Fetched {
            samples,
            backfill,
            insulin,
            carbs,
        }
    }
}
