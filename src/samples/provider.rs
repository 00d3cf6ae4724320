//! Inbound data boundary.
//!
//! The platform health store is the source of truth; this crate only ever
//! reads from it. Implementations may suspend; failures are reported as
//! errors and the caller keeps whatever it had cached.

use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::GlucoseSample;
use crate::overlay::{CarbEntry, InsulinDelivery};

pub trait GlucoseDataProvider: Send + Sync {
    /// Raw readings with `start <= timestamp <= end`, in any order.
    fn fetch_samples(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<GlucoseSample>>> + Send;

    fn fetch_insulin(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<InsulinDelivery>>> + Send {
        async { Ok(Vec::new()) }
    }

    fn fetch_carbs(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<CarbEntry>>> + Send {
        async { Ok(Vec::new()) }
    }
}
