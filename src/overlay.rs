//! Insulin and carbohydrate overlay for the today window.
//!
//! Only the totals needed for the derived ratios are computed here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::TimeWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryKind {
    Bolus,
    Basal,
}

impl DeliveryKind {
    /// Parses the platform's delivery-reason metadata tag.
    pub fn from_reason(reason: &str) -> Option<Self> {
        match reason.trim().to_ascii_lowercase().as_str() {
            "bolus" => Some(DeliveryKind::Bolus),
            "basal" => Some(DeliveryKind::Basal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryKind::Bolus => "bolus",
            DeliveryKind::Basal => "basal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsulinDelivery {
    pub timestamp: DateTime<Utc>,
    pub units: f64,
    pub kind: DeliveryKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbEntry {
    pub timestamp: DateTime<Utc>,
    pub grams: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyOverlay {
    pub bolus_units: f64,
    pub basal_units: f64,
    pub carbs_grams: f64,
    /// Basal as a share of total insulin; `None` when no insulin was delivered.
    pub basal_share_percent: Option<f64>,
    /// Grams of carbohydrate per unit of bolus insulin; `None` without bolus.
    pub carbs_per_bolus_unit: Option<f64>,
}

impl DailyOverlay {
    pub fn total_units(&self) -> f64 {
        self.bolus_units + self.basal_units
    }
}

/// Totals for entries inside `window`. Negative or non-finite amounts are skipped.
pub fn compute_overlay(
    window: &TimeWindow,
    deliveries: &[InsulinDelivery],
    carbs: &[CarbEntry],
) -> DailyOverlay {
    let usable = |amount: f64| amount.is_finite() && amount >= 0.0;

    let (mut bolus_units, mut basal_units) = (0.0, 0.0);
    for delivery in deliveries
        .iter()
        .filter(|d| window.contains(d.timestamp) && usable(d.units))
    {
        match delivery.kind {
            DeliveryKind::Bolus => bolus_units += delivery.units,
            DeliveryKind::Basal => basal_units += delivery.units,
        }
    }

    let carbs_grams: f64 = carbs
        .iter()
        .filter(|c| window.contains(c.timestamp) && usable(c.grams))
        .map(|c| c.grams)
        .sum();

    let total = bolus_units + basal_units;
    DailyOverlay {
        bolus_units,
        basal_units,
        carbs_grams,
        basal_share_percent: (total > 0.0).then(|| basal_units / total * 100.0),
        carbs_per_bolus_unit: (bolus_units > 0.0).then(|| carbs_grams / bolus_units),
    }
}
