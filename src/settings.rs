use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use crate::aggregation::{TirThresholds, MAX_PERIOD_DAYS};
use crate::samples::store::{DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS};

pub const MGDL_PER_MMOL: f64 = 18.0182;

/// Display unit only; classification always works in mg/dL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GlucoseUnit {
    #[default]
    MgDl,
    MmolL,
}

impl GlucoseUnit {
    pub fn display_from_mgdl(&self, value_mgdl: f64) -> f64 {
        match self {
            GlucoseUnit::MgDl => value_mgdl,
            GlucoseUnit::MmolL => value_mgdl / MGDL_PER_MMOL,
        }
    }

    pub fn display_to_mgdl(&self, value: f64) -> f64 {
        match self {
            GlucoseUnit::MgDl => value,
            GlucoseUnit::MmolL => value * MGDL_PER_MMOL,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GlucoseUnit::MgDl => "mg/dL",
            GlucoseUnit::MmolL => "mmol/L",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub thresholds: TirThresholds,
    /// Period lengths in days, each published as its own summary.
    pub periods: Vec<u32>,
    pub retention_days: u32,
    pub unit: GlucoseUnit,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            thresholds: TirThresholds::default(),
            periods: vec![7, 14, 30, 90],
            retention_days: DEFAULT_RETENTION_DAYS,
            unit: GlucoseUnit::MgDl,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if self
            .periods
            .iter()
            .any(|days| *days == 0 || *days > MAX_PERIOD_DAYS)
        {
            bail!(
                "period lengths must be between 1 and {MAX_PERIOD_DAYS} days: {:?}",
                self.periods
            );
        }
        if self.retention_days == 0 || self.retention_days > MAX_RETENTION_DAYS {
            bail!(
                "retention must be between 1 and {MAX_RETENTION_DAYS} days, got {}",
                self.retention_days
            );
        }
        Ok(())
    }

    /// Past days the longest period needs from history.
    pub fn history_lookback(&self) -> u32 {
        self.periods
            .iter()
            .copied()
            .max()
            .unwrap_or(1)
            .min(MAX_PERIOD_DAYS)
            .saturating_sub(1)
    }
}

pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<EngineSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`, falling back to defaults when the file is
    /// missing, unreadable as JSON, or fails validation.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<EngineSettings>(&contents) {
                Ok(settings) if settings.validate().is_ok() => settings,
                Ok(settings) => {
                    warn!("Ignoring invalid settings in {}: {:?}", path.display(), settings);
                    EngineSettings::default()
                }
                Err(err) => {
                    warn!("Ignoring unparsable settings in {}: {err}", path.display());
                    EngineSettings::default()
                }
            }
        } else {
            EngineSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory(settings: EngineSettings) -> Self {
        Self {
            path: None,
            data: RwLock::new(settings),
        }
    }

    pub fn current(&self) -> EngineSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, settings: EngineSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn update_thresholds(&self, thresholds: TirThresholds) -> Result<()> {
        let mut next = self.current();
        next.thresholds = thresholds;
        self.update(next)
    }

    fn persist(&self, data: &EngineSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let contents = fs::read_to_string(path)?;
        let data: EngineSettings = serde_json::from_str(&contents)?;
        data.validate()?;
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = data;
        Ok(())
    }
}
