//! Tracker configuration.
//!
//! Loaded from JSON handed over by the app (missing fields fall back to the
//! defaults below) and validated before use.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::filter::FilterConfig;

/// Population-average body weight used when the user's weight is unknown.
pub const DEFAULT_BODY_WEIGHT_KG: f64 = 70.0;

/// Configuration for a [`crate::CardioTracker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(default)]
pub struct TrackerConfig {
    /// Sample filter thresholds
    pub filter: FilterConfig,

    /// User's body weight in kg, if known. Used for calorie estimates.
    pub body_weight_kg: Option<f64>,

    /// Weight assumed when `body_weight_kg` is missing.
    /// Default: 70.0 kg
    pub default_body_weight_kg: f64,

    /// Emit an `Updated` event for every accepted sample.
    /// Default: true
    pub emit_sample_updates: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            body_weight_kg: None,
            default_body_weight_kg: DEFAULT_BODY_WEIGHT_KG,
            emit_sample_updates: true,
        }
    }
}

impl TrackerConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TrackerConfig =
            serde_json::from_str(json).map_err(|e| TrackerError::Config {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all thresholds are usable.
    pub fn validate(&self) -> Result<()> {
        let filter = &self.filter;
        if !(filter.min_movement_meters.is_finite() && filter.min_movement_meters >= 0.0) {
            return Err(config_error("min_movement_meters must be >= 0"));
        }
        if filter.min_interval_ms < 0 {
            return Err(config_error("min_interval_ms must be >= 0"));
        }
        if !is_positive(filter.speed_ceiling_factor) {
            return Err(config_error("speed_ceiling_factor must be > 0"));
        }
        if let Some(weight) = self.body_weight_kg {
            if !is_positive(weight) {
                return Err(config_error("body_weight_kg must be > 0"));
            }
        }
        if !is_positive(self.default_body_weight_kg) {
            return Err(config_error("default_body_weight_kg must be > 0"));
        }
        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn config_error(message: &str) -> TrackerError {
    TrackerError::Config {
        message: message.to_string(),
    }
}

/// Per-session options supplied at `start`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct StartOptions {
    /// Overrides the tracker's body weight for this session.
    pub body_weight_kg: Option<f64>,
    /// Raw step counter value at start, used as the step baseline.
    pub initial_steps: Option<u64>,
}
