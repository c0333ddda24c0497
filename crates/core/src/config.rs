//! Tunable estimator and session constants.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::DEFAULT_NOMINAL_VOLTAGE;

pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.1;
pub const DEFAULT_WINDOW_SECS: u64 = 90;
pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 5;

/// What happens to an open session when the host goes to the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundPolicy {
    /// Finalize the session and start a new one on return to the foreground.
    #[default]
    TerminateAndRestart,
    /// Keep the session open, stop sampling until the host returns.
    PauseAndResume,
}

impl BackgroundPolicy {
    pub fn label(&self) -> &'static str {
        match self {
            BackgroundPolicy::TerminateAndRestart => "Terminate and restart",
            BackgroundPolicy::PauseAndResume => "Pause and resume",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub smoothing_alpha: f64,
    pub window_secs: u64,
    pub sample_interval_secs: u64,
    pub nominal_voltage: f64,
    pub background_policy: BackgroundPolicy,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            window_secs: DEFAULT_WINDOW_SECS,
            sample_interval_secs: DEFAULT_SAMPLE_INTERVAL_SECS,
            nominal_voltage: DEFAULT_NOMINAL_VOLTAGE,
            background_policy: BackgroundPolicy::default(),
        }
    }
}

impl EstimatorConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(ConfigError::Alpha(self.smoothing_alpha));
        }
        if self.window_secs == 0 {
            return Err(ConfigError::Window);
        }
        if self.sample_interval_secs == 0 {
            return Err(ConfigError::Interval);
        }
        if !self.nominal_voltage.is_finite() || self.nominal_voltage <= 0.0 {
            return Err(ConfigError::Voltage(self.nominal_voltage));
        }
        Ok(())
    }
}
