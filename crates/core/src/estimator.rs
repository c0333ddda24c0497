//! Charging power estimation from level deltas.
//!
//! The instantaneous rate is derived from the oldest and newest samples in
//! the window and then smoothed with an exponential moving average, so a
//! single noisy reading moves the published value only by `alpha`.

use crate::buffer::SampleBuffer;
use crate::config::DEFAULT_SMOOTHING_ALPHA;
use crate::types::{CapacityInput, Sample};

const SECS_PER_HOUR: f64 = 3600.0;

/// Computes instantaneous charging watts between two samples.
///
/// Returns `None` unless both elapsed time and level change are positive.
/// Flat or falling levels are jitter or discharge blips, not charging evidence.
pub fn instant_watts(oldest: &Sample, newest: &Sample, capacity: &CapacityInput) -> Option<f64> {
    let delta_percent = (newest.level - oldest.level) * 100.0;
    let delta_secs = (newest.timestamp - oldest.timestamp).num_milliseconds() as f64 / 1000.0;
    let delta_hours = delta_secs / SECS_PER_HOUR;

    if delta_hours <= 0.0 || delta_percent <= 0.0 {
        return None;
    }

    let current_ma = capacity.milliamp_hours * (delta_percent / 100.0) / delta_hours;
    Some((current_ma / 1000.0) * capacity.nominal_voltage)
}

/// Exponentially smoothed charging power for one session.
#[derive(Debug, Clone)]
pub struct PowerEstimator {
    alpha: f64,
    ema: Option<f64>,
}

impl Default for PowerEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_ALPHA)
    }
}

impl PowerEstimator {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, ema: None }
    }

    /// Folds the buffer's current endpoints into the smoothed value.
    ///
    /// Returns the smoothed watts, unchanged when the buffer holds fewer
    /// than two samples or the endpoints carry no charging evidence.
    pub fn update(&mut self, buffer: &SampleBuffer, capacity: &CapacityInput) -> Option<f64> {
        if buffer.len() < 2 {
            return self.ema;
        }

        let (Some(oldest), Some(newest)) = (buffer.oldest(), buffer.newest()) else {
            return self.ema;
        };

        let Some(instant) = instant_watts(oldest, newest, capacity) else {
            return self.ema;
        };

        let smoothed = match self.ema {
            Some(prev) => self.alpha * instant + (1.0 - self.alpha) * prev,
            None => instant,
        };
        self.ema = Some(smoothed);
        self.ema
    }

    pub fn smoothed(&self) -> Option<f64> {
        self.ema
    }

    pub fn reset(&mut self) {
        self.ema = None;
    }
}
