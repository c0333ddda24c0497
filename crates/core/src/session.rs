//! Charging session record and the metrics published while it is open.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One contiguous interval of charging activity.
///
/// Summary fields are only meaningful once `end_time` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub average_watts: f64,
    pub peak_watts: f64,
    /// Level change in percentage points. Negative if the level dropped.
    pub delta_percent: f64,
    pub charger_label: Option<String>,
    pub notes: Option<String>,
}

impl Session {
    pub fn open(id: Uuid, start_time: DateTime<Utc>) -> Self {
        Self {
            id,
            start_time,
            end_time: None,
            average_watts: 0.0,
            peak_watts: 0.0,
            delta_percent: 0.0,
            charger_label: None,
            notes: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Elapsed time from start until `now`, or until `end_time` once closed.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        let end = self.end_time.unwrap_or(now);
        (end - self.start_time).to_std().unwrap_or(Duration::ZERO)
    }

    pub(crate) fn finalize(
        &mut self,
        end_time: DateTime<Utc>,
        average_watts: f64,
        delta_percent: f64,
    ) {
        self.end_time = Some(end_time);
        self.average_watts = average_watts;
        self.delta_percent = delta_percent;
    }
}

/// Metrics published after every controller step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MetricsSnapshot {
    pub session_id: Option<Uuid>,
    pub is_charging: bool,
    pub battery_level: f64,
    pub current_watts: f64,
    pub peak_watts: f64,
    pub average_watts: f64,
    #[serde(with = "duration_secs")]
    pub session_duration: Duration,
    #[serde(with = "duration_secs")]
    pub eta_to_full: Duration,
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO))
    }
}
