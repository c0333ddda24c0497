//! Shared types for charge estimation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CapacityError;

/// Nominal lithium cell voltage used when the device does not report one.
pub const DEFAULT_NOMINAL_VOLTAGE: f64 = 3.82;

/// Capacity assumed when no device-specific value is known.
pub const FALLBACK_CAPACITY_MAH: f64 = 3000.0;

/// Device charging state as reported by the battery observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeState {
    /// Battery is actively charging
    Charging,
    /// Battery is full, charger may still be attached
    Full,
    /// Running on battery power
    Unplugged,
    /// State cannot be determined
    #[default]
    Unknown,
}

impl ChargeState {
    /// Returns a human-readable label for the charge state.
    pub fn label(&self) -> &'static str {
        match self {
            ChargeState::Charging => "Charging",
            ChargeState::Full => "Full",
            ChargeState::Unplugged => "Unplugged",
            ChargeState::Unknown => "Unknown",
        }
    }

    /// Returns true if the battery is currently charging.
    pub fn is_charging(&self) -> bool {
        matches!(self, ChargeState::Charging)
    }
}

impl fmt::Display for ChargeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A single battery level reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    /// Charge level as a fraction in `[0, 1]`.
    pub level: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, level: f64) -> Self {
        Self { timestamp, level }
    }
}

/// Battery capacity used for a single computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityInput {
    pub milliamp_hours: f64,
    pub nominal_voltage: f64,
}

impl CapacityInput {
    /// Validates and builds a capacity value.
    ///
    /// Non-finite or non-positive values are rejected here so the estimator
    /// never has to guard against them.
    pub fn new(milliamp_hours: f64, nominal_voltage: f64) -> Result<Self, CapacityError> {
        if !milliamp_hours.is_finite() || milliamp_hours <= 0.0 {
            return Err(CapacityError::Invalid {
                field: "milliamp_hours",
                value: milliamp_hours,
            });
        }
        if !nominal_voltage.is_finite() || nominal_voltage <= 0.0 {
            return Err(CapacityError::Invalid {
                field: "nominal_voltage",
                value: nominal_voltage,
            });
        }
        Ok(Self {
            milliamp_hours,
            nominal_voltage,
        })
    }

    /// Conservative default used when the capacity provider has nothing.
    pub fn fallback() -> Self {
        Self {
            milliamp_hours: FALLBACK_CAPACITY_MAH,
            nominal_voltage: DEFAULT_NOMINAL_VOLTAGE,
        }
    }

    /// Builds a capacity from an energy rating in watt-hours.
    pub fn from_watt_hours(watt_hours: f64, nominal_voltage: f64) -> Result<Self, CapacityError> {
        if !nominal_voltage.is_finite() || nominal_voltage <= 0.0 {
            return Err(CapacityError::Invalid {
                field: "nominal_voltage",
                value: nominal_voltage,
            });
        }
        Self::new(watt_hours / nominal_voltage * 1000.0, nominal_voltage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_state_labels() {
        assert_eq!(ChargeState::Charging.label(), "Charging");
        assert_eq!(ChargeState::Full.label(), "Full");
        assert_eq!(ChargeState::Unplugged.label(), "Unplugged");
        assert_eq!(ChargeState::Unknown.label(), "Unknown");
    }

    #[test]
    fn test_only_charging_is_charging() {
        assert!(ChargeState::Charging.is_charging());
        assert!(!ChargeState::Full.is_charging());
        assert!(!ChargeState::Unplugged.is_charging());
        assert!(!ChargeState::Unknown.is_charging());
    }

    #[test]
    fn test_capacity_rejects_invalid_values() {
        assert!(CapacityInput::new(-1.0, 3.82).is_err());
        assert!(CapacityInput::new(0.0, 3.82).is_err());
        assert!(CapacityInput::new(f64::NAN, 3.82).is_err());
        assert!(CapacityInput::new(3000.0, 0.0).is_err());
        assert!(CapacityInput::new(3000.0, 3.82).is_ok());
    }

    #[test]
    fn test_capacity_from_watt_hours() {
        let capacity = CapacityInput::from_watt_hours(11.46, 3.82).unwrap();
        assert!((capacity.milliamp_hours - 3000.0).abs() < 0.01);
        assert!(CapacityInput::from_watt_hours(0.0, 3.82).is_err());
        assert!(CapacityInput::from_watt_hours(11.46, -3.82).is_err());
    }

    #[test]
    fn test_fallback_capacity() {
        let capacity = CapacityInput::fallback();
        assert_eq!(capacity.milliamp_hours, FALLBACK_CAPACITY_MAH);
        assert_eq!(capacity.nominal_voltage, DEFAULT_NOMINAL_VOLTAGE);
    }
}
