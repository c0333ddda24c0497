//! Capacity provider backed by the battery's reported energy.

use trickle_core::{CapacityError, CapacityInput, CapacityProvider};

use crate::battery::BatteryInfo;

/// Derives milliamp-hours from the full-charge energy and a nominal voltage.
///
/// Falls back to the design energy when the full-charge energy is missing.
#[derive(Debug, Clone, Copy)]
pub struct SystemCapacity {
    energy_wh: f64,
    nominal_voltage: f64,
}

impl SystemCapacity {
    pub fn new(energy_wh: f64, nominal_voltage: f64) -> Self {
        Self {
            energy_wh,
            nominal_voltage,
        }
    }

    pub fn from_info(info: &BatteryInfo, nominal_voltage: f64) -> Self {
        let energy_wh = if info.full_energy_wh > 0.0 {
            info.full_energy_wh
        } else {
            info.design_energy_wh
        };
        Self::new(energy_wh, nominal_voltage)
    }
}

impl CapacityProvider for SystemCapacity {
    fn capacity(&self) -> Result<CapacityInput, CapacityError> {
        if self.energy_wh <= 0.0 {
            return Err(CapacityError::Unavailable(
                "battery reports no energy capacity".to_string(),
            ));
        }
        CapacityInput::from_watt_hours(self.energy_wh, self.nominal_voltage)
    }
}
