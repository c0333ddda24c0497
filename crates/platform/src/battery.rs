//! Battery monitoring traits and types.

use color_eyre::eyre::{eyre, Result};
use starship_battery::units::energy::watt_hour;
use starship_battery::units::ratio::ratio;
use starship_battery::Manager;
use trickle_core::{ChargeState, ControllerEvent};

use crate::types::charge_state_from;

/// Battery information snapshot.
///
/// All values represent the state at the time of the last refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatteryInfo {
    /// Current charge level as a fraction (0.0-1.0).
    pub level: f64,

    /// Current charging state.
    pub state: ChargeState,

    /// Energy at full charge in watt-hours.
    pub full_energy_wh: f64,

    /// Design energy in watt-hours.
    pub design_energy_wh: f64,

    pub vendor: Option<String>,
    pub model: Option<String>,
}

impl BatteryInfo {
    /// The observer notification for this snapshot.
    pub fn as_event(&self) -> ControllerEvent {
        ControllerEvent::BatteryChanged {
            state: self.state,
            level: self.level,
        }
    }

    /// True when the state or level differs from `other`.
    pub fn changed_from(&self, other: &BatteryInfo) -> bool {
        self.state != other.state || (self.level - other.level).abs() > f64::EPSILON
    }
}

/// Trait for battery providers.
pub trait BatteryProvider {
    /// Create a new battery provider instance.
    fn new() -> Result<Self>
    where
        Self: Sized;

    /// Refresh battery information from the system.
    fn refresh(&mut self) -> Result<()>;

    /// Get the current battery information.
    fn info(&self) -> &BatteryInfo;
}

/// The first system battery, read through `starship-battery`.
pub struct SystemBattery {
    info: BatteryInfo,
    manager: Manager,
}

impl BatteryProvider for SystemBattery {
    fn new() -> Result<Self> {
        let manager = Manager::new()?;
        let mut provider = Self {
            info: BatteryInfo::default(),
            manager,
        };
        provider.refresh()?;
        Ok(provider)
    }

    fn refresh(&mut self) -> Result<()> {
        let mut battery = self
            .manager
            .batteries()?
            .next()
            .ok_or_else(|| eyre!("No battery found"))??;

        self.manager.refresh(&mut battery)?;

        self.info.level = f64::from(battery.state_of_charge().get::<ratio>()).clamp(0.0, 1.0);
        self.info.state = charge_state_from(battery.state());
        self.info.full_energy_wh = f64::from(battery.energy_full().get::<watt_hour>());
        self.info.design_energy_wh = f64::from(battery.energy_full_design().get::<watt_hour>());
        self.info.vendor = battery.vendor().map(str::to_string);
        self.info.model = battery.model().map(str::to_string);

        Ok(())
    }

    fn info(&self) -> &BatteryInfo {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(state: ChargeState, level: f64) -> BatteryInfo {
        BatteryInfo {
            level,
            state,
            ..Default::default()
        }
    }

    #[test]
    fn test_change_detection() {
        let base = info(ChargeState::Charging, 0.5);
        assert!(!base.changed_from(&base.clone()));
        assert!(info(ChargeState::Full, 0.5).changed_from(&base));
        assert!(info(ChargeState::Charging, 0.51).changed_from(&base));
    }

    #[test]
    fn test_as_event() {
        let event = info(ChargeState::Unplugged, 0.3).as_event();
        assert_eq!(
            event,
            ControllerEvent::BatteryChanged {
                state: ChargeState::Unplugged,
                level: 0.3
            }
        );
    }
}
