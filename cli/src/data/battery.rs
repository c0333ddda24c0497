use color_eyre::eyre::Result;
use trickle_core::{CapacityProvider, ControllerEvent, FixedCapacity};
use trickle_platform::{BatteryInfo, BatteryProvider, SystemBattery, SystemCapacity};

use crate::config::UserConfig;

/// Polls a battery provider and reports state/level changes as controller
/// events.
pub struct BatteryData<B: BatteryProvider = SystemBattery> {
    provider: B,
    last: Option<BatteryInfo>,
}

impl BatteryData<SystemBattery> {
    pub fn new() -> Result<Self> {
        Ok(Self::with_provider(SystemBattery::new()?))
    }
}

impl<B: BatteryProvider> BatteryData<B> {
    pub fn with_provider(provider: B) -> Self {
        Self {
            provider,
            last: None,
        }
    }

    pub fn info(&self) -> &BatteryInfo {
        self.provider.info()
    }

    pub fn level(&self) -> f64 {
        self.provider.info().level
    }

    /// The current reading as an event, regardless of whether it changed.
    /// Used for the initial snapshot.
    pub fn current_event(&mut self) -> ControllerEvent {
        let info = self.provider.info().clone();
        let event = info.as_event();
        self.last = Some(info);
        event
    }

    /// Refreshes the provider and returns an event only when the state or
    /// level moved since the last report.
    pub fn poll(&mut self) -> Result<Option<ControllerEvent>> {
        self.provider.refresh()?;
        let info = self.provider.info();

        let changed = self
            .last
            .as_ref()
            .map_or(true, |last| info.changed_from(last));
        if !changed {
            return Ok(None);
        }

        let info = info.clone();
        let event = info.as_event();
        self.last = Some(info);
        Ok(Some(event))
    }

    /// Capacity source for the controller: the configured override, or the
    /// battery's own energy rating.
    pub fn capacity_provider(&self, config: &UserConfig) -> Box<dyn CapacityProvider> {
        let voltage = config.estimator.nominal_voltage;
        if let Some(mah) = config.capacity_override() {
            match trickle_core::CapacityInput::new(mah, voltage) {
                Ok(capacity) => return Box::new(FixedCapacity(capacity)),
                Err(e) => tracing::warn!(error = %e, "Ignoring configured capacity"),
            }
        }
        Box::new(SystemCapacity::from_info(self.provider.info(), voltage))
    }

    #[cfg(test)]
    pub(crate) fn provider_mut(&mut self) -> &mut B {
        &mut self.provider
    }
}

/// Battery that replays queued readings, one per refresh.
#[cfg(test)]
pub(crate) struct ScriptedBattery {
    pub readings: Vec<(trickle_core::ChargeState, f64)>,
    pub info: BatteryInfo,
}

#[cfg(test)]
impl BatteryProvider for ScriptedBattery {
    fn new() -> Result<Self> {
        Ok(Self {
            readings: Vec::new(),
            info: BatteryInfo::default(),
        })
    }

    fn refresh(&mut self) -> Result<()> {
        if !self.readings.is_empty() {
            let (state, level) = self.readings.remove(0);
            self.info.state = state;
            self.info.level = level;
        }
        Ok(())
    }

    fn info(&self) -> &BatteryInfo {
        &self.info
    }
}

#[cfg(test)]
pub(crate) fn scripted(
    readings: &[(trickle_core::ChargeState, f64)],
) -> BatteryData<ScriptedBattery> {
    let battery = ScriptedBattery {
        readings: readings.to_vec(),
        info: BatteryInfo::default(),
    };
    BatteryData::with_provider(battery)
}
