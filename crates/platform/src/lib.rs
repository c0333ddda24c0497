//! Battery access for trickle.
//!
//! Reads the system battery through `starship-battery` and adapts it to the
//! collaborator traits of `trickle-core`: level and charge state feed the
//! controller, full-charge energy feeds the capacity provider.
//!
//! # Example
//!
//! ```ignore
//! use trickle_platform::{BatteryProvider, SystemBattery};
//!
//! let mut battery = SystemBattery::new()?;
//! battery.refresh()?;
//! println!("Level: {:.0}%", battery.info().level * 100.0);
//! ```

mod battery;
mod capacity;
mod types;

pub use battery::{BatteryInfo, BatteryProvider, SystemBattery};
pub use capacity::SystemCapacity;
pub use types::charge_state_from;
