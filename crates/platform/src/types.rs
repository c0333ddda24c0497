//! Conversions from `starship-battery` types.

use trickle_core::ChargeState;

/// Maps the battery crate's state onto the states the controller reacts to.
///
/// An empty battery is still on battery power, so it maps to `Unplugged`.
pub fn charge_state_from(state: starship_battery::State) -> ChargeState {
    match state {
        starship_battery::State::Charging => ChargeState::Charging,
        starship_battery::State::Discharging => ChargeState::Unplugged,
        starship_battery::State::Empty => ChargeState::Unplugged,
        starship_battery::State::Full => ChargeState::Full,
        starship_battery::State::Unknown => ChargeState::Unknown,
    }
}
