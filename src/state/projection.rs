// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Projection of the shadow onto heater-cooler characteristics.
//!
//! Every function here is pure: it reads shadow fields and returns the value a
//! host would display. [`ProjectedState`] captures all of them at once so two
//! snapshots can be diffed.

use crate::types::{
    Active, Characteristic, CharacteristicValue, CurrentHeaterCoolerState, OperatingMode,
    SwingMode, TargetHeaterCoolerState,
};

use super::DeviceState;

/// `Active` is on only when the unit is powered and known to be connected.
#[must_use]
pub fn active(state: &DeviceState) -> Active {
    if state.power_state() && state.is_online() {
        Active::Active
    } else {
        Active::Inactive
    }
}

/// Measured temperature, passed through.
#[must_use]
pub fn current_temperature(state: &DeviceState) -> f64 {
    state.cur_temp()
}

/// What the unit is doing right now.
///
/// An explicit heat or cool mode wins; otherwise the direction is inferred
/// from the measured temperature relative to the setpoint.
#[must_use]
pub fn current_heater_cooler_state(state: &DeviceState) -> CurrentHeaterCoolerState {
    if !state.power_state() || !state.is_online() {
        return CurrentHeaterCoolerState::Inactive;
    }
    match state.mode() {
        Some(OperatingMode::Heat) => CurrentHeaterCoolerState::Heating,
        Some(OperatingMode::Cool) => CurrentHeaterCoolerState::Cooling,
        Some(OperatingMode::Auto) | None => {
            if state.cur_temp() > state.set_temp() {
                CurrentHeaterCoolerState::Cooling
            } else if state.cur_temp() < state.set_temp() {
                CurrentHeaterCoolerState::Heating
            } else {
                CurrentHeaterCoolerState::Idle
            }
        }
    }
}

/// Requested operating mode; unset maps to `Auto`.
#[must_use]
pub fn target_heater_cooler_state(state: &DeviceState) -> TargetHeaterCoolerState {
    match state.mode() {
        Some(OperatingMode::Cool) => TargetHeaterCoolerState::Cool,
        Some(OperatingMode::Heat) => TargetHeaterCoolerState::Heat,
        Some(OperatingMode::Auto) | None => TargetHeaterCoolerState::Auto,
    }
}

/// Setpoint shared by both threshold characteristics.
#[must_use]
pub fn threshold_temperature(state: &DeviceState) -> f64 {
    state.set_temp()
}

/// Vertical swing.
#[must_use]
pub fn swing_mode(state: &DeviceState) -> SwingMode {
    if state.swing_mode() {
        SwingMode::Enabled
    } else {
        SwingMode::Disabled
    }
}

/// Fan speed as a percentage: 0 under automatic fan, otherwise raw units
/// times the step.
#[must_use]
pub fn rotation_speed(state: &DeviceState, fan_speed_min_step: u32) -> f64 {
    if state.auto_fan_speed_is_on() {
        0.0
    } else {
        state.fan_speed() * f64::from(fan_speed_min_step)
    }
}

/// Projects a single characteristic.
#[must_use]
pub fn project(
    state: &DeviceState,
    characteristic: Characteristic,
    fan_speed_min_step: u32,
) -> CharacteristicValue {
    match characteristic {
        Characteristic::Active => CharacteristicValue::Active(active(state)),
        Characteristic::CurrentTemperature => {
            CharacteristicValue::Temperature(current_temperature(state))
        }
        Characteristic::CurrentHeaterCoolerState => {
            CharacteristicValue::CurrentState(current_heater_cooler_state(state))
        }
        Characteristic::TargetHeaterCoolerState => {
            CharacteristicValue::TargetState(target_heater_cooler_state(state))
        }
        Characteristic::CoolingThresholdTemperature
        | Characteristic::HeatingThresholdTemperature => {
            CharacteristicValue::Temperature(threshold_temperature(state))
        }
        Characteristic::SwingMode => CharacteristicValue::Swing(swing_mode(state)),
        Characteristic::RotationSpeed => {
            CharacteristicValue::Percentage(rotation_speed(state, fan_speed_min_step))
        }
    }
}

/// A snapshot of every characteristic value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedState {
    values: [CharacteristicValue; Characteristic::ALL.len()],
}

impl ProjectedState {
    /// Projects every characteristic of the given state.
    #[must_use]
    pub fn of(state: &DeviceState, fan_speed_min_step: u32) -> Self {
        Self {
            values: Characteristic::ALL.map(|c| project(state, c, fan_speed_min_step)),
        }
    }

    /// Returns the value of one characteristic.
    #[must_use]
    pub fn get(&self, characteristic: Characteristic) -> CharacteristicValue {
        let index = Characteristic::ALL
            .iter()
            .position(|c| *c == characteristic)
            .unwrap_or_default();
        self.values[index]
    }

    /// Iterates over `(characteristic, value)` pairs in notification order.
    pub fn iter(&self) -> impl Iterator<Item = (Characteristic, CharacteristicValue)> + '_ {
        Characteristic::ALL.into_iter().zip(self.values.iter().copied())
    }
}
