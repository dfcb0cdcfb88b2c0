// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heater-cooler characteristics exposed to the accessory host.
//!
//! The numeric values of the enums follow the accessory protocol's encoding so
//! hosts can forward [`CharacteristicValue::as_f64`] unchanged.

use std::fmt;

/// A characteristic of the heater-cooler service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    /// Whether the unit is running.
    Active,
    /// Measured room temperature.
    CurrentTemperature,
    /// What the unit is currently doing.
    CurrentHeaterCoolerState,
    /// The requested operating mode.
    TargetHeaterCoolerState,
    /// Cooling setpoint.
    CoolingThresholdTemperature,
    /// Heating setpoint.
    HeatingThresholdTemperature,
    /// Vertical swing.
    SwingMode,
    /// Fan speed as a percentage.
    RotationSpeed,
}

impl Characteristic {
    /// Every characteristic, in notification order.
    pub const ALL: [Self; 8] = [
        Self::Active,
        Self::CurrentTemperature,
        Self::CurrentHeaterCoolerState,
        Self::TargetHeaterCoolerState,
        Self::CoolingThresholdTemperature,
        Self::HeatingThresholdTemperature,
        Self::SwingMode,
        Self::RotationSpeed,
    ];

    /// Returns `true` if the host may write this characteristic.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        !matches!(
            self,
            Self::CurrentTemperature | Self::CurrentHeaterCoolerState
        )
    }

    /// Returns the characteristic name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::CurrentTemperature => "CurrentTemperature",
            Self::CurrentHeaterCoolerState => "CurrentHeaterCoolerState",
            Self::TargetHeaterCoolerState => "TargetHeaterCoolerState",
            Self::CoolingThresholdTemperature => "CoolingThresholdTemperature",
            Self::HeatingThresholdTemperature => "HeatingThresholdTemperature",
            Self::SwingMode => "SwingMode",
            Self::RotationSpeed => "RotationSpeed",
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Active` characteristic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Active {
    /// Not running.
    Inactive = 0,
    /// Running.
    Active = 1,
}

/// `CurrentHeaterCoolerState` characteristic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurrentHeaterCoolerState {
    /// Off or unreachable.
    Inactive = 0,
    /// On, at target.
    Idle = 1,
    /// Heating.
    Heating = 2,
    /// Cooling.
    Cooling = 3,
}

/// `TargetHeaterCoolerState` characteristic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetHeaterCoolerState {
    /// Automatic.
    Auto = 0,
    /// Heat.
    Heat = 1,
    /// Cool.
    Cool = 2,
}

impl TargetHeaterCoolerState {
    /// Decodes a raw protocol value. Unknown values map to `Auto`.
    #[must_use]
    pub fn from_raw(raw: f64) -> Self {
        if raw == f64::from(Self::Heat as u8) {
            Self::Heat
        } else if raw == f64::from(Self::Cool as u8) {
            Self::Cool
        } else {
            Self::Auto
        }
    }
}

/// `SwingMode` characteristic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwingMode {
    /// Swing off.
    Disabled = 0,
    /// Swing on.
    Enabled = 1,
}

/// A projected characteristic value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CharacteristicValue {
    /// Value of [`Characteristic::Active`].
    Active(Active),
    /// A temperature in degrees Celsius.
    Temperature(f64),
    /// Value of [`Characteristic::CurrentHeaterCoolerState`].
    CurrentState(CurrentHeaterCoolerState),
    /// Value of [`Characteristic::TargetHeaterCoolerState`].
    TargetState(TargetHeaterCoolerState),
    /// Value of [`Characteristic::SwingMode`].
    Swing(SwingMode),
    /// A percentage in 0..=100.
    Percentage(f64),
}

impl CharacteristicValue {
    /// Returns the raw protocol value.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Active(v) => f64::from(v as u8),
            Self::CurrentState(v) => f64::from(v as u8),
            Self::TargetState(v) => f64::from(v as u8),
            Self::Swing(v) => f64::from(v as u8),
            Self::Temperature(v) | Self::Percentage(v) => v,
        }
    }

    /// Returns `false` for values the host cannot display (non-finite numbers).
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.as_f64().is_finite()
    }
}

impl fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active(v) => write!(f, "{v:?}"),
            Self::CurrentState(v) => write!(f, "{v:?}"),
            Self::TargetState(v) => write!(f, "{v:?}"),
            Self::Swing(v) => write!(f, "{v:?}"),
            Self::Temperature(v) => write!(f, "{v}\u{00b0}C"),
            Self::Percentage(v) => write!(f, "{v}%"),
        }
    }
}

/// Range metadata of a numeric characteristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacteristicProps {
    /// Smallest accepted value.
    pub min_value: f64,
    /// Largest accepted value.
    pub max_value: f64,
    /// Granularity.
    pub min_step: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_follow_protocol() {
        assert_eq!(CharacteristicValue::Active(Active::Active).as_f64(), 1.0);
        assert_eq!(
            CharacteristicValue::CurrentState(CurrentHeaterCoolerState::Cooling).as_f64(),
            3.0
        );
        assert_eq!(
            CharacteristicValue::TargetState(TargetHeaterCoolerState::Heat).as_f64(),
            1.0
        );
        assert_eq!(CharacteristicValue::Swing(SwingMode::Disabled).as_f64(), 0.0);
    }

    #[test]
    fn target_state_from_raw() {
        assert_eq!(TargetHeaterCoolerState::from_raw(1.0), TargetHeaterCoolerState::Heat);
        assert_eq!(TargetHeaterCoolerState::from_raw(2.0), TargetHeaterCoolerState::Cool);
        assert_eq!(TargetHeaterCoolerState::from_raw(0.0), TargetHeaterCoolerState::Auto);
        assert_eq!(TargetHeaterCoolerState::from_raw(7.0), TargetHeaterCoolerState::Auto);
    }

    #[test]
    fn nan_is_not_defined() {
        assert!(!CharacteristicValue::Temperature(f64::NAN).is_defined());
        assert!(CharacteristicValue::Temperature(21.0).is_defined());
    }

    #[test]
    fn read_only_characteristics() {
        assert!(!Characteristic::CurrentTemperature.is_writable());
        assert!(!Characteristic::CurrentHeaterCoolerState.is_writable());
        assert!(Characteristic::RotationSpeed.is_writable());
    }
}
