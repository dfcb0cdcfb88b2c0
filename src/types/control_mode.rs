// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logical control modes and operating modes.

use std::fmt;

/// A logical control capability of an air conditioner.
///
/// Each mode resolves to at most one vendor function per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlMode {
    /// Power on/off.
    IsOn,
    /// Target temperature.
    SetTemp,
    /// Manual fan speed, in raw vendor units.
    FanSpeed,
    /// Automatic fan speed.
    FanSpeedAuto,
    /// Vertical swing.
    FanFlow,
    /// Automatic operating mode.
    AutoMode,
    /// Heating operating mode.
    HeatMode,
    /// Cooling operating mode.
    CoolMode,
}

impl ControlMode {
    /// All control modes, in resolution order.
    pub const ALL: [Self; 8] = [
        Self::IsOn,
        Self::SetTemp,
        Self::FanFlow,
        Self::FanSpeedAuto,
        Self::FanSpeed,
        Self::AutoMode,
        Self::HeatMode,
        Self::CoolMode,
    ];

    /// Returns `true` if commands for this mode carry a numeric `value`
    /// rather than an `isOn` flag.
    #[must_use]
    pub const fn is_valued(self) -> bool {
        matches!(self, Self::SetTemp | Self::FanSpeed)
    }

    /// Returns the mode name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IsOn => "IsOn",
            Self::SetTemp => "SetTemp",
            Self::FanSpeed => "FanSpeed",
            Self::FanSpeedAuto => "FanSpeedAuto",
            Self::FanFlow => "FanFlow",
            Self::AutoMode => "AutoMode",
            Self::HeatMode => "HeatMode",
            Self::CoolMode => "CoolMode",
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operating mode a unit currently runs in.
///
/// Parsed from the on-command of whichever mode function is switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatingMode {
    /// Automatic.
    Auto,
    /// Heating.
    Heat,
    /// Cooling.
    Cool,
}

impl OperatingMode {
    /// Parses a vendor on-command string.
    #[must_use]
    pub fn from_on_command(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(Self::Auto),
            "heat" => Some(Self::Heat),
            "cool" => Some(Self::Cool),
            _ => None,
        }
    }

    /// Returns the vendor on-command string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Heat => "heat",
            Self::Cool => "cool",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valued_modes() {
        assert!(ControlMode::SetTemp.is_valued());
        assert!(ControlMode::FanSpeed.is_valued());
        assert!(!ControlMode::FanSpeedAuto.is_valued());
        assert!(!ControlMode::IsOn.is_valued());
        assert!(!ControlMode::CoolMode.is_valued());
    }

    #[test]
    fn operating_mode_from_on_command() {
        assert_eq!(OperatingMode::from_on_command("heat"), Some(OperatingMode::Heat));
        assert_eq!(OperatingMode::from_on_command("cool"), Some(OperatingMode::Cool));
        assert_eq!(OperatingMode::from_on_command("auto"), Some(OperatingMode::Auto));
        assert_eq!(OperatingMode::from_on_command("dry"), None);
    }

    #[test]
    fn every_mode_listed_once() {
        let mut modes = ControlMode::ALL.to_vec();
        modes.sort();
        modes.dedup();
        assert_eq!(modes.len(), ControlMode::ALL.len());
    }
}
