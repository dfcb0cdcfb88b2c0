// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolution of vendor functions into logical control modes.
//!
//! The vendor identifies functions by loose string tags rather than stable ids,
//! and the set of functions differs between models. [`Capabilities::resolve`]
//! matches each [`ControlMode`] against a fixed predicate table over the
//! device's flattened function list. A mode without a match is simply absent:
//! the device does not support it.
//!
//! # Examples
//!
//! ```
//! use daichi_bridge::Capabilities;
//! use daichi_bridge::types::{ControlMode, Device};
//!
//! let device: Device = serde_json::from_value(serde_json::json!({
//!     "id": 1,
//!     "pult": [{"functions": [
//!         {"id": 10, "state": {"isOn": true}, "metaData": {"bleTagInfo": {"bleTag": "power"}}}
//!     ]}]
//! })).unwrap();
//!
//! let capabilities = Capabilities::resolve(&device).unwrap();
//! assert!(capabilities.supports(ControlMode::IsOn));
//! assert!(!capabilities.supports(ControlMode::SetTemp));
//! ```

use std::collections::HashMap;

use crate::types::{CharacteristicProps, ControlMode, Device, PultFunction};

/// Value range maximum assumed when a device has no usable fan speed range.
const DEFAULT_FAN_SPEED_MAX: f64 = 20.0;

/// Predicate matching a function by tag, optional title and optional on-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionMatcher {
    /// Required BLE tag.
    pub tag: &'static str,
    /// Required title, if any.
    pub title: Option<&'static str>,
    /// Required on-command, if any.
    pub on_command: Option<&'static str>,
}

impl FunctionMatcher {
    /// Returns the matcher for a control mode.
    #[must_use]
    pub const fn for_mode(mode: ControlMode) -> Self {
        let (tag, title, on_command) = match mode {
            ControlMode::IsOn => ("power", None, None),
            ControlMode::SetTemp => ("setTemp", None, None),
            ControlMode::FanFlow => ("flow", Some("Vertical swing"), Some("vert_on")),
            ControlMode::FanSpeedAuto => ("fanSpeed", Some("Auto"), Some("0")),
            ControlMode::FanSpeed => ("fanSpeed", Some("Fan speed"), None),
            ControlMode::AutoMode => ("mode", None, Some("auto")),
            ControlMode::HeatMode => ("mode", Some("Heat"), Some("heat")),
            ControlMode::CoolMode => ("mode", Some("Cool"), Some("cool")),
        };
        Self {
            tag,
            title,
            on_command,
        }
    }

    /// Returns `true` if the function satisfies every constraint.
    #[must_use]
    pub fn matches(&self, function: &PultFunction) -> bool {
        function.ble_tag() == Some(self.tag)
            && self
                .title
                .is_none_or(|title| function.title.as_deref() == Some(title))
            && self
                .on_command
                .is_none_or(|cmd| function.on_command() == Some(cmd))
    }

    /// Returns the first matching function in list order.
    #[must_use]
    pub fn search<'a>(&self, functions: &[&'a PultFunction]) -> Option<&'a PultFunction> {
        functions.iter().copied().find(|f| self.matches(f))
    }
}

/// The functions a device exposes, keyed by control mode.
///
/// Built once per accessory; the function *values* inside are only used for
/// construction-time metadata (ranges), never as live state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    functions: HashMap<ControlMode, PultFunction>,
}

impl Capabilities {
    /// Resolves every control mode against the device's functions.
    ///
    /// Returns `None` if the device has no functions at all.
    #[must_use]
    pub fn resolve(device: &Device) -> Option<Self> {
        let flattened = device.functions();
        if flattened.is_empty() {
            return None;
        }

        let functions = ControlMode::ALL
            .into_iter()
            .filter_map(|mode| {
                FunctionMatcher::for_mode(mode)
                    .search(&flattened)
                    .map(|f| (mode, f.clone()))
            })
            .collect();

        Some(Self { functions })
    }

    /// Returns the function resolved for a mode.
    #[must_use]
    pub fn function(&self, mode: ControlMode) -> Option<&PultFunction> {
        self.functions.get(&mode)
    }

    /// Returns the vendor function id for a mode.
    #[must_use]
    pub fn function_id(&self, mode: ControlMode) -> Option<u64> {
        self.function(mode).map(|f| f.id)
    }

    /// Returns `true` if the device supports the mode.
    #[must_use]
    pub fn supports(&self, mode: ControlMode) -> bool {
        self.functions.contains_key(&mode)
    }

    /// Returns the number of resolved modes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if no mode resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Percentage points per raw fan speed unit.
    ///
    /// Computed as `floor(100 / max(range))` of the fan speed function, with a
    /// range maximum of 20 when the device reports none.
    #[must_use]
    pub fn fan_speed_min_step(&self) -> u32 {
        let max = self
            .function(ControlMode::FanSpeed)
            .and_then(|f| f.state.range_max())
            .filter(|m| *m > 0.0)
            .unwrap_or(DEFAULT_FAN_SPEED_MAX);

        // 100 / max is in (0, 100] for max >= 1, and 0 < max < 1 saturates
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let step = (100.0 / max).floor() as u32;
        step.max(1)
    }

    /// Props of the threshold temperature characteristics, taken from the
    /// target temperature function's range (`[0]` when unknown).
    #[must_use]
    pub fn threshold_props(&self) -> CharacteristicProps {
        let state = self.function(ControlMode::SetTemp).map(|f| &f.state);
        CharacteristicProps {
            min_value: state.and_then(|s| s.range_min()).unwrap_or(0.0),
            max_value: state.and_then(|s| s.range_max()).unwrap_or(0.0),
            min_step: 1.0,
        }
    }

    /// Props of the rotation speed characteristic.
    #[must_use]
    pub fn rotation_speed_props(&self) -> CharacteristicProps {
        CharacteristicProps {
            min_value: 0.0,
            max_value: 100.0,
            min_step: f64::from(self.fan_speed_min_step()),
        }
    }
}
