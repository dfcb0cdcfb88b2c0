// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logical device state shadow.

use crate::capabilities::Capabilities;
use crate::types::{ControlMode, Device, OperatingMode, STATUS_CONNECTED};

/// Mode functions checked when deriving the operating mode, in precedence order.
const MODE_PRECEDENCE: [ControlMode; 3] = [
    ControlMode::AutoMode,
    ControlMode::HeatMode,
    ControlMode::CoolMode,
];

/// In-memory state of one air conditioner, derived from the latest payload.
///
/// Fields are only ever overwritten by values present in a payload; a missing
/// field leaves the previous value in place. The one exception is `online`,
/// which follows the payload's `status` even when it is absent.
///
/// # Examples
///
/// ```
/// use daichi_bridge::state::DeviceState;
/// use daichi_bridge::types::Device;
///
/// let device: Device = serde_json::from_str(
///     r#"{"id":5,"status":"connected","curTemp":24,"state":{"isOn":true}}"#,
/// ).unwrap();
///
/// let mut state = DeviceState::new();
/// state.derive_from(&device);
/// assert_eq!(state.cur_temp(), 24.0);
/// assert!(state.power_state());
/// assert_eq!(state.online(), Some(true));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceState {
    cur_temp: f64,
    power_state: bool,
    online: Option<bool>,
    set_temp: f64,
    fan_speed: f64,
    auto_fan_speed_is_on: bool,
    mode: Option<OperatingMode>,
    swing_mode: bool,
}

impl DeviceState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the state in place from a device payload.
    ///
    /// Function-backed fields are resolved from the payload's own function
    /// list, so a payload without functions only touches the top-level fields.
    pub fn derive_from(&mut self, device: &Device) {
        if let Some(cur_temp) = device.cur_temp {
            self.cur_temp = cur_temp;
        }
        if let Some(is_on) = device.is_on() {
            self.power_state = is_on;
        }
        // Absent status is passed through as unknown, not kept
        self.online = device.status.as_deref().map(|s| s == STATUS_CONNECTED);

        let Some(functions) = Capabilities::resolve(device) else {
            return;
        };

        let state_of = |mode| functions.function(mode).map(|f| &f.state);

        if let Some(value) = state_of(ControlMode::SetTemp).and_then(|s| s.value) {
            self.set_temp = value;
        }
        if let Some(value) = state_of(ControlMode::FanSpeed).and_then(|s| s.value) {
            self.fan_speed = value;
        }
        if let Some(is_on) = state_of(ControlMode::FanSpeedAuto).and_then(|s| s.is_on) {
            self.auto_fan_speed_is_on = is_on;
        }
        if let Some(mode) = MODE_PRECEDENCE
            .into_iter()
            .filter_map(|m| functions.function(m))
            .find(|f| f.state.is_on == Some(true))
            .and_then(|f| f.on_command())
            .and_then(OperatingMode::from_on_command)
        {
            self.mode = Some(mode);
        }
        if let Some(is_on) = state_of(ControlMode::FanFlow).and_then(|s| s.is_on) {
            self.swing_mode = is_on;
        }
    }

    // ========== Accessors ==========

    /// Measured room temperature.
    #[must_use]
    pub fn cur_temp(&self) -> f64 {
        self.cur_temp
    }

    /// Whether the unit is switched on.
    #[must_use]
    pub fn power_state(&self) -> bool {
        self.power_state
    }

    /// Connectivity: `Some(true)` when connected, `None` when the last payload
    /// carried no status.
    #[must_use]
    pub fn online(&self) -> Option<bool> {
        self.online
    }

    /// Returns `true` only if the unit is known to be connected.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online == Some(true)
    }

    /// Target temperature.
    #[must_use]
    pub fn set_temp(&self) -> f64 {
        self.set_temp
    }

    /// Manual fan speed in raw vendor units.
    #[must_use]
    pub fn fan_speed(&self) -> f64 {
        self.fan_speed
    }

    /// Whether automatic fan speed is engaged.
    #[must_use]
    pub fn auto_fan_speed_is_on(&self) -> bool {
        self.auto_fan_speed_is_on
    }

    /// Current operating mode, if any mode function has been seen on.
    #[must_use]
    pub fn mode(&self) -> Option<OperatingMode> {
        self.mode
    }

    /// Whether vertical swing is on.
    #[must_use]
    pub fn swing_mode(&self) -> bool {
        self.swing_mode
    }
}
