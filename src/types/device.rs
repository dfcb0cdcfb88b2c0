// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vendor device payloads.
//!
//! These types mirror the JSON the Daichi cloud returns for a device, both from
//! the REST API and from push notifications. Every field the bridge does not
//! strictly need is optional so that partial payloads still deserialize.

use serde::Deserialize;

use crate::error::ParseError;

/// Connectivity status reported for a device that is reachable.
pub const STATUS_CONNECTED: &str = "connected";

/// A read-only snapshot of one air conditioner.
///
/// # Examples
///
/// ```
/// use daichi_bridge::types::Device;
///
/// let device: Device = serde_json::from_str(
///     r#"{"id":5,"serial":"AC-5","status":"connected","curTemp":24,"state":{"isOn":true}}"#,
/// ).unwrap();
/// assert_eq!(device.id, 5);
/// assert_eq!(device.is_on(), Some(true));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Vendor device id.
    pub id: u64,
    /// Serial number, used as the accessory identity.
    #[serde(default)]
    pub serial: Option<String>,
    /// Connectivity status, `"connected"` when online.
    #[serde(default)]
    pub status: Option<String>,
    /// Measured room temperature.
    #[serde(default)]
    pub cur_temp: Option<f64>,
    /// Device-level power state.
    #[serde(default)]
    pub state: Option<DeviceStatus>,
    /// Groups of controllable functions.
    #[serde(default)]
    pub pult: Option<Vec<Pult>>,
    /// Brand, series and model.
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,
    /// User-assigned name.
    #[serde(default)]
    pub title: Option<String>,
}

impl Device {
    /// Returns the device-level power flag, if reported.
    #[must_use]
    pub fn is_on(&self) -> Option<bool> {
        self.state.as_ref().and_then(|s| s.is_on)
    }

    /// Flattens every function across all pult groups.
    ///
    /// A function carrying a linked function is immediately followed by that
    /// linked function, so both can be matched independently. Linking is a
    /// single level: a linked function's own link is not followed.
    #[must_use]
    pub fn functions(&self) -> Vec<&PultFunction> {
        self.pult
            .iter()
            .flatten()
            .filter_map(|p| p.functions.as_ref())
            .flatten()
            .flat_map(|f| std::iter::once(f).chain(f.linked_function.as_deref()))
            .collect()
    }
}

/// Device-level state record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    /// Whether the unit is switched on.
    #[serde(default)]
    pub is_on: Option<bool>,
}

/// Manufacturer information.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceInfo {
    /// Brand name.
    #[serde(default)]
    pub brand: Option<String>,
    /// Product series (the vendor spells it `seria`).
    #[serde(default)]
    pub seria: Option<String>,
    /// Model name.
    #[serde(default)]
    pub model: Option<String>,
}

/// A vendor grouping container for functions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Pult {
    /// The functions in this group.
    #[serde(default)]
    pub functions: Option<Vec<PultFunction>>,
}

/// A single controllable function of a device.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PultFunction {
    /// Vendor-assigned function id, used when sending commands.
    pub id: u64,
    /// Display title, e.g. `"Fan speed"`.
    #[serde(default)]
    pub title: Option<String>,
    /// Current value of the function.
    #[serde(default)]
    pub state: FunctionState,
    /// Tag information used to identify the function category.
    #[serde(default, rename = "metaData")]
    pub meta_data: Option<MetaData>,
    /// A paired function treated as a sibling when enumerating.
    #[serde(default)]
    pub linked_function: Option<Box<PultFunction>>,
}

impl PultFunction {
    /// Returns the BLE tag, e.g. `"mode"`.
    #[must_use]
    pub fn ble_tag(&self) -> Option<&str> {
        self.tag_info().and_then(|t| t.ble_tag.as_deref())
    }

    /// Returns the on-command sub-discriminator, e.g. `"heat"`.
    #[must_use]
    pub fn on_command(&self) -> Option<&str> {
        self.tag_info().and_then(|t| t.ble_on_command.as_deref())
    }

    fn tag_info(&self) -> Option<&BleTagInfo> {
        self.meta_data.as_ref().and_then(|m| m.ble_tag_info.as_ref())
    }
}

/// Value record of a function.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionState {
    /// Numeric value for valued functions (temperature, fan speed).
    #[serde(default)]
    pub value: Option<f64>,
    /// On/off flag for toggled functions (modes, swing).
    #[serde(default)]
    pub is_on: Option<bool>,
    /// Allowed values, used for min/max derivation.
    #[serde(default)]
    pub value_range: Option<Vec<f64>>,
}

impl FunctionState {
    /// Smallest value of the range, if the range is non-empty.
    #[must_use]
    pub fn range_min(&self) -> Option<f64> {
        self.value_range
            .as_deref()
            .and_then(|r| r.iter().copied().reduce(f64::min))
    }

    /// Largest value of the range, if the range is non-empty.
    #[must_use]
    pub fn range_max(&self) -> Option<f64> {
        self.value_range
            .as_deref()
            .and_then(|r| r.iter().copied().reduce(f64::max))
    }
}

/// Metadata block of a function.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaData {
    /// Tag information.
    #[serde(default)]
    pub ble_tag_info: Option<BleTagInfo>,
}

/// Tag and on-command of a function.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BleTagInfo {
    /// Category tag, e.g. `"power"`, `"setTemp"`, `"fanSpeed"`.
    #[serde(default)]
    pub ble_tag: Option<String>,
    /// Variant within the tag, e.g. `"auto"`, `"vert_on"`.
    #[serde(default)]
    pub ble_on_command: Option<String>,
}

/// A list of devices, as carried by push messages and command responses.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceList {
    /// The devices.
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl DeviceList {
    /// Parses a push notification body.
    ///
    /// # Errors
    ///
    /// Returns error if the payload is not a JSON device list.
    pub fn from_json(payload: &[u8]) -> Result<Self, ParseError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Finds the device with the given id.
    #[must_use]
    pub fn find(&self, id: u64) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }
}
