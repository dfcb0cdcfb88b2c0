// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Control request payloads.

use std::fmt;

use serde::Serialize;

use crate::types::ControlMode;

/// Largest command correlation id the cloud accepts.
pub const MAX_COMMAND_ID: u32 = 99_999_999;

/// A value written to a vendor function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    /// On/off flag for toggled functions.
    Bool(bool),
    /// Numeric value for valued functions.
    Number(f64),
}

impl ControlValue {
    /// Returns the value as a number; `true` is 1.
    #[must_use]
    pub fn as_number(self) -> f64 {
        match self {
            Self::Bool(b) => f64::from(u8::from(b)),
            Self::Number(n) => n,
        }
    }

    /// Returns the value as a flag; any non-zero number is `true`.
    #[must_use]
    pub fn as_bool(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Number(n) => n != 0.0,
        }
    }
}

impl From<bool> for ControlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for ControlValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for ControlValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// The function part of a control request.
///
/// Exactly one of `value` and `is_on` is set, depending on the mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionControl {
    /// Vendor function id.
    pub function_id: u64,
    /// Numeric value, for [`ControlMode::SetTemp`] and [`ControlMode::FanSpeed`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// On/off flag, for every other mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_on: Option<bool>,
    /// Always `null`.
    pub parameters: Option<serde_json::Value>,
}

impl FunctionControl {
    /// Shapes a value for the given mode.
    #[must_use]
    pub fn new(mode: ControlMode, function_id: u64, value: ControlValue) -> Self {
        let (value, is_on) = if mode.is_valued() {
            (Some(value.as_number()), None)
        } else {
            (None, Some(value.as_bool()))
        };
        Self {
            function_id,
            value,
            is_on,
            parameters: None,
        }
    }
}

/// Body of `POST devices/{id}/ctrl`.
///
/// # Examples
///
/// ```
/// use daichi_bridge::command::{ControlRequest, ControlValue};
/// use daichi_bridge::types::ControlMode;
///
/// let request = ControlRequest::new(ControlMode::SetTemp, 42, ControlValue::Number(23.0));
/// let json = serde_json::to_value(&request).unwrap();
///
/// assert_eq!(json["value"]["functionId"], 42);
/// assert_eq!(json["value"]["value"], 23.0);
/// assert!(json["value"].get("isOn").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    /// Random correlation id in `0..=99_999_999`.
    pub cmd_id: u32,
    /// The function being written.
    pub value: FunctionControl,
    /// Always `null`.
    pub conflict_resolve_data: Option<serde_json::Value>,
}

impl ControlRequest {
    /// Builds a request with a fresh correlation id.
    #[must_use]
    pub fn new(mode: ControlMode, function_id: u64, value: ControlValue) -> Self {
        Self {
            cmd_id: random_command_id(),
            value: FunctionControl::new(mode, function_id, value),
            conflict_resolve_data: None,
        }
    }
}

fn random_command_id() -> u32 {
    let id = uuid::Uuid::new_v4().as_u128() % (u128::from(MAX_COMMAND_ID) + 1);
    // Bounded by MAX_COMMAND_ID above
    u32::try_from(id).unwrap_or(MAX_COMMAND_ID)
}
