// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Control commands.
//!
//! A command writes one value to one vendor function:
//!
//! | Mode | Payload field | Example |
//! |------|---------------|---------|
//! | [`ControlMode::SetTemp`](crate::types::ControlMode::SetTemp) | `value` | `23` |
//! | [`ControlMode::FanSpeed`](crate::types::ControlMode::FanSpeed) | `value` | `3` |
//! | every other mode | `isOn` | `true` |
//!
//! [`ControlRequest`] is the wire body; [`CommandDispatcher`] sends it and
//! handles re-login.
//!
//! # Examples
//!
//! ```
//! use daichi_bridge::command::{ControlRequest, ControlValue};
//! use daichi_bridge::types::ControlMode;
//!
//! let request = ControlRequest::new(ControlMode::IsOn, 7, ControlValue::Bool(false));
//! let json = serde_json::to_value(&request).unwrap();
//!
//! assert_eq!(json["value"]["isOn"], false);
//! assert!(json["cmdId"].as_u64().unwrap() <= 99_999_999);
//! ```

mod control;
mod dispatcher;

pub use control::{ControlRequest, ControlValue, FunctionControl, MAX_COMMAND_ID};
pub use dispatcher::{CommandDispatcher, DEFAULT_MAX_RETRIES};
