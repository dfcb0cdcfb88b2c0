// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the bridge.
//!
//! # Types
//!
//! - [`Device`], [`PultFunction`] and friends - vendor device payloads
//! - [`ControlMode`] - the fixed vocabulary of logical controls
//! - [`OperatingMode`] - auto/heat/cool as reported by the unit
//! - [`Characteristic`], [`CharacteristicValue`] - what the accessory host sees

mod characteristic;
mod control_mode;
mod device;

pub use characteristic::{
    Active, Characteristic, CharacteristicProps, CharacteristicValue, CurrentHeaterCoolerState,
    SwingMode, TargetHeaterCoolerState,
};
pub use control_mode::{ControlMode, OperatingMode};
pub use device::{
    BleTagInfo, Device, DeviceInfo, DeviceList, DeviceStatus, FunctionState, MetaData, Pult,
    PultFunction, STATUS_CONNECTED,
};
