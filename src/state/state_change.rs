// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Change detection between projected snapshots.
//!
//! After every re-derivation of the shadow, the old and new projections are
//! compared characteristic by characteristic. A change is reported only when
//! the new value is defined and differs from the old one.
//!
//! # Examples
//!
//! ```
//! use daichi_bridge::state::{changes_since, check_and_update};
//! use daichi_bridge::types::{Characteristic, CharacteristicValue};
//!
//! let old = CharacteristicValue::Temperature(22.0);
//! let new = CharacteristicValue::Temperature(23.0);
//!
//! let change = check_and_update(old, new, Characteristic::CurrentTemperature).unwrap();
//! assert_eq!(change.value, new);
//!
//! assert!(check_and_update(new, new, Characteristic::CurrentTemperature).is_none());
//! ```

use crate::types::{Characteristic, CharacteristicValue};

use super::ProjectedState;

/// A characteristic whose projected value changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateChange {
    /// The characteristic that changed.
    pub characteristic: Characteristic,
    /// Its new value.
    pub value: CharacteristicValue,
}

/// Compares two projections of one characteristic.
///
/// Returns the change to notify, or `None` when the new value is undefined
/// or equal to the old one.
#[must_use]
pub fn check_and_update(
    old: CharacteristicValue,
    new: CharacteristicValue,
    characteristic: Characteristic,
) -> Option<StateChange> {
    (new.is_defined() && new != old).then_some(StateChange {
        characteristic,
        value: new,
    })
}

/// Diffs two snapshots, in notification order.
#[must_use]
pub fn changes_since(old: &ProjectedState, new: &ProjectedState) -> Vec<StateChange> {
    old.iter()
        .zip(new.iter())
        .filter_map(|((characteristic, before), (_, after))| {
            check_and_update(before, after, characteristic)
        })
        .collect()
}
