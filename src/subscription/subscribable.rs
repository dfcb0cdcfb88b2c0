// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for accessories that push value updates.

use crate::state::StateChange;
use crate::subscription::SubscriptionId;
use crate::types::{Characteristic, CharacteristicValue};

/// Trait for types that notify characteristic changes.
///
/// Notifications fire after a command response or push update changed a
/// projected value. They never fire for the initial state.
///
/// # Examples
///
/// ```no_run
/// use daichi_bridge::subscription::Subscribable;
/// use daichi_bridge::types::Characteristic;
///
/// fn watch(accessory: &impl Subscribable) {
///     accessory.on_characteristic_changed(Characteristic::CurrentTemperature, |value| {
///         println!("Temperature is now {value}");
///     });
///
///     let id = accessory.on_change(|change| {
///         println!("{} -> {}", change.characteristic, change.value);
///     });
///     accessory.unsubscribe(id);
/// }
/// ```
pub trait Subscribable {
    /// Subscribes to changes of one characteristic.
    fn on_characteristic_changed<F>(
        &self,
        characteristic: Characteristic,
        callback: F,
    ) -> SubscriptionId
    where
        F: Fn(CharacteristicValue) + Send + Sync + 'static;

    /// Subscribes to every change.
    fn on_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static;

    /// Removes a subscription.
    ///
    /// Returns `true` if the subscription existed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
