// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for characteristic notifications.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry for storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::StateChange;
use crate::types::{Characteristic, CharacteristicValue};

/// Unique identifier for a subscription.
///
/// IDs are unique within an accessory's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Callback for a single characteristic.
type ValueCallback = Arc<dyn Fn(CharacteristicValue) + Send + Sync>;

/// Callback receiving every change.
type ChangeCallback = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Registry of notification callbacks.
///
/// Uses `parking_lot::RwLock` for interior mutability so callbacks can be
/// registered and dispatched from any task. Callbacks are invoked
/// synchronously, in arbitrary order.
pub struct CallbackRegistry {
    next_id: AtomicU64,
    value_callbacks: RwLock<HashMap<SubscriptionId, (Characteristic, ValueCallback)>>,
    change_callbacks: RwLock<HashMap<SubscriptionId, ChangeCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            value_callbacks: RwLock::new(HashMap::new()),
            change_callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration methods
    // =========================================================================

    /// Registers a callback for one characteristic.
    pub fn on_value_changed<F>(&self, characteristic: Characteristic, callback: F) -> SubscriptionId
    where
        F: Fn(CharacteristicValue) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.value_callbacks
            .write()
            .insert(id, (characteristic, Arc::new(callback)));
        id
    }

    /// Registers a callback for every change.
    pub fn on_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.change_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.value_callbacks.write().remove(&id).is_some()
            || self.change_callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.value_callbacks.write().clear();
        self.change_callbacks.write().clear();
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Dispatches a change to every matching callback.
    ///
    /// Callbacks are cloned out of the registry first, so a callback may
    /// subscribe or unsubscribe without deadlocking.
    pub fn dispatch(&self, change: &StateChange) {
        let generic: Vec<ChangeCallback> = self.change_callbacks.read().values().cloned().collect();
        for callback in generic {
            callback(change);
        }

        let specific: Vec<ValueCallback> = self
            .value_callbacks
            .read()
            .values()
            .filter(|(c, _)| *c == change.characteristic)
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in specific {
            callback(change.value);
        }
    }

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.value_callbacks.read().len() + self.change_callbacks.read().len()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}
