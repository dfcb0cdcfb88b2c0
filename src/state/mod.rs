// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state shadow, projection and change detection.
//!
//! The pipeline runs the same way for command responses and push updates:
//!
//! 1. [`DeviceState::derive_from`] folds a device payload into the shadow
//! 2. [`ProjectedState::of`] maps the shadow onto characteristic values
//! 3. [`changes_since`] diffs the projections taken before and after
//!
//! # Examples
//!
//! ```
//! use daichi_bridge::state::{DeviceState, ProjectedState, changes_since};
//! use daichi_bridge::types::{Characteristic, Device};
//!
//! let mut state = DeviceState::new();
//! let before = ProjectedState::of(&state, 5);
//!
//! let device: Device = serde_json::from_str(
//!     r#"{"id":5,"status":"connected","curTemp":24,"state":{"isOn":true}}"#,
//! ).unwrap();
//! state.derive_from(&device);
//!
//! let changes = changes_since(&before, &ProjectedState::of(&state, 5));
//! assert_eq!(changes[0].characteristic, Characteristic::Active);
//! ```

mod device_state;
pub mod projection;
mod state_change;

pub use device_state::DeviceState;
pub use projection::ProjectedState;
pub use state_change::{StateChange, changes_since, check_and_update};
