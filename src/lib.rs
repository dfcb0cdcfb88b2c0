// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Daichi Bridge - exposes Daichi cloud air conditioners as heater-cooler
//! accessories.
//!
//! The Daichi cloud controls air conditioners through loosely tagged vendor
//! "functions". This library maps them onto a fixed heater-cooler model
//! (active, current/target state, thresholds, swing, rotation speed), keeps
//! a local shadow of each unit, and notifies the host when a command
//! response or push update changes a visible value.
//!
//! # Supported Features
//!
//! - **Discovery**: login, building/place enumeration, device filtering
//! - **Control**: power, mode, setpoint, fan speed, swing, with re-login on 401
//! - **Push updates**: MQTT over websockets, one shared connection per account
//! - **Notifications**: per-characteristic callbacks on value changes
//!
//! # Quick Start
//!
//! ```no_run
//! use daichi_bridge::{Bridge, BridgeConfig};
//! use daichi_bridge::subscription::Subscribable;
//! use daichi_bridge::types::Characteristic;
//!
//! #[tokio::main]
//! async fn main() -> daichi_bridge::Result<()> {
//!     let config = BridgeConfig::new("Daichi", "user@example.com", "secret");
//!     let mut bridge = Bridge::start(config).await?;
//!
//!     for accessory in bridge.accessories() {
//!         accessory.on_change(|change| {
//!             println!("{} is now {}", change.characteristic, change.value);
//!         });
//!         println!(
//!             "{}: {}",
//!             accessory.info().name,
//!             accessory.get(Characteristic::CurrentTemperature)
//!         );
//!     }
//!
//!     if let Some(accessory) = bridge.accessories().first() {
//!         accessory.set(Characteristic::Active, 1.0).await;
//!     }
//!
//!     if let Some(push_loop) = bridge.connect_push().await? {
//!         push_loop.await.ok();
//!     }
//!     Ok(())
//! }
//! ```

pub mod accessory;
pub mod bridge;
mod capabilities;
pub mod command;
pub mod config;
pub mod error;
pub mod protocol;
pub mod state;
pub mod subscription;
pub mod types;

pub use accessory::{AccessoryInfo, CharacteristicSpec, HeaterCoolerAccessory};
pub use bridge::{Bridge, CloudAccessory};
pub use capabilities::{Capabilities, FunctionMatcher};
pub use command::{CommandDispatcher, ControlRequest, ControlValue};
pub use config::{BridgeConfig, DeviceFilter};
pub use error::{ConfigError, Error, ParseError, ProtocolError, Result, ValueError};
pub use protocol::{CloudClient, CloudConfig, CloudTransport, MqttUser, PushClient, PushConfig};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
