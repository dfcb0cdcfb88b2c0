// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge startup and push dispatch.
//!
//! Startup logs in, discovers the account's devices once and creates one
//! accessory per exposed device. Push messages are then fed to every
//! accessory; each one picks out its own device.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::accessory::HeaterCoolerAccessory;
use crate::command::CommandDispatcher;
use crate::config::BridgeConfig;
use crate::error::{Error, ProtocolError};
use crate::protocol::{CloudClient, CloudTransport, PushClient, PushMessage};
use crate::types::Device;

/// An accessory backed by the cloud REST client.
pub type CloudAccessory = HeaterCoolerAccessory<CloudClient>;

/// The running bridge.
///
/// # Examples
///
/// ```no_run
/// use daichi_bridge::{Bridge, BridgeConfig};
///
/// # async fn example() -> daichi_bridge::Result<()> {
/// let config = BridgeConfig::new("Daichi", "user@example.com", "secret");
/// let mut bridge = Bridge::start(config).await?;
///
/// for accessory in bridge.accessories() {
///     println!("{} ({})", accessory.info().name, accessory.info().serial_number);
/// }
///
/// if let Some(push_loop) = bridge.connect_push().await? {
///     push_loop.await.ok();
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Bridge {
    config: BridgeConfig,
    dispatcher: Arc<CommandDispatcher<CloudClient>>,
    accessories: Vec<Arc<CloudAccessory>>,
    push: Option<PushClient>,
}

impl Bridge {
    /// Logs in and builds one accessory per discovered device.
    ///
    /// A failed login is logged and startup continues unauthenticated;
    /// discovery then simply finds nothing.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub async fn start(config: BridgeConfig) -> Result<Self, Error> {
        let client = config.cloud_config()?.into_client()?;
        tracing::debug!(name = config.name(), "Starting bridge");

        if let Err(e) = client.login().await {
            tracing::error!(error = %e, "Login failed");
        }

        let devices = select_devices(client.devices().await, &config);
        if devices.is_empty() {
            tracing::info!("Devices not found");
        }

        let dispatcher = Arc::new(CommandDispatcher::new(client));
        let accessories = devices
            .iter()
            .map(|device| {
                tracing::info!(
                    device_id = device.id,
                    serial = device.serial.as_deref().unwrap_or_default(),
                    "Adding new accessory"
                );
                Arc::new(HeaterCoolerAccessory::new(
                    device,
                    Arc::clone(&dispatcher),
                    config.max_retries(),
                ))
            })
            .collect();

        Ok(Self {
            config,
            dispatcher,
            accessories,
            push: None,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the shared command dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<CommandDispatcher<CloudClient>> {
        &self.dispatcher
    }

    /// Returns every accessory.
    #[must_use]
    pub fn accessories(&self) -> &[Arc<CloudAccessory>] {
        &self.accessories
    }

    /// Returns the accessory of a device.
    #[must_use]
    pub fn accessory(&self, device_id: u64) -> Option<&Arc<CloudAccessory>> {
        self.accessories.iter().find(|a| a.device_id() == device_id)
    }

    /// Returns the push client, once connected.
    #[must_use]
    pub fn push_client(&self) -> Option<&PushClient> {
        self.push.as_ref()
    }

    /// Connects the push channel and starts feeding the accessories.
    ///
    /// Returns `None` without connecting if login did not yield push
    /// credentials.
    ///
    /// # Errors
    ///
    /// Returns error if the broker URL is invalid.
    pub async fn connect_push(&mut self) -> Result<Option<JoinHandle<()>>, ProtocolError> {
        let Some(user) = self.dispatcher.transport().mqtt_user() else {
            tracing::error!("MQTT user is unknown");
            return Ok(None);
        };

        let (client, messages) = PushClient::connect(self.config.push_config(&user)).await?;
        self.push = Some(client);

        let accessories = self.accessories.clone();
        Ok(Some(tokio::spawn(run_push_loop(messages, accessories))))
    }

    /// Drops every subscription and disconnects the push channel, if
    /// connected.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be queued.
    pub async fn shutdown(&mut self) -> Result<(), ProtocolError> {
        for accessory in &self.accessories {
            accessory.clear_subscriptions();
        }
        match self.push.take() {
            Some(push) => push.disconnect().await,
            None => Ok(()),
        }
    }
}

/// Keeps the devices the bridge should expose.
///
/// Devices without a serial number are dropped; when the configuration names
/// devices, only those whose title matches are kept.
#[must_use]
pub fn select_devices(devices: Vec<Device>, config: &BridgeConfig) -> Vec<Device> {
    devices
        .into_iter()
        .filter(|d| d.serial.as_deref().is_some_and(|s| !s.is_empty()))
        .filter(|d| config.includes_title(d.title.as_deref()))
        .collect()
}

/// Feeds push messages to every accessory until the channel closes.
pub async fn run_push_loop<T: CloudTransport>(
    mut messages: mpsc::Receiver<PushMessage>,
    accessories: Vec<Arc<HeaterCoolerAccessory<T>>>,
) {
    while let Some(message) = messages.recv().await {
        tracing::debug!(topic = %message.topic, "Dispatching push message");
        for accessory in &accessories {
            accessory.handle_push(&message.payload);
        }
    }
    tracing::debug!("Push channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ControlRequest;
    use crate::subscription::Subscribable;
    use crate::types::{Characteristic, DeviceList};
    use parking_lot::Mutex;
    use serde_json::json;

    struct OfflineTransport;

    impl CloudTransport for OfflineTransport {
        async fn login(&self) -> Result<(), ProtocolError> {
            Ok(())
        }

        async fn post_control(
            &self,
            _device_id: u64,
            _request: &ControlRequest,
        ) -> Result<DeviceList, ProtocolError> {
            Err(ProtocolError::UnexpectedStatus(503))
        }
    }

    /// Log sink shared with a `tracing_subscriber` writer.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn unit(id: u64, set_temp: f64) -> serde_json::Value {
        json!({
            "id": id,
            "serial": format!("SN-{id}"),
            "status": "connected",
            "curTemp": 24,
            "state": {"isOn": true},
            "pult": [{"functions": [{
                "id": 2,
                "state": {"value": set_temp, "valueRange": [16, 32]},
                "metaData": {"bleTagInfo": {"bleTag": "setTemp"}}
            }]}]
        })
    }

    fn accessory(
        id: u64,
        dispatcher: &Arc<CommandDispatcher<OfflineTransport>>,
    ) -> Arc<HeaterCoolerAccessory<OfflineTransport>> {
        let device: Device = serde_json::from_value(unit(id, 22.0)).unwrap();
        Arc::new(HeaterCoolerAccessory::new(&device, Arc::clone(dispatcher), 2))
    }

    #[tokio::test]
    async fn push_loop_routes_to_owning_accessory() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let dispatcher = Arc::new(CommandDispatcher::new(OfflineTransport));
        let bedroom = accessory(5, &dispatcher);
        let kitchen = accessory(7, &dispatcher);

        let bedroom_seen = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&bedroom_seen);
        bedroom.on_change(move |change| seen.lock().push(change.characteristic));
        let kitchen_seen = Arc::new(Mutex::new(0_u32));
        let seen = Arc::clone(&kitchen_seen);
        kitchen.on_change(move |_| *seen.lock() += 1);
        let kitchen_before = kitchen.state();

        let (tx, rx) = mpsc::channel(4);
        tx.send(PushMessage {
            topic: "user/77/notification".to_string(),
            payload: serde_json::to_vec(&json!({"devices": [unit(5, 26.0)]})).unwrap(),
        })
        .await
        .unwrap();
        drop(tx);

        run_push_loop(rx, vec![Arc::clone(&bedroom), Arc::clone(&kitchen)]).await;

        assert_eq!(bedroom.state().set_temp(), 26.0);
        assert_eq!(
            *bedroom_seen.lock(),
            vec![
                Characteristic::CoolingThresholdTemperature,
                Characteristic::HeatingThresholdTemperature
            ]
        );
        assert_eq!(kitchen.state(), kitchen_before);
        assert_eq!(*kitchen_seen.lock(), 0);

        let output = String::from_utf8(logs.0.lock().clone()).unwrap();
        let not_found: Vec<&str> = output
            .lines()
            .filter(|l| l.contains("Device not found in push payload"))
            .collect();
        assert_eq!(not_found.len(), 1);
        assert!(not_found[0].contains("ERROR"));
        assert!(not_found[0].contains("device_id=7"));
    }

    fn devices() -> Vec<Device> {
        serde_json::from_value(serde_json::json!([
            {"id": 1, "serial": "A", "title": "Bedroom"},
            {"id": 2, "title": "Kitchen"},
            {"id": 3, "serial": "", "title": "Hall"},
            {"id": 4, "serial": "D", "title": "Office"},
            {"id": 5, "serial": "E"}
        ]))
        .unwrap()
    }

    #[test]
    fn devices_without_serial_are_dropped() {
        let config = BridgeConfig::new("n", "u", "p");
        let ids: Vec<u64> = select_devices(devices(), &config).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 4, 5]);
    }

    #[test]
    fn configured_names_filter_by_title() {
        let config = BridgeConfig::new("n", "u", "p").with_device("bedroom");
        let ids: Vec<u64> = select_devices(devices(), &config).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1]);
    }
}
