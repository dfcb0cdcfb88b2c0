// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heater-cooler accessory backed by one cloud device.
//!
//! An accessory owns the device's [`Capabilities`], its [`DeviceState`]
//! shadow and the callbacks of whoever hosts it. Reads are served from the
//! shadow; writes are sent to the cloud and the response is folded back into
//! the shadow through the same path as push updates:
//!
//! ```text
//! command response ─┐
//!                   ├─> derive shadow -> project -> diff -> notify
//! push message ─────┘
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::capabilities::Capabilities;
use crate::command::{CommandDispatcher, ControlValue};
use crate::protocol::CloudTransport;
use crate::state::{DeviceState, ProjectedState, StateChange, changes_since, projection};
use crate::subscription::{CallbackRegistry, Subscribable, SubscriptionId};
use crate::types::{
    Characteristic, CharacteristicProps, CharacteristicValue, ControlMode, Device, DeviceList,
    SwingMode, TargetHeaterCoolerState,
};

// ============================================================================
// AccessoryInfo
// ============================================================================

/// Identity of an accessory, shown by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInfo {
    /// Brand, or `"Unknown Manufacturer"`.
    pub manufacturer: String,
    /// Series and model joined by a space.
    pub model: String,
    /// Device serial number.
    pub serial_number: String,
    /// Device title, or `"Unknown Name"`.
    pub name: String,
    /// Stable identifier derived from the serial number.
    pub uuid: Uuid,
}

impl AccessoryInfo {
    /// Fallback manufacturer.
    pub const UNKNOWN_MANUFACTURER: &'static str = "Unknown Manufacturer";
    /// Fallback name.
    pub const UNKNOWN_NAME: &'static str = "Unknown Name";

    /// Builds the identity of a device.
    ///
    /// # Examples
    ///
    /// ```
    /// use daichi_bridge::AccessoryInfo;
    /// use daichi_bridge::types::Device;
    ///
    /// let device: Device = serde_json::from_str(r#"{
    ///     "id": 5,
    ///     "serial": "AC-5",
    ///     "title": "Bedroom",
    ///     "deviceInfo": {"brand": "Daichi", "seria": "Alpha", "model": "A20"}
    /// }"#).unwrap();
    ///
    /// let info = AccessoryInfo::from_device(&device);
    /// assert_eq!(info.model, "Alpha A20");
    /// assert_eq!(info.uuid, AccessoryInfo::uuid_for_serial("AC-5"));
    /// ```
    #[must_use]
    pub fn from_device(device: &Device) -> Self {
        let info = device.device_info.as_ref();
        let serial_number = device.serial.clone().unwrap_or_default();

        let model = info
            .map(|i| {
                [i.seria.as_deref(), i.model.as_deref()]
                    .into_iter()
                    .flatten()
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        Self {
            manufacturer: info
                .and_then(|i| i.brand.clone())
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| Self::UNKNOWN_MANUFACTURER.to_string()),
            model,
            uuid: Self::uuid_for_serial(&serial_number),
            serial_number,
            name: device
                .title
                .clone()
                .unwrap_or_else(|| Self::UNKNOWN_NAME.to_string()),
        }
    }

    /// Returns the accessory UUID for a serial number.
    #[must_use]
    pub fn uuid_for_serial(serial: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, serial.as_bytes())
    }
}

// ============================================================================
// Characteristic table
// ============================================================================

/// Registration entry of one characteristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacteristicSpec {
    /// The characteristic.
    pub characteristic: Characteristic,
    /// Whether it has a setter.
    pub writable: bool,
    /// Range metadata, for numeric characteristics with configured bounds.
    pub props: Option<CharacteristicProps>,
}

// ============================================================================
// HeaterCoolerAccessory
// ============================================================================

/// A heater-cooler accessory for one air conditioner.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use daichi_bridge::{CloudConfig, CommandDispatcher, HeaterCoolerAccessory};
/// use daichi_bridge::protocol::CloudTransport;
/// use daichi_bridge::types::Characteristic;
///
/// # async fn example() -> Result<(), daichi_bridge::ProtocolError> {
/// let client = CloudConfig::new("user@example.com", "secret").into_client()?;
/// client.login().await?;
/// let device = client.get_device(5).await?.unwrap();
///
/// let dispatcher = Arc::new(CommandDispatcher::new(client));
/// let accessory = HeaterCoolerAccessory::new(&device, dispatcher, 2);
///
/// println!("{}", accessory.get(Characteristic::CurrentTemperature));
/// accessory.set(Characteristic::Active, 1.0).await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HeaterCoolerAccessory<T> {
    device_id: u64,
    info: AccessoryInfo,
    capabilities: Option<Capabilities>,
    fan_speed_min_step: u32,
    state: Arc<RwLock<DeviceState>>,
    dispatcher: Arc<CommandDispatcher<T>>,
    callbacks: Arc<CallbackRegistry>,
    max_retries: u32,
}

impl<T: CloudTransport> HeaterCoolerAccessory<T> {
    /// Creates the accessory and derives its initial state from `device`.
    ///
    /// The initial derivation does not notify.
    #[must_use]
    pub fn new(device: &Device, dispatcher: Arc<CommandDispatcher<T>>, max_retries: u32) -> Self {
        let capabilities = Capabilities::resolve(device);
        let fan_speed_min_step = capabilities
            .clone()
            .unwrap_or_default()
            .fan_speed_min_step();

        let mut state = DeviceState::new();
        state.derive_from(device);

        match &capabilities {
            Some(caps) => {
                tracing::debug!(device_id = device.id, modes = caps.len(), "Resolved functions");
            }
            None => tracing::debug!(device_id = device.id, "Device exposes no functions"),
        }

        Self {
            device_id: device.id,
            info: AccessoryInfo::from_device(device),
            capabilities,
            fan_speed_min_step,
            state: Arc::new(RwLock::new(state)),
            dispatcher,
            callbacks: Arc::new(CallbackRegistry::new()),
            max_retries,
        }
    }

    /// Vendor device id.
    #[must_use]
    pub fn device_id(&self) -> u64 {
        self.device_id
    }

    /// Accessory identity.
    #[must_use]
    pub fn info(&self) -> &AccessoryInfo {
        &self.info
    }

    /// Resolved functions, if the device exposes any.
    #[must_use]
    pub fn capabilities(&self) -> Option<&Capabilities> {
        self.capabilities.as_ref()
    }

    /// Percentage points per raw fan speed unit.
    #[must_use]
    pub fn fan_speed_min_step(&self) -> u32 {
        self.fan_speed_min_step
    }

    /// Returns a snapshot of the shadow.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.state.read().clone()
    }

    /// Returns every characteristic value at once.
    #[must_use]
    pub fn snapshot(&self) -> ProjectedState {
        ProjectedState::of(&self.state.read(), self.fan_speed_min_step)
    }

    /// Lists the characteristics to register with the host.
    #[must_use]
    pub fn characteristics(&self) -> Vec<CharacteristicSpec> {
        let caps = self.capabilities.clone().unwrap_or_default();
        Characteristic::ALL
            .into_iter()
            .map(|characteristic| CharacteristicSpec {
                characteristic,
                writable: characteristic.is_writable(),
                props: match characteristic {
                    Characteristic::CoolingThresholdTemperature
                    | Characteristic::HeatingThresholdTemperature => Some(caps.threshold_props()),
                    Characteristic::RotationSpeed => Some(caps.rotation_speed_props()),
                    _ => None,
                },
            })
            .collect()
    }

    // ========== Getters ==========

    /// Returns the current projected value of a characteristic.
    #[must_use]
    pub fn get(&self, characteristic: Characteristic) -> CharacteristicValue {
        let value = projection::project(&self.state.read(), characteristic, self.fan_speed_min_step);
        tracing::debug!(
            device_id = self.device_id,
            %characteristic,
            %value,
            "GET"
        );
        value
    }

    // ========== Setters ==========

    /// Writes a characteristic, given its raw protocol value.
    ///
    /// The write is acknowledged regardless of outcome: a failed command is
    /// logged and leaves the shadow unchanged. A non-finite value counts as
    /// missing. Writes to read-only characteristics are ignored.
    pub async fn set(&self, characteristic: Characteristic, value: f64) {
        tracing::debug!(device_id = self.device_id, %characteristic, value, "SET");
        let value = value.is_finite().then_some(value);

        match characteristic {
            Characteristic::Active => {
                self.command(ControlMode::IsOn, value.map(|v| ControlValue::Bool(v != 0.0)))
                    .await;
            }
            Characteristic::TargetHeaterCoolerState => {
                let mode = match value.map(TargetHeaterCoolerState::from_raw) {
                    Some(TargetHeaterCoolerState::Heat) => ControlMode::HeatMode,
                    Some(TargetHeaterCoolerState::Cool) => ControlMode::CoolMode,
                    _ => ControlMode::AutoMode,
                };
                self.command(mode, Some(ControlValue::Bool(true))).await;
            }
            Characteristic::CoolingThresholdTemperature
            | Characteristic::HeatingThresholdTemperature => {
                let current = self.state.read().set_temp();
                if value == Some(current) {
                    tracing::debug!(device_id = self.device_id, "Setpoint unchanged");
                    return;
                }
                self.command(ControlMode::SetTemp, value.map(ControlValue::Number))
                    .await;
            }
            Characteristic::SwingMode => {
                let enabled = value == Some(f64::from(SwingMode::Enabled as u8));
                self.command(ControlMode::FanFlow, Some(ControlValue::Bool(enabled)))
                    .await;
            }
            Characteristic::RotationSpeed => self.set_rotation_speed(value).await,
            Characteristic::CurrentTemperature | Characteristic::CurrentHeaterCoolerState => {
                tracing::warn!(
                    device_id = self.device_id,
                    %characteristic,
                    "Write to read-only characteristic, skipping"
                );
            }
        }
    }

    async fn set_rotation_speed(&self, value: Option<f64>) {
        let current = projection::rotation_speed(&self.state.read(), self.fan_speed_min_step);
        if value == Some(current) {
            tracing::debug!(device_id = self.device_id, "Rotation speed unchanged");
            return;
        }

        let raw = value.map(|v| self.raw_fan_speed(v));
        match raw {
            // Below one step reads back as 0, which is automatic fan speed
            Some(raw) if raw <= 0.0 => {
                self.command(ControlMode::FanSpeedAuto, Some(ControlValue::Bool(true)))
                    .await;
            }
            _ => {
                self.command(ControlMode::FanSpeed, raw.map(ControlValue::Number))
                    .await;
            }
        }
    }

    /// Converts a percentage to raw fan units, rounding down to a whole step
    /// and capped at the function's maximum.
    fn raw_fan_speed(&self, percentage: f64) -> f64 {
        let step = f64::from(self.fan_speed_min_step);
        let max = self
            .capabilities
            .as_ref()
            .and_then(|c| c.function(ControlMode::FanSpeed))
            .and_then(|f| f.state.range_max())
            .unwrap_or(f64::INFINITY);

        (percentage / step).floor().min(max)
    }

    async fn command(&self, mode: ControlMode, value: Option<ControlValue>) {
        let Some(function_id) = self.capabilities.as_ref().and_then(|c| c.function_id(mode))
        else {
            tracing::debug!(device_id = self.device_id, %mode, "Mode not supported by device");
            return;
        };

        let Some(devices) = self
            .dispatcher
            .send(self.device_id, mode, function_id, value, self.max_retries)
            .await
        else {
            return;
        };

        if self.handle_devices(&devices).is_none() {
            tracing::error!(
                device_id = self.device_id,
                "Command response does not contain the device"
            );
        }
    }

    /// Drops every subscription of this accessory.
    pub fn clear_subscriptions(&self) {
        self.callbacks.clear();
    }

    // ========== Updates ==========

    /// Handles a raw push payload.
    ///
    /// A payload that does not parse, or does not mention this device, is
    /// logged and otherwise ignored.
    pub fn handle_push(&self, payload: &[u8]) -> Vec<StateChange> {
        let devices = match DeviceList::from_json(payload) {
            Ok(devices) => devices,
            Err(e) => {
                tracing::error!(
                    device_id = self.device_id,
                    error = %e,
                    payload = %String::from_utf8_lossy(payload),
                    "Malformed push payload"
                );
                return Vec::new();
            }
        };

        self.handle_devices(&devices).unwrap_or_else(|| {
            tracing::error!(
                device_id = self.device_id,
                payload = %String::from_utf8_lossy(payload),
                "Device not found in push payload"
            );
            Vec::new()
        })
    }

    /// Applies this accessory's entry of a device list.
    ///
    /// Returns `None` if the list has no entry for this device.
    pub fn handle_devices(&self, devices: &DeviceList) -> Option<Vec<StateChange>> {
        devices.find(self.device_id).map(|d| self.apply_device(d))
    }

    /// Folds a device payload into the shadow and notifies every changed
    /// characteristic.
    pub fn apply_device(&self, device: &Device) -> Vec<StateChange> {
        let changes = {
            let mut state = self.state.write();
            let before = ProjectedState::of(&state, self.fan_speed_min_step);
            state.derive_from(device);
            changes_since(&before, &ProjectedState::of(&state, self.fan_speed_min_step))
        };

        for change in &changes {
            tracing::info!(
                device_id = self.device_id,
                characteristic = %change.characteristic,
                value = %change.value,
                "Characteristic changed"
            );
            self.callbacks.dispatch(change);
        }
        changes
    }
}

impl<T> Subscribable for HeaterCoolerAccessory<T> {
    fn on_characteristic_changed<F>(
        &self,
        characteristic: Characteristic,
        callback: F,
    ) -> SubscriptionId
    where
        F: Fn(CharacteristicValue) + Send + Sync + 'static,
    {
        self.callbacks.on_value_changed(characteristic, callback)
    }

    fn on_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.callbacks.on_change(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ControlRequest;
    use crate::error::ProtocolError;
    use crate::types::{Active, CurrentHeaterCoolerState};
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    /// Transport that records requests and answers with a fixed device list.
    #[derive(Default)]
    struct RecordingTransport {
        requests: Mutex<Vec<ControlRequest>>,
        response: Mutex<Option<Value>>,
    }

    impl CloudTransport for RecordingTransport {
        async fn login(&self) -> Result<(), ProtocolError> {
            Ok(())
        }

        async fn post_control(
            &self,
            _device_id: u64,
            request: &ControlRequest,
        ) -> Result<DeviceList, ProtocolError> {
            self.requests.lock().push(request.clone());
            let body = self.response.lock().clone().unwrap_or(json!({"devices": []}));
            Ok(serde_json::from_value(body).unwrap())
        }
    }

    fn func(id: u64, tag: &str, title: Option<&str>, cmd: Option<&str>, state: Value) -> Value {
        json!({
            "id": id,
            "title": title,
            "state": state,
            "metaData": {"bleTagInfo": {"bleTag": tag, "bleOnCommand": cmd}}
        })
    }

    fn device_json(id: u64, set_temp: f64, fan_speed: f64, mode: &str) -> Value {
        let on = |m: &str| json!({"isOn": mode == m});
        json!({
            "id": id,
            "serial": format!("SN-{id}"),
            "title": "Bedroom",
            "status": "connected",
            "curTemp": 24,
            "state": {"isOn": true},
            "pult": [{"functions": [
                func(1, "power", None, None, json!({"isOn": true})),
                func(2, "setTemp", None, None, json!({"value": set_temp, "valueRange": [16, 32]})),
                func(3, "flow", Some("Vertical swing"), Some("vert_on"), json!({"isOn": false})),
                func(4, "fanSpeed", Some("Auto"), Some("0"), json!({"isOn": false})),
                func(5, "fanSpeed", Some("Fan speed"), None,
                     json!({"value": fan_speed, "valueRange": [1, 5]})),
                func(6, "mode", Some("Auto"), Some("auto"), on("auto")),
                func(7, "mode", Some("Heat"), Some("heat"), on("heat")),
                func(8, "mode", Some("Cool"), Some("cool"), on("cool"))
            ]}]
        })
    }

    fn accessory(device: &Value) -> HeaterCoolerAccessory<RecordingTransport> {
        let device: Device = serde_json::from_value(device.clone()).unwrap();
        let dispatcher = Arc::new(CommandDispatcher::new(RecordingTransport::default()));
        HeaterCoolerAccessory::new(&device, dispatcher, 2)
    }

    fn requests(acc: &HeaterCoolerAccessory<RecordingTransport>) -> Vec<Value> {
        acc.dispatcher
            .transport()
            .requests
            .lock()
            .iter()
            .map(|r| serde_json::to_value(&r.value).unwrap())
            .collect()
    }

    #[test]
    fn info_fallbacks() {
        let device: Device = serde_json::from_str(r#"{"id": 1, "serial": "X"}"#).unwrap();
        let info = AccessoryInfo::from_device(&device);
        assert_eq!(info.manufacturer, AccessoryInfo::UNKNOWN_MANUFACTURER);
        assert_eq!(info.name, AccessoryInfo::UNKNOWN_NAME);
        assert_eq!(info.model, "");
        assert_eq!(info.serial_number, "X");
    }

    #[test]
    fn uuid_is_stable_per_serial() {
        assert_eq!(
            AccessoryInfo::uuid_for_serial("A"),
            AccessoryInfo::uuid_for_serial("A")
        );
        assert_ne!(
            AccessoryInfo::uuid_for_serial("A"),
            AccessoryInfo::uuid_for_serial("B")
        );
    }

    #[test]
    fn initial_projection() {
        let acc = accessory(&device_json(5, 22.0, 3.0, "cool"));
        assert_eq!(acc.get(Characteristic::Active), CharacteristicValue::Active(Active::Active));
        assert_eq!(
            acc.get(Characteristic::CurrentHeaterCoolerState),
            CharacteristicValue::CurrentState(CurrentHeaterCoolerState::Cooling)
        );
        assert_eq!(acc.get(Characteristic::RotationSpeed), CharacteristicValue::Percentage(60.0));
    }

    #[test]
    fn characteristic_table_props() {
        let acc = accessory(&device_json(5, 22.0, 3.0, "cool"));
        let table = acc.characteristics();
        assert_eq!(table.len(), Characteristic::ALL.len());

        let cooling = table
            .iter()
            .find(|s| s.characteristic == Characteristic::CoolingThresholdTemperature)
            .unwrap();
        assert!(cooling.writable);
        assert_eq!(
            cooling.props,
            Some(CharacteristicProps {
                min_value: 16.0,
                max_value: 32.0,
                min_step: 1.0
            })
        );

        let rotation = table
            .iter()
            .find(|s| s.characteristic == Characteristic::RotationSpeed)
            .unwrap();
        assert_eq!(rotation.props.unwrap().min_step, 20.0);

        let current = table
            .iter()
            .find(|s| s.characteristic == Characteristic::CurrentTemperature)
            .unwrap();
        assert!(!current.writable);
        assert!(current.props.is_none());
    }

    #[tokio::test]
    async fn target_state_selects_mode_function() {
        let acc = accessory(&device_json(5, 22.0, 3.0, "cool"));
        acc.set(Characteristic::TargetHeaterCoolerState, 1.0).await;
        acc.set(Characteristic::TargetHeaterCoolerState, 0.0).await;

        let sent = requests(&acc);
        assert_eq!(sent[0]["functionId"], 7);
        assert_eq!(sent[0]["isOn"], true);
        assert_eq!(sent[1]["functionId"], 6);
    }

    #[tokio::test]
    async fn unchanged_setpoint_is_not_sent() {
        let acc = accessory(&device_json(5, 22.0, 3.0, "cool"));
        acc.set(Characteristic::HeatingThresholdTemperature, 22.0).await;
        assert!(requests(&acc).is_empty());

        acc.set(Characteristic::CoolingThresholdTemperature, 23.0).await;
        let sent = requests(&acc);
        assert_eq!(sent[0]["functionId"], 2);
        assert_eq!(sent[0]["value"], 23.0);
    }

    #[tokio::test]
    async fn rotation_speed_quantizes_down() {
        let acc = accessory(&device_json(5, 22.0, 3.0, "cool"));
        acc.set(Characteristic::RotationSpeed, 50.0).await;
        acc.set(Characteristic::RotationSpeed, 100.0).await;
        acc.set(Characteristic::RotationSpeed, 0.0).await;
        acc.set(Characteristic::RotationSpeed, 10.0).await;

        let sent = requests(&acc);
        assert_eq!(sent[0]["functionId"], 5);
        assert_eq!(sent[0]["value"], 2.0);
        assert_eq!(sent[1]["value"], 5.0);
        assert_eq!(sent[2]["functionId"], 4);
        assert_eq!(sent[2]["isOn"], true);
        // Less than one step selects automatic fan speed
        assert_eq!(sent[3]["functionId"], 4);
    }

    #[tokio::test]
    async fn unchanged_rotation_speed_is_not_sent() {
        let acc = accessory(&device_json(5, 22.0, 3.0, "cool"));
        acc.set(Characteristic::RotationSpeed, 60.0).await;
        assert!(requests(&acc).is_empty());
    }

    #[tokio::test]
    async fn swing_and_active_send_flags() {
        let acc = accessory(&device_json(5, 22.0, 3.0, "cool"));
        acc.set(Characteristic::SwingMode, 1.0).await;
        acc.set(Characteristic::Active, 0.0).await;

        let sent = requests(&acc);
        assert_eq!(sent[0]["functionId"], 3);
        assert_eq!(sent[0]["isOn"], true);
        assert_eq!(sent[1]["functionId"], 1);
        assert_eq!(sent[1]["isOn"], false);
    }

    #[tokio::test]
    async fn non_finite_value_is_rejected() {
        let acc = accessory(&device_json(5, 22.0, 3.0, "cool"));
        acc.set(Characteristic::Active, f64::NAN).await;
        acc.set(Characteristic::CoolingThresholdTemperature, f64::NAN).await;
        assert!(requests(&acc).is_empty());
    }

    #[tokio::test]
    async fn read_only_writes_are_ignored() {
        let acc = accessory(&device_json(5, 22.0, 3.0, "cool"));
        acc.set(Characteristic::CurrentTemperature, 30.0).await;
        assert!(requests(&acc).is_empty());
    }

    #[tokio::test]
    async fn command_response_updates_shadow() {
        let acc = accessory(&device_json(5, 22.0, 3.0, "cool"));
        *acc.dispatcher.transport().response.lock() = Some(json!({
            "devices": [device_json(5, 22.0, 3.0, "heat")]
        }));

        acc.set(Characteristic::TargetHeaterCoolerState, 1.0).await;
        assert_eq!(
            acc.get(Characteristic::TargetHeaterCoolerState),
            CharacteristicValue::TargetState(TargetHeaterCoolerState::Heat)
        );
    }

    /// Transport that reports back whatever fan setting was sent.
    struct EchoTransport;

    impl CloudTransport for EchoTransport {
        async fn login(&self) -> Result<(), ProtocolError> {
            Ok(())
        }

        async fn post_control(
            &self,
            device_id: u64,
            request: &ControlRequest,
        ) -> Result<DeviceList, ProtocolError> {
            let sent = serde_json::to_value(&request.value).unwrap();
            let mut device = device_json(device_id, 22.0, 3.0, "cool");
            let functions = device["pult"][0]["functions"].as_array_mut().unwrap();
            match sent["functionId"].as_u64() {
                Some(4) => functions[3]["state"]["isOn"] = sent["isOn"].clone(),
                Some(5) => functions[4]["state"]["value"] = sent["value"].clone(),
                _ => {}
            }
            Ok(serde_json::from_value(json!({"devices": [device]})).unwrap())
        }
    }

    #[tokio::test]
    async fn rotation_speed_reads_back_within_one_step() {
        let device: Device =
            serde_json::from_value(device_json(5, 22.0, 3.0, "cool")).unwrap();

        for v in [0.0, 5.0, 10.0, 19.0, 20.0, 35.0, 59.0, 61.0, 99.0, 100.0] {
            let dispatcher = Arc::new(CommandDispatcher::new(EchoTransport));
            let acc = HeaterCoolerAccessory::new(&device, dispatcher, 2);
            let step = f64::from(acc.fan_speed_min_step());

            acc.set(Characteristic::RotationSpeed, v).await;

            let read = acc.get(Characteristic::RotationSpeed).as_f64();
            assert!(
                (v - step..=v).contains(&read),
                "set {v} with step {step} read back {read}"
            );
        }
    }

    #[test]
    fn functions_arriving_after_startup_are_tracked() {
        let bare: Device = serde_json::from_value(json!({
            "id": 9,
            "serial": "SN-9",
            "status": "connected",
            "curTemp": 20,
            "state": {"isOn": true}
        }))
        .unwrap();
        let dispatcher = Arc::new(CommandDispatcher::new(RecordingTransport::default()));
        let acc = HeaterCoolerAccessory::new(&bare, dispatcher, 2);
        assert!(acc.capabilities().is_none());

        let payload = serde_json::to_vec(&json!({"devices": [{
            "id": 9,
            "status": "connected",
            "pult": [{"functions": [
                func(2, "setTemp", None, None, json!({"value": 25, "valueRange": [16, 32]}))
            ]}]
        }]}))
        .unwrap();
        let changed: Vec<Characteristic> = acc
            .handle_push(&payload)
            .iter()
            .map(|c| c.characteristic)
            .collect();

        assert_eq!(acc.state().set_temp(), 25.0);
        assert!(changed.contains(&Characteristic::CoolingThresholdTemperature));
    }

    #[test]
    fn push_for_other_device_changes_nothing() {
        let acc = accessory(&device_json(5, 22.0, 3.0, "cool"));
        let before = acc.state();
        let payload = serde_json::to_vec(&json!({"devices": [device_json(7, 30.0, 1.0, "heat")]}))
            .unwrap();

        assert!(acc.handle_push(&payload).is_empty());
        assert_eq!(acc.state(), before);
    }

    #[test]
    fn malformed_push_is_ignored() {
        let acc = accessory(&device_json(5, 22.0, 3.0, "cool"));
        assert!(acc.handle_push(b"not json").is_empty());
    }

    #[test]
    fn push_notifies_subscribers() {
        let acc = accessory(&device_json(5, 22.0, 3.0, "cool"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        acc.on_characteristic_changed(Characteristic::CoolingThresholdTemperature, move |v| {
            seen_clone.lock().push(v);
        });
        let all = Arc::new(Mutex::new(0_u32));
        let all_clone = Arc::clone(&all);
        acc.on_change(move |_| *all_clone.lock() += 1);

        let payload =
            serde_json::to_vec(&json!({"devices": [device_json(5, 25.0, 3.0, "cool")]})).unwrap();
        let changes = acc.handle_push(&payload);

        let changed: Vec<Characteristic> = changes.iter().map(|c| c.characteristic).collect();
        assert_eq!(
            changed,
            vec![
                Characteristic::CoolingThresholdTemperature,
                Characteristic::HeatingThresholdTemperature
            ]
        );
        assert_eq!(*seen.lock(), vec![CharacteristicValue::Temperature(25.0)]);
        assert_eq!(*all.lock(), 2);
    }
}
