// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::command::DEFAULT_MAX_RETRIES;
use crate::error::ConfigError;
use crate::protocol::{CloudConfig, MqttUser, PushConfig};

/// A device the user wants exposed, matched by title.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceFilter {
    /// Device title as shown in the vendor app.
    #[serde(default)]
    pub name: Option<String>,
}

/// Configuration of the whole bridge.
///
/// Deserializes from the host's platform configuration block; fields not
/// present fall back to the production defaults.
///
/// # Examples
///
/// ```
/// use daichi_bridge::BridgeConfig;
///
/// let config: BridgeConfig = serde_json::from_str(r#"{
///     "name": "Daichi",
///     "username": "user@example.com",
///     "password": "secret",
///     "devices": [{"name": "Bedroom"}]
/// }"#).unwrap();
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_retries(), 2);
/// assert!(config.includes_title(Some("bedroom")));
/// assert!(!config.includes_title(Some("Kitchen")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    devices: Vec<DeviceFilter>,
    #[serde(default = "default_api_url")]
    api_url: String,
    #[serde(default = "default_mqtt_url")]
    mqtt_url: String,
    #[serde(default = "default_client_id")]
    client_id: String,
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_api_url() -> String {
    CloudConfig::DEFAULT_API_URL.to_string()
}

fn default_mqtt_url() -> String {
    PushConfig::DEFAULT_URL.to_string()
}

fn default_client_id() -> String {
    CloudConfig::DEFAULT_CLIENT_ID.to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_timeout_secs() -> u64 {
    CloudConfig::DEFAULT_TIMEOUT.as_secs()
}

impl BridgeConfig {
    /// Creates a configuration with the required parameters.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            username: Some(username.into()),
            password: Some(password.into()),
            devices: Vec::new(),
            api_url: default_api_url(),
            mqtt_url: default_mqtt_url(),
            client_id: default_client_id(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Restricts the bridge to devices with this title.
    #[must_use]
    pub fn with_device(mut self, name: impl Into<String>) -> Self {
        self.devices.push(DeviceFilter {
            name: Some(name.into()),
        });
        self
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Sets the push broker URL.
    #[must_use]
    pub fn with_mqtt_url(mut self, url: impl Into<String>) -> Self {
        self.mqtt_url = url.into();
        self
    }

    /// Sets the number of attempts per command.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Checks that every required parameter is present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` for an absent name, username or
    /// password, and `ConfigError::InvalidValue` for a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_none() {
            return Err(ConfigError::MissingField("name"));
        }
        if self.username.is_none() {
            return Err(ConfigError::MissingField("username"));
        }
        if self.password.is_none() {
            return Err(ConfigError::MissingField("password"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout",
                message: "must be at least one second".to_string(),
            });
        }
        Ok(())
    }

    /// Platform name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Number of attempts per command.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// HTTP request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Push broker URL.
    #[must_use]
    pub fn mqtt_url(&self) -> &str {
        &self.mqtt_url
    }

    /// Lower-cased device titles to expose; empty means all.
    #[must_use]
    pub fn device_names(&self) -> Vec<String> {
        self.devices
            .iter()
            .filter_map(|d| d.name.as_deref())
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    /// Returns `true` if a device with this title should be exposed.
    ///
    /// Titles are compared case-insensitively. Without a filter every device
    /// is exposed; with one, untitled devices are not.
    #[must_use]
    pub fn includes_title(&self, title: Option<&str>) -> bool {
        let names = self.device_names();
        if names.is_empty() {
            return true;
        }
        title.is_some_and(|t| names.contains(&t.to_lowercase()))
    }

    /// Derives the cloud client configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid.
    pub fn cloud_config(&self) -> Result<CloudConfig, ConfigError> {
        self.validate()?;
        Ok(CloudConfig::new(
            self.username.clone().unwrap_or_default(),
            self.password.clone().unwrap_or_default(),
        )
        .with_api_url(self.api_url.clone())
        .with_client_id(self.client_id.clone())
        .with_timeout(self.timeout()))
    }

    /// Derives the push channel configuration for a user.
    #[must_use]
    pub fn push_config(&self, user: &MqttUser) -> PushConfig {
        PushConfig::for_user(self.mqtt_url.clone(), user)
    }
}
