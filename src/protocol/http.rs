// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! REST client for the Daichi cloud API.

use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::command::ControlRequest;
use crate::error::ProtocolError;
use crate::protocol::CloudTransport;
use crate::types::{Device, DeviceList};

// ============================================================================
// CloudConfig - Connection parameters
// ============================================================================

/// Configuration for the cloud REST client.
///
/// # Examples
///
/// ```
/// use daichi_bridge::protocol::CloudConfig;
/// use std::time::Duration;
///
/// let config = CloudConfig::new("user@example.com", "secret")
///     .with_api_url("http://127.0.0.1:8080/api/v4/")
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.api_url(), "http://127.0.0.1:8080/api/v4/");
/// ```
#[derive(Debug, Clone)]
pub struct CloudConfig {
    username: String,
    password: String,
    api_url: String,
    client_id: String,
    timeout: Duration,
}

impl CloudConfig {
    /// Production API base URL.
    pub const DEFAULT_API_URL: &'static str = "https://web.daichicloud.ru/api/v4/";
    /// OAuth client id of the vendor's web application.
    pub const DEFAULT_CLIENT_ID: &'static str = "sOJO7B6SqgaKudTfCzqLAy540cCuDzpI";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration for the given account.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            api_url: Self::DEFAULT_API_URL.to_string(),
            client_id: Self::DEFAULT_CLIENT_ID.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the API base URL. A trailing slash is added if missing.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        let mut url = url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.api_url = url;
        self
    }

    /// Sets the OAuth client id.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the account user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the API base URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Returns the OAuth client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates a `CloudClient` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn into_client(self) -> Result<CloudClient, ProtocolError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(CloudClient {
            config: self,
            client,
            session: Session::default(),
        })
    }
}

// ============================================================================
// Session - Token and push credentials
// ============================================================================

/// Credentials for the push channel, issued per account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttUser {
    /// Broker user name.
    pub username: String,
    /// Broker password.
    pub password: String,
    /// Cloud user id, used in the notification topic.
    pub user_id: u64,
}

impl MqttUser {
    /// Returns the topic carrying this user's device notifications.
    #[must_use]
    pub fn notification_topic(&self) -> String {
        format!("user/{}/notification", self.user_id)
    }
}

/// Authentication state of a [`CloudClient`].
///
/// The token is attached to each request explicitly; nothing is stored on
/// the underlying HTTP client.
#[derive(Debug, Default)]
pub struct Session {
    token: RwLock<Option<String>>,
    mqtt_user: RwLock<Option<MqttUser>>,
}

impl Session {
    /// Returns the current bearer token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Returns `true` if a token is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Returns the push credentials, if known.
    #[must_use]
    pub fn mqtt_user(&self) -> Option<MqttUser> {
        self.mqtt_user.read().clone()
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    fn set_mqtt_user(&self, user: Option<MqttUser>) {
        *self.mqtt_user.write() = user;
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read().as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

// ============================================================================
// Wire format
// ============================================================================

/// Every API response wraps its payload in `data`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    #[serde(rename = "grant_type")]
    grant_type: &'static str,
    email: &'a str,
    password: &'a str,
    client_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserData {
    id: Option<u64>,
    mqtt_user: Option<MqttUserData>,
}

#[derive(Debug, Deserialize)]
struct MqttUserData {
    username: Option<String>,
    password: Option<String>,
}

impl UserData {
    fn into_mqtt_user(self) -> Option<MqttUser> {
        let mqtt = self.mqtt_user?;
        Some(MqttUser {
            username: mqtt.username.filter(|s| !s.is_empty())?,
            password: mqtt.password.filter(|s| !s.is_empty())?,
            user_id: self.id.filter(|id| *id != 0)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Building {
    #[serde(default)]
    places: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    id: u64,
}

// ============================================================================
// CloudClient
// ============================================================================

/// Client for the Daichi cloud REST API.
///
/// # Examples
///
/// ```no_run
/// use daichi_bridge::protocol::{CloudConfig, CloudTransport};
///
/// # async fn example() -> Result<(), daichi_bridge::ProtocolError> {
/// let client = CloudConfig::new("user@example.com", "secret").into_client()?;
/// client.login().await?;
/// for device in client.devices().await {
///     println!("{} {:?}", device.id, device.title);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CloudClient {
    config: CloudConfig,
    client: Client,
    session: Session,
}

impl CloudClient {
    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    /// Returns the session state.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the push credentials learned at login.
    #[must_use]
    pub fn mqtt_user(&self) -> Option<MqttUser> {
        self.session.mqtt_user()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProtocolError> {
        let response = self
            .session
            .authorize(request)
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ProtocolError::AuthenticationFailed);
        }
        if !status.is_success() {
            return Err(ProtocolError::UnexpectedStatus(status.as_u16()));
        }
        Ok(response)
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ProtocolError> {
        let url = self.url(path);
        tracing::debug!(url = %url, "GET");

        let envelope: Envelope<T> = self
            .send(self.client.get(&url))
            .await?
            .json()
            .await
            .map_err(ProtocolError::Http)?;
        Ok(envelope.data)
    }

    /// Fetches the account's push credentials and stores them in the session.
    ///
    /// Missing pieces leave the push user unknown.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn refresh_user(&self) -> Result<Option<MqttUser>, ProtocolError> {
        let user = self
            .get_data::<UserData>("user")
            .await?
            .and_then(UserData::into_mqtt_user);
        self.session.set_mqtt_user(user.clone());
        Ok(user)
    }

    /// Lists the ids of every place across the account's buildings.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is malformed.
    pub async fn list_buildings(&self) -> Result<Vec<u64>, ProtocolError> {
        let buildings: Vec<Building> = self.get_data("buildings").await?.unwrap_or_default();
        tracing::debug!(count = buildings.len(), "Fetched buildings");

        Ok(buildings
            .into_iter()
            .flat_map(|b| b.places)
            .map(|p| p.id)
            .collect())
    }

    /// Fetches one device.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is malformed.
    pub async fn get_device(&self, id: u64) -> Result<Option<Device>, ProtocolError> {
        self.get_data(&format!("devices/{id}")).await
    }

    /// Discovers every device of the account.
    ///
    /// Failures are logged; a device that cannot be fetched is skipped and a
    /// failed building listing yields an empty list.
    pub async fn devices(&self) -> Vec<Device> {
        let ids = match self.list_buildings().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list buildings");
                return Vec::new();
            }
        };

        let mut devices = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_device(id).await {
                Ok(Some(device)) => devices.push(device),
                Ok(None) => tracing::debug!(device_id = id, "Device has no data"),
                Err(e) => tracing::error!(device_id = id, error = %e, "Failed to fetch device"),
            }
        }
        devices
    }
}

impl CloudTransport for CloudClient {
    async fn login(&self) -> Result<(), ProtocolError> {
        let url = self.url("token");
        tracing::debug!(url = %url, "Logging in");

        let body = TokenRequest {
            grant_type: "password",
            email: &self.config.username,
            password: &self.config.password,
            client_id: &self.config.client_id,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ProtocolError::Http)?;
        if !response.status().is_success() {
            self.session.set_token(None);
            return Err(if response.status() == StatusCode::UNAUTHORIZED {
                ProtocolError::AuthenticationFailed
            } else {
                ProtocolError::UnexpectedStatus(response.status().as_u16())
            });
        }

        let envelope: Envelope<TokenData> = response.json().await.map_err(ProtocolError::Http)?;
        let token = envelope
            .data
            .and_then(|d| d.access_token)
            .filter(|t| !t.is_empty());
        let Some(token) = token else {
            self.session.set_token(None);
            tracing::error!("login: unauthorized, no token issued");
            return Err(ProtocolError::AuthenticationFailed);
        };

        self.session.set_token(Some(token));
        tracing::info!("Logged in");

        if let Err(e) = self.refresh_user().await {
            tracing::error!(error = %e, "Failed to fetch push credentials");
        }
        Ok(())
    }

    async fn post_control(
        &self,
        device_id: u64,
        request: &ControlRequest,
    ) -> Result<DeviceList, ProtocolError> {
        let url = self.url(&format!("devices/{device_id}/ctrl?ignoreConflicts=false"));
        tracing::debug!(url = %url, cmd_id = request.cmd_id, "POST control");

        let envelope: Envelope<DeviceList> = self
            .send(self.client.post(&url).json(request))
            .await?
            .json()
            .await
            .map_err(ProtocolError::Http)?;
        Ok(envelope.data.unwrap_or_default())
    }
}
