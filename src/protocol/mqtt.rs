// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT push channel.
//!
//! The cloud publishes a device list on `user/{userId}/notification` whenever
//! one of the account's devices changes. [`PushClient`] subscribes to that
//! topic and forwards every publish over a channel; decoding is left to the
//! receiver.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, Transport};
use tokio::sync::mpsc;

use crate::error::ProtocolError;
use crate::protocol::MqttUser;

/// Global counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Pause between reconnection attempts after an event loop error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Capacity of the request and message channels.
const CHANNEL_CAPACITY: usize = 32;

// ============================================================================
// PushConfig
// ============================================================================

/// Configuration for the push channel.
///
/// # Examples
///
/// ```
/// use daichi_bridge::protocol::PushConfig;
///
/// let config = PushConfig::new("mqtt://127.0.0.1:1883")
///     .with_credentials("mqtt_user", "mqtt_password")
///     .with_topic("user/77/notification");
///
/// assert_eq!(config.topic(), "user/77/notification");
/// ```
#[derive(Debug, Clone)]
pub struct PushConfig {
    url: String,
    credentials: Option<(String, String)>,
    topic: String,
    client_id: Option<String>,
    keep_alive: Duration,
}

impl PushConfig {
    /// Production broker URL.
    pub const DEFAULT_URL: &'static str = "wss://split.daichicloud.ru/mqtt";
    /// Default keep-alive interval.
    pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

    /// Creates a configuration for the given broker URL.
    ///
    /// Supported schemes are `wss://`, `ws://`, `mqtts://`, `mqtt://` and
    /// `tcp://`; a bare `host:port` is plain TCP.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credentials: None,
            topic: String::new(),
            client_id: None,
            keep_alive: Self::DEFAULT_KEEP_ALIVE,
        }
    }

    /// Creates a configuration subscribing to a user's notifications.
    #[must_use]
    pub fn for_user(url: impl Into<String>, user: &MqttUser) -> Self {
        Self::new(url)
            .with_credentials(user.username.clone(), user.password.clone())
            .with_topic(user.notification_topic())
    }

    /// Sets the broker credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the topic to subscribe to.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Sets a custom client ID.
    #[must_use]
    pub fn with_client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Sets the keep-alive interval.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Returns the broker URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the subscription topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    fn mqtt_options(&self) -> Result<MqttOptions, ProtocolError> {
        let broker = parse_broker_url(&self.url)?;

        // PID + counter to avoid conflicts
        let client_id = self.client_id.clone().unwrap_or_else(|| {
            let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
            format!("daichi_{}_{}", std::process::id(), counter)
        });

        let mut options = MqttOptions::new(client_id, broker.host, broker.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        options.set_transport(broker.transport);
        if let Some((username, password)) = &self.credentials {
            options.set_credentials(username, password);
        }
        Ok(options)
    }
}

// ============================================================================
// Broker URL parsing
// ============================================================================

struct BrokerAddress {
    /// Host for TCP transports, the full URL for websockets.
    host: String,
    port: u16,
    transport: Transport,
}

/// Installs the process-wide rustls crypto provider.
///
/// Both `ring` (through reqwest) and `aws-lc-rs` (through rumqttc) are linked,
/// so rustls cannot pick one on its own. Installing twice is harmless.
fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn parse_broker_url(url: &str) -> Result<BrokerAddress, ProtocolError> {
    let (scheme, rest) = url.split_once("://").unwrap_or(("mqtt", url));
    if matches!(scheme, "wss" | "mqtts" | "ssl") {
        install_crypto_provider();
    }

    let (default_port, transport, websocket) = match scheme {
        "wss" => (443, Transport::wss_with_default_config(), true),
        "ws" => (80, Transport::Ws, true),
        "mqtts" | "ssl" => (8883, Transport::tls_with_default_config(), false),
        "mqtt" | "tcp" => (1883, Transport::Tcp, false),
        other => {
            return Err(ProtocolError::InvalidAddress(format!(
                "unsupported scheme: {other}"
            )));
        }
    };

    let authority = rest.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        return Err(ProtocolError::InvalidAddress(format!("missing host: {url}")));
    }

    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) => {
            let port = p
                .parse()
                .map_err(|_| ProtocolError::InvalidAddress(format!("Invalid port: {p}")))?;
            (h, port)
        }
        None => (authority, default_port),
    };

    Ok(BrokerAddress {
        host: if websocket {
            url.to_string()
        } else {
            host.to_string()
        },
        port,
        transport,
    })
}

// ============================================================================
// PushClient
// ============================================================================

/// A message received on the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    /// Topic the message was published on.
    pub topic: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

/// Subscriber to the cloud's push notifications.
///
/// The connection is driven by a background task which re-subscribes after
/// every (re)connection and keeps retrying after errors until the client
/// disconnects or the receiver is dropped.
///
/// # Examples
///
/// ```no_run
/// use daichi_bridge::protocol::{PushClient, PushConfig};
///
/// # async fn example() -> Result<(), daichi_bridge::ProtocolError> {
/// let config = PushConfig::new(PushConfig::DEFAULT_URL)
///     .with_credentials("mqtt_user", "mqtt_password")
///     .with_topic("user/77/notification");
///
/// let (client, mut messages) = PushClient::connect(config).await?;
/// while let Some(message) = messages.recv().await {
///     println!("{}: {} bytes", message.topic, message.payload.len());
/// }
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PushClient {
    client: AsyncClient,
    topic: String,
}

impl PushClient {
    /// Starts the push connection.
    ///
    /// Returns the client handle and the receiving end of the message channel.
    ///
    /// # Errors
    ///
    /// Returns error if the broker URL is invalid or no topic is configured.
    pub async fn connect(
        config: PushConfig,
    ) -> Result<(Self, mpsc::Receiver<PushMessage>), ProtocolError> {
        if config.topic.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "push topic is required".to_string(),
            ));
        }

        let options = config.mqtt_options()?;
        let (client, event_loop) = AsyncClient::new(options, CHANNEL_CAPACITY);
        let (message_tx, message_rx) = mpsc::channel::<PushMessage>(CHANNEL_CAPACITY);

        tracing::info!(url = %config.url, topic = %config.topic, "Connecting push channel");

        let subscriber = client.clone();
        let topic = config.topic.clone();
        tokio::spawn(async move {
            handle_push_events(event_loop, subscriber, topic, message_tx).await;
        });

        // Yield once so the event loop can start before callers proceed
        tokio::task::yield_now().await;

        Ok((
            Self {
                client,
                topic: config.topic,
            },
            message_rx,
        ))
    }

    /// Returns the subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Disconnects from the broker and stops the background task.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        self.client.disconnect().await.map_err(ProtocolError::Mqtt)
    }
}

/// Drives the MQTT connection in the background.
async fn handle_push_events(
    mut event_loop: EventLoop,
    client: AsyncClient,
    topic: String,
    message_tx: mpsc::Sender<PushMessage>,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::info!(?connack, "Push channel connected");
                if let Err(e) = client.subscribe(&topic, QoS::AtLeastOnce).await {
                    tracing::error!(error = %e, topic = %topic, "Push subscription failed");
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "Push subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::debug!(
                    topic = %publish.topic,
                    bytes = publish.payload.len(),
                    "Received push message"
                );
                let message = PushMessage {
                    topic: publish.topic.clone(),
                    payload: publish.payload.to_vec(),
                };
                if message_tx.send(message).await.is_err() {
                    tracing::debug!("Push receiver dropped, stopping");
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("Push channel disconnected by broker");
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::info!("Push channel disconnected");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if message_tx.is_closed() {
                    break;
                }
                tracing::error!(error = %e, "Push channel error");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_wss_url() {
        let broker = parse_broker_url("wss://split.daichicloud.ru/mqtt").unwrap();
        assert_eq!(broker.host, "wss://split.daichicloud.ru/mqtt");
        assert_eq!(broker.port, 443);
    }

    #[test]
    fn tls_schemes_have_a_crypto_provider() {
        parse_broker_url("mqtts://broker.example:8883").unwrap();
        assert!(rustls::crypto::CryptoProvider::get_default().is_some());
    }

    #[test]
    fn parse_ws_url_with_port() {
        let broker = parse_broker_url("ws://127.0.0.1:9001/mqtt").unwrap();
        assert_eq!(broker.host, "ws://127.0.0.1:9001/mqtt");
        assert_eq!(broker.port, 9001);
        assert!(matches!(broker.transport, Transport::Ws));
    }

    #[test]
    fn parse_mqtt_url_with_port() {
        let broker = parse_broker_url("mqtt://192.168.1.50:1884").unwrap();
        assert_eq!(broker.host, "192.168.1.50");
        assert_eq!(broker.port, 1884);
        assert!(matches!(broker.transport, Transport::Tcp));
    }

    #[test]
    fn parse_bare_host_defaults_to_tcp() {
        let broker = parse_broker_url("broker.local").unwrap();
        assert_eq!(broker.host, "broker.local");
        assert_eq!(broker.port, 1883);
    }

    #[test]
    fn parse_rejects_bad_urls() {
        assert!(parse_broker_url("http://example.com").is_err());
        assert!(parse_broker_url("mqtt://host:notaport").is_err());
        assert!(parse_broker_url("mqtt://").is_err());
    }

    #[test]
    fn config_for_user() {
        let user = MqttUser {
            username: "mu".to_string(),
            password: "mp".to_string(),
            user_id: 12,
        };
        let config = PushConfig::for_user(PushConfig::DEFAULT_URL, &user);
        assert_eq!(config.topic(), "user/12/notification");
        assert_eq!(config.url(), PushConfig::DEFAULT_URL);
    }

    #[tokio::test]
    async fn connect_requires_topic() {
        let result = PushClient::connect(PushConfig::new("mqtt://127.0.0.1:1")).await;
        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }
}
