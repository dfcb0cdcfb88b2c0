// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the bridge.
//!
//! Errors are raised by the transport layers (cloud HTTP API, push channel) and
//! by payload parsing. The accessory-facing layers catch them where the I/O
//! happens, log them, and fall back to "leave the prior state unchanged".

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during protocol communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a vendor payload.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A control value was rejected before any request was made.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// The bridge configuration is incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors related to protocol communication (HTTP/MQTT).
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// MQTT connection or communication failed.
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// The token is missing or was refused by the cloud.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The cloud answered with a non-success status other than 401.
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl ProtocolError {
    /// Returns `true` if this failure should trigger a re-login.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed)
    }
}

/// Errors related to parsing vendor payloads.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors related to control values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The control value was absent.
    #[error("no value given for {0}")]
    Rejected(String),
}

/// Errors related to the bridge configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required configuration parameter is missing.
    #[error("missing required config parameter: {0}")]
    MissingField(&'static str),

    /// A configuration parameter has an unusable value.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// The offending parameter.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failure_is_detected() {
        assert!(ProtocolError::AuthenticationFailed.is_auth_failure());
        assert!(!ProtocolError::UnexpectedStatus(500).is_auth_failure());
    }

    #[test]
    fn error_from_config_error() {
        let err: Error = ConfigError::MissingField("username").into();
        assert!(matches!(err, Error::Config(ConfigError::MissingField("username"))));
        assert_eq!(
            err.to_string(),
            "configuration error: missing required config parameter: username"
        );
    }

    #[test]
    fn value_error_display() {
        let err = ValueError::Rejected("SetTemp".to_string());
        assert_eq!(err.to_string(), "no value given for SetTemp");
    }

    #[test]
    fn protocol_error_display() {
        assert_eq!(
            ProtocolError::UnexpectedStatus(503).to_string(),
            "unexpected HTTP status 503"
        );
    }
}
