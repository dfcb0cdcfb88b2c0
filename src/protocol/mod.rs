// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transports to the Daichi cloud.
//!
//! # Transports
//!
//! - [`CloudClient`]: the REST API, used for login, discovery and control
//! - [`PushClient`]: the MQTT push channel delivering device updates
//!
//! Commands go through the [`CloudTransport`] trait so that the dispatcher
//! can be driven by any implementation, including test doubles.

mod http;
mod mqtt;

pub use http::{CloudClient, CloudConfig, MqttUser, Session};
pub use mqtt::{PushClient, PushConfig, PushMessage};

use crate::command::ControlRequest;
use crate::error::ProtocolError;
use crate::types::DeviceList;

/// The operations the command path needs from the cloud.
#[allow(async_fn_in_trait)]
pub trait CloudTransport {
    /// Authenticates and stores a fresh token.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::AuthenticationFailed` if no token was issued,
    /// or a transport error if the request failed.
    async fn login(&self) -> Result<(), ProtocolError>;

    /// Sends a control request for one device.
    ///
    /// Returns the refreshed device list from the response.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::AuthenticationFailed` on HTTP 401 and
    /// `ProtocolError::UnexpectedStatus` on any other non-success status.
    async fn post_control(
        &self,
        device_id: u64,
        request: &ControlRequest,
    ) -> Result<DeviceList, ProtocolError>;
}
