// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command dispatch with re-login on authentication failure.

use crate::error::ValueError;
use crate::protocol::CloudTransport;
use crate::types::{ControlMode, DeviceList};

use super::{ControlRequest, ControlValue};

/// Default number of attempts per command.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Sends control commands and recovers from expired tokens.
///
/// Failures never propagate: every outcome other than a successful response
/// is logged and reported as `None`, which callers treat as "leave the prior
/// state unchanged".
#[derive(Debug)]
pub struct CommandDispatcher<T> {
    transport: T,
}

impl<T: CloudTransport> CommandDispatcher<T> {
    /// Creates a dispatcher over a transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends a command and returns the refreshed device list.
    ///
    /// `max_retries` bounds the number of requests: on an authentication
    /// failure the dispatcher logs in again and retries with one attempt
    /// fewer, giving up once none remain. Other failures are not retried.
    /// A missing `value` is rejected before any request is made.
    pub async fn send(
        &self,
        device_id: u64,
        mode: ControlMode,
        function_id: u64,
        value: Option<ControlValue>,
        max_retries: u32,
    ) -> Option<DeviceList> {
        tracing::debug!(
            device_id,
            %mode,
            function_id,
            value = ?value,
            "Dispatching command"
        );

        let Some(value) = value else {
            let error = ValueError::Rejected(mode.to_string());
            tracing::error!(device_id, error = %error, "Command rejected");
            return None;
        };

        let mut retries = max_retries;
        while retries > 0 {
            let request = ControlRequest::new(mode, function_id, value);
            match self.transport.post_control(device_id, &request).await {
                Ok(devices) => return Some(devices),
                Err(e) if e.is_auth_failure() => {
                    tracing::error!(device_id, "Control request unauthorized, logging in again");
                    if let Err(e) = self.transport.login().await {
                        tracing::error!(error = %e, "Login failed");
                    }
                    retries -= 1;
                }
                Err(e) => {
                    tracing::error!(device_id, %mode, error = %e, "Control request failed");
                    return None;
                }
            }
        }

        tracing::error!(device_id, %mode, max_retries, "Giving up on command");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Transport replaying scripted control outcomes.
    #[derive(Default)]
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<Result<DeviceList, ProtocolError>>>,
        requests: Mutex<Vec<ControlRequest>>,
        logins: Mutex<u32>,
    }

    impl ScriptedTransport {
        fn with(outcomes: Vec<Result<DeviceList, ProtocolError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                ..Self::default()
            }
        }
    }

    impl CloudTransport for ScriptedTransport {
        async fn login(&self) -> Result<(), ProtocolError> {
            *self.logins.lock() += 1;
            Ok(())
        }

        async fn post_control(
            &self,
            _device_id: u64,
            request: &ControlRequest,
        ) -> Result<DeviceList, ProtocolError> {
            self.requests.lock().push(request.clone());
            self.outcomes
                .lock()
                .pop_front()
                .unwrap_or(Err(ProtocolError::UnexpectedStatus(500)))
        }
    }

    fn one_device(id: u64) -> DeviceList {
        serde_json::from_value(serde_json::json!({"devices": [{"id": id}]})).unwrap()
    }

    #[tokio::test]
    async fn success_returns_devices() {
        let dispatcher = CommandDispatcher::new(ScriptedTransport::with(vec![Ok(one_device(5))]));
        let result = dispatcher
            .send(5, ControlMode::IsOn, 1, Some(true.into()), 2)
            .await;
        assert!(result.unwrap().find(5).is_some());
        assert_eq!(*dispatcher.transport().logins.lock(), 0);
    }

    #[tokio::test]
    async fn missing_value_makes_no_request() {
        let dispatcher = CommandDispatcher::new(ScriptedTransport::default());
        assert!(dispatcher.send(5, ControlMode::SetTemp, 1, None, 2).await.is_none());
        assert!(dispatcher.transport().requests.lock().is_empty());
    }

    #[tokio::test]
    async fn false_and_zero_are_sent() {
        let dispatcher = CommandDispatcher::new(ScriptedTransport::with(vec![
            Ok(DeviceList::default()),
            Ok(DeviceList::default()),
        ]));
        assert!(
            dispatcher
                .send(5, ControlMode::IsOn, 1, Some(false.into()), 2)
                .await
                .is_some()
        );
        assert!(
            dispatcher
                .send(5, ControlMode::FanSpeed, 2, Some(0.0.into()), 2)
                .await
                .is_some()
        );
        assert_eq!(dispatcher.transport().requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn unauthorized_once_relogs_and_retries() {
        let dispatcher = CommandDispatcher::new(ScriptedTransport::with(vec![
            Err(ProtocolError::AuthenticationFailed),
            Ok(one_device(5)),
        ]));
        let result = dispatcher
            .send(5, ControlMode::CoolMode, 8, Some(true.into()), 2)
            .await;

        assert!(result.is_some());
        assert_eq!(*dispatcher.transport().logins.lock(), 1);
        assert_eq!(dispatcher.transport().requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let dispatcher = CommandDispatcher::new(ScriptedTransport::with(vec![
            Err(ProtocolError::AuthenticationFailed),
            Err(ProtocolError::AuthenticationFailed),
            Ok(one_device(5)),
        ]));
        let result = dispatcher
            .send(5, ControlMode::IsOn, 1, Some(true.into()), 2)
            .await;

        assert!(result.is_none());
        assert_eq!(dispatcher.transport().requests.lock().len(), 2);
        assert_eq!(*dispatcher.transport().logins.lock(), 2);
    }

    #[tokio::test]
    async fn zero_retries_sends_nothing() {
        let dispatcher = CommandDispatcher::new(ScriptedTransport::with(vec![Ok(one_device(5))]));
        assert!(
            dispatcher
                .send(5, ControlMode::IsOn, 1, Some(true.into()), 0)
                .await
                .is_none()
        );
        assert!(dispatcher.transport().requests.lock().is_empty());
    }

    #[tokio::test]
    async fn other_failures_are_not_retried() {
        let dispatcher = CommandDispatcher::new(ScriptedTransport::with(vec![
            Err(ProtocolError::UnexpectedStatus(503)),
            Ok(one_device(5)),
        ]));
        assert!(
            dispatcher
                .send(5, ControlMode::IsOn, 1, Some(true.into()), 2)
                .await
                .is_none()
        );
        assert_eq!(dispatcher.transport().requests.lock().len(), 1);
        assert_eq!(*dispatcher.transport().logins.lock(), 0);
    }

    #[tokio::test]
    async fn each_attempt_gets_a_fresh_request() {
        let dispatcher = CommandDispatcher::new(ScriptedTransport::with(vec![
            Err(ProtocolError::AuthenticationFailed),
            Ok(DeviceList::default()),
        ]));
        dispatcher
            .send(5, ControlMode::SetTemp, 3, Some(23.0.into()), 2)
            .await;
        let requests = dispatcher.transport().requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].value, requests[1].value);
    }
}
