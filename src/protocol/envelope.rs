// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outgoing commands.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::types::DeviceUuid;

use super::message::{Header, Message, MessageId, Method};

/// A command to send, before it is assigned a correlation identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    target: DeviceUuid,
    namespace: String,
    method: Method,
    payload: Value,
}

impl CommandRequest {
    /// Creates a read request with an empty payload.
    #[must_use]
    pub fn get(target: DeviceUuid, namespace: impl Into<String>) -> Self {
        Self {
            target,
            namespace: namespace.into(),
            method: Method::Get,
            payload: json!({}),
        }
    }

    /// Creates a write request.
    #[must_use]
    pub fn set(target: DeviceUuid, namespace: impl Into<String>, payload: Value) -> Self {
        Self {
            target,
            namespace: namespace.into(),
            method: Method::Set,
            payload,
        }
    }

    /// Returns the target device.
    #[must_use]
    pub fn target(&self) -> &DeviceUuid {
        &self.target
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// A command bound to its correlation identifier and issue time.
///
/// Envelopes are immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEnvelope {
    message_id: MessageId,
    request: CommandRequest,
    issued_at: DateTime<Utc>,
}

impl CommandEnvelope {
    /// Binds a request to an identifier.
    #[must_use]
    pub fn new(message_id: MessageId, request: CommandRequest, issued_at: DateTime<Utc>) -> Self {
        Self {
            message_id,
            request,
            issued_at,
        }
    }

    /// Returns the correlation identifier.
    #[must_use]
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// Returns the target device.
    #[must_use]
    pub fn target(&self) -> &DeviceUuid {
        &self.request.target
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.request.namespace
    }

    /// Returns the method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.request.method
    }

    /// Returns the payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.request.payload
    }

    /// Returns when the envelope was built.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Renders the wire message, asking for the ack on `reply_topic`.
    #[must_use]
    pub fn to_message(&self, reply_topic: &str) -> Message {
        let header = Header::new(
            Some(self.message_id.clone()),
            self.request.namespace.clone(),
            self.request.method,
            self.issued_at,
        )
        .with_from(reply_topic);
        Message::new(header, self.request.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_request_has_empty_object_payload() {
        let uuid = DeviceUuid::new("dev").unwrap();
        let request = CommandRequest::get(uuid, "Appliance.System.All");
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.payload(), &json!({}));
    }

    #[test]
    fn envelope_message_carries_id_and_reply_topic() {
        let uuid = DeviceUuid::new("dev").unwrap();
        let request = CommandRequest::set(
            uuid,
            "Appliance.Control.Spray",
            json!({"spray": {"channel": 0, "mode": 1}}),
        );
        let id = MessageId::from_wire("0123");
        let issued_at = Utc::now();
        let envelope = CommandEnvelope::new(id.clone(), request, issued_at);

        let message = envelope.to_message("/app/me/subscribe");
        assert_eq!(message.message_id(), Some(&id));
        assert_eq!(message.method(), Method::Set);
        assert_eq!(message.header.from.as_deref(), Some("/app/me/subscribe"));
        assert_eq!(message.payload["spray"]["mode"], 1);
        assert_eq!(
            message.header.stamp().map(|t| t.timestamp_millis()),
            Some(issued_at.timestamp_millis())
        );
    }
}
