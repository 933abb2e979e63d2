// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire format of broker messages.
//!
//! Every message, in both directions, is a JSON object with a `header` and a
//! `payload`:
//!
//! ```json
//! {
//!   "header": {
//!     "messageId": "9f3c0e2a7b8d4c1e8a6b5d4c3b2a1f0e",
//!     "namespace": "Appliance.Control.Spray",
//!     "method": "SET",
//!     "payloadVersion": 1,
//!     "from": "/app/merosync_1234_0/subscribe",
//!     "timestamp": 1700000000,
//!     "timestampMs": 250
//!   },
//!   "payload": { "spray": { "channel": 0, "mode": 1 } }
//! }
//! ```
//!
//! Acknowledgments echo the `messageId` of the command they answer.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;

/// Correlation identifier carried in `header.messageId`.
///
/// Fresh identifiers are random 128-bit values rendered as 32 lowercase hex
/// characters.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generates a new random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Wraps an identifier received from the wire.
    #[must_use]
    pub fn from_wire(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Read request.
    Get,
    /// Write request.
    Set,
    /// Unsolicited state notification.
    Push,
    /// Acknowledgment of a `GET`, carrying the requested state.
    GetAck,
    /// Acknowledgment of a `SET`.
    SetAck,
    /// Negative acknowledgment.
    Error,
}

impl Method {
    /// Returns `true` for methods that answer a command.
    #[must_use]
    pub const fn is_ack(self) -> bool {
        matches!(self, Self::GetAck | Self::SetAck | Self::Error)
    }

    /// Returns the method name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Set => "SET",
            Self::Push => "PUSH",
            Self::GetAck => "GETACK",
            Self::SetAck => "SETACK",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_payload_version() -> u8 {
    1
}

/// Message header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Correlation identifier. Pushes may omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    /// Capability namespace, e.g. `Appliance.Control.ToggleX`.
    pub namespace: String,
    /// Message method.
    pub method: Method,
    /// Payload schema version.
    #[serde(default = "default_payload_version")]
    pub payload_version: u8,
    /// Topic of the sender; acknowledgments are addressed to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Send time, seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Millisecond part of the send time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
}

impl Header {
    /// Creates a header stamped with the given time.
    #[must_use]
    pub fn new(
        message_id: Option<MessageId>,
        namespace: impl Into<String>,
        method: Method,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            message_id,
            namespace: namespace.into(),
            method,
            payload_version: 1,
            from: None,
            timestamp: Some(at.timestamp()),
            timestamp_ms: Some(i64::from(at.timestamp_subsec_millis())),
        }
    }

    /// Sets the sender topic.
    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Returns the send time, if the header carries a valid one.
    ///
    /// This is the timestamp used for last-write-wins ordering.
    #[must_use]
    pub fn stamp(&self) -> Option<DateTime<Utc>> {
        let secs = self.timestamp?;
        let millis = self
            .timestamp_ms
            .filter(|ms| (0..1000).contains(ms))
            .unwrap_or(0);
        let nanos = u32::try_from(millis * 1_000_000).ok()?;
        DateTime::from_timestamp(secs, nanos)
    }
}

/// A decoded broker message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message header.
    pub header: Header,
    /// Namespace-specific payload.
    #[serde(default)]
    pub payload: Value,
}

impl Message {
    /// Creates a message.
    #[must_use]
    pub fn new(header: Header, payload: Value) -> Self {
        Self { header, payload }
    }

    /// Decodes a message from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if the text is not a valid message.
    pub fn decode(text: &str) -> Result<Self, ParseError> {
        serde_json::from_str(text).map_err(Into::into)
    }

    /// Encodes the message to JSON text.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if serialization fails.
    pub fn encode(&self) -> Result<String, ParseError> {
        serde_json::to_string(self).map_err(Into::into)
    }

    /// Returns the correlation identifier, if any.
    #[must_use]
    pub fn message_id(&self) -> Option<&MessageId> {
        self.header.message_id.as_ref()
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.header.namespace
    }

    /// Returns the method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.header.method
    }
}
