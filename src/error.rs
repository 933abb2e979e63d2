// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `merosync` library.
//!
//! The hierarchy separates value validation, broker communication, message
//! parsing and device-level refusals. The broker-level kinds map onto the
//! outcomes a caller has to distinguish:
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | [`ProtocolError::ConnectionFailed`] | Session could not be established or authenticated |
//! | [`ProtocolError::NotConnected`] | Publish attempted while the session is down; retry later |
//! | [`ProtocolError::Timeout`] | No acknowledgment in time; the command may or may not have run |
//! | [`DeviceError::UnsupportedCapability`] | The device does not expose that surface |
//! | [`DeviceError::Offline`] | The device is flagged offline; nothing was sent |

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during broker communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a message.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error reported for a specific device.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// Device was not found in the manager.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The manager has not been initialized, or was already closed.
    #[error("manager is not initialized")]
    NotInitialized,
}

impl Error {
    /// Returns `true` when the command outcome is unknown.
    ///
    /// A timed out command may still have reached the device. Callers must
    /// not treat it as a confirmed failure; a [`refresh`](crate::DeviceProxy::refresh)
    /// reveals the actual state.
    #[must_use]
    pub fn is_outcome_unknown(&self) -> bool {
        matches!(self, Self::Protocol(ProtocolError::Timeout(_)))
    }

    /// Returns `true` if retrying the same call later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Protocol(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
        /// The actual value that was provided.
        actual: i64,
    },

    /// A spray mode code is not one of the known modes.
    #[error("invalid spray mode: {0}")]
    InvalidSprayMode(i64),

    /// A hex color string could not be parsed.
    #[error("invalid hex color: {0}")]
    InvalidHexColor(String),

    /// A device UUID is empty or contains topic separators/wildcards.
    #[error("invalid device uuid: {0:?}")]
    InvalidUuid(String),

    /// A light command that would change nothing.
    #[error("light command sets no attribute")]
    EmptyLightCommand,
}

/// Errors related to broker communication.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The MQTT client rejected the request.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Establishing or authenticating the session failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A publish or subscribe was attempted while the session is down.
    #[error("session is not connected")]
    NotConnected,

    /// No acknowledgment arrived before the deadline.
    #[error("command timed out after {0} ms, outcome unknown")]
    Timeout(u64),

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

impl ProtocolError {
    /// Returns `true` for transient failures.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotConnected | Self::Timeout(_) => true,
            #[cfg(feature = "mqtt")]
            Self::Mqtt(_) => true,
            _ => false,
        }
    }
}

/// Errors related to parsing broker messages.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the message.
    #[error("missing field in message: {0}")]
    MissingField(String),

    /// Unexpected message format.
    #[error("unexpected message format: {0}")]
    UnexpectedFormat(String),

    /// Failed to parse a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// Errors related to device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Device does not support the requested capability.
    #[error("device does not support {capability}")]
    UnsupportedCapability {
        /// The capability that is not supported.
        capability: String,
    },

    /// The device is flagged offline; the command was not sent.
    #[error("device {uuid} is offline")]
    Offline {
        /// The device that is offline.
        uuid: String,
    },

    /// The device answered with an `ERROR` acknowledgment.
    #[error("command rejected: {0}")]
    CommandRejected(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            min: 0,
            max: 100,
            actual: 150,
        };
        assert_eq!(err.to_string(), "value 150 is out of range [0, 100]");
    }

    #[test]
    fn timeout_is_outcome_unknown() {
        let err: Error = ProtocolError::Timeout(5000).into();
        assert!(err.is_outcome_unknown());
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "protocol error: command timed out after 5000 ms, outcome unknown"
        );
    }

    #[test]
    fn not_connected_is_retryable_but_known() {
        let err: Error = ProtocolError::NotConnected.into();
        assert!(!err.is_outcome_unknown());
        assert!(err.is_retryable());
    }

    #[test]
    fn capability_errors_are_not_retryable() {
        let err: Error = DeviceError::UnsupportedCapability {
            capability: "spray".to_string(),
        }
        .into();
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "device error: device does not support spray");
    }

    #[test]
    fn offline_display() {
        let err = DeviceError::Offline {
            uuid: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "device abc is offline");
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::MissingField("header".to_string());
        assert_eq!(err.to_string(), "missing field in message: header");
    }
}
