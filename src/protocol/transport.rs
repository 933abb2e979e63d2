// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker session abstraction.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::error::ProtocolError;

/// Boxed future returned by [`Transport`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A raw message received from the broker.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    topic: String,
    payload: String,
    received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Creates a message received now.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }

    /// Returns the topic the message arrived on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the raw payload text.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Returns when the message was received.
    #[must_use]
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

/// One authenticated connection to the broker.
///
/// Implementations deliver every inbound message, acknowledgments and pushes
/// alike, on the single channel returned by [`connect`](Self::connect), in
/// broker delivery order.
///
/// While the connection is down, [`publish`](Self::publish) fails fast with
/// [`ProtocolError::NotConnected`] instead of buffering.
pub trait Transport: Send + Sync {
    /// Establishes the connection and returns the inbound message stream.
    ///
    /// The stream ends when the session is closed or gives up reconnecting.
    /// A session that gave up may be connected again; topics it had
    /// subscribed are restored.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ConnectionFailed`] on handshake or
    /// authentication failure.
    fn connect(&self) -> BoxFuture<'_, Result<mpsc::Receiver<InboundMessage>, ProtocolError>>;

    /// Adds topic interest. Topics already subscribed are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotConnected`] if the session is down.
    fn subscribe<'a>(&'a self, topics: &'a [String]) -> BoxFuture<'a, Result<(), ProtocolError>>;

    /// Publishes a payload on a topic.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotConnected`] if the session is down.
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        payload: String,
    ) -> BoxFuture<'a, Result<(), ProtocolError>>;

    /// Returns whether the session is currently connected.
    fn is_connected(&self) -> bool;

    /// Tears the connection down and releases every subscription.
    ///
    /// Closing an already closed session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the disconnect could not be sent; the session is
    /// considered closed regardless.
    fn close(&self) -> BoxFuture<'_, Result<(), ProtocolError>>;
}
