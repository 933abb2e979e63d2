// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker plumbing.
//!
//! This module contains everything between the device proxies and the
//! broker: the message wire format, the topic convention, the [`Transport`]
//! abstraction with its MQTT implementation, and the [`PushRouter`] that
//! fans inbound traffic out to the dispatcher and the proxies.
//!
//! # Sessions
//!
//! - [`MqttSession`]: `rumqttc` connection with automatic reconnection
//!   (requires the `mqtt` feature, enabled by default)
//! - Any other [`Transport`] implementation, e.g. an in-memory broker for
//!   tests

mod envelope;
mod message;
pub mod namespace;
mod push_router;
mod reconnect;
#[cfg(feature = "mqtt")]
mod session;
pub mod topics;
mod transport;

pub use envelope::{CommandEnvelope, CommandRequest};
pub use message::{Header, Message, MessageId, Method};
pub use push_router::PushRouter;
pub use reconnect::ReconnectionPolicy;
#[cfg(feature = "mqtt")]
pub use session::{MqttSession, MqttSessionBuilder};
pub use transport::{BoxFuture, InboundMessage, Transport};
