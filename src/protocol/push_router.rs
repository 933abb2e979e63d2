// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound message routing.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::command::Dispatcher;
use crate::device::DeviceTable;

use super::message::{Message, Method};
use super::topics::device_uuid_from_topic;
use super::transport::InboundMessage;

/// Consumes the inbound stream of a session.
///
/// Each message is offered to the dispatcher when it may complete a pending
/// command, and pushes are applied to the proxy of the device that sent
/// them. Routing never fails: undecodable messages and pushes from unknown
/// devices are logged and dropped.
#[derive(Debug, Clone)]
pub struct PushRouter {
    dispatcher: Arc<Dispatcher>,
    devices: Arc<RwLock<DeviceTable>>,
}

impl PushRouter {
    /// Creates a router over a dispatcher and a proxy collection.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, devices: Arc<RwLock<DeviceTable>>) -> Self {
        Self {
            dispatcher,
            devices,
        }
    }

    /// Routes one inbound message.
    pub fn route(&self, inbound: &InboundMessage) {
        let message = match Message::decode(inbound.payload()) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(topic = %inbound.topic(), error = %e, "Dropping undecodable message");
                return;
            }
        };

        let method = message.method();
        if message.message_id().is_some() && (method.is_ack() || method == Method::Push) {
            let resolved = self.dispatcher.resolve(&message);
            if method.is_ack() && !resolved {
                tracing::debug!(
                    topic = %inbound.topic(),
                    namespace = %message.namespace(),
                    message_id = ?message.message_id(),
                    "Dropping unmatched ack"
                );
            }
        }

        if method != Method::Push {
            return;
        }

        let source = message
            .header
            .from
            .as_deref()
            .and_then(device_uuid_from_topic)
            .or_else(|| device_uuid_from_topic(inbound.topic()));
        let Some(source) = source else {
            tracing::warn!(topic = %inbound.topic(), "Dropping push without source device");
            return;
        };

        let proxy = self.devices.read().get(source);
        match proxy {
            Some(proxy) => {
                proxy.apply_push(&message, inbound.received_at());
            }
            None => {
                tracing::warn!(uuid = %source, namespace = %message.namespace(), "Dropping push from unknown device");
            }
        }
    }

    /// Routes messages until the stream ends.
    pub async fn run(self, mut inbound: mpsc::Receiver<InboundMessage>) {
        tracing::debug!("Push router started");
        while let Some(message) = inbound.recv().await {
            self.route(&message);
        }
        tracing::warn!("Push router stopped: inbound stream closed");
    }
}
