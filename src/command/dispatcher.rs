// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request/acknowledgment correlation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{DeviceError, Error, ProtocolError};
use crate::protocol::topics::device_command_topic;
use crate::protocol::{CommandEnvelope, CommandRequest, Message, MessageId, Method, Transport};

type PendingMap = Mutex<HashMap<MessageId, oneshot::Sender<Message>>>;

/// Publishes commands and matches acknowledgments back to their callers.
///
/// Each [`send`](Self::send) registers a pending correlation keyed by a fresh
/// [`MessageId`]. The entry is removed exactly once: when the matching ack is
/// [resolved](Self::resolve), when the deadline passes, or when the caller
/// drops the `send` future. Acks arriving after that find nothing and are
/// ignored.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    reply_topic: String,
    pending: PendingMap,
}

/// Removes the pending entry when the awaiting side goes away.
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    message_id: MessageId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.pending.lock().remove(&self.message_id).is_some() {
            tracing::debug!(message_id = %self.message_id, "Pending command released");
        }
    }
}

impl Dispatcher {
    /// Creates a dispatcher that asks for acks on `reply_topic`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, reply_topic: impl Into<String>) -> Self {
        Self {
            transport,
            reply_topic: reply_topic.into(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the topic acks are addressed to.
    #[must_use]
    pub fn reply_topic(&self) -> &str {
        &self.reply_topic
    }

    /// Returns the number of commands awaiting an ack.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Sends a command and waits for its acknowledgment.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::NotConnected`] or [`ProtocolError::Mqtt`] if the
    ///   publish failed; nothing is pending afterwards.
    /// - [`ProtocolError::Timeout`] if no ack arrived in time. The command may
    ///   still have been executed.
    /// - [`DeviceError::CommandRejected`] if the device answered `ERROR`.
    /// - [`ProtocolError::ChannelClosed`] if the dispatcher was shut down
    ///   while waiting.
    pub async fn send(&self, request: CommandRequest, timeout: Duration) -> Result<Message, Error> {
        let (tx, rx) = oneshot::channel();
        let message_id = self.register(tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            message_id: message_id.clone(),
        };

        let envelope = CommandEnvelope::new(message_id, request, Utc::now());
        let topic = device_command_topic(envelope.target());
        let payload = envelope.to_message(&self.reply_topic).encode()?;

        tracing::debug!(
            uuid = %envelope.target(),
            namespace = %envelope.namespace(),
            method = %envelope.method(),
            message_id = %envelope.message_id(),
            "Sending command"
        );
        self.transport.publish(&topic, payload).await?;

        let ack = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(ack)) => ack,
            Ok(Err(_)) => {
                return Err(ProtocolError::ChannelClosed(
                    "dispatcher shut down while awaiting ack".to_string(),
                )
                .into());
            }
            Err(_) => {
                tracing::warn!(
                    uuid = %envelope.target(),
                    namespace = %envelope.namespace(),
                    message_id = %envelope.message_id(),
                    "Command timed out"
                );
                let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                return Err(ProtocolError::Timeout(millis).into());
            }
        };

        if ack.method() == Method::Error {
            return Err(DeviceError::CommandRejected(ack.payload.to_string()).into());
        }
        Ok(ack)
    }

    /// Offers an inbound message to the pending table.
    ///
    /// Returns `true` if it completed a pending command. Messages without an
    /// identifier, and identifiers that are no longer pending, are ignored.
    pub fn resolve(&self, message: &Message) -> bool {
        let Some(message_id) = message.message_id() else {
            return false;
        };
        let Some(slot) = self.pending.lock().remove(message_id) else {
            return false;
        };
        // The receiver may have been dropped between removal and send.
        slot.send(message.clone()).is_ok()
    }

    /// Fails every pending command with [`ProtocolError::ChannelClosed`].
    pub fn cancel_all(&self) {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "Cancelled pending commands");
        }
    }

    fn register(&self, slot: oneshot::Sender<Message>) -> MessageId {
        let mut pending = self.pending.lock();
        let mut message_id = MessageId::random();
        while pending.contains_key(&message_id) {
            message_id = MessageId::random();
        }
        pending.insert(message_id.clone(), slot);
        message_id
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("reply_topic", &self.reply_topic)
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::test_support::RecordingTransport;
    use super::*;
    use crate::protocol::Header;
    use crate::types::DeviceUuid;

    fn dispatcher() -> (Arc<Dispatcher>, tokio::sync::mpsc::UnboundedReceiver<(String, String)>) {
        let (transport, published) = RecordingTransport::new();
        let dispatcher = Dispatcher::new(Arc::new(transport), "/app/test/subscribe");
        (Arc::new(dispatcher), published)
    }

    fn request() -> CommandRequest {
        CommandRequest::set(
            DeviceUuid::new("dev1").unwrap(),
            "Appliance.Control.Spray",
            json!({"spray": {"channel": 0, "mode": 1}}),
        )
    }

    fn ack_for(payload: &str, method: Method) -> Message {
        let sent = Message::decode(payload).unwrap();
        let header = Header::new(
            sent.header.message_id.clone(),
            sent.header.namespace.clone(),
            method,
            Utc::now(),
        );
        Message::new(header, json!({}))
    }

    #[tokio::test]
    async fn ack_resolves_pending_command() {
        let (dispatcher, mut published) = dispatcher();
        let sender = Arc::clone(&dispatcher);
        let task =
            tokio::spawn(async move { sender.send(request(), Duration::from_secs(5)).await });

        let (topic, payload) = published.recv().await.unwrap();
        assert_eq!(topic, "/appliance/dev1/subscribe");
        assert_eq!(dispatcher.pending_count(), 1);

        let ack = ack_for(&payload, Method::SetAck);
        assert!(dispatcher.resolve(&ack));

        let result = task.await.unwrap().unwrap();
        assert_eq!(result.method(), Method::SetAck);
        assert_eq!(dispatcher.pending_count(), 0);

        // A duplicate ack finds nothing.
        assert!(!dispatcher.resolve(&ack));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_removes_pending_entry_and_late_ack_is_ignored() {
        let (dispatcher, mut published) = dispatcher();

        let result = dispatcher.send(request(), Duration::from_secs(5)).await;
        let err = result.unwrap_err();
        assert!(err.is_outcome_unknown());
        assert!(matches!(err, Error::Protocol(ProtocolError::Timeout(5000))));
        assert_eq!(dispatcher.pending_count(), 0);

        let (_, payload) = published.recv().await.unwrap();
        assert!(!dispatcher.resolve(&ack_for(&payload, Method::SetAck)));
    }

    #[tokio::test]
    async fn error_ack_is_a_rejection() {
        let (dispatcher, mut published) = dispatcher();
        let sender = Arc::clone(&dispatcher);
        let task =
            tokio::spawn(async move { sender.send(request(), Duration::from_secs(5)).await });

        let (_, payload) = published.recv().await.unwrap();
        assert!(dispatcher.resolve(&ack_for(&payload, Method::Error)));

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::Device(DeviceError::CommandRejected(_))
        ));
    }

    #[tokio::test]
    async fn publish_failure_leaves_nothing_pending() {
        let dispatcher = Dispatcher::new(
            Arc::new(RecordingTransport::failing()),
            "/app/test/subscribe",
        );
        let err = dispatcher
            .send(request(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError::NotConnected)));
        assert_eq!(dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn dropping_the_caller_releases_the_entry() {
        let (dispatcher, mut published) = dispatcher();
        let sender = Arc::clone(&dispatcher);
        let task =
            tokio::spawn(async move { sender.send(request(), Duration::from_secs(60)).await });

        let (_, payload) = published.recv().await.unwrap();
        assert_eq!(dispatcher.pending_count(), 1);

        task.abort();
        let _ = task.await;
        assert_eq!(dispatcher.pending_count(), 0);
        assert!(!dispatcher.resolve(&ack_for(&payload, Method::SetAck)));
    }

    #[tokio::test]
    async fn concurrent_commands_get_distinct_ids() {
        let (dispatcher, mut published) = dispatcher();
        let mut tasks = Vec::new();
        for _ in 0..3 {
            let sender = Arc::clone(&dispatcher);
            tasks.push(tokio::spawn(async move {
                sender.send(request(), Duration::from_secs(5)).await
            }));
        }

        let mut ids = std::collections::HashSet::new();
        let mut acks = Vec::new();
        for _ in 0..3 {
            let (_, payload) = published.recv().await.unwrap();
            let ack = ack_for(&payload, Method::SetAck);
            ids.insert(ack.message_id().cloned().unwrap());
            acks.push(ack);
        }
        assert_eq!(ids.len(), 3);

        for ack in &acks {
            assert!(dispatcher.resolve(ack));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn cancel_all_fails_waiters() {
        let (dispatcher, mut published) = dispatcher();
        let sender = Arc::clone(&dispatcher);
        let task =
            tokio::spawn(async move { sender.send(request(), Duration::from_secs(60)).await });

        let _ = published.recv().await.unwrap();
        dispatcher.cancel_all();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::ChannelClosed(_))
        ));
    }

    #[test]
    fn message_without_id_resolves_nothing() {
        let (dispatcher, _published) = dispatcher();
        let push = Message::new(
            Header::new(None, "Appliance.Control.Spray", Method::Push, Utc::now()),
            json!({}),
        );
        assert!(!dispatcher.resolve(&push));
    }
}
