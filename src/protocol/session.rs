// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT broker session.
//!
//! [`MqttSession`] owns one connection to the broker. Its event loop runs in
//! a background task that forwards every incoming publish to the inbound
//! channel and, when the connection drops, keeps polling with exponential
//! backoff. Every tracked subscription is restored after each reconnect.
//!
//! # Examples
//!
//! ```no_run
//! use merosync::protocol::{MqttSession, Transport};
//!
//! # async fn example() -> merosync::Result<()> {
//! let session = MqttSession::builder()
//!     .host("mqtt.example.com")
//!     .port(1883)
//!     .credentials("user", "password")
//!     .build()?;
//!
//! let mut inbound = session.connect().await?;
//! session.subscribe(&["/appliance/abc/publish".to_string()]).await?;
//!
//! while let Some(message) = inbound.recv().await {
//!     println!("{}: {}", message.topic(), message.payload());
//! }
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::ProtocolError;

use super::reconnect::ReconnectionPolicy;
use super::transport::{BoxFuture, InboundMessage, Transport};

/// Global counter for generating unique client IDs.
static SESSION_CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Capacity of the inbound message channel.
const INBOUND_CAPACITY: usize = 256;

/// Capacity of the rumqttc request queue.
const REQUEST_CAPACITY: usize = 64;

/// Configuration for an MQTT session.
#[derive(Debug, Clone)]
struct MqttSessionConfig {
    host: String,
    port: u16,
    client_id: Option<String>,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    connection_timeout: Duration,
    reconnection: ReconnectionPolicy,
}

impl Default for MqttSessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            client_id: None,
            credentials: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            reconnection: ReconnectionPolicy::default(),
        }
    }
}

/// An MQTT connection implementing [`Transport`].
///
/// `MqttSession` is cheaply cloneable; clones share the same connection.
#[derive(Clone)]
pub struct MqttSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: MqttSessionConfig,
    client_id: String,
    /// Client handle; `None` before connect and after close.
    client: Mutex<Option<AsyncClient>>,
    /// Topics to restore after a reconnect.
    subscriptions: Mutex<BTreeSet<String>>,
    connected: AtomicBool,
    closing: AtomicBool,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionInner {
    fn client(&self) -> Result<AsyncClient, ProtocolError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(ProtocolError::NotConnected);
        }
        self.client.lock().clone().ok_or(ProtocolError::NotConnected)
    }
}

impl MqttSession {
    /// Creates a new builder for configuring an MQTT session.
    #[must_use]
    pub fn builder() -> MqttSessionBuilder {
        MqttSessionBuilder::default()
    }

    /// Returns the host address of the broker.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Returns the port of the broker.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.config.port
    }

    /// Returns the MQTT client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    /// Returns the number of tracked subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.lock().len()
    }

    async fn connect_inner(&self) -> Result<mpsc::Receiver<InboundMessage>, ProtocolError> {
        let inner = &self.inner;
        if inner.client.lock().is_some() {
            return Err(ProtocolError::ConnectionFailed(
                "session is already connected".to_string(),
            ));
        }

        let config = &inner.config;
        let mut options = MqttOptions::new(&inner.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive);
        options.set_clean_session(true);
        if let Some((ref username, ref password)) = config.credentials {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (connack_tx, connack_rx) = oneshot::channel();

        inner.closing.store(false, Ordering::Release);
        *inner.client.lock() = Some(client);

        let task_inner = Arc::clone(inner);
        let handle = tokio::spawn(async move {
            run_event_loop(event_loop, task_inner, inbound_tx, connack_tx).await;
        });
        *inner.event_task.lock() = Some(handle);

        let timeout = config.connection_timeout;
        let outcome = match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(reason))) => Err(ProtocolError::ConnectionFailed(reason)),
            Ok(Err(_)) => Err(ProtocolError::ConnectionFailed(
                "MQTT event loop terminated unexpectedly".to_string(),
            )),
            Err(_) => Err(ProtocolError::ConnectionFailed(format!(
                "MQTT connection timeout after {}s",
                timeout.as_secs()
            ))),
        };

        if let Err(err) = outcome {
            if let Some(handle) = inner.event_task.lock().take() {
                handle.abort();
            }
            inner.client.lock().take();
            inner.connected.store(false, Ordering::Release);
            tracing::warn!(
                host = %config.host,
                port = %config.port,
                error = %err,
                "MQTT session failed to connect"
            );
            return Err(err);
        }

        tracing::info!(
            host = %config.host,
            port = %config.port,
            client_id = %inner.client_id,
            "Connected to MQTT broker"
        );
        // Non-empty only when a previous connection gave up reconnecting.
        restore_subscriptions(inner);
        Ok(inbound_rx)
    }

    async fn subscribe_inner(&self, topics: &[String]) -> Result<(), ProtocolError> {
        let client = self.inner.client()?;
        for topic in topics {
            if self.inner.subscriptions.lock().contains(topic) {
                continue;
            }
            client
                .subscribe(topic.as_str(), QoS::AtLeastOnce)
                .await
                .map_err(ProtocolError::Mqtt)?;
            self.inner.subscriptions.lock().insert(topic.clone());
            tracing::debug!(topic = %topic, "Subscribed to topic");
        }
        Ok(())
    }

    async fn publish_inner(&self, topic: &str, payload: String) -> Result<(), ProtocolError> {
        let client = self.inner.client()?;
        tracing::debug!(topic = %topic, payload = %payload, "Publishing MQTT message");
        client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(ProtocolError::Mqtt)
    }

    async fn close_inner(&self) -> Result<(), ProtocolError> {
        let inner = &self.inner;
        inner.closing.store(true, Ordering::Release);
        inner.subscriptions.lock().clear();

        let client = inner.client.lock().take();
        let was_connected = inner.connected.swap(false, Ordering::AcqRel);
        let result = match client {
            Some(client) if was_connected => {
                tracing::info!(
                    host = %inner.config.host,
                    port = %inner.config.port,
                    "Disconnecting from MQTT broker"
                );
                client.disconnect().await.map_err(ProtocolError::Mqtt)
            }
            _ => Ok(()),
        };

        let handle = inner.event_task.lock().take();
        if let Some(mut handle) = handle {
            // Give the event loop a moment to flush the disconnect packet.
            if tokio::time::timeout(Duration::from_secs(1), &mut handle)
                .await
                .is_err()
            {
                handle.abort();
            }
        }

        result
    }
}

impl Transport for MqttSession {
    fn connect(&self) -> BoxFuture<'_, Result<mpsc::Receiver<InboundMessage>, ProtocolError>> {
        Box::pin(self.connect_inner())
    }

    fn subscribe<'a>(&'a self, topics: &'a [String]) -> BoxFuture<'a, Result<(), ProtocolError>> {
        Box::pin(self.subscribe_inner(topics))
    }

    fn publish<'a>(
        &'a self,
        topic: &'a str,
        payload: String,
    ) -> BoxFuture<'a, Result<(), ProtocolError>> {
        Box::pin(self.publish_inner(topic, payload))
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    fn close(&self) -> BoxFuture<'_, Result<(), ProtocolError>> {
        Box::pin(self.close_inner())
    }
}

impl std::fmt::Debug for MqttSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttSession")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("client_id", &self.inner.client_id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Builder for creating an MQTT session.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use merosync::protocol::{MqttSession, ReconnectionPolicy};
///
/// let session = MqttSession::builder()
///     .host("192.168.1.50")
///     .port(8883)
///     .client_id("merosync_living_room")
///     .keep_alive(Duration::from_secs(60))
///     .connection_timeout(Duration::from_secs(5))
///     .reconnection(ReconnectionPolicy::new().with_max_retries(3))
///     .build()
///     .unwrap();
///
/// assert_eq!(session.client_id(), "merosync_living_room");
/// ```
#[derive(Debug, Default)]
pub struct MqttSessionBuilder {
    config: MqttSessionConfig,
}

impl MqttSessionBuilder {
    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the MQTT client identifier (default: generated).
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = Some(client_id.into());
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub fn reconnection(mut self, policy: ReconnectionPolicy) -> Self {
        self.config.reconnection = policy;
        self
    }

    /// Builds the session. Nothing is connected until [`Transport::connect`].
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` if the host is not set.
    pub fn build(self) -> Result<MqttSession, ProtocolError> {
        if self.config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let client_id = self.config.client_id.clone().unwrap_or_else(|| {
            let counter = SESSION_CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
            format!("merosync_{}_{}", std::process::id(), counter)
        });

        Ok(MqttSession {
            inner: Arc::new(SessionInner {
                config: self.config,
                client_id,
                client: Mutex::new(None),
                subscriptions: Mutex::new(BTreeSet::new()),
                connected: AtomicBool::new(false),
                closing: AtomicBool::new(false),
                event_task: Mutex::new(None),
            }),
        })
    }
}

/// Drives the rumqttc event loop until the session closes or gives up.
async fn run_event_loop(
    mut event_loop: EventLoop,
    inner: Arc<SessionInner>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    connack_tx: oneshot::Sender<Result<(), String>>,
) {
    let mut connack_tx = Some(connack_tx);
    let mut attempt: u32 = 0;

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT session connected");
                inner.connected.store(true, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Ok(()));
                } else {
                    tracing::info!(attempt, "MQTT session reconnected");
                    attempt = 0;
                    restore_subscriptions(&inner);
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match String::from_utf8(publish.payload.to_vec()) {
                    Ok(payload) => {
                        tracing::debug!(topic = %publish.topic, "MQTT message received");
                        let message = InboundMessage::new(publish.topic, payload);
                        if inbound_tx.send(message).await.is_err() {
                            tracing::debug!("Inbound receiver dropped, stopping event loop");
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(topic = %publish.topic, error = %e, "Dropping non UTF-8 payload");
                    }
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker sent disconnect");
                inner.connected.store(false, Ordering::Release);
            }
            Ok(_) => {}
            Err(e) => {
                inner.connected.store(false, Ordering::Release);

                if inner.closing.load(Ordering::Acquire) {
                    tracing::debug!("MQTT event loop stopped after close");
                    break;
                }

                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(Err(e.to_string()));
                    break;
                }

                let policy = &inner.config.reconnection;
                if !policy.should_retry(attempt) {
                    tracing::error!(error = %e, attempt, "MQTT session lost, giving up");
                    // Tracked topics stay so the next connect restores them.
                    inner.client.lock().take();
                    break;
                }

                let delay = policy.jittered_delay_for_attempt(attempt);
                attempt += 1;
                tracing::warn!(
                    error = %e,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "MQTT session lost, reconnecting"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    inner.connected.store(false, Ordering::Release);
}

/// Re-subscribes every tracked topic after a reconnect or a fresh connect.
///
/// Uses the non-blocking request path, so it is safe to call from the event
/// loop task that drains the request queue.
fn restore_subscriptions(inner: &SessionInner) {
    let Some(client) = inner.client.lock().clone() else {
        return;
    };
    let topics: Vec<String> = inner.subscriptions.lock().iter().cloned().collect();
    for topic in topics {
        if let Err(e) = client.try_subscribe(topic.as_str(), QoS::AtLeastOnce) {
            tracing::warn!(topic = %topic, error = %e, "Failed to restore subscription");
        }
    }
}
