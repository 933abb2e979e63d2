// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory broker and simulated devices shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use merosync::error::ProtocolError;
use merosync::protocol::topics::{device_command_topic, device_push_topic};
use merosync::protocol::{BoxFuture, Header, InboundMessage, Message, MessageId, Method, namespace};
use merosync::types::DeviceUuid;
use merosync::{DeviceDescriptor, Manager, StaticDirectory};
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;

/// Topic-exact broker delivering to sessions and simulated devices.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Mutex<BrokerState>>,
}

#[derive(Default)]
struct BrokerState {
    next_session: u64,
    sessions: HashMap<u64, Subscriber>,
    devices: HashMap<String, SimulatedDevice>,
    log: Vec<(String, String)>,
}

struct Subscriber {
    topics: BTreeSet<String>,
    tx: mpsc::Sender<InboundMessage>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a client session on this broker.
    pub fn session(&self) -> MemorySession {
        MemorySession {
            broker: self.clone(),
            id: Mutex::new(None),
            topics: Mutex::new(BTreeSet::new()),
            fail_subscribe: AtomicBool::new(false),
        }
    }

    /// Routes publishes on the device's command topic to the device.
    pub fn attach(&self, device: &SimulatedDevice) {
        self.inner
            .lock()
            .devices
            .insert(device.command_topic(), device.clone());
    }

    /// Delivers a publish to subscribers and to the addressed device.
    pub fn deliver(&self, topic: &str, payload: String) {
        let device = {
            let mut state = self.inner.lock();
            state.log.push((topic.to_string(), payload.clone()));
            for subscriber in state.sessions.values() {
                if subscriber.topics.contains(topic) {
                    let _ = subscriber
                        .tx
                        .try_send(InboundMessage::new(topic, payload.clone()));
                }
            }
            state.devices.get(topic).cloned()
        };

        if let Some(device) = device {
            for (reply_topic, reply) in device.handle(&payload) {
                self.deliver(&reply_topic, reply);
            }
        }
    }

    /// Sends a state notification from the device to every subscriber.
    pub fn push_from(&self, device: &SimulatedDevice, namespace: &str, payload: Value) {
        let (topic, message) = device.push(namespace, payload, None);
        self.deliver(&topic, message);
    }

    /// Like [`push_from`](Self::push_from) with an explicit header stamp.
    pub fn push_from_at(
        &self,
        device: &SimulatedDevice,
        namespace: &str,
        payload: Value,
        stamp: DateTime<Utc>,
    ) {
        let (topic, message) = device.push(namespace, payload, Some(stamp));
        self.deliver(&topic, message);
    }

    /// Publishes every reply the device held back while muted.
    pub fn release_held(&self, device: &SimulatedDevice) {
        for (topic, payload) in device.take_held() {
            self.deliver(&topic, payload);
        }
    }

    /// Returns the decoded messages published on a topic, oldest first.
    pub fn messages_on(&self, topic: &str) -> Vec<Message> {
        self.inner
            .lock()
            .log
            .iter()
            .filter(|(t, _)| t == topic)
            .filter_map(|(_, payload)| Message::decode(payload).ok())
            .collect()
    }

    /// Returns the `SET` commands a device received.
    pub fn set_commands_to(&self, device: &SimulatedDevice) -> Vec<Message> {
        self.messages_on(&device.command_topic())
            .into_iter()
            .filter(|m| m.method() == Method::Set)
            .collect()
    }

    fn register(&self) -> (u64, mpsc::Receiver<InboundMessage>) {
        let (tx, rx) = mpsc::channel(256);
        let mut state = self.inner.lock();
        let id = state.next_session;
        state.next_session += 1;
        state.sessions.insert(
            id,
            Subscriber {
                topics: BTreeSet::new(),
                tx,
            },
        );
        (id, rx)
    }

    fn add_topics(&self, id: u64, topics: &[String]) -> bool {
        let mut state = self.inner.lock();
        let Some(subscriber) = state.sessions.get_mut(&id) else {
            return false;
        };
        subscriber.topics.extend(topics.iter().cloned());
        true
    }

    fn unregister(&self, id: u64) {
        self.inner.lock().sessions.remove(&id);
    }
}

/// Client session on a [`MemoryBroker`].
///
/// Like the MQTT session, it remembers its topics until closed and restores
/// them when connected again.
pub struct MemorySession {
    broker: MemoryBroker,
    id: Mutex<Option<u64>>,
    topics: Mutex<BTreeSet<String>>,
    fail_subscribe: AtomicBool,
}

impl MemorySession {
    /// Makes every subsequent subscription fail.
    pub fn fail_subscriptions(&self) {
        self.fail_subscribe.store(true, Ordering::SeqCst);
    }

    /// Loses the connection for good, ending the inbound stream, as a
    /// session that ran out of reconnect attempts.
    pub fn give_up(&self) {
        if let Some(id) = self.id.lock().take() {
            self.broker.unregister(id);
        }
    }
}

impl merosync::Transport for MemorySession {
    fn connect(&self) -> BoxFuture<'_, Result<mpsc::Receiver<InboundMessage>, ProtocolError>> {
        Box::pin(async move {
            let (id, rx) = self.broker.register();
            if let Some(previous) = self.id.lock().replace(id) {
                self.broker.unregister(previous);
            }
            let topics: Vec<String> = self.topics.lock().iter().cloned().collect();
            self.broker.add_topics(id, &topics);
            Ok(rx)
        })
    }

    fn subscribe<'a>(&'a self, topics: &'a [String]) -> BoxFuture<'a, Result<(), ProtocolError>> {
        Box::pin(async move {
            if self.fail_subscribe.load(Ordering::SeqCst) {
                return Err(ProtocolError::ConnectionFailed("subscription refused".to_string()));
            }
            let id = (*self.id.lock()).ok_or(ProtocolError::NotConnected)?;
            if !self.broker.add_topics(id, topics) {
                return Err(ProtocolError::NotConnected);
            }
            self.topics.lock().extend(topics.iter().cloned());
            Ok(())
        })
    }

    fn publish<'a>(
        &'a self,
        topic: &'a str,
        payload: String,
    ) -> BoxFuture<'a, Result<(), ProtocolError>> {
        Box::pin(async move {
            if self.id.lock().is_none() {
                return Err(ProtocolError::NotConnected);
            }
            self.broker.deliver(topic, payload);
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.id.lock().is_some()
    }

    fn close(&self) -> BoxFuture<'_, Result<(), ProtocolError>> {
        Box::pin(async move {
            self.topics.lock().clear();
            self.give_up();
            Ok(())
        })
    }
}

/// A device answering commands the way cloud-connected appliances do.
///
/// Every `SET` is acknowledged to the sender's reply topic and then
/// broadcast as a `PUSH` on the device's publish topic. Header stamps are
/// strictly increasing.
#[derive(Clone)]
pub struct SimulatedDevice {
    uuid: DeviceUuid,
    state: Arc<Mutex<DeviceState>>,
}

struct DeviceState {
    abilities: Vec<String>,
    toggle: BTreeMap<u64, i64>,
    spray: BTreeMap<u64, i64>,
    light: Map<String, Value>,
    last_stamp_ms: i64,
    muted: bool,
    held: Vec<(String, String)>,
}

impl SimulatedDevice {
    pub fn new(uuid: &str, abilities: &[&str]) -> Self {
        let mut light = Map::new();
        light.insert("channel".to_string(), json!(0));
        Self {
            uuid: DeviceUuid::new(uuid).expect("valid test uuid"),
            state: Arc::new(Mutex::new(DeviceState {
                abilities: abilities.iter().map(ToString::to_string).collect(),
                toggle: BTreeMap::from([(0, 0)]),
                spray: BTreeMap::from([(0, 0)]),
                light,
                last_stamp_ms: 0,
                muted: false,
                held: Vec::new(),
            })),
        }
    }

    pub fn uuid(&self) -> &DeviceUuid {
        &self.uuid
    }

    pub fn command_topic(&self) -> String {
        device_command_topic(&self.uuid)
    }

    pub fn push_topic(&self) -> String {
        device_push_topic(&self.uuid)
    }

    /// Holds replies back instead of sending them. Commands still apply.
    pub fn set_muted(&self, muted: bool) {
        self.state.lock().muted = muted;
    }

    pub fn take_held(&self) -> Vec<(String, String)> {
        std::mem::take(&mut self.state.lock().held)
    }

    pub fn spray_code(&self, channel: u64) -> Option<i64> {
        self.state.lock().spray.get(&channel).copied()
    }

    pub fn rgb(&self) -> Option<i64> {
        self.state.lock().light.get("rgb").and_then(Value::as_i64)
    }

    /// Builds a push from this device.
    pub fn push(
        &self,
        ns: &str,
        payload: Value,
        stamp: Option<DateTime<Utc>>,
    ) -> (String, String) {
        let stamp = stamp.unwrap_or_else(|| self.state.lock().tick());
        let header = Header::new(Some(MessageId::random()), ns, Method::Push, stamp)
            .with_from(self.push_topic());
        let message = Message::new(header, payload).encode().expect("encodable push");
        (self.push_topic(), message)
    }

    fn handle(&self, payload: &str) -> Vec<(String, String)> {
        let Ok(request) = Message::decode(payload) else {
            return Vec::new();
        };
        let Some(reply_to) = request.header.from.clone() else {
            return Vec::new();
        };

        let mut state = self.state.lock();
        let requested = request.namespace().to_string();
        let supported = state.abilities.iter().any(|a| *a == requested);

        let mut replies = Vec::new();
        match request.method() {
            Method::Get if requested == namespace::SYSTEM_ALL => {
                let all = json!({"all": {
                    "system": {"online": {"status": 1}},
                    "digest": state.digest(),
                }});
                replies.push(state.reply(&request, &reply_to, &self.push_topic(), Method::GetAck, all));
            }
            Method::Get if requested == namespace::SYSTEM_ABILITY => {
                let ability: Map<String, Value> = state
                    .abilities
                    .iter()
                    .map(|ns| (ns.clone(), json!({})))
                    .collect();
                let body = json!({"ability": ability});
                replies.push(state.reply(&request, &reply_to, &self.push_topic(), Method::GetAck, body));
            }
            Method::Set if supported => {
                state.apply_set(&requested, &request.payload);
                replies.push(state.reply(&request, &reply_to, &self.push_topic(), Method::SetAck, json!({})));
                let section = state.section(&requested);
                let stamp = state.tick();
                let header = Header::new(Some(MessageId::random()), &requested, Method::Push, stamp)
                    .with_from(self.push_topic());
                let push = Message::new(header, section).encode().expect("encodable push");
                replies.push((self.push_topic(), push));
            }
            _ => {
                let body = json!({"error": {"code": 5000, "detail": "unsupported"}});
                replies.push(state.reply(&request, &reply_to, &self.push_topic(), Method::Error, body));
            }
        }

        if state.muted {
            state.held.extend(replies);
            return Vec::new();
        }
        replies
    }
}

impl DeviceState {
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_millis();
        self.last_stamp_ms = now.max(self.last_stamp_ms + 1);
        DateTime::from_timestamp_millis(self.last_stamp_ms).expect("valid stamp")
    }

    fn reply(
        &mut self,
        request: &Message,
        reply_to: &str,
        from: &str,
        method: Method,
        payload: Value,
    ) -> (String, String) {
        let header = Header::new(
            request.header.message_id.clone(),
            request.namespace(),
            method,
            self.tick(),
        )
        .with_from(from);
        let message = Message::new(header, payload).encode().expect("encodable ack");
        (reply_to.to_string(), message)
    }

    fn apply_set(&mut self, ns: &str, payload: &Value) {
        let entries = |key: &str| -> Vec<Value> {
            match payload.get(key) {
                Some(Value::Array(items)) => items.clone(),
                Some(item) => vec![item.clone()],
                None => Vec::new(),
            }
        };
        let channel = |entry: &Value| entry.get("channel").and_then(Value::as_u64).unwrap_or(0);

        if ns == namespace::CONTROL_SPRAY {
            for entry in entries("spray") {
                if let Some(mode) = entry.get("mode").and_then(Value::as_i64) {
                    self.spray.insert(channel(&entry), mode);
                }
            }
        } else if ns == namespace::CONTROL_TOGGLEX {
            for entry in entries("togglex") {
                if let Some(onoff) = entry.get("onoff").and_then(Value::as_i64) {
                    self.toggle.insert(channel(&entry), onoff);
                }
            }
        } else if ns == namespace::CONTROL_LIGHT {
            for entry in entries("light") {
                for key in ["rgb", "luminance", "temperature"] {
                    if let Some(value) = entry.get(key) {
                        self.light.insert(key.to_string(), value.clone());
                    }
                }
            }
        }
    }

    fn section(&self, ns: &str) -> Value {
        let digest = self.digest();
        let key = if ns == namespace::CONTROL_SPRAY {
            "spray"
        } else if ns == namespace::CONTROL_TOGGLEX {
            "togglex"
        } else {
            "light"
        };
        json!({ key: digest.get(key).cloned().unwrap_or(Value::Null) })
    }

    fn digest(&self) -> Value {
        let mut digest = Map::new();
        let supports = |ns: &str| self.abilities.iter().any(|a| a == ns);
        if supports(namespace::CONTROL_TOGGLEX) {
            let entries: Vec<Value> = self
                .toggle
                .iter()
                .map(|(channel, onoff)| json!({"channel": channel, "onoff": onoff}))
                .collect();
            digest.insert("togglex".to_string(), Value::Array(entries));
        }
        if supports(namespace::CONTROL_SPRAY) {
            let entries: Vec<Value> = self
                .spray
                .iter()
                .map(|(channel, mode)| json!({"channel": channel, "mode": mode}))
                .collect();
            digest.insert("spray".to_string(), Value::Array(entries));
        }
        if supports(namespace::CONTROL_LIGHT) {
            digest.insert("light".to_string(), Value::Object(self.light.clone()));
        }
        Value::Object(digest)
    }
}

/// Builds a manager on its own session, initialized and with devices
/// discovered.
pub async fn discovered_manager(
    broker: &MemoryBroker,
    client_id: &str,
    descriptors: Vec<DeviceDescriptor>,
) -> Manager {
    let manager = Manager::builder(
        Arc::new(broker.session()),
        Arc::new(StaticDirectory::new(descriptors)),
    )
    .client_id(client_id)
    .build();
    manager.init().await.expect("init");
    manager.discover().await.expect("discover");
    manager
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}
