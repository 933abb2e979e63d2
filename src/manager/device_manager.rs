// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Manager owning a session, its proxies and its router task.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::command::Dispatcher;
use crate::device::{DeviceIdentity, DeviceProxy, DeviceTable};
use crate::error::{Error, ParseError};
use crate::event::{DeviceEvent, EventBus};
use crate::protocol::topics::device_push_topic;
use crate::protocol::{CommandRequest, PushRouter, Transport, namespace};
use crate::types::{DeviceUuid, OnlineStatus};

use super::config::ManagerConfig;
use super::directory::{DeviceDescriptor, DeviceDirectory};
use super::filter::DeviceFilter;

/// Entry point of the library.
///
/// A manager owns one broker session, one router task consuming the
/// session's inbound stream, and one proxy per discovered device. Managers
/// share nothing: two managers on the same account each keep their own
/// proxies and converge through the device's pushes.
///
/// # Lifecycle
///
/// 1. [`init`](Self::init) connects the session and starts routing.
/// 2. [`discover`](Self::discover) creates proxies for the account's devices.
/// 3. Proxies are used through [`device`](Self::device) and
///    [`find_devices`](Self::find_devices).
/// 4. [`close`](Self::close) stops routing and disconnects.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use merosync::capability::CapabilityKind;
/// use merosync::manager::{DeviceFilter, Manager, StaticDirectory};
/// use merosync::protocol::MqttSession;
/// use merosync::types::SprayMode;
///
/// # async fn example() -> merosync::Result<()> {
/// let session = MqttSession::builder()
///     .host("mqtt.example.com")
///     .credentials("user", "token")
///     .build()?;
/// let directory = StaticDirectory::from_json(r#"[{"uuid": "2103171946271290841048e1e9a1b2c3"}]"#)?;
///
/// let manager = Manager::builder(Arc::new(session), Arc::new(directory)).build();
/// manager.init().await?;
/// manager.discover().await?;
///
/// let filter = DeviceFilter::new().with_capability(CapabilityKind::Spray);
/// for device in manager.find_devices(&filter) {
///     device.set_spray_mode(SprayMode::Intermittent).await?;
/// }
///
/// manager.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Manager {
    transport: Arc<dyn Transport>,
    directory: Arc<dyn DeviceDirectory>,
    config: ManagerConfig,
    dispatcher: Arc<Dispatcher>,
    devices: Arc<RwLock<DeviceTable>>,
    events: EventBus,
    router_task: Mutex<Option<JoinHandle<()>>>,
}

impl Manager {
    /// Creates a manager. Nothing is connected until [`init`](Self::init).
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        directory: Arc<dyn DeviceDirectory>,
        config: ManagerConfig,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&transport),
            config.reply_topic(),
        ));
        let events = EventBus::with_capacity(config.event_capacity());
        Self {
            transport,
            directory,
            config,
            dispatcher,
            devices: Arc::new(RwLock::new(DeviceTable::new())),
            events,
            router_task: Mutex::new(None),
        }
    }

    /// Creates a builder over a transport and a device directory.
    #[must_use]
    pub fn builder(
        transport: Arc<dyn Transport>,
        directory: Arc<dyn DeviceDirectory>,
    ) -> ManagerBuilder {
        ManagerBuilder {
            transport,
            directory,
            config: ManagerConfig::default(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Returns `true` once [`init`](Self::init) succeeded, until
    /// [`close`](Self::close) or until the session's inbound stream ends
    /// (the session gave up reconnecting).
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.router_task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Returns `true` if the session is currently connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Connects the session, subscribes to the reply topic and starts the
    /// router task. Calling it again while initialized does nothing.
    ///
    /// After the session gave up reconnecting, calling it again reconnects
    /// and resumes routing; discovered proxies and their state are kept.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ConnectionFailed`](crate::error::ProtocolError::ConnectionFailed)
    /// if the session cannot be established. If the session connected but the
    /// subscription failed, the session is closed again before returning.
    pub async fn init(&self) -> Result<(), Error> {
        if self.is_initialized() {
            return Ok(());
        }

        let inbound = self.transport.connect().await?;
        let reply_topic = [self.config.reply_topic()];
        if let Err(e) = self.transport.subscribe(&reply_topic).await {
            tracing::warn!(error = %e, "Reply topic subscription failed, closing session");
            if let Err(close_err) = self.transport.close().await {
                tracing::debug!(error = %close_err, "Session close after failed init");
            }
            return Err(e.into());
        }

        let router = PushRouter::new(Arc::clone(&self.dispatcher), Arc::clone(&self.devices));
        let handle = tokio::spawn(router.run(inbound));
        if let Some(previous) = self.router_task.lock().replace(handle) {
            previous.abort();
        }

        tracing::info!(client_id = %self.config.client_id(), "Manager initialized");
        Ok(())
    }

    /// Creates proxies for the devices listed by the directory.
    ///
    /// Devices already known keep their proxy and cached state; only their
    /// online status is updated. For online devices whose descriptor carries
    /// no abilities, the abilities are fetched from the device; a device that
    /// does not answer is skipped and retried by the next discovery. A device
    /// that was offline at its first discovery gets its abilities fetched by
    /// the first discovery that finds it online.
    ///
    /// Returns every proxy, in discovery order.
    ///
    /// # Errors
    ///
    /// - [`Error::NotInitialized`] before [`init`](Self::init)
    /// - the directory's error if the device list cannot be retrieved
    /// - a protocol error if a push topic subscription fails
    pub async fn discover(&self) -> Result<Vec<Arc<DeviceProxy>>, Error> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }

        let descriptors = self.directory.list_devices().await?;
        tracing::debug!(count = descriptors.len(), "Device list retrieved");

        for descriptor in descriptors {
            let uuid = match DeviceUuid::new(descriptor.uuid.as_str()) {
                Ok(uuid) => uuid,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping device with invalid uuid");
                    continue;
                }
            };

            let existing = self.devices.read().get(uuid.as_str());
            if let Some(proxy) = existing {
                self.update_known(&proxy, &descriptor).await;
                continue;
            }

            let abilities = match self.resolve_abilities(&uuid, &descriptor).await {
                Ok(abilities) => abilities,
                Err(e) => {
                    tracing::warn!(uuid = %uuid, error = %e, "Could not fetch abilities, skipping device");
                    continue;
                }
            };

            self.transport
                .subscribe(&[device_push_topic(&uuid)])
                .await?;

            let identity = DeviceIdentity::new(
                uuid.clone(),
                descriptor.dev_name.clone(),
                descriptor.device_type.clone(),
            )
            .with_abilities(abilities);
            let proxy = Arc::new(DeviceProxy::new(
                identity,
                descriptor.online_status,
                Arc::clone(&self.dispatcher),
                self.events.clone(),
                self.config.command_timeout(),
            ));
            tracing::info!(
                uuid = %uuid,
                name = %proxy.name(),
                capabilities = ?proxy.capabilities(),
                "Device discovered"
            );
            self.devices.write().insert(proxy);
            self.events.publish(DeviceEvent::discovered(uuid));
        }

        Ok(self.devices.read().all())
    }

    /// Returns the proxies matching a filter, in discovery order.
    #[must_use]
    pub fn find_devices(&self, filter: &DeviceFilter) -> Vec<Arc<DeviceProxy>> {
        self.devices
            .read()
            .all()
            .into_iter()
            .filter(|proxy| filter.matches(proxy))
            .collect()
    }

    /// Looks up a proxy by UUID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if no such device was discovered.
    pub fn device(&self, uuid: &str) -> Result<Arc<DeviceProxy>, Error> {
        self.devices
            .read()
            .get(uuid)
            .ok_or_else(|| Error::DeviceNotFound(uuid.to_string()))
    }

    /// Returns the number of discovered devices.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    /// Subscribes to discovery, reachability and state events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Stops the router, fails pending commands, closes the session and
    /// releases every proxy. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the session's error if the disconnect could not be sent; the
    /// manager is closed regardless.
    pub async fn close(&self) -> Result<(), Error> {
        let handle = self.router_task.lock().take();
        let Some(handle) = handle else {
            return Ok(());
        };
        handle.abort();
        self.dispatcher.cancel_all();
        self.devices.write().clear();

        let result = self.transport.close().await;
        tracing::info!(client_id = %self.config.client_id(), "Manager closed");
        result.map_err(Into::into)
    }

    /// Refreshes a proxy that an earlier discovery created.
    ///
    /// A proxy created while its device was unreachable knows no abilities;
    /// they are taken from the descriptor or fetched as soon as either the
    /// directory or the proxy itself sees the device online.
    async fn update_known(&self, proxy: &DeviceProxy, descriptor: &DeviceDescriptor) {
        if !proxy.knows_abilities() {
            if !descriptor.abilities.is_empty() {
                proxy.learn_abilities(descriptor.abilities.clone());
            } else if descriptor.online_status == OnlineStatus::Online
                || proxy.online_status() == OnlineStatus::Online
            {
                match self.fetch_abilities(proxy.uuid()).await {
                    Ok(abilities) => {
                        if proxy.learn_abilities(abilities) {
                            tracing::info!(
                                uuid = %proxy.uuid(),
                                capabilities = ?proxy.capabilities(),
                                "Device abilities learned"
                            );
                        }
                        // It just answered, which outranks the listing.
                        proxy.set_online_status(OnlineStatus::Online);
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(uuid = %proxy.uuid(), error = %e, "Could not fetch abilities");
                    }
                }
            }
        }
        proxy.set_online_status(descriptor.online_status);
    }

    async fn resolve_abilities(
        &self,
        uuid: &DeviceUuid,
        descriptor: &DeviceDescriptor,
    ) -> Result<Vec<String>, Error> {
        if !descriptor.abilities.is_empty() || descriptor.online_status != OnlineStatus::Online {
            return Ok(descriptor.abilities.clone());
        }
        self.fetch_abilities(uuid).await
    }

    async fn fetch_abilities(&self, uuid: &DeviceUuid) -> Result<Vec<String>, Error> {
        let request = CommandRequest::get(uuid.clone(), namespace::SYSTEM_ABILITY);
        let ack = self
            .dispatcher
            .send(request, self.config.command_timeout())
            .await?;
        let abilities = ack
            .payload
            .get("ability")
            .and_then(serde_json::Value::as_object)
            .ok_or_else(|| ParseError::MissingField("ability".to_string()))?;
        Ok(abilities.keys().cloned().collect())
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        if let Some(handle) = self.router_task.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("client_id", &self.config.client_id())
            .field("devices", &self.device_count())
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Manager`].
#[must_use]
pub struct ManagerBuilder {
    transport: Arc<dyn Transport>,
    directory: Arc<dyn DeviceDirectory>,
    config: ManagerConfig,
}

impl ManagerBuilder {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the client identifier used in the reply topic.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config = self.config.with_client_id(client_id);
        self
    }

    /// Sets how long commands wait for their acknowledgment.
    pub fn command_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.with_command_timeout(timeout);
        self
    }

    /// Sets the event bus capacity.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config = self.config.with_event_capacity(capacity);
        self
    }

    /// Builds the manager.
    pub fn build(self) -> Manager {
        Manager::new(self.transport, self.directory, self.config)
    }
}
