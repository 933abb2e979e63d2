// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local mirror of one remote device.
//!
//! A [`DeviceProxy`] is created by [`Manager::discover`](crate::Manager::discover)
//! and lives as long as its manager. It exposes the command surface of the
//! capabilities the device advertised, and a cached view of the device state
//! that is updated only by confirmed acknowledgments, pushes from the device
//! and explicit refreshes.
//!
//! # State consistency
//!
//! Every cached attribute remembers the device-side timestamp of its last
//! update and ignores older ones. Commands are never applied optimistically:
//! after `set_spray_mode(..)` returns `Ok`, the cached mode is the acked one
//! unless a newer push already superseded it.
//!
//! ```no_run
//! use merosync::types::SprayMode;
//! # use merosync::Manager;
//!
//! # async fn example(manager: &Manager) -> merosync::Result<()> {
//! let diffuser = manager.device("2103171946271290841048e1e9a1b2c3")?;
//!
//! diffuser.set_spray_mode(SprayMode::Continuous).await?;
//! assert_eq!(diffuser.spray_mode(), Some(SprayMode::Continuous));
//! # Ok(())
//! # }
//! ```

mod identity;
mod table;

pub use identity::DeviceIdentity;
pub use table::DeviceTable;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;

use crate::capability::{
    Capability, CapabilityKind, CapabilityRegistry, CapabilitySet, LightCommand, LightState,
    SprayCommand, SprayState, ToggleCommand, ToggleState,
};
use crate::command::Dispatcher;
use crate::error::{DeviceError, Error, ParseError};
use crate::event::{DeviceEvent, EventBus, UpdateSource};
use crate::protocol::{CommandRequest, Message, namespace};
use crate::state::ApplyMode;
use crate::types::{DeviceUuid, Luminance, OnlineStatus, RgbColor, SprayMode, Temperature};

/// A device as seen by one manager.
///
/// Proxies are shared as `Arc<DeviceProxy>`; every method takes `&self`.
#[derive(Debug)]
pub struct DeviceProxy {
    uuid: DeviceUuid,
    identity: RwLock<DeviceIdentity>,
    online: RwLock<OnlineStatus>,
    capabilities: RwLock<CapabilitySet>,
    dispatcher: Arc<Dispatcher>,
    events: EventBus,
    command_timeout: Duration,
}

impl DeviceProxy {
    /// Creates a proxy whose capabilities are composed from the identity's
    /// advertised namespaces.
    #[must_use]
    pub fn new(
        identity: DeviceIdentity,
        online: OnlineStatus,
        dispatcher: Arc<Dispatcher>,
        events: EventBus,
        command_timeout: Duration,
    ) -> Self {
        let capabilities = CapabilityRegistry::compose(identity.abilities());
        Self {
            uuid: identity.uuid().clone(),
            identity: RwLock::new(identity),
            online: RwLock::new(online),
            capabilities: RwLock::new(capabilities),
            dispatcher,
            events,
            command_timeout,
        }
    }

    /// Returns the device UUID.
    #[must_use]
    pub fn uuid(&self) -> &DeviceUuid {
        &self.uuid
    }

    /// Returns a snapshot of the device identity.
    #[must_use]
    pub fn identity(&self) -> DeviceIdentity {
        self.identity.read().clone()
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> String {
        self.identity.read().name().to_string()
    }

    /// Returns `true` once the device's advertised namespaces are known.
    #[must_use]
    pub fn knows_abilities(&self) -> bool {
        !self.identity.read().abilities().is_empty()
    }

    /// Returns the current reachability.
    #[must_use]
    pub fn online_status(&self) -> OnlineStatus {
        *self.online.read()
    }

    /// Returns `true` if the device has the capability.
    #[must_use]
    pub fn supports(&self, kind: CapabilityKind) -> bool {
        self.capabilities.read().supports(kind)
    }

    /// Returns the device's capabilities.
    #[must_use]
    pub fn capabilities(&self) -> Vec<CapabilityKind> {
        self.capabilities.read().kinds()
    }

    /// Returns a snapshot of the cached state of every capability.
    #[must_use]
    pub fn capability_state(&self) -> CapabilitySet {
        self.capabilities.read().clone()
    }

    // ========== Toggle ==========

    /// Turns channel 0 on.
    ///
    /// # Errors
    ///
    /// See [`set_on_off`](Self::set_on_off).
    pub async fn turn_on(&self) -> Result<(), Error> {
        self.set_on_off(0, true).await
    }

    /// Turns channel 0 off.
    ///
    /// # Errors
    ///
    /// See [`set_on_off`](Self::set_on_off).
    pub async fn turn_off(&self) -> Result<(), Error> {
        self.set_on_off(0, false).await
    }

    /// Switches a channel on or off.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::UnsupportedCapability`] if the device has no toggle
    /// - [`DeviceError::Offline`] if the device is flagged offline
    /// - [`ProtocolError::Timeout`](crate::error::ProtocolError::Timeout) if
    ///   no ack arrived; the outcome is unknown
    pub async fn set_on_off(&self, channel: u8, on: bool) -> Result<(), Error> {
        self.execute::<ToggleState>(&ToggleCommand { channel, on })
            .await
    }

    /// Returns the cached on/off state of a channel.
    #[must_use]
    pub fn is_on(&self, channel: u8) -> Option<bool> {
        self.read::<ToggleState, _>(|toggle| toggle.is_on(channel))
    }

    // ========== Light ==========

    /// Sets color, brightness and/or temperature.
    ///
    /// # Errors
    ///
    /// - [`ValueError::EmptyLightCommand`](crate::error::ValueError::EmptyLightCommand)
    ///   if the command sets nothing
    /// - [`DeviceError::UnsupportedCapability`] if the device has no light
    /// - [`DeviceError::Offline`] if the device is flagged offline
    /// - [`ProtocolError::Timeout`](crate::error::ProtocolError::Timeout) if
    ///   no ack arrived; the outcome is unknown
    pub async fn set_light_color(&self, command: LightCommand) -> Result<(), Error> {
        self.execute::<LightState>(&command).await
    }

    /// Returns the cached color.
    #[must_use]
    pub fn rgb_color(&self) -> Option<RgbColor> {
        self.read::<LightState, _>(LightState::rgb)
    }

    /// Returns the cached brightness.
    #[must_use]
    pub fn luminance(&self) -> Option<Luminance> {
        self.read::<LightState, _>(LightState::luminance)
    }

    /// Returns the cached white temperature.
    #[must_use]
    pub fn temperature(&self) -> Option<Temperature> {
        self.read::<LightState, _>(LightState::temperature)
    }

    // ========== Spray ==========

    /// Sets the spray mode of channel 0.
    ///
    /// # Errors
    ///
    /// See [`set_spray_mode_on`](Self::set_spray_mode_on).
    pub async fn set_spray_mode(&self, mode: SprayMode) -> Result<(), Error> {
        self.set_spray_mode_on(0, mode).await
    }

    /// Sets the spray mode of a channel.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::UnsupportedCapability`] if the device cannot spray
    /// - [`DeviceError::Offline`] if the device is flagged offline
    /// - [`ProtocolError::Timeout`](crate::error::ProtocolError::Timeout) if
    ///   no ack arrived; the outcome is unknown
    pub async fn set_spray_mode_on(&self, channel: u8, mode: SprayMode) -> Result<(), Error> {
        self.execute::<SprayState>(&SprayCommand { channel, mode })
            .await
    }

    /// Returns the cached spray mode of channel 0.
    #[must_use]
    pub fn spray_mode(&self) -> Option<SprayMode> {
        self.spray_mode_on(0)
    }

    /// Returns the cached spray mode of a channel.
    #[must_use]
    pub fn spray_mode_on(&self, channel: u8) -> Option<SprayMode> {
        self.read::<SprayState, _>(|spray| spray.mode(channel))
    }

    // ========== Full state ==========

    /// Fetches the full device state and replaces the cache with it.
    ///
    /// The result is applied regardless of timestamps, so a refresh also
    /// repairs state after a timed-out command.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::Offline`] if the device is flagged offline
    /// - [`ProtocolError::Timeout`](crate::error::ProtocolError::Timeout) if
    ///   no answer arrived
    /// - [`ParseError::MissingField`] if the answer carries no digest
    pub async fn refresh(&self) -> Result<(), Error> {
        self.ensure_online()?;

        let request = CommandRequest::get(self.uuid().clone(), namespace::SYSTEM_ALL);
        let ack = self.send(request).await?;
        let stamp = ack.header.stamp().unwrap_or_else(Utc::now);

        let all = ack
            .payload
            .get("all")
            .ok_or_else(|| ParseError::MissingField("all".to_string()))?;
        if let Some(code) = all.pointer("/system/online/status").and_then(Value::as_i64) {
            self.set_online_status(OnlineStatus::from(code));
        }
        let digest = all
            .get("digest")
            .ok_or_else(|| ParseError::MissingField("all.digest".to_string()))?;

        let changed = self
            .capabilities
            .write()
            .apply_digest(digest, stamp, ApplyMode::Authoritative);
        tracing::debug!(uuid = %self.uuid(), changed = changed.len(), "Device state refreshed");
        for kind in changed {
            self.events.publish(DeviceEvent::state_changed(
                self.uuid().clone(),
                kind,
                UpdateSource::Refresh,
            ));
        }
        Ok(())
    }

    /// Applies an unsolicited notification from this device.
    ///
    /// `received_at` stands in for the header timestamp when the device sent
    /// none. Returns `true` if the cached state or reachability changed.
    /// Malformed payloads are logged and ignored.
    pub fn apply_push(&self, message: &Message, received_at: DateTime<Utc>) -> bool {
        let namespace = message.namespace();

        if namespace == namespace::SYSTEM_ONLINE {
            let Some(code) = message
                .payload
                .pointer("/online/status")
                .and_then(Value::as_i64)
            else {
                tracing::warn!(uuid = %self.uuid(), "Online push without status");
                return false;
            };
            return self.set_online_status(OnlineStatus::from(code));
        }

        let Some(kind) = CapabilityKind::from_namespace(namespace) else {
            tracing::debug!(uuid = %self.uuid(), namespace = %namespace, "Ignoring push for unhandled namespace");
            return false;
        };

        let stamp = message.header.stamp().unwrap_or(received_at);
        let result = self.capabilities.write().apply(
            kind,
            &message.payload,
            stamp,
            ApplyMode::LastWriteWins,
        );

        match result {
            Ok(changed) => {
                let promoted = self.promote_unknown();
                if changed {
                    tracing::debug!(uuid = %self.uuid(), capability = %kind, "State updated from push");
                    self.events.publish(DeviceEvent::state_changed(
                        self.uuid().clone(),
                        kind,
                        UpdateSource::Push,
                    ));
                }
                changed || promoted
            }
            Err(e) => {
                tracing::warn!(uuid = %self.uuid(), namespace = %namespace, error = %e, "Dropping malformed push");
                false
            }
        }
    }

    /// Installs the abilities of a device that was unreachable when the
    /// proxy was created and composes its capabilities.
    ///
    /// Only a proxy that knows no abilities yet accepts them. Returns `true`
    /// if the capability set was composed.
    pub(crate) fn learn_abilities(&self, abilities: Vec<String>) -> bool {
        if abilities.is_empty() {
            return false;
        }
        let mut identity = self.identity.write();
        if !identity.abilities().is_empty() {
            return false;
        }
        *self.capabilities.write() = CapabilityRegistry::compose(&abilities);
        *identity = identity.clone().with_abilities(abilities);
        true
    }

    /// Sets the reachability. Going offline marks every known attribute
    /// stale. Returns `true` if the status changed.
    pub(crate) fn set_online_status(&self, status: OnlineStatus) -> bool {
        let previous = std::mem::replace(&mut *self.online.write(), status);
        if previous == status {
            return false;
        }
        if status.is_offline() {
            self.capabilities.write().mark_stale();
        }
        tracing::info!(uuid = %self.uuid(), from = %previous, to = %status, "Device online status changed");
        self.events
            .publish(DeviceEvent::online_status_changed(self.uuid().clone(), status));
        true
    }

    async fn execute<C: Capability>(&self, command: &C::Command) -> Result<(), Error> {
        let payload = C::build(command)?;
        self.ensure_capability(C::KIND)?;
        self.ensure_online()?;

        let request = CommandRequest::set(self.uuid().clone(), C::KIND.namespace(), payload);
        let ack = self.send(request.clone()).await?;
        let stamp = ack.header.stamp().unwrap_or_else(Utc::now);

        let changed = {
            let mut capabilities = self.capabilities.write();
            match C::slot_mut(&mut capabilities) {
                Some(state) => state.apply(request.payload(), stamp, ApplyMode::LastWriteWins)?,
                None => false,
            }
        };
        if changed {
            self.events.publish(DeviceEvent::state_changed(
                self.uuid().clone(),
                C::KIND,
                UpdateSource::Ack,
            ));
        }
        Ok(())
    }

    /// Sends through the dispatcher and keeps reachability in line with
    /// the outcome.
    async fn send(&self, request: CommandRequest) -> Result<Message, Error> {
        match self.dispatcher.send(request, self.command_timeout).await {
            Ok(ack) => {
                self.set_online_status(OnlineStatus::Online);
                Ok(ack)
            }
            Err(e) if e.is_outcome_unknown() => {
                let downgraded = {
                    let mut online = self.online.write();
                    let was_online = *online == OnlineStatus::Online;
                    if was_online {
                        *online = OnlineStatus::Unknown;
                    }
                    was_online
                };
                if downgraded {
                    self.events.publish(DeviceEvent::online_status_changed(
                        self.uuid().clone(),
                        OnlineStatus::Unknown,
                    ));
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn promote_unknown(&self) -> bool {
        let promoted = {
            let mut online = self.online.write();
            let unknown = *online == OnlineStatus::Unknown;
            if unknown {
                *online = OnlineStatus::Online;
            }
            unknown
        };
        if promoted {
            self.events.publish(DeviceEvent::online_status_changed(
                self.uuid().clone(),
                OnlineStatus::Online,
            ));
        }
        promoted
    }

    fn ensure_capability(&self, kind: CapabilityKind) -> Result<(), DeviceError> {
        if self.supports(kind) {
            return Ok(());
        }
        Err(DeviceError::UnsupportedCapability {
            capability: kind.name().to_string(),
        })
    }

    fn ensure_online(&self) -> Result<(), DeviceError> {
        if self.online_status().is_offline() {
            return Err(DeviceError::Offline {
                uuid: self.uuid().to_string(),
            });
        }
        Ok(())
    }

    fn read<C: Capability, T>(&self, f: impl FnOnce(&C) -> Option<T>) -> Option<T> {
        C::slot(&self.capabilities.read()).and_then(f)
    }
}
