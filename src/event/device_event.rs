// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device event types.

use std::fmt;

use crate::capability::CapabilityKind;
use crate::types::{DeviceUuid, OnlineStatus};

/// What caused a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateSource {
    /// Acknowledgment of a command issued by this manager.
    Ack,
    /// Unsolicited notification from the device.
    Push,
    /// Explicit full-state refresh.
    Refresh,
}

impl fmt::Display for UpdateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ack => "ack",
            Self::Push => "push",
            Self::Refresh => "refresh",
        })
    }
}

/// Events emitted by the manager and its device proxies.
///
/// Events carry identifiers only; read the new state from the proxy.
///
/// # Examples
///
/// ```
/// use merosync::capability::CapabilityKind;
/// use merosync::event::{DeviceEvent, UpdateSource};
/// use merosync::types::DeviceUuid;
///
/// let uuid = DeviceUuid::new("abc").unwrap();
/// let event = DeviceEvent::state_changed(uuid.clone(), CapabilityKind::Spray, UpdateSource::Push);
///
/// assert_eq!(event.uuid(), &uuid);
/// assert!(event.is_state_change());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A device proxy was created by discovery.
    Discovered {
        /// The discovered device.
        uuid: DeviceUuid,
    },

    /// The device's reachability changed.
    OnlineStatusChanged {
        /// The device.
        uuid: DeviceUuid,
        /// The new status.
        status: OnlineStatus,
    },

    /// Cached state of one capability changed.
    StateChanged {
        /// The device.
        uuid: DeviceUuid,
        /// The capability whose state changed.
        capability: CapabilityKind,
        /// What caused the change.
        source: UpdateSource,
    },
}

impl DeviceEvent {
    /// Returns the device this event concerns.
    #[must_use]
    pub fn uuid(&self) -> &DeviceUuid {
        match self {
            Self::Discovered { uuid }
            | Self::OnlineStatusChanged { uuid, .. }
            | Self::StateChanged { uuid, .. } => uuid,
        }
    }

    /// Returns `true` if this is a state change event.
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        matches!(self, Self::StateChanged { .. })
    }

    /// Creates a discovered event.
    #[must_use]
    pub fn discovered(uuid: DeviceUuid) -> Self {
        Self::Discovered { uuid }
    }

    /// Creates an online status event.
    #[must_use]
    pub fn online_status_changed(uuid: DeviceUuid, status: OnlineStatus) -> Self {
        Self::OnlineStatusChanged { uuid, status }
    }

    /// Creates a state changed event.
    #[must_use]
    pub fn state_changed(uuid: DeviceUuid, capability: CapabilityKind, source: UpdateSource) -> Self {
        Self::StateChanged {
            uuid,
            capability,
            source,
        }
    }
}
