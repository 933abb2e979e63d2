// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identity.

use crate::types::DeviceUuid;

/// What a device is, as learned at discovery.
///
/// The abilities of a device that was unreachable at discovery are filled in
/// once, when it first answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    uuid: DeviceUuid,
    name: String,
    device_type: String,
    abilities: Vec<String>,
}

impl DeviceIdentity {
    /// Creates an identity with no advertised abilities.
    #[must_use]
    pub fn new(uuid: DeviceUuid, name: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            device_type: device_type.into(),
            abilities: Vec::new(),
        }
    }

    /// Sets the advertised namespaces, in the order the device reported them.
    #[must_use]
    pub fn with_abilities<I, S>(mut self, abilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.abilities = abilities.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the device UUID.
    #[must_use]
    pub fn uuid(&self) -> &DeviceUuid {
        &self.uuid
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the model, e.g. `mod100`.
    #[must_use]
    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    /// Returns the advertised namespaces.
    #[must_use]
    pub fn abilities(&self) -> &[String] {
        &self.abilities
    }
}
