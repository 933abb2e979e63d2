// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Source of the initial device list.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::protocol::BoxFuture;
use crate::types::OnlineStatus;

/// One entry of the cloud device list.
///
/// Field names follow the cloud's JSON (`devName`, `deviceType`,
/// `onlineStatus`); unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    /// Device UUID.
    pub uuid: String,
    /// Display name.
    #[serde(default)]
    pub dev_name: String,
    /// Model, e.g. `mod100`.
    #[serde(default)]
    pub device_type: String,
    /// Reachability according to the cloud.
    #[serde(default)]
    pub online_status: OnlineStatus,
    /// Advertised namespaces, when the list already carries them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub abilities: Vec<String>,
}

impl DeviceDescriptor {
    /// Creates an online descriptor with no abilities.
    #[must_use]
    pub fn new(
        uuid: impl Into<String>,
        dev_name: impl Into<String>,
        device_type: impl Into<String>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            dev_name: dev_name.into(),
            device_type: device_type.into(),
            online_status: OnlineStatus::Online,
            abilities: Vec::new(),
        }
    }

    /// Sets the reachability.
    #[must_use]
    pub fn with_online_status(mut self, status: OnlineStatus) -> Self {
        self.online_status = status;
        self
    }

    /// Sets the advertised namespaces.
    #[must_use]
    pub fn with_abilities<I, S>(mut self, abilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.abilities = abilities.into_iter().map(Into::into).collect();
        self
    }
}

/// Provides the devices bound to the account.
///
/// The cloud HTTP API is one implementation; [`StaticDirectory`] is another.
pub trait DeviceDirectory: Send + Sync {
    /// Lists every device of the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the list could not be retrieved.
    fn list_devices(&self) -> BoxFuture<'_, Result<Vec<DeviceDescriptor>, Error>>;
}

/// A fixed device list.
///
/// # Examples
///
/// ```
/// use merosync::manager::StaticDirectory;
///
/// let directory = StaticDirectory::from_json(r#"[
///     {"uuid": "2103171946271290841048e1e9a1b2c3", "devName": "Diffuser",
///      "deviceType": "mod100", "onlineStatus": 1}
/// ]"#).unwrap();
///
/// assert_eq!(directory.descriptors()[0].dev_name, "Diffuser");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    descriptors: Vec<DeviceDescriptor>,
}

impl StaticDirectory {
    /// Creates a directory over the given descriptors.
    #[must_use]
    pub fn new(descriptors: Vec<DeviceDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Parses a JSON array of descriptors.
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` if the text is not a valid device list.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let descriptors = serde_json::from_str(text).map_err(crate::error::ParseError::from)?;
        Ok(Self { descriptors })
    }

    /// Returns the descriptors.
    #[must_use]
    pub fn descriptors(&self) -> &[DeviceDescriptor] {
        &self.descriptors
    }
}

impl DeviceDirectory for StaticDirectory {
    fn list_devices(&self) -> BoxFuture<'_, Result<Vec<DeviceDescriptor>, Error>> {
        let descriptors = self.descriptors.clone();
        Box::pin(async move { Ok(descriptors) })
    }
}
