// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifier type.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Cloud-assigned unique identifier of a device.
///
/// Vendors issue these as 32 hex characters, but the only hard requirement
/// is that the value can be embedded in a broker topic: it must be non-empty
/// and must not contain `/`, `+` or `#`.
///
/// # Examples
///
/// ```
/// use merosync::types::DeviceUuid;
///
/// let uuid = DeviceUuid::new("2103171946271290841048e1e9a1b2c3").unwrap();
/// assert_eq!(uuid.as_str(), "2103171946271290841048e1e9a1b2c3");
///
/// assert!(DeviceUuid::new("bad/uuid").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceUuid(String);

impl DeviceUuid {
    /// Creates a device identifier after checking it is topic-safe.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidUuid` if the value is empty or contains
    /// topic separators or wildcards.
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let value = value.into();
        if value.is_empty() || value.contains(['/', '+', '#']) || value.contains(char::is_whitespace)
        {
            return Err(ValueError::InvalidUuid(value));
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DeviceUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceUuid({})", self.0)
    }
}

impl fmt::Display for DeviceUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceUuid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DeviceUuid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for DeviceUuid {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceUuid {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DeviceUuid> for String {
    fn from(uuid: DeviceUuid) -> Self {
        uuid.0
    }
}
