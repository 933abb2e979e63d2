// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device reachability as reported by the cloud.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Online status of a device.
///
/// The cloud reports numeric codes: `1` online, `0` and `2` offline,
/// `-1` unknown. Firmware upgrades (`3`) are treated as unknown since
/// the device answers no commands meanwhile but is not gone either.
///
/// # Examples
///
/// ```
/// use merosync::types::OnlineStatus;
///
/// assert_eq!(OnlineStatus::from(1), OnlineStatus::Online);
/// assert_eq!(OnlineStatus::from(2), OnlineStatus::Offline);
/// assert_eq!(OnlineStatus::from(42), OnlineStatus::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum OnlineStatus {
    /// The device is connected to the cloud.
    Online,
    /// The device is not reachable.
    Offline,
    /// No reliable information.
    #[default]
    Unknown,
}

impl OnlineStatus {
    /// Returns the wire code for this status.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Online => 1,
            Self::Offline => 2,
            Self::Unknown => -1,
        }
    }

    /// Returns `true` if the device is flagged offline.
    #[must_use]
    pub const fn is_offline(self) -> bool {
        matches!(self, Self::Offline)
    }
}

impl From<i64> for OnlineStatus {
    fn from(code: i64) -> Self {
        match code {
            1 => Self::Online,
            0 | 2 => Self::Offline,
            _ => Self::Unknown,
        }
    }
}

impl From<OnlineStatus> for i64 {
    fn from(status: OnlineStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for OnlineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
            Self::Unknown => "UNKNOWN",
        })
    }
}
