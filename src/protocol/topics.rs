// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker topic convention.
//!
//! | Topic | Direction | Content |
//! |-------|-----------|---------|
//! | `/appliance/<uuid>/subscribe` | client → device | commands |
//! | `/appliance/<uuid>/publish` | device → clients | pushes |
//! | `/app/<client_id>/subscribe` | device → one client | acknowledgments |

use crate::types::DeviceUuid;

const APPLIANCE_PREFIX: &str = "/appliance/";

/// Topic a device listens on for commands.
#[must_use]
pub fn device_command_topic(uuid: &DeviceUuid) -> String {
    format!("{APPLIANCE_PREFIX}{uuid}/subscribe")
}

/// Topic a device publishes its notifications on.
#[must_use]
pub fn device_push_topic(uuid: &DeviceUuid) -> String {
    format!("{APPLIANCE_PREFIX}{uuid}/publish")
}

/// Topic a client receives acknowledgments on.
#[must_use]
pub fn client_reply_topic(client_id: &str) -> String {
    format!("/app/{client_id}/subscribe")
}

/// Extracts the device UUID from an `/appliance/<uuid>/...` topic.
///
/// # Examples
///
/// ```
/// use merosync::protocol::topics::device_uuid_from_topic;
///
/// assert_eq!(device_uuid_from_topic("/appliance/abc/publish"), Some("abc"));
/// assert_eq!(device_uuid_from_topic("/app/client/subscribe"), None);
/// ```
#[must_use]
pub fn device_uuid_from_topic(topic: &str) -> Option<&str> {
    topic
        .strip_prefix(APPLIANCE_PREFIX)?
        .split('/')
        .next()
        .filter(|uuid| !uuid.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_topics() {
        let uuid = DeviceUuid::new("abc").unwrap();
        assert_eq!(device_command_topic(&uuid), "/appliance/abc/subscribe");
        assert_eq!(device_push_topic(&uuid), "/appliance/abc/publish");
    }

    #[test]
    fn reply_topic() {
        assert_eq!(client_reply_topic("app_1"), "/app/app_1/subscribe");
    }

    #[test]
    fn uuid_extraction_rejects_empty_segment() {
        assert_eq!(device_uuid_from_topic("/appliance//publish"), None);
        assert_eq!(device_uuid_from_topic("/appliance/"), None);
        assert_eq!(device_uuid_from_topic("/appliance/xyz"), Some("xyz"));
    }
}
