// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device selection criteria.

use crate::capability::CapabilityKind;
use crate::device::DeviceProxy;
use crate::types::OnlineStatus;

/// Criteria for [`Manager::find_devices`](crate::Manager::find_devices).
///
/// Every criterion that is set must match; an empty filter matches every
/// device.
///
/// # Examples
///
/// ```
/// use merosync::capability::CapabilityKind;
/// use merosync::manager::DeviceFilter;
/// use merosync::types::OnlineStatus;
///
/// let filter = DeviceFilter::new()
///     .with_capability(CapabilityKind::Spray)
///     .with_online_status(OnlineStatus::Online);
/// # let _ = filter;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    capability: Option<CapabilityKind>,
    online_status: Option<OnlineStatus>,
    uuids: Option<Vec<String>>,
    device_type: Option<String>,
}

impl DeviceFilter {
    /// Creates a filter that matches every device.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only devices with this capability.
    #[must_use]
    pub fn with_capability(mut self, capability: CapabilityKind) -> Self {
        self.capability = Some(capability);
        self
    }

    /// Only devices with this reachability.
    #[must_use]
    pub fn with_online_status(mut self, status: OnlineStatus) -> Self {
        self.online_status = Some(status);
        self
    }

    /// Only devices whose UUID is listed.
    #[must_use]
    pub fn with_uuids<I, S>(mut self, uuids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uuids = Some(uuids.into_iter().map(Into::into).collect());
        self
    }

    /// Only devices of this model, compared case-insensitively.
    #[must_use]
    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    /// Returns `true` if the proxy satisfies every criterion.
    #[must_use]
    pub fn matches(&self, proxy: &DeviceProxy) -> bool {
        if let Some(capability) = self.capability
            && !proxy.supports(capability)
        {
            return false;
        }
        if let Some(status) = self.online_status
            && proxy.online_status() != status
        {
            return false;
        }
        if let Some(ref uuids) = self.uuids
            && !uuids.iter().any(|uuid| uuid == proxy.uuid().as_str())
        {
            return false;
        }
        if let Some(ref device_type) = self.device_type
            && !proxy
                .identity()
                .device_type()
                .eq_ignore_ascii_case(device_type)
        {
            return false;
        }
        true
    }
}
