// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Proxy collection keyed by device UUID.

use std::collections::HashMap;
use std::sync::Arc;

use super::DeviceProxy;
use crate::types::DeviceUuid;

/// The proxies of one manager, in discovery order.
#[derive(Debug, Default)]
pub struct DeviceTable {
    by_uuid: HashMap<DeviceUuid, Arc<DeviceProxy>>,
    order: Vec<DeviceUuid>,
}

impl DeviceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a proxy. An existing proxy for the same UUID is kept and
    /// returned instead.
    pub fn insert(&mut self, proxy: Arc<DeviceProxy>) -> Arc<DeviceProxy> {
        let uuid = proxy.uuid().clone();
        if let Some(existing) = self.by_uuid.get(&uuid) {
            return Arc::clone(existing);
        }
        self.order.push(uuid.clone());
        self.by_uuid.insert(uuid, Arc::clone(&proxy));
        proxy
    }

    /// Looks up a proxy by UUID.
    #[must_use]
    pub fn get(&self, uuid: &str) -> Option<Arc<DeviceProxy>> {
        self.by_uuid.get(uuid).cloned()
    }

    /// Returns `true` if a proxy exists for the UUID.
    #[must_use]
    pub fn contains(&self, uuid: &str) -> bool {
        self.by_uuid.contains_key(uuid)
    }

    /// Returns every proxy in discovery order.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<DeviceProxy>> {
        self.order
            .iter()
            .filter_map(|uuid| self.by_uuid.get(uuid).cloned())
            .collect()
    }

    /// Returns the number of proxies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Removes every proxy.
    pub fn clear(&mut self) {
        self.by_uuid.clear();
        self.order.clear();
    }
}
