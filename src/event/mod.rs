// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device events.
//!
//! The manager owns one [`EventBus`]; its proxies publish on it whenever
//! discovery, reachability or cached state changes. Subscribe through
//! [`Manager::subscribe`](crate::Manager::subscribe).

mod device_event;
mod event_bus;

pub use device_event::{DeviceEvent, UpdateSource};
pub use event_bus::{DEFAULT_EVENT_CAPACITY, EventBus};
