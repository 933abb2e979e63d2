// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fleet management.
//!
//! The [`Manager`] ties everything together: it owns the broker session,
//! discovers the account's devices through a [`DeviceDirectory`], creates a
//! [`DeviceProxy`](crate::DeviceProxy) per device and keeps those proxies
//! current by routing every inbound message.
//!
//! # Event Subscription
//!
//! ```no_run
//! use merosync::event::DeviceEvent;
//! # use merosync::Manager;
//!
//! # fn example(manager: &Manager) {
//! let mut events = manager.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             DeviceEvent::StateChanged { uuid, capability, source } => {
//!                 println!("{uuid}: {capability} changed ({source})");
//!             }
//!             DeviceEvent::OnlineStatusChanged { uuid, status } => {
//!                 println!("{uuid} is now {status}");
//!             }
//!             DeviceEvent::Discovered { uuid } => println!("found {uuid}"),
//!         }
//!     }
//! });
//! # }
//! ```

mod config;
mod device_manager;
mod directory;
mod filter;

pub use config::{DEFAULT_COMMAND_TIMEOUT, ManagerConfig};
pub use device_manager::{Manager, ManagerBuilder};
pub use directory::{DeviceDescriptor, DeviceDirectory, StaticDirectory};
pub use filter::DeviceFilter;
