// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command dispatch.
//!
//! Commands travel to a device on its command topic and are answered on the
//! manager's reply topic, possibly interleaved with acks for other commands
//! and with pushes from any device. The [`Dispatcher`] tags each command with
//! a random correlation identifier and hands the matching ack back to the
//! caller that is waiting for it.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use merosync::command::Dispatcher;
//! use merosync::protocol::{CommandRequest, MqttSession, namespace};
//! use merosync::types::DeviceUuid;
//!
//! # async fn example() -> merosync::Result<()> {
//! let session = MqttSession::builder().host("mqtt.example.com").build()?;
//! let dispatcher = Dispatcher::new(Arc::new(session), "/app/my_client/subscribe");
//!
//! let uuid = DeviceUuid::new("2103171946271290841048e1e9a1b2c3")?;
//! let ack = dispatcher
//!     .send(CommandRequest::get(uuid, namespace::SYSTEM_ALL), Duration::from_secs(10))
//!     .await?;
//! println!("{}", ack.payload);
//! # Ok(())
//! # }
//! ```

mod dispatcher;

pub use dispatcher::Dispatcher;

#[cfg(test)]
pub(crate) use dispatcher::test_support;
