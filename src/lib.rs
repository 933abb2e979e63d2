// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `merosync` - client runtime for cloud-brokered smart-home devices.
//!
//! Devices of this family (Meross-style appliances) are reachable only
//! through the vendor's MQTT broker. Commands go out on a per-device topic,
//! acknowledgments come back on a per-client topic, and every device
//! broadcasts its state changes to all clients of the account. This library
//! keeps a live, consistent local view of such a fleet and issues commands
//! with request/acknowledgment correlation.
//!
//! # Consistency
//!
//! - State is applied only when confirmed: by the acknowledgment of a
//!   command, by a push from the device, or by an explicit refresh.
//! - Every attribute is guarded by the device-side timestamp of its last
//!   update, so replayed or reordered messages never roll state back and
//!   independent managers converge.
//! - A command that times out has an unknown outcome
//!   ([`Error::is_outcome_unknown`]); call [`DeviceProxy::refresh`] to learn
//!   the truth.
//!
//! # Supported capabilities
//!
//! - **Toggle**: multi-channel on/off (`Appliance.Control.ToggleX`)
//! - **Light**: RGB color, luminance, white temperature (`Appliance.Control.Light`)
//! - **Spray**: off/continuous/intermittent (`Appliance.Control.Spray`)
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use merosync::manager::{Manager, StaticDirectory};
//! use merosync::protocol::MqttSession;
//! use merosync::types::{RgbColor, SprayMode};
//! use merosync::capability::LightCommand;
//!
//! #[tokio::main]
//! async fn main() -> merosync::Result<()> {
//!     let session = MqttSession::builder()
//!         .host("mqtt.example.com")
//!         .port(2001)
//!         .credentials("user", "token")
//!         .build()?;
//!     let directory = StaticDirectory::from_json(
//!         r#"[{"uuid": "2103171946271290841048e1e9a1b2c3", "devName": "Diffuser", "onlineStatus": 1}]"#,
//!     )?;
//!
//!     let manager = Manager::builder(Arc::new(session), Arc::new(directory)).build();
//!     manager.init().await?;
//!     manager.discover().await?;
//!
//!     let diffuser = manager.device("2103171946271290841048e1e9a1b2c3")?;
//!     diffuser.set_spray_mode(SprayMode::Continuous).await?;
//!     diffuser.set_light_color(LightCommand::color(RgbColor::GREEN)).await?;
//!
//!     println!("spray: {:?}, color: {:?}", diffuser.spray_mode(), diffuser.rgb_color());
//!
//!     manager.close().await?;
//!     Ok(())
//! }
//! ```

pub mod capability;
pub mod command;
pub mod device;
pub mod error;
pub mod event;
pub mod manager;
pub mod protocol;
pub mod state;
pub mod types;

pub use capability::{CapabilityKind, LightCommand};
pub use device::{DeviceIdentity, DeviceProxy};
pub use error::{DeviceError, Error, ParseError, ProtocolError, Result, ValueError};
pub use event::{DeviceEvent, UpdateSource};
pub use manager::{DeviceDescriptor, DeviceFilter, Manager, ManagerConfig, StaticDirectory};
#[cfg(feature = "mqtt")]
pub use protocol::MqttSession;
pub use protocol::{ReconnectionPolicy, Transport};
pub use types::{DeviceUuid, Luminance, OnlineStatus, RgbColor, SprayMode, Temperature};
