// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for device control.
//!
//! Each type ensures values are within their valid ranges at construction
//! time, so an invalid argument is rejected before anything is published.
//!
//! # Types
//!
//! - [`DeviceUuid`] - Topic-safe device identifier
//! - [`OnlineStatus`] - Online/Offline/Unknown reachability
//! - [`SprayMode`] - Off/Continuous/Intermittent
//! - [`RgbColor`] - 24-bit color, packed as `0xRRGGBB` on the wire
//! - [`Luminance`] - Brightness (0-100%)
//! - [`Temperature`] - White temperature (1-100%)

mod device_uuid;
mod light;
mod online_status;
mod rgb_color;
mod spray_mode;

pub use device_uuid::DeviceUuid;
pub use light::{Luminance, Temperature};
pub use online_status::OnlineStatus;
pub use rgb_color::RgbColor;
pub use spray_mode::SprayMode;
