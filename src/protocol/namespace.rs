// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Message namespaces understood by this library.

/// Full state snapshot (`GET`), answered with a digest of every capability.
pub const SYSTEM_ALL: &str = "Appliance.System.All";

/// Capability listing (`GET`), answered with the advertised namespaces.
pub const SYSTEM_ABILITY: &str = "Appliance.System.Ability";

/// Reachability notification (`PUSH`).
pub const SYSTEM_ONLINE: &str = "Appliance.System.Online";

/// Multi-channel on/off control.
pub const CONTROL_TOGGLEX: &str = "Appliance.Control.ToggleX";

/// Light color, brightness and temperature control.
pub const CONTROL_LIGHT: &str = "Appliance.Control.Light";

/// Spray mode control for humidifiers and diffusers.
pub const CONTROL_SPRAY: &str = "Appliance.Control.Spray";
