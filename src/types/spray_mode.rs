// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spray mode for humidifier/diffuser devices.
//!
//! # Device Methods
//!
//! - [`set_spray_mode()`](crate::DeviceProxy::set_spray_mode) - Change the mode
//! - [`spray_mode()`](crate::DeviceProxy::spray_mode) - Read the cached mode

use std::fmt;

use crate::error::ValueError;

/// Operating mode of a spray channel.
///
/// | Code | Mode |
/// |------|------|
/// | 0 | Off |
/// | 1 | Continuous |
/// | 2 | Intermittent |
///
/// # Examples
///
/// ```
/// use merosync::types::SprayMode;
///
/// assert_eq!(SprayMode::Continuous.code(), 1);
/// assert_eq!(SprayMode::try_from(2).unwrap(), SprayMode::Intermittent);
/// assert!(SprayMode::try_from(7).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SprayMode {
    /// Spraying is off.
    Off,
    /// Spraying without pause.
    Continuous,
    /// Spraying with periodic pauses.
    Intermittent,
}

impl SprayMode {
    /// All modes, in code order.
    pub const ALL: [Self; 3] = [Self::Off, Self::Continuous, Self::Intermittent];

    /// Returns the wire code for this mode.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Continuous => 1,
            Self::Intermittent => 2,
        }
    }

    /// Returns the mode name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Continuous => "CONTINUOUS",
            Self::Intermittent => "INTERMITTENT",
        }
    }

    /// Parses a wire code.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidSprayMode` for unknown codes.
    pub fn from_code(code: i64) -> Result<Self, ValueError> {
        match code {
            0 => Ok(Self::Off),
            1 => Ok(Self::Continuous),
            2 => Ok(Self::Intermittent),
            other => Err(ValueError::InvalidSprayMode(other)),
        }
    }
}

impl fmt::Display for SprayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for SprayMode {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_code(i64::from(value))
    }
}
