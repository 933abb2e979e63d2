// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Brightness and white temperature values for light devices.
//!
//! Both are percentages on the wire. Devices report `-1` for an attribute
//! that is not active in the current light mode; such values never make it
//! into these types.

use std::fmt;

use crate::error::ValueError;

/// Brightness level as a percentage (0-100).
///
/// # Examples
///
/// ```
/// use merosync::types::Luminance;
///
/// let lum = Luminance::new(75).unwrap();
/// assert_eq!(lum.value(), 75);
/// assert!(Luminance::new(101).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Luminance(u8);

impl Luminance {
    /// Minimum luminance (0%).
    pub const MIN: Self = Self(0);

    /// Maximum luminance (100%).
    pub const MAX: Self = Self(100);

    /// Creates a new luminance value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > 100 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: i64::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Returns the percentage value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Reads a wire value, rejecting the `-1` sentinel and anything out of range.
    pub(crate) fn from_wire(value: i64) -> Option<Self> {
        u8::try_from(value).ok().and_then(|v| Self::new(v).ok())
    }
}

impl fmt::Display for Luminance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for Luminance {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// White color temperature as a percentage (1 = warmest, 100 = coolest).
///
/// # Examples
///
/// ```
/// use merosync::types::Temperature;
///
/// assert_eq!(Temperature::WARMEST.value(), 1);
/// assert!(Temperature::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Temperature(u8);

impl Temperature {
    /// Warmest white.
    pub const WARMEST: Self = Self(1);

    /// Coolest white.
    pub const COOLEST: Self = Self(100);

    /// Creates a new temperature value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value is outside 1-100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if !(1..=100).contains(&value) {
            return Err(ValueError::OutOfRange {
                min: 1,
                max: 100,
                actual: i64::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Returns the percentage value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    pub(crate) fn from_wire(value: i64) -> Option<Self> {
        u8::try_from(value).ok().and_then(|v| Self::new(v).ok())
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for Temperature {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
