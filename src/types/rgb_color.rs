// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RGB color type with hex parsing and the packed wire encoding.
//!
//! Devices carry colors on the wire as a single integer `0xRRGGBB`
//! (`"rgb": 65280` is pure green).
//!
//! # Device Methods
//!
//! Use [`RgbColor`] with [`DeviceProxy::set_light_color()`](crate::DeviceProxy::set_light_color)
//! and read it back with [`DeviceProxy::rgb_color()`](crate::DeviceProxy::rgb_color).

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// RGB color with 8-bit channels (0-255).
///
/// # Examples
///
/// ```
/// use merosync::types::RgbColor;
///
/// let color = RgbColor::new(255, 128, 0);
/// assert_eq!(color.red(), 255);
/// assert_eq!(color.to_packed(), 0xFF8000);
///
/// let green = RgbColor::from_hex("#00FF00").unwrap();
/// assert_eq!(green, RgbColor::GREEN);
/// assert_eq!(green.to_hex(), "00FF00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RgbColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl RgbColor {
    /// Pure red.
    pub const RED: Self = Self::new(255, 0, 0);

    /// Pure green.
    pub const GREEN: Self = Self::new(0, 255, 0);

    /// Pure blue.
    pub const BLUE: Self = Self::new(0, 0, 255);

    /// White.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Creates a new RGB color.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Creates a color from its packed `0xRRGGBB` wire form.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the value does not fit in 24 bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use merosync::types::RgbColor;
    ///
    /// assert_eq!(RgbColor::from_packed(65280).unwrap(), RgbColor::GREEN);
    /// assert!(RgbColor::from_packed(-1).is_err());
    /// ```
    pub fn from_packed(value: i64) -> Result<Self, ValueError> {
        let packed = u32::try_from(value)
            .ok()
            .filter(|v| *v <= 0x00FF_FFFF)
            .ok_or(ValueError::OutOfRange {
                min: 0,
                max: 0x00FF_FFFF,
                actual: value,
            })?;
        let [_, red, green, blue] = packed.to_be_bytes();
        Ok(Self::new(red, green, blue))
    }

    /// Returns the packed `0xRRGGBB` wire form.
    #[must_use]
    pub const fn to_packed(&self) -> u32 {
        u32::from_be_bytes([0, self.red, self.green, self.blue])
    }

    /// Parses an RGB color from a hex string.
    ///
    /// Accepts formats: `#RRGGBB`, `RRGGBB`, `#RGB`, `RGB`
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidHexColor` if the hex string is invalid.
    pub fn from_hex(hex: &str) -> Result<Self, ValueError> {
        let hex = hex.trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(ValueError::InvalidHexColor(hex.to_string()));
        }

        match hex.len() {
            3 => {
                let chars: Vec<char> = hex.chars().collect();
                let r = parse_hex_char(chars[0])?;
                let g = parse_hex_char(chars[1])?;
                let b = parse_hex_char(chars[2])?;
                // Expand 0-F to 0-255
                Ok(Self::new(r * 17, g * 17, b * 17))
            }
            6 => {
                let r = parse_hex_pair(&hex[0..2])?;
                let g = parse_hex_pair(&hex[2..4])?;
                let b = parse_hex_pair(&hex[4..6])?;
                Ok(Self::new(r, g, b))
            }
            _ => Err(ValueError::InvalidHexColor(hex.to_string())),
        }
    }

    /// Returns the red component.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Returns the green component.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Returns the blue component.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }

    /// Returns the color as a hex string without the hash prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

impl FromStr for RgbColor {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<(u8, u8, u8)> for RgbColor {
    fn from((red, green, blue): (u8, u8, u8)) -> Self {
        Self::new(red, green, blue)
    }
}

impl From<RgbColor> for (u8, u8, u8) {
    fn from(color: RgbColor) -> Self {
        (color.red, color.green, color.blue)
    }
}

fn parse_hex_char(c: char) -> Result<u8, ValueError> {
    c.to_digit(16)
        .and_then(|d| u8::try_from(d).ok())
        .ok_or_else(|| ValueError::InvalidHexColor(c.to_string()))
}

fn parse_hex_pair(s: &str) -> Result<u8, ValueError> {
    u8::from_str_radix(s, 16).map_err(|_| ValueError::InvalidHexColor(s.to_string()))
}
