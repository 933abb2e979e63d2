// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color light (`Appliance.Control.Light`).
//!
//! The wire payload carries a `capacity` bit mask naming the attributes a
//! command sets:
//!
//! | Bit | Attribute |
//! |-----|-----------|
//! | `1` | `rgb` (packed `0xRRGGBB`) |
//! | `2` | `temperature` (1-100) |
//! | `4` | `luminance` (0-100) |

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::{Capability, CapabilityKind, CapabilitySet, channel_of, entries};
use crate::error::{ParseError, ValueError};
use crate::state::{ApplyMode, Tracked};
use crate::types::{Luminance, RgbColor, Temperature};

const CAPACITY_RGB: u8 = 1;
const CAPACITY_TEMPERATURE: u8 = 2;
const CAPACITY_LUMINANCE: u8 = 4;

/// Builder for a light command.
///
/// Only the attributes that are set are sent; the device keeps the others.
/// Commands always target channel 0, the only light channel tracked.
///
/// # Examples
///
/// ```
/// use merosync::capability::LightCommand;
/// use merosync::types::{Luminance, RgbColor};
///
/// let command = LightCommand::new()
///     .rgb(RgbColor::GREEN)
///     .luminance(Luminance::new(80).unwrap());
///
/// assert_eq!(command.rgb_value(), Some(RgbColor::GREEN));
/// assert!(command.temperature_value().is_none());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightCommand {
    rgb: Option<RgbColor>,
    luminance: Option<Luminance>,
    temperature: Option<Temperature>,
}

impl LightCommand {
    /// Creates an empty command.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a command that only sets the color.
    #[must_use]
    pub fn color(rgb: RgbColor) -> Self {
        Self::new().rgb(rgb)
    }

    /// Sets the color.
    #[must_use]
    pub fn rgb(mut self, rgb: RgbColor) -> Self {
        self.rgb = Some(rgb);
        self
    }

    /// Sets the brightness.
    #[must_use]
    pub fn luminance(mut self, luminance: Luminance) -> Self {
        self.luminance = Some(luminance);
        self
    }

    /// Sets the white temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: Temperature) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Returns the color to set, if any.
    #[must_use]
    pub fn rgb_value(&self) -> Option<RgbColor> {
        self.rgb
    }

    /// Returns the brightness to set, if any.
    #[must_use]
    pub fn luminance_value(&self) -> Option<Luminance> {
        self.luminance
    }

    /// Returns the temperature to set, if any.
    #[must_use]
    pub fn temperature_value(&self) -> Option<Temperature> {
        self.temperature
    }

    /// Returns `true` if the command sets nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rgb.is_none() && self.luminance.is_none() && self.temperature.is_none()
    }

    fn capacity(&self) -> u8 {
        let mut capacity = 0;
        if self.rgb.is_some() {
            capacity |= CAPACITY_RGB;
        }
        if self.temperature.is_some() {
            capacity |= CAPACITY_TEMPERATURE;
        }
        if self.luminance.is_some() {
            capacity |= CAPACITY_LUMINANCE;
        }
        capacity
    }
}

/// Cached light attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightState {
    rgb: Tracked<RgbColor>,
    luminance: Tracked<Luminance>,
    temperature: Tracked<Temperature>,
}

impl LightState {
    /// Returns the cached color.
    #[must_use]
    pub fn rgb(&self) -> Option<RgbColor> {
        self.rgb.get()
    }

    /// Returns the cached brightness.
    #[must_use]
    pub fn luminance(&self) -> Option<Luminance> {
        self.luminance.get()
    }

    /// Returns the cached white temperature.
    #[must_use]
    pub fn temperature(&self) -> Option<Temperature> {
        self.temperature.get()
    }

    /// Returns the tracked color attribute.
    #[must_use]
    pub fn rgb_attribute(&self) -> &Tracked<RgbColor> {
        &self.rgb
    }

    /// Returns the tracked brightness attribute.
    #[must_use]
    pub fn luminance_attribute(&self) -> &Tracked<Luminance> {
        &self.luminance
    }

    /// Returns the tracked temperature attribute.
    #[must_use]
    pub fn temperature_attribute(&self) -> &Tracked<Temperature> {
        &self.temperature
    }
}

impl Capability for LightState {
    const KIND: CapabilityKind = CapabilityKind::Light;
    type Command = LightCommand;

    fn build(command: &LightCommand) -> Result<Value, ValueError> {
        if command.is_empty() {
            return Err(ValueError::EmptyLightCommand);
        }

        let mut light = Map::new();
        light.insert("channel".to_string(), Value::from(0_u8));
        light.insert("capacity".to_string(), command.capacity().into());
        if let Some(rgb) = command.rgb {
            light.insert("rgb".to_string(), rgb.to_packed().into());
        }
        if let Some(temperature) = command.temperature {
            light.insert("temperature".to_string(), temperature.value().into());
        }
        if let Some(luminance) = command.luminance {
            light.insert("luminance".to_string(), luminance.value().into());
        }

        let mut payload = Map::new();
        payload.insert(Self::KIND.payload_key().to_string(), Value::Object(light));
        Ok(Value::Object(payload))
    }

    fn apply(
        &mut self,
        container: &Value,
        stamp: DateTime<Utc>,
        mode: ApplyMode,
    ) -> Result<bool, ParseError> {
        let Some(section) = container.get(Self::KIND.payload_key()) else {
            return Ok(false);
        };

        let mut changed = false;
        for entry in entries(section) {
            // Only channel 0 is modelled.
            if channel_of(entry, "light")? != 0 {
                continue;
            }

            // Negative values mean "not reported".
            if let Some(packed) = entry.get("rgb").and_then(Value::as_i64).filter(|v| *v >= 0) {
                let rgb = RgbColor::from_packed(packed).map_err(|e| ParseError::InvalidValue {
                    field: "light.rgb".to_string(),
                    message: e.to_string(),
                })?;
                changed |= self.rgb.apply_with(rgb, stamp, mode);
            }
            if let Some(luminance) = entry
                .get("luminance")
                .and_then(Value::as_i64)
                .and_then(Luminance::from_wire)
            {
                changed |= self.luminance.apply_with(luminance, stamp, mode);
            }
            if let Some(temperature) = entry
                .get("temperature")
                .and_then(Value::as_i64)
                .and_then(Temperature::from_wire)
            {
                changed |= self.temperature.apply_with(temperature, stamp, mode);
            }
        }
        Ok(changed)
    }

    fn mark_stale(&mut self) -> bool {
        let rgb = self.rgb.mark_stale();
        let luminance = self.luminance.mark_stale();
        let temperature = self.temperature.mark_stale();
        rgb || luminance || temperature
    }

    fn slot(set: &CapabilitySet) -> Option<&Self> {
        set.light.as_ref()
    }

    fn slot_mut(set: &mut CapabilitySet) -> Option<&mut Self> {
        set.light.as_mut()
    }
}
