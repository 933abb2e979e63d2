// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Multi-channel on/off (`Appliance.Control.ToggleX`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use super::{Capability, CapabilityKind, CapabilitySet, channel_of, entries};
use crate::error::{ParseError, ValueError};
use crate::state::{ApplyMode, Tracked};

/// Arguments of a toggle command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleCommand {
    /// Target channel; 0 is the main outlet.
    pub channel: u8,
    /// Desired state.
    pub on: bool,
}

/// On/off state per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToggleState {
    channels: BTreeMap<u8, Tracked<bool>>,
}

impl ToggleState {
    /// Returns the cached state of a channel.
    #[must_use]
    pub fn is_on(&self, channel: u8) -> Option<bool> {
        self.channels.get(&channel).and_then(Tracked::get)
    }

    /// Returns the tracked attribute of a channel.
    #[must_use]
    pub fn channel(&self, channel: u8) -> Option<&Tracked<bool>> {
        self.channels.get(&channel)
    }
}

impl Capability for ToggleState {
    const KIND: CapabilityKind = CapabilityKind::Toggle;
    type Command = ToggleCommand;

    fn build(command: &ToggleCommand) -> Result<Value, ValueError> {
        Ok(json!({
            "togglex": {
                "channel": command.channel,
                "onoff": u8::from(command.on),
            }
        }))
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
            let channel = channel_of(entry, "togglex")?;
            let on = match entry.get("onoff") {
                Some(Value::Bool(on)) => *on,
                Some(value) => match value.as_i64() {
                    Some(0) => false,
                    Some(1) => true,
                    _ => {
                        return Err(ParseError::InvalidValue {
                            field: "togglex.onoff".to_string(),
                            message: format!("expected 0 or 1, got {value}"),
                        });
                    }
                },
                None => return Err(ParseError::MissingField("togglex.onoff".to_string())),
            };
            changed |= self
                .channels
                .entry(channel)
                .or_default()
                .apply_with(on, stamp, mode);
        }
        Ok(changed)
    }

    fn mark_stale(&mut self) -> bool {
        self.channels
            .values_mut()
            .fold(false, |changed, attr| attr.mark_stale() || changed)
    }

    fn slot(set: &CapabilitySet) -> Option<&Self> {
        set.toggle.as_ref()
    }

    fn slot_mut(set: &mut CapabilitySet) -> Option<&mut Self> {
        set.toggle.as_mut()
    }
}
