// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spray mode (`Appliance.Control.Spray`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use super::{Capability, CapabilityKind, CapabilitySet, channel_of, entries};
use crate::error::{ParseError, ValueError};
use crate::state::{ApplyMode, Tracked};
use crate::types::SprayMode;

/// Arguments of a spray command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SprayCommand {
    /// Target channel; single-tank devices use 0.
    pub channel: u8,
    /// Desired mode.
    pub mode: SprayMode,
}

/// Spray mode per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SprayState {
    channels: BTreeMap<u8, Tracked<SprayMode>>,
}

impl SprayState {
    /// Returns the cached mode of a channel.
    #[must_use]
    pub fn mode(&self, channel: u8) -> Option<SprayMode> {
        self.channels.get(&channel).and_then(Tracked::get)
    }

    /// Returns the tracked attribute of a channel.
    #[must_use]
    pub fn channel(&self, channel: u8) -> Option<&Tracked<SprayMode>> {
        self.channels.get(&channel)
    }
}

impl Capability for SprayState {
    const KIND: CapabilityKind = CapabilityKind::Spray;
    type Command = SprayCommand;

    fn build(command: &SprayCommand) -> Result<Value, ValueError> {
        Ok(json!({
            "spray": {
                "channel": command.channel,
                "mode": command.mode.code(),
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
            let channel = channel_of(entry, "spray")?;
            let code = entry
                .get("mode")
                .and_then(Value::as_i64)
                .ok_or_else(|| ParseError::MissingField("spray.mode".to_string()))?;
            let spray_mode =
                SprayMode::from_code(code).map_err(|e| ParseError::InvalidValue {
                    field: "spray.mode".to_string(),
                    message: e.to_string(),
                })?;
            changed |= self
                .channels
                .entry(channel)
                .or_default()
                .apply_with(spray_mode, stamp, mode);
        }
        Ok(changed)
    }

    fn mark_stale(&mut self) -> bool {
        self.channels
            .values_mut()
            .fold(false, |changed, attr| attr.mark_stale() || changed)
    }

    fn slot(set: &CapabilitySet) -> Option<&Self> {
        set.spray.as_ref()
    }

    fn slot_mut(set: &mut CapabilitySet) -> Option<&mut Self> {
        set.spray.as_mut()
    }
}
