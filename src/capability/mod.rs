// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device capabilities.
//!
//! A device advertises the namespaces it understands. At discovery time the
//! [`CapabilityRegistry`] turns that list into a [`CapabilitySet`]: one state
//! slice per supported capability, and nothing for the others. A proxy
//! without a slice refuses the matching commands locally.
//!
//! | Capability | Namespace | State |
//! |------------|-----------|-------|
//! | [`Toggle`](CapabilityKind::Toggle) | `Appliance.Control.ToggleX` | on/off per channel |
//! | [`Light`](CapabilityKind::Light) | `Appliance.Control.Light` | RGB, luminance, temperature |
//! | [`Spray`](CapabilityKind::Spray) | `Appliance.Control.Spray` | spray mode per channel |
//!
//! # Examples
//!
//! ```
//! use merosync::capability::{CapabilityKind, CapabilityRegistry};
//!
//! let set = CapabilityRegistry::compose([
//!     "Appliance.System.All",
//!     "Appliance.Control.Spray",
//!     "Appliance.Control.Light",
//! ]);
//!
//! assert!(set.supports(CapabilityKind::Spray));
//! assert!(set.supports(CapabilityKind::Light));
//! assert!(!set.supports(CapabilityKind::Toggle));
//! ```

mod light;
mod spray;
mod toggle;

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

pub use light::{LightCommand, LightState};
pub use spray::{SprayCommand, SprayState};
pub use toggle::{ToggleCommand, ToggleState};

use crate::error::{ParseError, ValueError};
use crate::protocol::namespace;
use crate::state::ApplyMode;

/// Identifies one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityKind {
    /// Multi-channel on/off.
    Toggle,
    /// Color light.
    Light,
    /// Spray (humidifier, diffuser).
    Spray,
}

impl CapabilityKind {
    /// Every known capability.
    pub const ALL: [Self; 3] = [Self::Toggle, Self::Light, Self::Spray];

    /// Returns the namespace commands for this capability are sent on.
    #[must_use]
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::Toggle => namespace::CONTROL_TOGGLEX,
            Self::Light => namespace::CONTROL_LIGHT,
            Self::Spray => namespace::CONTROL_SPRAY,
        }
    }

    /// Returns the key holding this capability's state in payloads and in
    /// the `Appliance.System.All` digest.
    #[must_use]
    pub const fn payload_key(self) -> &'static str {
        match self {
            Self::Toggle => "togglex",
            Self::Light => "light",
            Self::Spray => "spray",
        }
    }

    /// Returns a short human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
            Self::Light => "light",
            Self::Spray => "spray",
        }
    }

    /// Looks up the capability for a namespace.
    #[must_use]
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.namespace() == namespace)
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Behavior shared by every capability state slice.
///
/// Implementations translate typed commands into `SET` payloads and apply
/// payloads (from acks, pushes or refresh digests) onto their cached state.
pub trait Capability: Default + Send + Sync {
    /// The capability this state belongs to.
    const KIND: CapabilityKind;

    /// Typed arguments of the capability's `SET` command.
    type Command;

    /// Builds the `SET` payload for a command.
    ///
    /// # Errors
    ///
    /// Returns `ValueError` if the command is not valid as a whole.
    fn build(command: &Self::Command) -> Result<Value, ValueError>;

    /// Applies the section keyed by [`CapabilityKind::payload_key`] found in
    /// `container`, which is either a message payload or a state digest.
    ///
    /// A missing section is not an error and changes nothing. Returns `true`
    /// if any attribute changed.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the section is malformed. Entries parsed
    /// before the malformed one stay applied.
    fn apply(
        &mut self,
        container: &Value,
        stamp: DateTime<Utc>,
        mode: ApplyMode,
    ) -> Result<bool, ParseError>;

    /// Flags every known attribute as stale. Returns `true` if any changed.
    fn mark_stale(&mut self) -> bool;

    /// Returns this capability's slice of a set, if present.
    fn slot(set: &CapabilitySet) -> Option<&Self>;

    /// Returns this capability's slice of a set mutably, if present.
    fn slot_mut(set: &mut CapabilitySet) -> Option<&mut Self>;
}

/// The capability state slices of one device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilitySet {
    toggle: Option<ToggleState>,
    light: Option<LightState>,
    spray: Option<SprayState>,
}

impl CapabilitySet {
    /// Returns `true` if the device has the capability.
    #[must_use]
    pub fn supports(&self, kind: CapabilityKind) -> bool {
        match kind {
            CapabilityKind::Toggle => self.toggle.is_some(),
            CapabilityKind::Light => self.light.is_some(),
            CapabilityKind::Spray => self.spray.is_some(),
        }
    }

    /// Returns the supported capabilities.
    #[must_use]
    pub fn kinds(&self) -> Vec<CapabilityKind> {
        CapabilityKind::ALL
            .into_iter()
            .filter(|kind| self.supports(*kind))
            .collect()
    }

    /// Returns `true` if the device has no known capability.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds().is_empty()
    }

    /// Returns the on/off state, if supported.
    #[must_use]
    pub fn toggle(&self) -> Option<&ToggleState> {
        self.toggle.as_ref()
    }

    /// Returns the light state, if supported.
    #[must_use]
    pub fn light(&self) -> Option<&LightState> {
        self.light.as_ref()
    }

    /// Returns the spray state, if supported.
    #[must_use]
    pub fn spray(&self) -> Option<&SprayState> {
        self.spray.as_ref()
    }

    /// Applies a payload to one capability's slice.
    ///
    /// Returns `Ok(false)` if the capability is not supported.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the payload section is malformed.
    pub fn apply(
        &mut self,
        kind: CapabilityKind,
        container: &Value,
        stamp: DateTime<Utc>,
        mode: ApplyMode,
    ) -> Result<bool, ParseError> {
        match kind {
            CapabilityKind::Toggle => self.apply_slot::<ToggleState>(container, stamp, mode),
            CapabilityKind::Light => self.apply_slot::<LightState>(container, stamp, mode),
            CapabilityKind::Spray => self.apply_slot::<SprayState>(container, stamp, mode),
        }
    }

    /// Applies a full state digest to every supported capability.
    ///
    /// Returns the capabilities whose state changed. A malformed section is
    /// logged and skipped so it cannot block the others.
    pub fn apply_digest(
        &mut self,
        digest: &Value,
        stamp: DateTime<Utc>,
        mode: ApplyMode,
    ) -> Vec<CapabilityKind> {
        let mut changed = Vec::new();
        for kind in self.kinds() {
            match self.apply(kind, digest, stamp, mode) {
                Ok(true) => changed.push(kind),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(capability = %kind, error = %e, "Skipping malformed digest section");
                }
            }
        }
        changed
    }

    /// Flags every known attribute of every capability as stale.
    pub fn mark_stale(&mut self) -> bool {
        let toggle = self.toggle.as_mut().is_some_and(Capability::mark_stale);
        let light = self.light.as_mut().is_some_and(Capability::mark_stale);
        let spray = self.spray.as_mut().is_some_and(Capability::mark_stale);
        toggle || light || spray
    }

    fn apply_slot<C: Capability>(
        &mut self,
        container: &Value,
        stamp: DateTime<Utc>,
        mode: ApplyMode,
    ) -> Result<bool, ParseError> {
        C::slot_mut(self).map_or(Ok(false), |state| state.apply(container, stamp, mode))
    }

    fn enable(&mut self, kind: CapabilityKind) {
        match kind {
            CapabilityKind::Toggle => {
                self.toggle.get_or_insert_with(ToggleState::default);
            }
            CapabilityKind::Light => {
                self.light.get_or_insert_with(LightState::default);
            }
            CapabilityKind::Spray => {
                self.spray.get_or_insert_with(SprayState::default);
            }
        }
    }
}

/// Maps advertised namespaces to capabilities.
///
/// The set of capabilities is closed and fixed at compile time; composition
/// happens once per device, at discovery.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityRegistry;

impl CapabilityRegistry {
    /// Builds the capability set for a list of advertised namespaces.
    ///
    /// Namespaces that map to no capability (system namespaces, or
    /// capabilities this library does not implement) are skipped.
    pub fn compose<I, S>(tags: I) -> CapabilitySet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = CapabilitySet::default();
        for tag in tags {
            let tag = tag.as_ref();
            match CapabilityKind::from_namespace(tag) {
                Some(kind) => set.enable(kind),
                None => tracing::debug!(namespace = %tag, "Skipping unsupported namespace"),
            }
        }
        set
    }
}

/// Splits a payload section that is either a single entry or a list.
pub(crate) fn entries(section: &Value) -> Vec<&Value> {
    match section {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Reads the `channel` field of an entry, defaulting to channel 0.
pub(crate) fn channel_of(entry: &Value, field: &str) -> Result<u8, ParseError> {
    match entry.get("channel") {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_u64()
            .and_then(|c| u8::try_from(c).ok())
            .ok_or_else(|| ParseError::InvalidValue {
                field: format!("{field}.channel"),
                message: format!("expected a channel number, got {value}"),
            }),
    }
}
