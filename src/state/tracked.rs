// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Timestamp-guarded state for a single attribute.

use chrono::{DateTime, Utc};

/// Lifecycle of a cached attribute.
///
/// ```text
/// Unknown --(first ack/push/refresh)--> Known
/// Known   --(newer ack/push)----------> Known
/// Known   --(device went offline)-----> Stale
/// Stale   --(newer ack/push/refresh)--> Known
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeStatus {
    /// No value has been observed yet.
    Unknown,
    /// The value reflects the latest confirmed device state.
    Known,
    /// The value is retained but the device went offline since.
    Stale,
}

/// How an update should be weighed against the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Apply only if the update is newer (see [`Tracked::apply`]).
    LastWriteWins,
    /// Apply unconditionally. Used for explicit refreshes.
    Authoritative,
}

/// A cached attribute value with the timestamp of its last update.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use merosync::state::{AttributeStatus, Tracked};
///
/// let t1 = Utc.timestamp_opt(100, 0).unwrap();
/// let t0 = Utc.timestamp_opt(50, 0).unwrap();
///
/// let mut mode = Tracked::new();
/// assert_eq!(mode.status(), AttributeStatus::Unknown);
///
/// assert!(mode.apply(1, t1));
/// assert_eq!(mode.get(), Some(1));
///
/// // Older updates are discarded.
/// assert!(!mode.apply(2, t0));
/// assert_eq!(mode.get(), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracked<T> {
    value: Option<T>,
    updated_at: Option<DateTime<Utc>>,
    stale: bool,
}

impl<T> Default for Tracked<T> {
    fn default() -> Self {
        Self {
            value: None,
            updated_at: None,
            stale: false,
        }
    }
}

impl<T: Clone + PartialEq> Tracked<T> {
    /// Creates an attribute with no known value.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the cached value.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.value.clone()
    }

    /// Returns a reference to the cached value.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Returns the timestamp of the last applied update.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Returns where the attribute is in its lifecycle.
    #[must_use]
    pub fn status(&self) -> AttributeStatus {
        match (&self.value, self.stale) {
            (None, _) => AttributeStatus::Unknown,
            (Some(_), false) => AttributeStatus::Known,
            (Some(_), true) => AttributeStatus::Stale,
        }
    }

    /// Applies an update under the last-write-wins rule.
    ///
    /// - An update older than the last applied one is discarded.
    /// - An update with the same timestamp is discarded when it carries the
    ///   same value; with a different value it replaces the current one
    ///   (last received wins).
    /// - A newer update always replaces the value and clears staleness.
    ///
    /// Returns `true` if the value or status changed.
    pub fn apply(&mut self, value: T, stamp: DateTime<Utc>) -> bool {
        match self.updated_at {
            Some(last) if stamp < last => false,
            Some(last) if stamp == last && self.value.as_ref() == Some(&value) => false,
            _ => self.store(value, stamp),
        }
    }

    /// Applies an update regardless of its timestamp.
    ///
    /// The stored timestamp never moves backwards, so later pushes are
    /// still compared against the newest update seen.
    pub fn force(&mut self, value: T, stamp: DateTime<Utc>) -> bool {
        let stamp = self.updated_at.map_or(stamp, |last| last.max(stamp));
        self.store(value, stamp)
    }

    /// Applies an update using the given mode.
    pub fn apply_with(&mut self, value: T, stamp: DateTime<Utc>, mode: ApplyMode) -> bool {
        match mode {
            ApplyMode::LastWriteWins => self.apply(value, stamp),
            ApplyMode::Authoritative => self.force(value, stamp),
        }
    }

    /// Flags a known value as stale. Returns `true` if the status changed.
    pub fn mark_stale(&mut self) -> bool {
        if self.value.is_some() && !self.stale {
            self.stale = true;
            return true;
        }
        false
    }

    fn store(&mut self, value: T, stamp: DateTime<Utc>) -> bool {
        let changed = self.stale || self.value.as_ref() != Some(&value);
        self.value = Some(value);
        self.updated_at = Some(stamp);
        self.stale = false;
        changed
    }
}
