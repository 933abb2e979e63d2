// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Manager configuration.

use std::time::Duration;

use crate::event::DEFAULT_EVENT_CAPACITY;
use crate::protocol::topics::client_reply_topic;

/// Default time to wait for a command acknowledgment.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings of one [`Manager`](crate::Manager).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use merosync::manager::ManagerConfig;
///
/// let config = ManagerConfig::new()
///     .with_client_id("kitchen_tablet")
///     .with_command_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.reply_topic(), "/app/kitchen_tablet/subscribe");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    client_id: String,
    command_timeout: Duration,
    event_capacity: usize,
}

impl ManagerConfig {
    /// Creates a configuration with a random client identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the client identifier used in the reply topic.
    ///
    /// Two managers sharing a broker must use different identifiers, or
    /// each receives the other's acknowledgments.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Sets how long commands wait for their acknowledgment.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the event bus capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Returns the client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the topic acknowledgments are addressed to.
    #[must_use]
    pub fn reply_topic(&self) -> String {
        client_reply_topic(&self.client_id)
    }

    /// Returns the command timeout.
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Returns the event bus capacity.
    #[must_use]
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            client_id: format!("merosync_{}", uuid::Uuid::new_v4().simple()),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ManagerConfig::default();
        assert!(config.client_id().starts_with("merosync_"));
        assert_eq!(config.command_timeout(), Duration::from_secs(10));
        assert_eq!(config.event_capacity(), 256);
    }

    #[test]
    fn default_client_ids_differ() {
        assert_ne!(
            ManagerConfig::default().client_id(),
            ManagerConfig::default().client_id()
        );
    }
}
