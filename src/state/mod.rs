// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cached device state.
//!
//! Every attribute a device proxy mirrors is wrapped in a [`Tracked`] value,
//! which remembers when it was last updated and refuses older updates. Two
//! proxies fed the same ordered stream of updates therefore end up with the
//! same state, whatever commands either of them issued in between.

mod tracked;

pub use tracked::{ApplyMode, AttributeStatus, Tracked};
