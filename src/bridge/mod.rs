// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The event bridge and its building blocks.
//!
//! - [`HandleTable`] - Live callback registrations, one per event class
//! - [`translator`] - Conversion of hub callback arguments into [`Event`]s
//! - [`snapshot()`] - Enumeration of the hub's devices into a [`Snapshot`]
//! - [`EventBridge`] - Lifecycle orchestration over a [`Hub`]
//!
//! [`Event`]: crate::event::Event
//! [`Hub`]: crate::hub::Hub

mod config;
mod event_bridge;
mod handle_table;
mod snapshot;
pub mod translator;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use config::BridgeConfig;
pub use event_bridge::EventBridge;
pub use handle_table::{CallbackHandle, HandleTable};
pub use snapshot::{Device, DeviceState, Snapshot, SnapshotEntry, snapshot};

/// Lifecycle state of an [`EventBridge`].
///
/// A bridge only moves forward: `Uninitialized` to `Running` to `Stopped`.
/// A stopped bridge cannot be restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeState {
    /// Created but not started.
    #[default]
    Uninitialized,
    /// Connected, with callbacks registered.
    Running,
    /// Stopped for good.
    Stopped,
}

impl BridgeState {
    /// Returns the lowercase name of the state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
