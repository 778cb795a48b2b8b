// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by the hub boundary, events and snapshots.
//!
//! # Types
//!
//! - [`EventClass`] - The four notification kinds the hub delivers
//! - [`Method`] / [`Methods`] - Device commands and command bitmasks
//! - [`LastCommand`] - Last command the hub sent to a device
//! - [`ChangeEvent`] / [`ChangeType`] - Device-change notification codes
//! - [`SensorDataType`] - What a sensor reading measures
//! - [`DimLevel`] - Dim level (0-255)

mod codes;
mod dim_level;
mod event_class;
mod method;

pub use codes::{ChangeEvent, ChangeType, SensorDataType};
pub use dim_level::DimLevel;
pub use event_class::EventClass;
pub use method::{LastCommand, Method, Methods};

/// Identifier the hub assigns to a device.
///
/// Unique among the hub's devices and stable across snapshots.
pub type DeviceId = i32;
