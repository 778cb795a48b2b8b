// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The four notification kinds the hub delivers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of notification delivered by the hub.
///
/// The set is fixed: the hub exposes exactly one callback registration per
/// class and no other class is ever introduced at runtime.
///
/// # Examples
///
/// ```
/// use tellstick_bridge::types::EventClass;
///
/// assert_eq!(EventClass::ALL.len(), 4);
/// assert_eq!(EventClass::RawDevice.as_str(), "raw_device");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventClass {
    /// Sensor readings (temperature, humidity, ...).
    Sensor,
    /// Commands sent to a device (on, off, dim, ...).
    Device,
    /// A device was added, removed or changed in the hub's device list.
    DeviceChange,
    /// Raw protocol frames received by the controller.
    RawDevice,
}

impl EventClass {
    /// Every event class, in the order callbacks are registered.
    pub const ALL: [Self; 4] = [Self::Sensor, Self::Device, Self::DeviceChange, Self::RawDevice];

    /// Returns the snake case name of the class.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Device => "device",
            Self::DeviceChange => "device_change",
            Self::RawDevice => "raw_device",
        }
    }

    /// Returns a dense index (0-3) usable for per-class arrays.
    #[must_use]
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Sensor => 0,
            Self::Device => 1,
            Self::DeviceChange => 2,
            Self::RawDevice => 3,
        }
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_dense_and_match_all_order() {
        for (i, class) in EventClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), i);
        }
    }

    #[test]
    fn display_uses_snake_case() {
        assert_eq!(EventClass::DeviceChange.to_string(), "device_change");
        assert_eq!(EventClass::Sensor.to_string(), "sensor");
    }

    #[test]
    fn serde_matches_display() {
        let json = serde_json::to_string(&EventClass::RawDevice).unwrap();
        assert_eq!(json, "\"raw_device\"");
        let back: EventClass = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EventClass::RawDevice);
    }
}
