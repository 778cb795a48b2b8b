// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed hub event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    ChangeEvent, ChangeType, DeviceId, DimLevel, EventClass, Method, Methods, SensorDataType,
};

/// A notification delivered by the hub, translated into owned, typed data.
///
/// Each variant carries enough identifying information to be matched
/// against a device snapshot without querying the hub again. An event may
/// name a device that the latest snapshot does not contain yet; such an
/// event is pending a future snapshot, not an error.
///
/// # Examples
///
/// ```
/// use tellstick_bridge::event::Event;
/// use tellstick_bridge::types::{EventClass, Method};
///
/// let event = Event::Device {
///     device_id: 1,
///     method: Method::TurnOff.into(),
///     data: String::new(),
/// };
///
/// assert_eq!(event.class(), EventClass::Device);
/// assert_eq!(event.device_id(), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum Event {
    /// A sensor reading.
    Sensor {
        /// Radio protocol of the sensor.
        protocol: String,
        /// Sensor model.
        model: String,
        /// Sensor id.
        device_id: DeviceId,
        /// What the value measures.
        data_type: SensorDataType,
        /// The reading, exactly as the hub reported it.
        value: String,
        /// Unix timestamp of the reading.
        timestamp: i64,
    },

    /// A command was sent to a device.
    Device {
        /// Device the command was sent to.
        device_id: DeviceId,
        /// The command.
        method: Methods,
        /// Command argument (e.g. the dim level), may be empty.
        data: String,
    },

    /// The hub's device list changed.
    DeviceChange {
        /// Device that changed.
        device_id: DeviceId,
        /// What happened.
        change_event: ChangeEvent,
        /// Which attribute changed.
        change_type: ChangeType,
    },

    /// A raw protocol frame.
    RawDevice {
        /// Opaque payload, never validated by the bridge.
        raw_data: String,
        /// Controller that received the frame.
        controller_id: i32,
    },
}

impl Event {
    /// Returns the class of the event.
    #[must_use]
    pub const fn class(&self) -> EventClass {
        match self {
            Self::Sensor { .. } => EventClass::Sensor,
            Self::Device { .. } => EventClass::Device,
            Self::DeviceChange { .. } => EventClass::DeviceChange,
            Self::RawDevice { .. } => EventClass::RawDevice,
        }
    }

    /// Returns the device or sensor id the event refers to.
    ///
    /// Raw frames carry no device id.
    #[must_use]
    pub const fn device_id(&self) -> Option<DeviceId> {
        match self {
            Self::Sensor { device_id, .. }
            | Self::Device { device_id, .. }
            | Self::DeviceChange { device_id, .. } => Some(*device_id),
            Self::RawDevice { .. } => None,
        }
    }

    /// Returns `true` if the event means a new snapshot is needed.
    #[must_use]
    pub const fn requires_snapshot(&self) -> bool {
        matches!(self, Self::DeviceChange { change_event, .. } if change_event.alters_device_list())
    }

    /// Returns the dim level carried by a dim command.
    ///
    /// Returns `None` for any other event, or if the data is not a valid
    /// level.
    #[must_use]
    pub fn dim_level(&self) -> Option<DimLevel> {
        match self {
            Self::Device { method, data, .. } if method.contains(Method::Dim) => data.parse().ok(),
            _ => None,
        }
    }

    /// Returns a sensor reading as a number.
    #[must_use]
    pub fn sensor_value(&self) -> Option<f64> {
        match self {
            Self::Sensor { value, .. } => value.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the time of a sensor reading.
    #[must_use]
    pub fn sensor_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Sensor { timestamp, .. } => DateTime::from_timestamp(*timestamp, 0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(value: &str) -> Event {
        Event::Sensor {
            protocol: "fineoffset".to_string(),
            model: "temperaturehumidity".to_string(),
            device_id: 135,
            data_type: SensorDataType::Temperature,
            value: value.to_string(),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn classes() {
        assert_eq!(sensor("21.5").class(), EventClass::Sensor);
        let raw = Event::RawDevice {
            raw_data: "class:command;".to_string(),
            controller_id: 1,
        };
        assert_eq!(raw.class(), EventClass::RawDevice);
        assert_eq!(raw.device_id(), None);
    }

    #[test]
    fn sensor_helpers() {
        let event = sensor("21.5");
        assert_eq!(event.device_id(), Some(135));
        assert_eq!(event.sensor_value(), Some(21.5));
        assert_eq!(
            event.sensor_time().unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
        assert_eq!(sensor("n/a").sensor_value(), None);
    }

    #[test]
    fn dim_level_only_for_dim_commands() {
        let dim = Event::Device {
            device_id: 2,
            method: Method::Dim.into(),
            data: "128".to_string(),
        };
        assert_eq!(dim.dim_level(), Some(DimLevel::new(128)));

        let on = Event::Device {
            device_id: 2,
            method: Method::TurnOn.into(),
            data: "128".to_string(),
        };
        assert_eq!(on.dim_level(), None);
    }

    #[test]
    fn device_list_changes_require_snapshot() {
        let added = Event::DeviceChange {
            device_id: 7,
            change_event: ChangeEvent::Added,
            change_type: ChangeType::None,
        };
        assert!(added.requires_snapshot());

        let renamed = Event::DeviceChange {
            device_id: 7,
            change_event: ChangeEvent::Changed,
            change_type: ChangeType::Name,
        };
        assert!(!renamed.requires_snapshot());
    }

    #[test]
    fn serializes_with_class_tag() {
        let event = Event::Device {
            device_id: 1,
            method: Method::TurnOff.into(),
            data: String::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"class": "device", "device_id": 1, "method": 2, "data": ""})
        );
    }
}
