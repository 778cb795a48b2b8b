// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Latest reading of every sensor.
//!
//! [`SensorReadings`] is fed from the event stream and keeps the most recent
//! value per sensor id and [`SensorDataType`], so a temperature/humidity
//! sensor has two entries. It is independent of the device snapshot: sensors
//! are not hub devices.
//!
//! # Examples
//!
//! ```
//! use tellstick_bridge::event::Event;
//! use tellstick_bridge::readings::SensorReadings;
//! use tellstick_bridge::types::SensorDataType;
//!
//! let readings = SensorReadings::new();
//! let event = Event::Sensor {
//!     protocol: "fineoffset".to_string(),
//!     model: "temperaturehumidity".to_string(),
//!     device_id: 135,
//!     data_type: SensorDataType::Temperature,
//!     value: "21.5".to_string(),
//!     timestamp: 1_700_000_000,
//! };
//!
//! assert!(readings.observe(&event));
//! // Same value again is not a change.
//! assert!(!readings.observe(&event));
//!
//! let latest = readings.get(135, SensorDataType::Temperature).unwrap();
//! assert_eq!(latest.numeric(), Some(21.5));
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::types::{DeviceId, SensorDataType};

/// The most recent value of one sensor data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Radio protocol of the sensor.
    pub protocol: String,
    /// Sensor model.
    pub model: String,
    /// The value, exactly as the hub reported it.
    pub value: String,
    /// Unix timestamp of the reading.
    pub timestamp: i64,
}

impl SensorReading {
    /// Returns the value as a number.
    #[must_use]
    pub fn numeric(&self) -> Option<f64> {
        self.value.trim().parse().ok()
    }

    /// Returns the time of the reading.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Latest readings keyed by sensor id and data type.
#[derive(Debug, Default)]
pub struct SensorReadings {
    readings: RwLock<HashMap<(DeviceId, SensorDataType), SensorReading>>,
}

impl SensorReadings {
    /// Creates an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sensor event. Other events are ignored.
    ///
    /// Returns `true` if the event introduced a new sensor data type or
    /// changed its value.
    pub fn observe(&self, event: &Event) -> bool {
        let Event::Sensor {
            protocol,
            model,
            device_id,
            data_type,
            value,
            timestamp,
        } = event
        else {
            return false;
        };

        let mut readings = self.readings.write();
        let reading = SensorReading {
            protocol: protocol.clone(),
            model: model.clone(),
            value: value.clone(),
            timestamp: *timestamp,
        };
        let previous = readings.insert((*device_id, *data_type), reading);
        let changed = previous.is_none_or(|p| p.value != *value);
        if changed {
            tracing::debug!(
                sensor_id = device_id,
                data_type = ?data_type,
                value = %value,
                "Sensor reading changed"
            );
        }
        changed
    }

    /// Returns the latest reading of `data_type` for sensor `id`.
    #[must_use]
    pub fn get(&self, id: DeviceId, data_type: SensorDataType) -> Option<SensorReading> {
        self.readings.read().get(&(id, data_type)).cloned()
    }

    /// Returns every latest reading of sensor `id`, ordered by data type code.
    #[must_use]
    pub fn sensor(&self, id: DeviceId) -> Vec<(SensorDataType, SensorReading)> {
        let mut readings: Vec<_> = self
            .readings
            .read()
            .iter()
            .filter(|((sensor, _), _)| *sensor == id)
            .map(|((_, data_type), reading)| (*data_type, reading.clone()))
            .collect();
        readings.sort_by_key(|(data_type, _)| data_type.code());
        readings
    }

    /// Returns the ids of every sensor seen, in ascending order.
    #[must_use]
    pub fn sensor_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.readings.read().keys().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Returns the number of stored readings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.read().len()
    }

    /// Returns `true` if no reading is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
