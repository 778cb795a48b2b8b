// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration for the event bridge.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::event::{DEFAULT_QUEUE_CAPACITY, OverflowPolicy};
use crate::types::EventClass;

/// Configuration of an [`EventBridge`](super::EventBridge).
///
/// # Examples
///
/// ```
/// use tellstick_bridge::bridge::BridgeConfig;
/// use tellstick_bridge::event::OverflowPolicy;
/// use tellstick_bridge::types::EventClass;
///
/// let config = BridgeConfig::default()
///     .with_queue_capacity(1024)
///     .unwrap()
///     .with_overflow(EventClass::RawDevice, OverflowPolicy::DropNewest);
///
/// assert_eq!(config.queue_capacity().get(), 1024);
/// assert_eq!(config.overflow(EventClass::RawDevice), OverflowPolicy::DropNewest);
/// assert_eq!(config.overflow(EventClass::Device), OverflowPolicy::DropOldest);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    queue_capacity: NonZeroUsize,
    overflow: OverflowPolicies,
}

/// Overflow policy per event class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
struct OverflowPolicies {
    sensor: OverflowPolicy,
    device: OverflowPolicy,
    device_change: OverflowPolicy,
    raw_device: OverflowPolicy,
}

impl OverflowPolicies {
    fn get(&self, class: EventClass) -> OverflowPolicy {
        match class {
            EventClass::Sensor => self.sensor,
            EventClass::Device => self.device,
            EventClass::DeviceChange => self.device_change,
            EventClass::RawDevice => self.raw_device,
        }
    }

    fn set(&mut self, class: EventClass, policy: OverflowPolicy) {
        let slot = match class {
            EventClass::Sensor => &mut self.sensor,
            EventClass::Device => &mut self.device,
            EventClass::DeviceChange => &mut self.device_change,
            EventClass::RawDevice => &mut self.raw_device,
        };
        *slot = policy;
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: NonZeroUsize::new(DEFAULT_QUEUE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            overflow: OverflowPolicies::default(),
        }
    }
}

impl BridgeConfig {
    /// Creates the default configuration: 256 queued events, oldest events
    /// dropped first for every class.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the queue capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::ZeroCapacity`] if `capacity` is zero.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Result<Self, ValueError> {
        self.queue_capacity = NonZeroUsize::new(capacity).ok_or(ValueError::ZeroCapacity)?;
        Ok(self)
    }

    /// Sets the overflow policy for one event class.
    #[must_use]
    pub fn with_overflow(mut self, class: EventClass, policy: OverflowPolicy) -> Self {
        self.overflow.set(class, policy);
        self
    }

    /// Sets the overflow policy for every event class.
    #[must_use]
    pub fn with_overflow_all(mut self, policy: OverflowPolicy) -> Self {
        for class in EventClass::ALL {
            self.overflow.set(class, policy);
        }
        self
    }

    /// Returns the queue capacity.
    #[must_use]
    pub fn queue_capacity(&self) -> NonZeroUsize {
        self.queue_capacity
    }

    /// Returns the overflow policy for `class`.
    #[must_use]
    pub fn overflow(&self, class: EventClass) -> OverflowPolicy {
        self.overflow.get(class)
    }

    /// Returns the policies indexed like [`EventClass::ALL`].
    pub(crate) fn overflow_table(&self) -> [OverflowPolicy; 4] {
        EventClass::ALL.map(|class| self.overflow.get(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BridgeConfig::new();
        assert_eq!(config.queue_capacity().get(), 256);
        for class in EventClass::ALL {
            assert_eq!(config.overflow(class), OverflowPolicy::DropOldest);
        }
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(
            BridgeConfig::new().with_queue_capacity(0),
            Err(ValueError::ZeroCapacity)
        );
    }

    #[test]
    fn overflow_all_then_override() {
        let config = BridgeConfig::new()
            .with_overflow_all(OverflowPolicy::DropNewest)
            .with_overflow(EventClass::Device, OverflowPolicy::DropOldest);
        assert_eq!(
            config.overflow_table(),
            [
                OverflowPolicy::DropNewest,
                OverflowPolicy::DropOldest,
                OverflowPolicy::DropNewest,
                OverflowPolicy::DropNewest,
            ]
        );
    }

    #[test]
    fn deserializes_partial_config() {
        let config: BridgeConfig = serde_json::from_value(serde_json::json!({
            "queue_capacity": 64,
            "overflow": { "sensor": "drop_newest" }
        }))
        .unwrap();
        assert_eq!(config.queue_capacity().get(), 64);
        assert_eq!(config.overflow(EventClass::Sensor), OverflowPolicy::DropNewest);
        assert_eq!(config.overflow(EventClass::RawDevice), OverflowPolicy::DropOldest);
    }

    #[test]
    fn zero_capacity_fails_to_deserialize() {
        let result: Result<BridgeConfig, _> =
            serde_json::from_value(serde_json::json!({ "queue_capacity": 0 }));
        assert!(result.is_err());
    }
}
