// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary to the native hub library.
//!
//! The [`Hub`] trait is the interface the bridge expects from the hub: a
//! connection, one callback registration per [`EventClass`], and a
//! synchronous device query API. Every method is blocking and the hub is
//! responsible for its own thread safety.
//!
//! Callbacks are registered as closures with their state captured, and
//! receive the hub's native argument shapes as a [`RawCallback`]. The hub
//! invokes them on a thread it owns. A callback must never call back into
//! the hub.
//!
//! [`MemoryHub`] is an in-process implementation for tests and demos.

mod memory;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::HubError;
use crate::types::{DeviceId, DimLevel, EventClass, Methods};

pub use memory::{MemoryDevice, MemoryHub};

/// Token the hub returns for a callback registration.
///
/// Unique while the registration is live and meaningless afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackToken(i32);

impl CallbackToken {
    /// Wraps a raw token value.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the raw token value.
    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cb({})", self.0)
    }
}

/// Arguments of a sensor callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorArgs<'a> {
    /// Radio protocol of the sensor.
    pub protocol: &'a str,
    /// Sensor model.
    pub model: &'a str,
    /// Sensor id (protocol specific, not a hub device id).
    pub id: i32,
    /// Data type code.
    pub data_type: i32,
    /// Reading, as a decimal string.
    pub value: &'a str,
    /// Unix timestamp of the reading.
    pub timestamp: i32,
    /// Id of the registration that delivered the call.
    pub callback_id: i32,
}

/// Arguments of a device callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceArgs<'a> {
    /// Device the command was sent to.
    pub device_id: i32,
    /// Method bit of the command.
    pub method: i32,
    /// Command argument, e.g. the dim level. May be empty.
    pub data: &'a str,
    /// Id of the registration that delivered the call.
    pub callback_id: i32,
}

/// Arguments of a device-change callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceChangeArgs {
    /// Device that changed.
    pub device_id: i32,
    /// Change event code.
    pub change_event: i32,
    /// Change type code.
    pub change_type: i32,
    /// Id of the registration that delivered the call.
    pub callback_id: i32,
}

/// Arguments of a raw device callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDeviceArgs<'a> {
    /// Opaque protocol payload.
    pub data: &'a str,
    /// Controller that received the frame.
    pub controller_id: i32,
    /// Id of the registration that delivered the call.
    pub callback_id: i32,
}

/// A single callback invocation, in the hub's native argument shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawCallback<'a> {
    /// A sensor reading.
    Sensor(SensorArgs<'a>),
    /// A command sent to a device.
    Device(DeviceArgs<'a>),
    /// A device-list change.
    DeviceChange(DeviceChangeArgs),
    /// A raw protocol frame.
    RawDevice(RawDeviceArgs<'a>),
}

impl RawCallback<'_> {
    /// Returns the event class this invocation belongs to.
    #[must_use]
    pub const fn class(&self) -> EventClass {
        match self {
            Self::Sensor(_) => EventClass::Sensor,
            Self::Device(_) => EventClass::Device,
            Self::DeviceChange(_) => EventClass::DeviceChange,
            Self::RawDevice(_) => EventClass::RawDevice,
        }
    }
}

/// A callback handler registered with the hub.
pub type Callback = Arc<dyn Fn(&RawCallback<'_>) + Send + Sync>;

/// Interface of the native hub library.
///
/// All methods are synchronous and may block. Implementations must be
/// safe to call from several threads at once.
pub trait Hub: Send + Sync + 'static {
    /// Opens the connection to the hub.
    ///
    /// # Errors
    ///
    /// Returns an error if the hub service cannot be reached.
    fn connect(&self) -> Result<(), HubError>;

    /// Closes the connection to the hub.
    fn close(&self);

    /// Registers `callback` for notifications of `class`.
    ///
    /// # Errors
    ///
    /// Returns an error if the hub rejects the registration.
    fn register_callback(
        &self,
        class: EventClass,
        callback: Callback,
    ) -> Result<CallbackToken, HubError>;

    /// Removes a callback registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not registered.
    fn unregister_callback(&self, token: CallbackToken) -> Result<(), HubError>;

    /// Returns the number of devices the hub knows.
    ///
    /// # Errors
    ///
    /// Returns an error if the hub cannot be queried.
    fn device_count(&self) -> Result<usize, HubError>;

    /// Returns the id of the device at `index` in enumeration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is no longer valid.
    fn device_id_at(&self, index: usize) -> Result<DeviceId, HubError>;

    /// Returns the name of a device.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is unknown.
    fn device_name(&self, id: DeviceId) -> Result<String, HubError>;

    /// Returns which of the methods in `mask` the device supports.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is unknown.
    fn supported_methods(&self, id: DeviceId, mask: Methods) -> Result<Methods, HubError>;

    /// Returns the last command sent to the device, restricted to `mask`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is unknown.
    fn last_command(&self, id: DeviceId, mask: Methods) -> Result<Methods, HubError>;

    /// Returns the argument of the last command sent to the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is unknown.
    fn last_value(&self, id: DeviceId) -> Result<String, HubError>;

    /// Turns a device on.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    fn turn_on(&self, id: DeviceId) -> Result<(), HubError>;

    /// Turns a device off.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    fn turn_off(&self, id: DeviceId) -> Result<(), HubError>;

    /// Dims a device to `level`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    fn dim(&self, id: DeviceId, level: DimLevel) -> Result<(), HubError>;
}

impl<H: Hub + ?Sized> Hub for Arc<H> {
    fn connect(&self) -> Result<(), HubError> {
        (**self).connect()
    }

    fn close(&self) {
        (**self).close();
    }

    fn register_callback(
        &self,
        class: EventClass,
        callback: Callback,
    ) -> Result<CallbackToken, HubError> {
        (**self).register_callback(class, callback)
    }

    fn unregister_callback(&self, token: CallbackToken) -> Result<(), HubError> {
        (**self).unregister_callback(token)
    }

    fn device_count(&self) -> Result<usize, HubError> {
        (**self).device_count()
    }

    fn device_id_at(&self, index: usize) -> Result<DeviceId, HubError> {
        (**self).device_id_at(index)
    }

    fn device_name(&self, id: DeviceId) -> Result<String, HubError> {
        (**self).device_name(id)
    }

    fn supported_methods(&self, id: DeviceId, mask: Methods) -> Result<Methods, HubError> {
        (**self).supported_methods(id, mask)
    }

    fn last_command(&self, id: DeviceId, mask: Methods) -> Result<Methods, HubError> {
        (**self).last_command(id, mask)
    }

    fn last_value(&self, id: DeviceId) -> Result<String, HubError> {
        (**self).last_value(id)
    }

    fn turn_on(&self, id: DeviceId) -> Result<(), HubError> {
        (**self).turn_on(id)
    }

    fn turn_off(&self, id: DeviceId) -> Result<(), HubError> {
        (**self).turn_off(id)
    }

    fn dim(&self, id: DeviceId, level: DimLevel) -> Result<(), HubError> {
        (**self).dim(id, level)
    }
}
