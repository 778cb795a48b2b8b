// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Translation of hub callback arguments into [`Event`]s.
//!
//! These functions run on the hub's dispatch thread. They copy the borrowed
//! arguments into owned values and never touch the hub, block or fail.
//! Codes the crate does not know are carried through unchanged.

use crate::event::Event;
use crate::hub::{DeviceArgs, DeviceChangeArgs, RawCallback, RawDeviceArgs, SensorArgs};
use crate::types::{ChangeEvent, ChangeType, Methods, SensorDataType};

/// Translates any callback invocation.
///
/// # Examples
///
/// ```
/// use tellstick_bridge::bridge::translator;
/// use tellstick_bridge::event::Event;
/// use tellstick_bridge::hub::{DeviceArgs, RawCallback};
/// use tellstick_bridge::types::Method;
///
/// let event = translator::translate(&RawCallback::Device(DeviceArgs {
///     device_id: 1,
///     method: 2,
///     data: "",
///     callback_id: 5,
/// }));
///
/// assert_eq!(
///     event,
///     Event::Device { device_id: 1, method: Method::TurnOff.into(), data: String::new() }
/// );
/// ```
#[must_use]
pub fn translate(raw: &RawCallback<'_>) -> Event {
    match raw {
        RawCallback::Sensor(args) => sensor(args),
        RawCallback::Device(args) => device(args),
        RawCallback::DeviceChange(args) => device_change(args),
        RawCallback::RawDevice(args) => raw_device(args),
    }
}

/// Translates a sensor reading.
#[must_use]
pub fn sensor(args: &SensorArgs<'_>) -> Event {
    Event::Sensor {
        protocol: args.protocol.to_string(),
        model: args.model.to_string(),
        device_id: args.id,
        data_type: SensorDataType::from_code(args.data_type),
        value: args.value.to_string(),
        timestamp: i64::from(args.timestamp),
    }
}

/// Translates a device command.
///
/// The method is kept bit for bit, including bits this crate does not
/// name.
#[must_use]
pub fn device(args: &DeviceArgs<'_>) -> Event {
    Event::Device {
        device_id: args.device_id,
        method: Methods::from_bits(args.method.cast_unsigned()),
        data: args.data.to_string(),
    }
}

/// Translates a device-list change.
#[must_use]
pub fn device_change(args: &DeviceChangeArgs) -> Event {
    Event::DeviceChange {
        device_id: args.device_id,
        change_event: ChangeEvent::from_code(args.change_event),
        change_type: ChangeType::from_code(args.change_type),
    }
}

/// Translates a raw protocol frame. The payload is not inspected.
#[must_use]
pub fn raw_device(args: &RawDeviceArgs<'_>) -> Event {
    Event::RawDevice {
        raw_data: args.data.to_string(),
        controller_id: args.controller_id,
    }
}
