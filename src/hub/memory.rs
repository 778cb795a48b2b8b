// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process hub for tests and demos.
//!
//! [`MemoryHub`] keeps a device table and a callback table behind a mutex
//! and delivers callbacks on whichever thread calls one of the `fire_*`
//! methods, which lets tests play the role of the hub's dispatch thread.
//! Callbacks are always invoked with the internal lock released.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use crate::error::{HubError, HubErrorKind};
use crate::types::{DeviceId, DimLevel, EventClass, LastCommand, Method, Methods};

use super::{
    Callback, CallbackToken, DeviceArgs, DeviceChangeArgs, Hub, RawCallback, RawDeviceArgs,
    SensorArgs,
};

/// A device stored in a [`MemoryHub`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDevice {
    /// Hub device id.
    pub id: DeviceId,
    /// Device name.
    pub name: String,
    /// Methods the device supports.
    pub methods: Methods,
    /// Last command sent.
    pub last_command: LastCommand,
    /// Argument of the last command.
    pub last_value: String,
}

impl MemoryDevice {
    /// Creates a device that has never received a command.
    #[must_use]
    pub fn new(id: DeviceId, name: impl Into<String>, methods: Methods) -> Self {
        Self {
            id,
            name: name.into(),
            methods,
            last_command: LastCommand::None,
            last_value: String::new(),
        }
    }

    /// Sets the last command and value.
    #[must_use]
    pub fn with_last_command(mut self, command: LastCommand, value: impl Into<String>) -> Self {
        self.last_command = command;
        self.last_value = value.into();
        self
    }
}

#[derive(Default)]
struct Inner {
    connected: bool,
    connect_count: usize,
    close_count: usize,
    // `None` marks a slot whose device vanished during the current
    // enumeration; slots are compacted on the next count query.
    slots: Vec<Option<MemoryDevice>>,
    callbacks: BTreeMap<CallbackToken, (EventClass, Callback)>,
    // Registrations kept alive after unregistration, see
    // `deliver_after_unregister`.
    stale: BTreeMap<CallbackToken, (EventClass, Callback)>,
    next_token: i32,
    fail_next_connect: Option<HubError>,
    fail_registration: Option<EventClass>,
    vanish_after_count: Option<usize>,
    failing_devices: HashMap<DeviceId, HubErrorKind>,
    failing_indices: HashMap<usize, HubErrorKind>,
    deliver_after_unregister: bool,
}

impl Inner {
    fn ensure_connected(&self) -> Result<(), HubError> {
        if self.connected {
            Ok(())
        } else {
            Err(HubError::new(HubErrorKind::ConnectingService))
        }
    }

    fn device(&self, id: DeviceId) -> Result<&MemoryDevice, HubError> {
        self.ensure_connected()?;
        if let Some(&kind) = self.failing_devices.get(&id) {
            return Err(HubError::new(kind));
        }
        self.slots
            .iter()
            .flatten()
            .find(|d| d.id == id)
            .ok_or(HubError::new(HubErrorKind::DeviceNotFound))
    }

    fn device_mut(&mut self, id: DeviceId) -> Result<&mut MemoryDevice, HubError> {
        self.ensure_connected()?;
        self.slots
            .iter_mut()
            .flatten()
            .find(|d| d.id == id)
            .ok_or(HubError::new(HubErrorKind::DeviceNotFound))
    }
}

/// Thread-safe in-process [`Hub`].
///
/// # Examples
///
/// ```
/// use tellstick_bridge::hub::{Hub, MemoryDevice, MemoryHub};
/// use tellstick_bridge::types::Method;
///
/// let hub = MemoryHub::new();
/// hub.add_device(MemoryDevice::new(1, "Lamp", Method::TurnOn | Method::TurnOff));
///
/// hub.connect().unwrap();
/// assert_eq!(hub.device_count().unwrap(), 1);
/// assert_eq!(hub.device_name(1).unwrap(), "Lamp");
/// ```
pub struct MemoryHub {
    inner: Mutex<Inner>,
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemoryHub")
            .field("connected", &inner.connected)
            .field("devices", &inner.slots.iter().flatten().count())
            .field("callbacks", &inner.callbacks.len())
            .finish_non_exhaustive()
    }
}

impl MemoryHub {
    /// Creates an empty, disconnected hub.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_token: 1,
                ..Inner::default()
            }),
        }
    }

    /// Creates a hub preloaded with `devices`, in enumeration order.
    #[must_use]
    pub fn with_devices(devices: impl IntoIterator<Item = MemoryDevice>) -> Self {
        let hub = Self::new();
        for device in devices {
            hub.add_device(device);
        }
        hub
    }

    // =========================================================================
    // Device table
    // =========================================================================

    /// Appends a device to the enumeration order.
    pub fn add_device(&self, device: MemoryDevice) {
        self.inner.lock().slots.push(Some(device));
    }

    /// Removes a device. Returns `true` if it existed.
    pub fn remove_device(&self, id: DeviceId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.slots.len();
        inner
            .slots
            .retain(|slot| slot.as_ref().is_none_or(|d| d.id != id));
        inner.slots.len() != before
    }

    /// Overrides the last command and value of a device.
    pub fn set_last_command(&self, id: DeviceId, command: LastCommand, value: impl Into<String>) {
        let mut inner = self.inner.lock();
        if let Some(device) = inner.slots.iter_mut().flatten().find(|d| d.id == id) {
            device.last_command = command;
            device.last_value = value.into();
        }
    }

    /// Returns a copy of a device's stored record.
    #[must_use]
    pub fn device(&self, id: DeviceId) -> Option<MemoryDevice> {
        self.inner
            .lock()
            .slots
            .iter()
            .flatten()
            .find(|d| d.id == id)
            .cloned()
    }

    // =========================================================================
    // Failure injection
    // =========================================================================

    /// Makes the next [`Hub::connect`] call fail with `error`.
    pub fn fail_next_connect(&self, error: HubError) {
        self.inner.lock().fail_next_connect = Some(error);
    }

    /// Makes registrations for `class` fail.
    pub fn fail_registration(&self, class: EventClass) {
        self.inner.lock().fail_registration = Some(class);
    }

    /// Makes the device at `index` vanish right after the next count query.
    ///
    /// Within that enumeration pass, [`Hub::device_id_at`] fails for the
    /// index while every other index keeps its position.
    pub fn vanish_after_count(&self, index: usize) {
        self.inner.lock().vanish_after_count = Some(index);
    }

    /// Makes every per-device query for `id` fail with `DeviceNotFound`.
    pub fn fail_device_queries(&self, id: DeviceId) {
        self.fail_device_queries_with(id, HubErrorKind::DeviceNotFound);
    }

    /// Makes every per-device query for `id` fail with `kind`.
    pub fn fail_device_queries_with(&self, id: DeviceId, kind: HubErrorKind) {
        self.inner.lock().failing_devices.insert(id, kind);
    }

    /// Makes [`Hub::device_id_at`] fail with `kind` for `index`.
    pub fn fail_index_query_with(&self, index: usize, kind: HubErrorKind) {
        self.inner.lock().failing_indices.insert(index, kind);
    }

    /// Keeps delivering to callbacks after they are unregistered.
    ///
    /// Models a native hub whose dispatch thread is still inside a callback
    /// when unregistration returns.
    pub fn deliver_after_unregister(&self, enabled: bool) {
        self.inner.lock().deliver_after_unregister = enabled;
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Returns `true` while connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    /// Returns how many times [`Hub::connect`] succeeded.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.inner.lock().connect_count
    }

    /// Returns how many times [`Hub::close`] was called.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.inner.lock().close_count
    }

    /// Returns the number of live callback registrations.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.inner.lock().callbacks.len()
    }

    /// Returns the classes with a live callback registration.
    #[must_use]
    pub fn registered_classes(&self) -> Vec<EventClass> {
        self.inner
            .lock()
            .callbacks
            .values()
            .map(|(class, _)| *class)
            .collect()
    }

    // =========================================================================
    // Callback delivery
    // =========================================================================

    /// Delivers a device callback.
    pub fn fire_device(&self, device_id: DeviceId, method: i32, data: &str) {
        for (token, callback) in self.targets(EventClass::Device) {
            callback(&RawCallback::Device(DeviceArgs {
                device_id,
                method,
                data,
                callback_id: token.value(),
            }));
        }
    }

    /// Delivers a device-change callback.
    pub fn fire_device_change(&self, device_id: DeviceId, change_event: i32, change_type: i32) {
        for (token, callback) in self.targets(EventClass::DeviceChange) {
            callback(&RawCallback::DeviceChange(DeviceChangeArgs {
                device_id,
                change_event,
                change_type,
                callback_id: token.value(),
            }));
        }
    }

    /// Delivers a raw device callback.
    pub fn fire_raw(&self, data: &str, controller_id: i32) {
        for (token, callback) in self.targets(EventClass::RawDevice) {
            callback(&RawCallback::RawDevice(RawDeviceArgs {
                data,
                controller_id,
                callback_id: token.value(),
            }));
        }
    }

    /// Delivers a sensor callback.
    pub fn fire_sensor(
        &self,
        protocol: &str,
        model: &str,
        id: i32,
        data_type: i32,
        value: &str,
        timestamp: i32,
    ) {
        for (token, callback) in self.targets(EventClass::Sensor) {
            callback(&RawCallback::Sensor(SensorArgs {
                protocol,
                model,
                id,
                data_type,
                value,
                timestamp,
                callback_id: token.value(),
            }));
        }
    }

    fn targets(&self, class: EventClass) -> Vec<(CallbackToken, Callback)> {
        let inner = self.inner.lock();
        inner
            .callbacks
            .iter()
            .chain(inner.stale.iter())
            .filter(|(_, (c, _))| *c == class)
            .map(|(token, (_, cb))| (*token, cb.clone()))
            .collect()
    }

    fn record_command(
        &self,
        id: DeviceId,
        method: Method,
        value: String,
    ) -> Result<(), HubError> {
        {
            let mut inner = self.inner.lock();
            let device = inner.device_mut(id)?;
            if !device.methods.contains(method) {
                return Err(HubError::new(HubErrorKind::MethodNotSupported));
            }
            device.last_command = match method {
                Method::TurnOn => LastCommand::TurnOn,
                Method::TurnOff => LastCommand::TurnOff,
                Method::Dim => LastCommand::Dim,
                _ => device.last_command,
            };
            device.last_value = if method == Method::Dim {
                value.clone()
            } else {
                String::new()
            };
        }
        self.fire_device(id, method.bit().cast_signed(), &value);
        Ok(())
    }
}

impl Hub for MemoryHub {
    fn connect(&self) -> Result<(), HubError> {
        let mut inner = self.inner.lock();
        if let Some(error) = inner.fail_next_connect.take() {
            return Err(error);
        }
        inner.connected = true;
        inner.connect_count += 1;
        Ok(())
    }

    fn close(&self) {
        let mut inner = self.inner.lock();
        inner.connected = false;
        inner.close_count += 1;
    }

    fn register_callback(
        &self,
        class: EventClass,
        callback: Callback,
    ) -> Result<CallbackToken, HubError> {
        let mut inner = self.inner.lock();
        inner.ensure_connected()?;
        if inner.fail_registration == Some(class) {
            return Err(HubError::new(HubErrorKind::Unknown)
                .with_message(format!("registration of {class} callback rejected")));
        }
        let token = CallbackToken::new(inner.next_token);
        inner.next_token += 1;
        inner.callbacks.insert(token, (class, callback));
        Ok(token)
    }

    fn unregister_callback(&self, token: CallbackToken) -> Result<(), HubError> {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.callbacks.remove(&token) else {
            return Err(HubError::new(HubErrorKind::NotFound)
                .with_message(format!("callback {token} is not registered")));
        };
        if inner.deliver_after_unregister {
            inner.stale.insert(token, entry);
        }
        Ok(())
    }

    fn device_count(&self) -> Result<usize, HubError> {
        let mut inner = self.inner.lock();
        inner.ensure_connected()?;
        inner.slots.retain(Option::is_some);
        let count = inner.slots.len();
        if let Some(index) = inner.vanish_after_count.take() {
            if let Some(slot) = inner.slots.get_mut(index) {
                *slot = None;
            }
        }
        Ok(count)
    }

    fn device_id_at(&self, index: usize) -> Result<DeviceId, HubError> {
        let inner = self.inner.lock();
        inner.ensure_connected()?;
        if let Some(&kind) = inner.failing_indices.get(&index) {
            return Err(HubError::new(kind).with_message(format!("index {index}")));
        }
        match inner.slots.get(index) {
            Some(Some(device)) => Ok(device.id),
            _ => Err(HubError::new(HubErrorKind::DeviceNotFound)
                .with_message(format!("no device at index {index}"))),
        }
    }

    fn device_name(&self, id: DeviceId) -> Result<String, HubError> {
        Ok(self.inner.lock().device(id)?.name.clone())
    }

    fn supported_methods(&self, id: DeviceId, mask: Methods) -> Result<Methods, HubError> {
        Ok(self.inner.lock().device(id)?.methods.intersection(mask))
    }

    fn last_command(&self, id: DeviceId, mask: Methods) -> Result<Methods, HubError> {
        let inner = self.inner.lock();
        let device = inner.device(id)?;
        Ok(device
            .last_command
            .method()
            .map_or(Methods::NONE, Methods::from)
            .intersection(mask))
    }

    fn last_value(&self, id: DeviceId) -> Result<String, HubError> {
        Ok(self.inner.lock().device(id)?.last_value.clone())
    }

    fn turn_on(&self, id: DeviceId) -> Result<(), HubError> {
        self.record_command(id, Method::TurnOn, String::new())
    }

    fn turn_off(&self, id: DeviceId) -> Result<(), HubError> {
        self.record_command(id, Method::TurnOff, String::new())
    }

    fn dim(&self, id: DeviceId, level: DimLevel) -> Result<(), HubError> {
        self.record_command(id, Method::Dim, level.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn lamp() -> MemoryDevice {
        MemoryDevice::new(1, "Lamp", Method::TurnOn | Method::TurnOff)
    }

    fn counting_callback(counter: &Arc<AtomicUsize>) -> Callback {
        let counter = Arc::clone(counter);
        Arc::new(move |_: &RawCallback<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn queries_require_connection() {
        let hub = MemoryHub::with_devices([lamp()]);
        let err = hub.device_count().unwrap_err();
        assert_eq!(err.kind, HubErrorKind::ConnectingService);

        hub.connect().unwrap();
        assert_eq!(hub.device_count().unwrap(), 1);
    }

    #[test]
    fn tokens_are_unique() {
        let hub = MemoryHub::new();
        hub.connect().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let a = hub
            .register_callback(EventClass::Device, counting_callback(&counter))
            .unwrap();
        let b = hub
            .register_callback(EventClass::Sensor, counting_callback(&counter))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(hub.callback_count(), 2);
    }

    #[test]
    fn fire_reaches_only_matching_class() {
        let hub = MemoryHub::new();
        hub.connect().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        hub.register_callback(EventClass::Device, counting_callback(&counter))
            .unwrap();

        hub.fire_device(1, 1, "");
        hub.fire_raw("class:command;", 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_stops_delivery() {
        let hub = MemoryHub::new();
        hub.connect().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let token = hub
            .register_callback(EventClass::DeviceChange, counting_callback(&counter))
            .unwrap();
        hub.unregister_callback(token).unwrap();
        hub.fire_device_change(1, 1, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert!(hub.unregister_callback(token).is_err());
    }

    #[test]
    fn stale_delivery_after_unregister() {
        let hub = MemoryHub::new();
        hub.connect().unwrap();
        hub.deliver_after_unregister(true);
        let counter = Arc::new(AtomicUsize::new(0));
        let token = hub
            .register_callback(EventClass::Device, counting_callback(&counter))
            .unwrap();
        hub.unregister_callback(token).unwrap();
        hub.fire_device(1, 2, "");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(hub.callback_count(), 0);
    }

    #[test]
    fn vanish_keeps_other_indices() {
        let hub = MemoryHub::with_devices([
            lamp(),
            MemoryDevice::new(2, "Dimmer", Method::Dim.into()),
            MemoryDevice::new(3, "Bell", Method::Bell.into()),
        ]);
        hub.connect().unwrap();
        hub.vanish_after_count(1);

        assert_eq!(hub.device_count().unwrap(), 3);
        assert_eq!(hub.device_id_at(0).unwrap(), 1);
        assert!(hub.device_id_at(1).is_err());
        assert_eq!(hub.device_id_at(2).unwrap(), 3);

        // The next enumeration sees the compacted list.
        assert_eq!(hub.device_count().unwrap(), 2);
        assert_eq!(hub.device_id_at(1).unwrap(), 3);
    }

    #[test]
    fn commands_update_last_command_and_fire() {
        let hub = MemoryHub::with_devices([MemoryDevice::new(
            2,
            "Dimmer",
            Method::TurnOn | Method::TurnOff | Method::Dim,
        )]);
        hub.connect().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        hub.register_callback(EventClass::Device, counting_callback(&counter))
            .unwrap();

        hub.dim(2, DimLevel::new(128)).unwrap();
        assert_eq!(
            hub.last_command(2, Methods::LAST_COMMAND_MASK).unwrap(),
            Methods::from(Method::Dim)
        );
        assert_eq!(hub.last_value(2).unwrap(), "128");

        hub.turn_off(2).unwrap();
        assert_eq!(hub.last_value(2).unwrap(), "");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsupported_method_is_rejected() {
        let hub = MemoryHub::with_devices([lamp()]);
        hub.connect().unwrap();
        let err = hub.dim(1, DimLevel::FULL).unwrap_err();
        assert_eq!(err.kind, HubErrorKind::MethodNotSupported);
    }

    #[test]
    fn device_queries_fail_with_injected_kind() {
        let hub = MemoryHub::with_devices([lamp()]);
        hub.connect().unwrap();
        hub.fail_device_queries_with(1, HubErrorKind::BrokenPipe);

        assert_eq!(hub.device_name(1).unwrap_err().kind, HubErrorKind::BrokenPipe);
        assert_eq!(hub.last_value(1).unwrap_err().kind, HubErrorKind::BrokenPipe);
        assert_eq!(hub.device_id_at(0).unwrap(), 1);
    }

    #[test]
    fn supported_methods_respects_mask() {
        let hub = MemoryHub::with_devices([lamp()]);
        hub.connect().unwrap();
        let methods = hub.supported_methods(1, Method::TurnOn.into()).unwrap();
        assert_eq!(methods, Methods::from(Method::TurnOn));
    }
}
