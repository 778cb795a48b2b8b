// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lifecycle orchestration of the hub connection and callbacks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{Error, HubError, HubErrorKind, Result};
use crate::event::{EventQueue, EventReceiver};
use crate::hub::{Callback, Hub, RawCallback};
use crate::types::{DeviceId, DimLevel, EventClass, LastCommand, Method, Methods};

use super::{BridgeConfig, BridgeState, CallbackHandle, HandleTable, Snapshot, snapshot, translator};

#[derive(Debug, Default)]
struct Lifecycle {
    state: BridgeState,
    receiver_taken: bool,
}

/// Bridges a [`Hub`]'s callbacks into a typed event stream.
///
/// The bridge owns the hub connection and one callback registration per
/// [`EventClass`]. Every callback is translated on the hub's thread and
/// pushed into a bounded queue, which the application drains through
/// [`events`](Self::events). Device state is read separately, on the
/// caller's thread, with [`snapshot`](Self::snapshot).
///
/// # Lifecycle
///
/// `Uninitialized` to `Running` with [`start`](Self::start), then to
/// `Stopped` with [`stop`](Self::stop). A stopped bridge cannot be started
/// again; create a new one. Dropping a running bridge stops it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tellstick_bridge::bridge::{BridgeConfig, EventBridge};
/// use tellstick_bridge::event::Event;
/// use tellstick_bridge::hub::{MemoryDevice, MemoryHub};
/// use tellstick_bridge::types::Method;
///
/// # fn main() -> tellstick_bridge::Result<()> {
/// let hub = Arc::new(MemoryHub::with_devices([MemoryDevice::new(
///     1,
///     "Lamp",
///     Method::TurnOn | Method::TurnOff,
/// )]));
///
/// let bridge = EventBridge::new(Arc::clone(&hub), BridgeConfig::default());
/// let mut events = bridge.events()?;
/// bridge.start()?;
///
/// hub.fire_device(1, 2, "");
/// assert_eq!(
///     events.try_recv(),
///     Some(Event::Device { device_id: 1, method: Method::TurnOff.into(), data: String::new() })
/// );
///
/// assert_eq!(bridge.snapshot()?.len(), 1);
/// bridge.stop()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EventBridge<H: Hub> {
    hub: H,
    config: BridgeConfig,
    handles: HandleTable,
    queue: Arc<EventQueue>,
    accepting: Arc<AtomicBool>,
    lifecycle: Mutex<Lifecycle>,
}

impl<H: Hub> EventBridge<H> {
    /// Creates a bridge over `hub`. Nothing is connected until
    /// [`start`](Self::start).
    #[must_use]
    pub fn new(hub: H, config: BridgeConfig) -> Self {
        let queue = Arc::new(EventQueue::new(
            config.queue_capacity().get(),
            config.overflow_table(),
        ));
        Self {
            hub,
            config,
            handles: HandleTable::new(),
            queue,
            accepting: Arc::new(AtomicBool::new(false)),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Returns the hub.
    #[must_use]
    pub fn hub(&self) -> &H {
        &self.hub
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> BridgeState {
        self.lifecycle.lock().state
    }

    /// Returns the live callback registrations.
    #[must_use]
    pub fn handles(&self) -> Vec<CallbackHandle> {
        self.handles.all()
    }

    /// Returns how many events of `class` were lost to queue overflow.
    #[must_use]
    pub fn dropped_events(&self, class: EventClass) -> u64 {
        self.queue.dropped(class)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Connects to the hub and registers a callback for every event class.
    ///
    /// On failure every registration made so far is removed, the connection
    /// is closed, events delivered by those registrations are discarded and
    /// the bridge stays `Uninitialized`.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyStarted`] if the bridge is running
    /// - [`Error::InvalidState`] if the bridge was stopped
    /// - [`Error::Hub`] if connecting or registering fails
    /// - [`Error::DuplicateRegistration`] if a class is already registered
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.state {
            BridgeState::Uninitialized => {}
            BridgeState::Running => return Err(Error::AlreadyStarted),
            state @ BridgeState::Stopped => {
                return Err(Error::InvalidState {
                    operation: "start",
                    state,
                });
            }
        }

        self.hub.connect()?;
        tracing::debug!("Connected to hub");

        self.accepting.store(true, Ordering::Release);
        if let Err(e) = self.register_all() {
            tracing::warn!(error = %e, "Failed to register hub callbacks, rolling back");
            self.accepting.store(false, Ordering::Release);
            self.unregister_all();
            self.hub.close();
            let discarded = self.queue.clear();
            if discarded > 0 {
                tracing::debug!(discarded, "Discarded events delivered during failed start");
            }
            return Err(e);
        }

        lifecycle.state = BridgeState::Running;
        tracing::info!(
            queue_capacity = self.config.queue_capacity().get(),
            "Event bridge started"
        );
        Ok(())
    }

    /// Unregisters every callback and closes the hub connection.
    ///
    /// Once this returns, no hub callback reaches the event stream. Events
    /// already queued can still be received. Calling `stop` on a bridge
    /// that is not running does nothing.
    ///
    /// # Errors
    ///
    /// Does not fail at present; unregistration failures are logged and
    /// treated as already unregistered.
    pub fn stop(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state != BridgeState::Running {
            tracing::debug!(state = %lifecycle.state, "Stop ignored, bridge not running");
            return Ok(());
        }

        self.accepting.store(false, Ordering::Release);
        self.unregister_all();
        self.hub.close();
        self.queue.close();

        lifecycle.state = BridgeState::Stopped;
        tracing::info!("Event bridge stopped");
        Ok(())
    }

    fn register_all(&self) -> Result<()> {
        for class in EventClass::ALL {
            let token = self.hub.register_callback(class, self.callback())?;
            if let Err(e) = self.handles.put(class, token) {
                if let Err(unregister) = self.hub.unregister_callback(token) {
                    tracing::warn!(%class, %token, error = %unregister, "Failed to unregister duplicate callback");
                }
                return Err(e);
            }
            tracing::debug!(%class, %token, "Registered hub callback");
        }
        Ok(())
    }

    fn unregister_all(&self) {
        for handle in self.handles.drain() {
            let (class, token) = (handle.class(), handle.token());
            match self.hub.unregister_callback(token) {
                Ok(()) => tracing::debug!(%class, %token, "Unregistered hub callback"),
                Err(e) => tracing::warn!(
                    %class,
                    %token,
                    error = %e,
                    "Hub callback was not registered, ignoring"
                ),
            }
        }
    }

    fn callback(&self) -> Callback {
        let queue = Arc::clone(&self.queue);
        let accepting = Arc::clone(&self.accepting);
        Arc::new(move |raw: &RawCallback<'_>| {
            if !accepting.load(Ordering::Acquire) {
                return;
            }
            let event = translator::translate(raw);
            tracing::trace!(class = %event.class(), device_id = ?event.device_id(), "Hub event");
            queue.push(event);
        })
    }

    fn ensure_running(&self, operation: &'static str) -> Result<()> {
        match self.lifecycle.lock().state {
            BridgeState::Running => Ok(()),
            state => Err(Error::InvalidState { operation, state }),
        }
    }

    // =========================================================================
    // Application surface
    // =========================================================================

    /// Takes the event stream.
    ///
    /// The stream can be taken once per bridge, in any state. Take it
    /// before [`start`](Self::start) to observe every event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the stream was already taken.
    pub fn events(&self) -> Result<EventReceiver> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.receiver_taken {
            return Err(Error::InvalidState {
                operation: "take the event stream again",
                state: lifecycle.state,
            });
        }
        lifecycle.receiver_taken = true;
        Ok(EventReceiver::new(Arc::clone(&self.queue)))
    }

    /// Takes a snapshot of the hub's devices on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the bridge is not running, or
    /// [`Error::Hub`] if the hub connection fails.
    pub fn snapshot(&self) -> Result<Snapshot> {
        self.ensure_running("snapshot")?;
        snapshot(&self.hub)
    }

    // =========================================================================
    // Device commands
    // =========================================================================

    /// Turns a device on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the bridge is not running, or
    /// [`Error::Hub`] if the hub rejects the command.
    pub fn turn_on(&self, id: DeviceId) -> Result<()> {
        self.ensure_running("turn on")?;
        tracing::debug!(device_id = id, "Sending turn on");
        self.hub.turn_on(id)?;
        Ok(())
    }

    /// Turns a device off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the bridge is not running, or
    /// [`Error::Hub`] if the hub rejects the command.
    pub fn turn_off(&self, id: DeviceId) -> Result<()> {
        self.ensure_running("turn off")?;
        tracing::debug!(device_id = id, "Sending turn off");
        self.hub.turn_off(id)?;
        Ok(())
    }

    /// Dims a device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the bridge is not running, or
    /// [`Error::Hub`] if the hub rejects the command.
    pub fn dim(&self, id: DeviceId, level: DimLevel) -> Result<()> {
        self.ensure_running("dim")?;
        tracing::debug!(device_id = id, %level, "Sending dim");
        self.hub.dim(id, level)?;
        Ok(())
    }

    /// Toggles a device based on the last command the hub sent it, and
    /// returns the method that was sent.
    ///
    /// A device last dimmed to `0` is turned on, any other dim level turns
    /// it off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the bridge is not running, or
    /// [`Error::Hub`] if the hub fails or has no last command for the
    /// device.
    pub fn toggle(&self, id: DeviceId) -> Result<Method> {
        self.ensure_running("toggle")?;
        let last = LastCommand::from_mask(self.hub.last_command(id, Methods::LAST_COMMAND_MASK)?);
        let method = match last {
            LastCommand::Dim => {
                if self.hub.last_value(id)? == "0" {
                    Method::TurnOn
                } else {
                    Method::TurnOff
                }
            }
            LastCommand::TurnOn => Method::TurnOff,
            LastCommand::TurnOff => Method::TurnOn,
            LastCommand::None => {
                return Err(HubError::new(HubErrorKind::Unknown)
                    .with_message(format!("device {id} has no last command to toggle"))
                    .into());
            }
        };

        tracing::debug!(device_id = id, %last, %method, "Toggling device");
        if method == Method::TurnOn {
            self.hub.turn_on(id)?;
        } else {
            self.hub.turn_off(id)?;
        }
        Ok(method)
    }
}

impl<H: Hub> Drop for EventBridge<H> {
    fn drop(&mut self) {
        if self.lifecycle.get_mut().state == BridgeState::Running {
            tracing::debug!("Stopping event bridge on drop");
            if let Err(e) = self.stop() {
                tracing::warn!(error = %e, "Failed to stop event bridge on drop");
            }
        }
    }
}
