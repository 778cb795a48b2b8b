// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `tellstick_bridge` - Typed events and device snapshots for Tellstick hubs.
//!
//! A Tellstick hub (telldus-core) reports what happens through four
//! callback classes, invoked on a thread the hub owns: sensor readings,
//! device commands, device-list changes and raw protocol frames. This
//! library turns those callbacks into a bounded, typed [`Event`] stream and
//! reads the hub's device list into immutable [`Snapshot`]s.
//!
//! # Overview
//!
//! - [`EventBridge`] - Owns the hub connection and callback registrations
//! - [`event`] - The [`Event`] type and the bounded event queue
//! - [`bridge::snapshot()`] - Device enumeration that tolerates devices
//!   vanishing mid-scan
//! - [`hub`] - The [`Hub`](hub::Hub) interface and an in-process
//!   [`MemoryHub`](hub::MemoryHub)
//! - [`monitor`] - Alerts for sensors that stopped reporting
//! - [`readings`] - Latest value of every sensor
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use tellstick_bridge::{BridgeConfig, Event, EventBridge};
//! use tellstick_bridge::hub::{MemoryDevice, MemoryHub};
//! use tellstick_bridge::types::{LastCommand, Method};
//!
//! # fn main() -> tellstick_bridge::Result<()> {
//! let hub = Arc::new(MemoryHub::with_devices([
//!     MemoryDevice::new(1, "Lamp", Method::TurnOn | Method::TurnOff)
//!         .with_last_command(LastCommand::TurnOn, ""),
//! ]));
//!
//! let bridge = EventBridge::new(Arc::clone(&hub), BridgeConfig::default());
//! let mut events = bridge.events()?;
//! bridge.start()?;
//!
//! for device in bridge.snapshot()?.devices() {
//!     println!("{} {} on={}", device.id, device.name, device.state().on);
//! }
//!
//! bridge.turn_off(1)?;
//! if let Some(Event::Device { device_id, method, .. }) = events.try_recv() {
//!     println!("device {device_id} received {method}");
//! }
//!
//! bridge.stop()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Threading
//!
//! Callbacks never block: when the queue is full, the per-class
//! [`OverflowPolicy`](event::OverflowPolicy) discards an event instead.
//! Snapshots run on the caller's thread and share nothing with callback
//! delivery, so an event may name a device the latest snapshot does not
//! contain yet.

pub mod bridge;
pub mod error;
pub mod event;
pub mod hub;
pub mod monitor;
pub mod readings;
pub mod types;

pub use bridge::{BridgeConfig, BridgeState, Device, EventBridge, Snapshot, SnapshotEntry};
pub use error::{Error, HubError, HubErrorKind, Result, ValueError};
pub use event::{Event, EventReceiver};
