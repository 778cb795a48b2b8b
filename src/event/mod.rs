// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed hub events and the queue that carries them.
//!
//! Every hub callback is translated into an [`Event`] and pushed into a
//! bounded [`EventQueue`]. The application consumes the queue through the
//! [`EventReceiver`] handed out by the bridge.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use tellstick_bridge::event::{Event, EventQueue, EventReceiver, OverflowPolicy};
//! use tellstick_bridge::types::Method;
//!
//! let queue = Arc::new(EventQueue::new(16, [OverflowPolicy::DropOldest; 4]));
//! let mut rx = EventReceiver::new(Arc::clone(&queue));
//!
//! queue.push(Event::Device {
//!     device_id: 1,
//!     method: Method::TurnOn.into(),
//!     data: String::new(),
//! });
//!
//! assert_eq!(rx.try_recv().and_then(|e| e.device_id()), Some(1));
//! ```

mod hub_event;
mod queue;
mod raw_frame;

pub use hub_event::Event;
pub use queue::{DEFAULT_QUEUE_CAPACITY, EventQueue, EventReceiver, OverflowPolicy, PushOutcome};
pub use raw_frame::RawDeviceFrame;
