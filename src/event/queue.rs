// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounded outbound event queue.
//!
//! Hub callbacks push into the [`EventQueue`] from the hub's own dispatch
//! thread, so pushing never blocks: when the queue is full the event class's
//! [`OverflowPolicy`] decides which event is lost. The application drains
//! the queue through a single [`EventReceiver`], either asynchronously or
//! from a blocking thread.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::types::EventClass;

use super::Event;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Overflow warnings are logged for the first drop and then every this
/// many drops, per class.
const DROP_LOG_INTERVAL: u64 = 100;

/// What to do with an event when the queue is full.
///
/// No policy blocks the producer, which is the hub's dispatch thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the oldest queued event to make room for the new one.
    #[default]
    DropOldest,
    /// Discard the incoming event and keep the queue as it is.
    DropNewest,
}

/// Result of pushing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The event was queued without loss.
    Queued,
    /// The event was queued and the oldest event, of the given class, was
    /// evicted.
    EvictedOldest(EventClass),
    /// The queue was full and the event was discarded.
    Rejected,
    /// The queue is closed and the event was discarded.
    Closed,
}

#[derive(Debug, Default)]
struct QueueState {
    events: VecDeque<Event>,
    closed: bool,
}

/// Bounded multi-producer, single-consumer event queue.
#[derive(Debug)]
pub struct EventQueue {
    state: Mutex<QueueState>,
    available: Condvar,
    notify: Notify,
    capacity: usize,
    policies: [OverflowPolicy; 4],
    dropped: [AtomicU64; 4],
}

impl EventQueue {
    /// Creates a queue holding at most `capacity` events.
    ///
    /// `policies` is indexed in [`EventClass::ALL`] order. A capacity of
    /// zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize, policies: [OverflowPolicy; 4]) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                events: VecDeque::with_capacity(capacity.min(DEFAULT_QUEUE_CAPACITY)),
                closed: false,
            }),
            available: Condvar::new(),
            notify: Notify::new(),
            capacity,
            policies,
            dropped: Default::default(),
        }
    }

    /// Returns the capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the overflow policy for `class`.
    #[must_use]
    pub fn policy(&self, class: EventClass) -> OverflowPolicy {
        self.policies[class.index()]
    }

    /// Pushes an event without blocking.
    pub fn push(&self, event: Event) -> PushOutcome {
        let class = event.class();
        let outcome = {
            let mut state = self.state.lock();
            if state.closed {
                return PushOutcome::Closed;
            }
            if state.events.len() < self.capacity {
                state.events.push_back(event);
                PushOutcome::Queued
            } else {
                match self.policy(class) {
                    OverflowPolicy::DropNewest => PushOutcome::Rejected,
                    OverflowPolicy::DropOldest => {
                        let evicted = state.events.pop_front().map(|e| e.class());
                        state.events.push_back(event);
                        evicted.map_or(PushOutcome::Queued, PushOutcome::EvictedOldest)
                    }
                }
            }
        };

        match outcome {
            PushOutcome::Queued | PushOutcome::EvictedOldest(_) => {
                if let PushOutcome::EvictedOldest(lost) = outcome {
                    self.record_drop(lost);
                }
                self.available.notify_one();
                self.notify.notify_one();
            }
            PushOutcome::Rejected => self.record_drop(class),
            PushOutcome::Closed => {}
        }
        outcome
    }

    fn record_drop(&self, class: EventClass) {
        let total = self.dropped[class.index()].fetch_add(1, Ordering::Relaxed) + 1;
        if total == 1 || total % DROP_LOG_INTERVAL == 0 {
            tracing::warn!(
                class = %class,
                dropped = total,
                capacity = self.capacity,
                "Event queue full, dropping events"
            );
        }
    }

    /// Returns how many events of `class` were lost to overflow.
    #[must_use]
    pub fn dropped(&self, class: EventClass) -> u64 {
        self.dropped[class.index()].load(Ordering::Relaxed)
    }

    /// Closes the queue.
    ///
    /// Later pushes are discarded. Events already queued can still be
    /// received, after which receivers observe the end of the stream.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
        self.notify.notify_one();
    }

    /// Discards every queued event and returns how many were discarded.
    ///
    /// Discarded events are not counted as overflow drops.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let discarded = state.events.len();
        state.events.clear();
        discarded
    }

    /// Returns `true` once [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns the number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Returns `true` if no event is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pop(&self) -> Poll {
        let mut state = self.state.lock();
        match state.events.pop_front() {
            Some(event) => Poll::Ready(event),
            None if state.closed => Poll::Closed,
            None => Poll::Empty,
        }
    }
}

enum Poll {
    Ready(Event),
    Empty,
    Closed,
}

/// Consuming side of the event queue.
///
/// Ordering is the order in which the hub delivered the events. There is at
/// most one receiver per bridge.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tellstick_bridge::event::{Event, EventQueue, EventReceiver, OverflowPolicy};
///
/// let queue = Arc::new(EventQueue::new(8, [OverflowPolicy::DropOldest; 4]));
/// let mut rx = EventReceiver::new(Arc::clone(&queue));
///
/// queue.push(Event::RawDevice { raw_data: "class:command;".into(), controller_id: 1 });
/// assert!(rx.try_recv().is_some());
/// assert!(rx.try_recv().is_none());
/// ```
#[derive(Debug)]
pub struct EventReceiver {
    queue: Arc<EventQueue>,
}

impl EventReceiver {
    /// Creates a receiver draining `queue`.
    #[must_use]
    pub fn new(queue: Arc<EventQueue>) -> Self {
        Self { queue }
    }

    /// Receives the next event.
    ///
    /// Returns `None` once the queue is closed and empty.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.queue.pop() {
                Poll::Ready(event) => return Some(event),
                Poll::Closed => return None,
                Poll::Empty => self.queue.notify.notified().await,
            }
        }
    }

    /// Receives an event if one is queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        match self.queue.pop() {
            Poll::Ready(event) => Some(event),
            Poll::Empty | Poll::Closed => None,
        }
    }

    /// Blocks the current thread until an event arrives.
    ///
    /// Returns `None` once the queue is closed and empty. Must not be
    /// called from within an async runtime.
    pub fn blocking_recv(&mut self) -> Option<Event> {
        let mut state = self.queue.state.lock();
        loop {
            if let Some(event) = state.events.pop_front() {
                return Some(event);
            }
            if state.closed {
                return None;
            }
            self.queue.available.wait(&mut state);
        }
    }

    /// Blocks until an event arrives or `timeout` elapses.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<Event> {
        let mut state = self.queue.state.lock();
        loop {
            if let Some(event) = state.events.pop_front() {
                return Some(event);
            }
            if state.closed {
                return None;
            }
            if self
                .queue
                .available
                .wait_for(&mut state, timeout)
                .timed_out()
            {
                return state.events.pop_front();
            }
        }
    }

    /// Removes and returns every queued event.
    pub fn drain(&mut self) -> Vec<Event> {
        self.queue.state.lock().events.drain(..).collect()
    }

    /// Returns the number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if no event is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns `true` once the producing side has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }
}

/// Blocking iteration; ends when the queue is closed and drained.
impl Iterator for EventReceiver {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        self.blocking_recv()
    }
}
