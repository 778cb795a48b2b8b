// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bookkeeping of live callback registrations.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hub::CallbackToken;
use crate::types::EventClass;

/// A live callback registration: the class it covers and the hub's token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackHandle {
    class: EventClass,
    token: CallbackToken,
}

impl CallbackHandle {
    /// Creates a handle.
    #[must_use]
    pub const fn new(class: EventClass, token: CallbackToken) -> Self {
        Self { class, token }
    }

    /// Returns the event class.
    #[must_use]
    pub const fn class(&self) -> EventClass {
        self.class
    }

    /// Returns the hub token.
    #[must_use]
    pub const fn token(&self) -> CallbackToken {
        self.token
    }
}

impl fmt::Display for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class, self.token)
    }
}

/// Table of live callback registrations, at most one per event class.
///
/// The table never talks to the hub. It only records what was registered so
/// that teardown knows what to unregister.
///
/// # Thread Safety
///
/// All methods take `&self`; the table is guarded by a
/// `parking_lot::Mutex`.
///
/// # Examples
///
/// ```
/// use tellstick_bridge::bridge::HandleTable;
/// use tellstick_bridge::hub::CallbackToken;
/// use tellstick_bridge::types::EventClass;
///
/// let table = HandleTable::new();
/// table.put(EventClass::Device, CallbackToken::new(4)).unwrap();
///
/// assert!(table.put(EventClass::Device, CallbackToken::new(5)).is_err());
/// assert_eq!(table.take(EventClass::Device).unwrap().token().value(), 4);
/// assert!(table.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct HandleTable {
    slots: Mutex<[Option<CallbackToken>; 4]>,
}

impl HandleTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a registration for `class`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRegistration`] if `class` already has a
    /// live handle. The table is left unchanged.
    pub fn put(&self, class: EventClass, token: CallbackToken) -> Result<()> {
        let mut slots = self.slots.lock();
        let slot = &mut slots[class.index()];
        if slot.is_some() {
            return Err(Error::DuplicateRegistration { class });
        }
        *slot = Some(token);
        Ok(())
    }

    /// Removes and returns the registration for `class`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRegistered`] if `class` has no live handle.
    pub fn take(&self, class: EventClass) -> Result<CallbackHandle> {
        self.slots.lock()[class.index()]
            .take()
            .map(|token| CallbackHandle::new(class, token))
            .ok_or(Error::NotRegistered { class })
    }

    /// Returns the live handles in registration order.
    #[must_use]
    pub fn all(&self) -> Vec<CallbackHandle> {
        let slots = self.slots.lock();
        EventClass::ALL
            .iter()
            .filter_map(|&class| slots[class.index()].map(|token| CallbackHandle::new(class, token)))
            .collect()
    }

    /// Removes and returns every live handle, in registration order.
    pub fn drain(&self) -> Vec<CallbackHandle> {
        let mut slots = self.slots.lock();
        EventClass::ALL
            .iter()
            .filter_map(|&class| {
                slots[class.index()]
                    .take()
                    .map(|token| CallbackHandle::new(class, token))
            })
            .collect()
    }

    /// Returns `true` if `class` has a live handle.
    #[must_use]
    pub fn is_registered(&self, class: EventClass) -> bool {
        self.slots.lock()[class.index()].is_some()
    }

    /// Returns the number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns `true` if no handle is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
