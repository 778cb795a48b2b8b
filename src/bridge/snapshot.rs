// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Point-in-time enumeration of the hub's devices.
//!
//! The hub's device API is index based and not transactional: a device can
//! disappear between reading the count and reading its attributes. Such a
//! device becomes a [`SnapshotEntry::Unavailable`] entry and the snapshot
//! carries on, so a snapshot always has exactly as many entries as the
//! count it started from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};
use crate::hub::Hub;
use crate::types::{DeviceId, DimLevel, LastCommand, Methods};

/// A device as captured by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Hub device id.
    pub id: DeviceId,
    /// Display name.
    pub name: String,
    /// Methods the device supports.
    pub supported_methods: Methods,
    /// Last command the hub sent to the device.
    pub last_command: LastCommand,
    /// Argument of the last command. Only kept for dim commands.
    pub last_value: String,
}

/// On/off state and level derived from a device's last command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DeviceState {
    /// Whether the device is on.
    pub on: bool,
    /// Level, 0-255.
    pub level: u8,
}

impl Device {
    /// Derives the device state from its last command.
    ///
    /// A dim command with an unreadable value counts as level 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use tellstick_bridge::bridge::{Device, DeviceState};
    /// use tellstick_bridge::types::{LastCommand, Method};
    ///
    /// let dimmer = Device {
    ///     id: 2,
    ///     name: "Dimmer".to_string(),
    ///     supported_methods: Method::TurnOn | Method::TurnOff | Method::Dim,
    ///     last_command: LastCommand::Dim,
    ///     last_value: "128".to_string(),
    /// };
    ///
    /// assert_eq!(dimmer.state(), DeviceState { on: true, level: 128 });
    /// ```
    #[must_use]
    pub fn state(&self) -> DeviceState {
        match self.last_command {
            LastCommand::TurnOn => DeviceState {
                on: true,
                level: u8::MAX,
            },
            LastCommand::Dim => {
                let level = self
                    .last_value
                    .parse::<DimLevel>()
                    .unwrap_or(DimLevel::OFF);
                DeviceState {
                    on: level.is_on(),
                    level: level.value(),
                }
            }
            LastCommand::TurnOff | LastCommand::None => DeviceState::default(),
        }
    }

    /// Returns the dim level of the last dim command.
    #[must_use]
    pub fn dim_level(&self) -> Option<DimLevel> {
        match self.last_command {
            LastCommand::Dim => self.last_value.parse().ok(),
            _ => None,
        }
    }
}

/// One position of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SnapshotEntry {
    /// The device was read successfully.
    Device(Device),
    /// The device vanished while the snapshot was being taken.
    Unavailable {
        /// Enumeration index of the device.
        index: usize,
        /// Device id, if the index could still be resolved.
        id: Option<DeviceId>,
    },
}

impl SnapshotEntry {
    /// Returns the device id, if known.
    #[must_use]
    pub const fn id(&self) -> Option<DeviceId> {
        match self {
            Self::Device(device) => Some(device.id),
            Self::Unavailable { id, .. } => *id,
        }
    }

    /// Returns the device, if it was read.
    #[must_use]
    pub const fn device(&self) -> Option<&Device> {
        match self {
            Self::Device(device) => Some(device),
            Self::Unavailable { .. } => None,
        }
    }

    /// Returns `true` for an unavailable entry.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Immutable, ordered view of the hub's devices.
///
/// Entries are in the hub's enumeration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    entries: Vec<SnapshotEntry>,
    captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub(crate) fn new(entries: Vec<SnapshotEntry>) -> Self {
        Self {
            entries,
            captured_at: Utc::now(),
        }
    }

    /// Returns all entries in enumeration order.
    #[must_use]
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Returns when the snapshot was taken.
    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Returns the number of entries, available or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the hub had no devices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a device by id.
    #[must_use]
    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.devices().find(|device| device.id == id)
    }

    /// Iterates over the devices that were read.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.entries.iter().filter_map(SnapshotEntry::device)
    }

    /// Iterates over the entries of devices that vanished.
    pub fn unavailable(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.entries.iter().filter(|entry| entry.is_unavailable())
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a SnapshotEntry;
    type IntoIter = std::slice::Iter<'a, SnapshotEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Enumerates the hub's devices.
///
/// Devices that cannot be read are recorded as unavailable. The snapshot
/// is never retried.
///
/// # Errors
///
/// Returns [`Error::Hub`](crate::Error::Hub) if the device count cannot be
/// read, or if the hub connection fails while enumerating.
///
/// # Examples
///
/// ```
/// use tellstick_bridge::bridge::snapshot;
/// use tellstick_bridge::hub::{Hub, MemoryDevice, MemoryHub};
/// use tellstick_bridge::types::Method;
///
/// let hub = MemoryHub::new();
/// hub.add_device(MemoryDevice::new(1, "Lamp", Method::TurnOn | Method::TurnOff));
/// hub.connect().unwrap();
///
/// let snapshot = snapshot(&hub).unwrap();
/// assert_eq!(snapshot.len(), 1);
/// assert_eq!(snapshot.get(1).unwrap().name, "Lamp");
/// ```
pub fn snapshot<H: Hub + ?Sized>(hub: &H) -> Result<Snapshot> {
    let count = hub.device_count()?;
    tracing::debug!(count, "Taking device snapshot");

    let mut entries = Vec::with_capacity(count);
    for index in 0..count {
        let id = match hub.device_id_at(index) {
            Ok(id) => id,
            Err(e) if e.is_connection() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(index, error = %e, "Device vanished during snapshot");
                entries.push(SnapshotEntry::Unavailable { index, id: None });
                continue;
            }
        };

        match read_device(hub, id) {
            Ok(device) => entries.push(SnapshotEntry::Device(device)),
            Err(e) if e.is_connection() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(index, device_id = id, error = %e, "Device unavailable during snapshot");
                entries.push(SnapshotEntry::Unavailable {
                    index,
                    id: Some(id),
                });
            }
        }
    }

    let snapshot = Snapshot::new(entries);
    tracing::debug!(
        count = snapshot.len(),
        unavailable = snapshot.unavailable().count(),
        "Device snapshot complete"
    );
    Ok(snapshot)
}

fn read_device<H: Hub + ?Sized>(hub: &H, id: DeviceId) -> std::result::Result<Device, HubError> {
    let name = hub.device_name(id)?;
    let supported_methods = hub.supported_methods(id, Methods::ALL)?;
    let last_command = LastCommand::from_mask(hub.last_command(id, Methods::LAST_COMMAND_MASK)?);
    let last_value = hub.last_value(id)?;

    Ok(Device {
        id,
        name,
        supported_methods,
        last_command,
        last_value: if last_command == LastCommand::Dim {
            last_value
        } else {
            String::new()
        },
    })
}
