// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Numeric codes carried by hub callbacks.
//!
//! Every type here keeps an `Other` variant: codes the crate does not know
//! are passed through verbatim instead of being coerced into a known value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What happened to a device in a device-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEvent {
    /// A device was added.
    Added,
    /// A device's configuration changed.
    Changed,
    /// A device was removed.
    Removed,
    /// A device's state changed.
    StateChanged,
    /// A code this crate does not know.
    Other(i32),
}

impl ChangeEvent {
    /// Maps a hub code to a change event.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Added,
            2 => Self::Changed,
            3 => Self::Removed,
            4 => Self::StateChanged,
            other => Self::Other(other),
        }
    }

    /// Returns the hub code.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Added => 1,
            Self::Changed => 2,
            Self::Removed => 3,
            Self::StateChanged => 4,
            Self::Other(code) => *code,
        }
    }

    /// Returns `true` if the device list itself changed (added or removed).
    ///
    /// Applications typically take a new snapshot after such an event.
    #[must_use]
    pub const fn alters_device_list(&self) -> bool {
        matches!(self, Self::Added | Self::Removed)
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => f.write_str("added"),
            Self::Changed => f.write_str("changed"),
            Self::Removed => f.write_str("removed"),
            Self::StateChanged => f.write_str("state changed"),
            Self::Other(code) => write!(f, "unknown ({code})"),
        }
    }
}

/// Which attribute changed in a device-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// No specific attribute (used with added/removed).
    None,
    /// The device name.
    Name,
    /// The device protocol.
    Protocol,
    /// The device model.
    Model,
    /// The supported methods.
    Method,
    /// The device availability.
    Available,
    /// The controller firmware.
    Firmware,
    /// A code this crate does not know.
    Other(i32),
}

impl ChangeType {
    /// Maps a hub code to a change type.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::None,
            1 => Self::Name,
            2 => Self::Protocol,
            3 => Self::Model,
            4 => Self::Method,
            5 => Self::Available,
            6 => Self::Firmware,
            other => Self::Other(other),
        }
    }

    /// Returns the hub code.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::None => 0,
            Self::Name => 1,
            Self::Protocol => 2,
            Self::Model => 3,
            Self::Method => 4,
            Self::Available => 5,
            Self::Firmware => 6,
            Self::Other(code) => *code,
        }
    }
}

/// The quantity a sensor reading measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorDataType {
    /// Temperature in degrees Celsius.
    Temperature,
    /// Relative humidity in percent.
    Humidity,
    /// Rain rate in mm/h.
    RainRate,
    /// Accumulated rain in mm.
    RainTotal,
    /// Wind direction in degrees.
    WindDirection,
    /// Average wind speed in m/s.
    WindAverage,
    /// Wind gust speed in m/s.
    WindGust,
    /// A code this crate does not know.
    Other(i32),
}

impl SensorDataType {
    /// Maps a hub code to a data type.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Temperature,
            2 => Self::Humidity,
            4 => Self::RainRate,
            8 => Self::RainTotal,
            16 => Self::WindDirection,
            32 => Self::WindAverage,
            64 => Self::WindGust,
            other => Self::Other(other),
        }
    }

    /// Returns the hub code.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::Temperature => 1,
            Self::Humidity => 2,
            Self::RainRate => 4,
            Self::RainTotal => 8,
            Self::WindDirection => 16,
            Self::WindAverage => 32,
            Self::WindGust => 64,
            Self::Other(code) => *code,
        }
    }

    /// Returns the unit the hub reports values in, if known.
    #[must_use]
    pub const fn unit(&self) -> Option<&'static str> {
        match self {
            Self::Temperature => Some("°C"),
            Self::Humidity => Some("%"),
            Self::RainRate => Some("mm/h"),
            Self::RainTotal => Some("mm"),
            Self::WindDirection => Some("°"),
            Self::WindAverage | Self::WindGust => Some("m/s"),
            Self::Other(_) => None,
        }
    }
}
