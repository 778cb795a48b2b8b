// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device command methods and method bitmasks.
//!
//! The hub describes both "which commands does this device accept" and
//! "which command was sent last" as bitmasks over a fixed command set. The
//! bit values are the ones used by telldus-core.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single device command.
///
/// # Examples
///
/// ```
/// use tellstick_bridge::types::Method;
///
/// assert_eq!(Method::Dim.bit(), 16);
/// assert_eq!(Method::TurnOn.feature_name(), "on");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Turn the device on.
    TurnOn,
    /// Turn the device off.
    TurnOff,
    /// Ring a bell.
    Bell,
    /// Toggle the device.
    Toggle,
    /// Set a dim level.
    Dim,
    /// Send a learn signal.
    Learn,
    /// Execute a scene.
    Execute,
    /// Move blinds up.
    Up,
    /// Move blinds down.
    Down,
    /// Stop blinds.
    Stop,
}

impl Method {
    /// Every method in bit order.
    pub const ALL: [Self; 10] = [
        Self::TurnOn,
        Self::TurnOff,
        Self::Bell,
        Self::Toggle,
        Self::Dim,
        Self::Learn,
        Self::Execute,
        Self::Up,
        Self::Down,
        Self::Stop,
    ];

    /// Returns the bit this method occupies in a method mask.
    #[must_use]
    pub const fn bit(&self) -> u32 {
        match self {
            Self::TurnOn => 1,
            Self::TurnOff => 2,
            Self::Bell => 4,
            Self::Toggle => 8,
            Self::Dim => 16,
            Self::Learn => 32,
            Self::Execute => 64,
            Self::Up => 128,
            Self::Down => 256,
            Self::Stop => 512,
        }
    }

    /// Returns the feature name published for devices supporting this method.
    #[must_use]
    pub const fn feature_name(&self) -> &'static str {
        match self {
            Self::TurnOn => "on",
            Self::TurnOff => "off",
            Self::Bell => "bell",
            Self::Toggle => "toggle",
            Self::Dim => "dim",
            Self::Learn => "learn",
            Self::Execute => "execute",
            Self::Up => "up",
            Self::Down => "down",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.feature_name())
    }
}

/// A bitmask over [`Method`] values.
///
/// Bits outside the known command set are preserved so that values coming
/// from the hub are never silently altered.
///
/// # Examples
///
/// ```
/// use tellstick_bridge::types::{Method, Methods};
///
/// let mask = Method::TurnOn | Method::Dim;
/// assert!(mask.contains(Method::Dim));
/// assert!(!mask.contains(Method::Bell));
/// assert_eq!(mask.bits(), 17);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Methods(u32);

impl Methods {
    /// The empty mask.
    pub const NONE: Self = Self(0);

    /// The full mask used when asking the hub which methods a device
    /// supports.
    ///
    /// Asking with a narrower mask would under-report capabilities. `Learn`
    /// is not a capability and is left out.
    pub const ALL: Self = Self(1 | 2 | 4 | 8 | 16 | 64 | 128 | 256 | 512);

    /// The mask used when asking the hub for the last sent command.
    ///
    /// The hub only tracks the last command for these three methods.
    pub const LAST_COMMAND_MASK: Self = Self(1 | 2 | 16);

    /// Creates a mask from raw bits, keeping unknown bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns `true` if `method` is set.
    #[must_use]
    pub const fn contains(&self, method: Method) -> bool {
        self.0 & method.bit() != 0
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns the bits that do not correspond to a known method.
    #[must_use]
    pub const fn unknown_bits(&self) -> u32 {
        let mut known = 0;
        let mut i = 0;
        while i < Method::ALL.len() {
            known |= Method::ALL[i].bit();
            i += 1;
        }
        self.0 & !known
    }

    /// Returns the intersection of two masks.
    #[must_use]
    pub const fn intersection(&self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Iterates over the known methods present in the mask, in bit order.
    pub fn iter(&self) -> impl Iterator<Item = Method> {
        let mask = *self;
        Method::ALL.into_iter().filter(move |m| mask.contains(*m))
    }

    /// Returns the feature names of all known methods in the mask.
    #[must_use]
    pub fn feature_names(&self) -> Vec<&'static str> {
        self.iter().map(|m| m.feature_name()).collect()
    }
}

impl From<Method> for Methods {
    fn from(method: Method) -> Self {
        Self(method.bit())
    }
}

impl FromIterator<Method> for Methods {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, |acc, m| acc | m)
    }
}

impl std::ops::BitOr for Method {
    type Output = Methods;

    fn bitor(self, rhs: Self) -> Methods {
        Methods(self.bit() | rhs.bit())
    }
}

impl std::ops::BitOr for Methods {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOr<Method> for Methods {
    type Output = Self;

    fn bitor(self, rhs: Method) -> Self {
        Self(self.0 | rhs.bit())
    }
}

impl fmt::Display for Methods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.feature_names();
        if names.is_empty() && self.unknown_bits() == 0 {
            return f.write_str("none");
        }
        write!(f, "{}", names.join("|"))?;
        if self.unknown_bits() != 0 {
            if !names.is_empty() {
                f.write_str("|")?;
            }
            write!(f, "{:#x}", self.unknown_bits())?;
        }
        Ok(())
    }
}

/// The last command the hub sent to a device.
///
/// Only on, off and dim are tracked by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastCommand {
    /// No tracked command has been sent.
    #[default]
    None,
    /// The device was last turned on.
    TurnOn,
    /// The device was last turned off.
    TurnOff,
    /// The device was last dimmed.
    Dim,
}

impl LastCommand {
    /// Resolves the last command from the mask returned by the hub.
    ///
    /// The hub answers with a single bit, but should several bits be set
    /// the precedence is Dim, then `TurnOn`, then `TurnOff`.
    #[must_use]
    pub const fn from_mask(mask: Methods) -> Self {
        if mask.contains(Method::Dim) {
            Self::Dim
        } else if mask.contains(Method::TurnOn) {
            Self::TurnOn
        } else if mask.contains(Method::TurnOff) {
            Self::TurnOff
        } else {
            Self::None
        }
    }

    /// Returns the matching method, if any.
    #[must_use]
    pub const fn method(&self) -> Option<Method> {
        match self {
            Self::None => None,
            Self::TurnOn => Some(Method::TurnOn),
            Self::TurnOff => Some(Method::TurnOff),
            Self::Dim => Some(Method::Dim),
        }
    }
}

impl fmt::Display for LastCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.method() {
            Some(method) => method.fmt(f),
            None => f.write_str("none"),
        }
    }
}
