// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dim level type for dimmable devices.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Dim level as reported and accepted by the hub (0-255).
///
/// 0 is off and 255 is full brightness. The hub transports the level as a
/// decimal string, see [`FromStr`].
///
/// # Examples
///
/// ```
/// use tellstick_bridge::types::DimLevel;
///
/// let level: DimLevel = "128".parse().unwrap();
/// assert_eq!(level.value(), 128);
/// assert!(level.is_on());
///
/// assert!("256".parse::<DimLevel>().is_err());
/// assert!(!DimLevel::OFF.is_on());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimLevel(u8);

impl DimLevel {
    /// Level 0.
    pub const OFF: Self = Self(0);

    /// Level 255.
    pub const FULL: Self = Self(u8::MAX);

    /// Creates a dim level.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Returns the raw level.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns `true` for any level above zero.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        self.0 > 0
    }

    /// Returns the level as a fraction between 0.0 and 1.0.
    #[must_use]
    pub fn as_fraction(&self) -> f32 {
        f32::from(self.0) / 255.0
    }
}

impl fmt::Display for DimLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for DimLevel {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl FromStr for DimLevel {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| ValueError::InvalidDimLevel(s.to_string()))?;
        u8::try_from(value).map(Self).map_err(|_| ValueError::OutOfRange {
            min: 0,
            max: 255,
            actual: value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_levels() {
        assert_eq!("0".parse::<DimLevel>().unwrap(), DimLevel::OFF);
        assert_eq!("255".parse::<DimLevel>().unwrap(), DimLevel::FULL);
        assert_eq!(" 42 ".parse::<DimLevel>().unwrap().value(), 42);
    }

    #[test]
    fn parse_out_of_range() {
        let err = "300".parse::<DimLevel>().unwrap_err();
        assert_eq!(
            err,
            ValueError::OutOfRange {
                min: 0,
                max: 255,
                actual: 300
            }
        );
        assert!("-1".parse::<DimLevel>().is_err());
    }

    #[test]
    fn parse_garbage() {
        let err = "bright".parse::<DimLevel>().unwrap_err();
        assert_eq!(err, ValueError::InvalidDimLevel("bright".to_string()));
        assert!("".parse::<DimLevel>().is_err());
    }

    #[test]
    fn fraction() {
        assert!((DimLevel::OFF.as_fraction() - 0.0).abs() < f32::EPSILON);
        assert!((DimLevel::FULL.as_fraction() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn ordering() {
        assert!(DimLevel::OFF < DimLevel::new(1));
        assert!(DimLevel::new(128) < DimLevel::FULL);
    }
}
