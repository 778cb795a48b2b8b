// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key/value view over raw protocol frames.
//!
//! Raw frames arrive as `key:value;key:value;` strings. The bridge passes
//! them through untouched; this view is a convenience for applications and
//! never rejects input. Segments without a `:` are kept with an empty
//! value.

/// Parsed view of a raw frame payload.
///
/// # Examples
///
/// ```
/// use tellstick_bridge::event::RawDeviceFrame;
///
/// let frame = RawDeviceFrame::parse("class:command;protocol:arctech;house:A;unit:1;method:turnon;");
/// assert_eq!(frame.get("protocol"), Some("arctech"));
/// assert_eq!(frame.get("method"), Some("turnon"));
/// assert_eq!(frame.len(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawDeviceFrame {
    fields: Vec<(String, String)>,
}

impl RawDeviceFrame {
    /// Splits a raw payload into its fields, in order.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let fields = raw
            .split(';')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once(':') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (segment.to_string(), String::new()),
            })
            .collect();
        Self { fields }
    }

    /// Returns the first value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns all fields in payload order.
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the payload had no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
