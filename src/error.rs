// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the bridge.
//!
//! This module provides the error hierarchy used across the crate: lifecycle
//! misuse, callback registration conflicts, hub failures and value
//! validation.
//!
//! A device that disappears while a snapshot is being taken is *not* an
//! error. It is reported as a [`SnapshotEntry::Unavailable`] value inside the
//! snapshot.
//!
//! [`SnapshotEntry::Unavailable`]: crate::bridge::SnapshotEntry::Unavailable

use std::fmt;

use thiserror::Error;

use crate::bridge::BridgeState;
use crate::types::EventClass;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// A callback is already registered for this event class.
    ///
    /// The hub only supports one handler per class, so this is a programming
    /// error and fails [`EventBridge::start`](crate::EventBridge::start).
    #[error("a callback is already registered for {class} events")]
    DuplicateRegistration {
        /// The event class that was registered twice.
        class: EventClass,
    },

    /// No callback is registered for this event class.
    ///
    /// Teardown treats this as already clean.
    #[error("no callback registered for {class} events")]
    NotRegistered {
        /// The event class that had no live handle.
        class: EventClass,
    },

    /// The bridge has already been started.
    #[error("bridge already started")]
    AlreadyStarted,

    /// The operation is not valid in the bridge's current state.
    #[error("cannot {operation} while bridge is {state}")]
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the bridge was in.
        state: BridgeState,
    },

    /// The hub reported a failure.
    #[error("hub error: {0}")]
    Hub(#[from] HubError),

    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
        /// The actual value that was provided.
        actual: i64,
    },

    /// A dim level string could not be parsed.
    #[error("invalid dim level: {0}")]
    InvalidDimLevel(String),

    /// A queue capacity of zero was requested.
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,

    /// A zero-length check interval was requested.
    #[error("check interval must be greater than zero")]
    ZeroInterval,
}

/// Result codes reported by the hub.
///
/// The numeric values are the ones the telldus-core library returns from
/// every call. `0` means success and therefore has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HubErrorKind {
    /// The controller was not found.
    NotFound,
    /// The caller lacks permission to access the controller.
    PermissionDenied,
    /// The device id is unknown to the hub.
    DeviceNotFound,
    /// The device does not support the requested method.
    MethodNotSupported,
    /// Sending to the controller failed.
    Communication,
    /// The hub service could not be reached.
    ConnectingService,
    /// The hub answered with something unexpected.
    UnknownResponse,
    /// Syntax error in a request.
    Syntax,
    /// The connection to the hub service broke.
    BrokenPipe,
    /// Communication with the hub service failed.
    CommunicatingService,
    /// The hub's configuration file has a syntax error.
    ConfigSyntax,
    /// Any other failure.
    Unknown,
}

impl HubErrorKind {
    /// Maps a hub result code to an error kind.
    ///
    /// Returns `None` for `0` (success). Unrecognized codes map to
    /// [`HubErrorKind::Unknown`].
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => None,
            -1 => Some(Self::NotFound),
            -2 => Some(Self::PermissionDenied),
            -3 => Some(Self::DeviceNotFound),
            -4 => Some(Self::MethodNotSupported),
            -5 => Some(Self::Communication),
            -6 => Some(Self::ConnectingService),
            -7 => Some(Self::UnknownResponse),
            -8 => Some(Self::Syntax),
            -9 => Some(Self::BrokenPipe),
            -10 => Some(Self::CommunicatingService),
            -11 => Some(Self::ConfigSyntax),
            _ => Some(Self::Unknown),
        }
    }

    /// Returns the hub result code for this kind.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::NotFound => -1,
            Self::PermissionDenied => -2,
            Self::DeviceNotFound => -3,
            Self::MethodNotSupported => -4,
            Self::Communication => -5,
            Self::ConnectingService => -6,
            Self::UnknownResponse => -7,
            Self::Syntax => -8,
            Self::BrokenPipe => -9,
            Self::CommunicatingService => -10,
            Self::ConfigSyntax => -11,
            Self::Unknown => -99,
        }
    }

    /// Returns the human readable description the hub uses for this code.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "TellStick not found",
            Self::PermissionDenied => "Permission denied",
            Self::DeviceNotFound => "Device not found",
            Self::MethodNotSupported => "The method you tried to use is not supported by the device",
            Self::Communication => "An error occurred while communicating with TellStick",
            Self::ConnectingService => "Could not connect to the Telldus Service",
            Self::UnknownResponse => "Received an unknown response",
            Self::Syntax => "Syntax error",
            Self::BrokenPipe => "Broken pipe",
            Self::CommunicatingService => "An error occurred while communicating with the Telldus Service",
            Self::ConfigSyntax => "Syntax error in the configuration file",
            Self::Unknown => "Unknown error",
        }
    }

    /// Returns `true` if this kind means the hub connection itself failed.
    ///
    /// Connection failures abort a snapshot instead of being recorded as a
    /// single unavailable device.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::ConnectingService | Self::BrokenPipe | Self::CommunicatingService
        )
    }
}

impl fmt::Display for HubErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A failure reported by the hub.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} ({code}){detail}", code = .kind.code(), detail = DetailSuffix(.message.as_deref()))]
pub struct HubError {
    /// What went wrong.
    pub kind: HubErrorKind,
    /// Optional context added by the caller.
    pub message: Option<String>,
}

impl HubError {
    /// Creates a hub error without extra context.
    #[must_use]
    pub const fn new(kind: HubErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Creates a hub error from a raw result code.
    ///
    /// Returns `None` when `code` is `0` (success).
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        HubErrorKind::from_code(code).map(Self::new)
    }

    /// Attaches context to the error.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns `true` if the hub connection itself failed.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        self.kind.is_connection()
    }
}

impl From<HubErrorKind> for HubError {
    fn from(kind: HubErrorKind) -> Self {
        Self::new(kind)
    }
}

struct DetailSuffix<'a>(Option<&'a str>);

impl fmt::Display for DetailSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(message) => write!(f, ": {message}"),
            None => Ok(()),
        }
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
