// Copyright 2026 VitalBridge Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Crate-wide error type.

use thiserror::Error;

use crate::device::DeviceId;
use crate::storage::{RegistryError, RemoteError};
use crate::transport::TransportError;

/// Errors surfaced by the device manager and the pairing workflow.
#[derive(Debug, Error)]
pub enum Error {
    /// No transport was supplied; device features are disabled.
    #[error("transport unavailable, device features disabled")]
    TransportUnavailable,

    /// A registry entry carries a type tag no known device kind matches.
    #[error("unknown device type tag \"{tag}\"")]
    UnknownDeviceType { tag: String },

    /// The transport could not produce a handle for a paired device.
    #[error("could not resolve peripheral {id}")]
    ResolutionFailed { id: DeviceId },

    /// The pairing handshake did not complete.
    #[error("pairing failed: {reason}")]
    PairingFailed { reason: String },

    /// Another pairing session is already open.
    #[error("another pairing session is already active")]
    PairingInProgress,

    /// A pairing session was requested while nothing had been discovered.
    #[error("no pairable devices discovered")]
    NoPairableDevices,

    /// A live handle already exists for this device id.
    #[error("peripheral {id} is already registered")]
    DuplicateRegistration { id: DeviceId },

    /// The paired-device registry rejected a read or write.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The remote measurement store rejected a payload.
    #[error("remote store error: {0}")]
    Remote(#[from] RemoteError),

    /// The transport reported a failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The device manager task has stopped.
    #[error("device manager is no longer running")]
    ManagerClosed,
}
