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

//! Live peripheral state owned by the device manager.

use tracing::debug;

use crate::device::{DeviceId, DeviceKind, ManufacturerInfo};
use crate::measurement::DeviceSnapshot;
use crate::transport::DiscoveredPeripheral;

/// Connection state of a peripheral link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        }
    }
}

/// A single observed state change, with the state it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

impl StateTransition {
    /// The transport repeated the state we already had.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    /// The link just came up.
    pub fn entered_connected(&self) -> bool {
        self.to == ConnectionState::Connected && self.from != ConnectionState::Connected
    }

    /// An established link dropped without a deliberate disconnect.
    /// A failed connect attempt (`Connecting` to `Disconnected`) is not
    /// a link loss.
    pub fn lost_link(&self) -> bool {
        self.from == ConnectionState::Connected && self.to == ConnectionState::Disconnected
    }
}

/// A peripheral the manager currently holds a handle for, either in the
/// discovered set awaiting pairing or in the live table after it.
///
/// Owned exclusively by the manager task; everything handed out of it
/// is a copy.
#[derive(Debug)]
pub struct Peripheral {
    id: DeviceId,
    kind: DeviceKind,
    name: String,
    model: Option<String>,
    manufacturer: Option<String>,
    state: ConnectionState,
    advertisement: Option<ManufacturerInfo>,
    battery_percent: Option<u8>,
}

impl Peripheral {
    pub(crate) fn from_discovered(discovered: DiscoveredPeripheral) -> Self {
        let advertisement = discovered
            .advertisement
            .as_deref()
            .and_then(ManufacturerInfo::decode);
        Self {
            id: discovered.id,
            kind: discovered.kind,
            name: discovered.name,
            model: discovered.model,
            manufacturer: discovered.manufacturer,
            state: ConnectionState::Disconnected,
            advertisement,
            battery_percent: None,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn battery_percent(&self) -> Option<u8> {
        self.battery_percent
    }

    pub fn advertisement(&self) -> Option<&ManufacturerInfo> {
        self.advertisement.as_ref()
    }

    /// Latest advertisement says the device is accepting pairing.
    pub fn in_pairing_mode(&self) -> bool {
        self.advertisement
            .as_ref()
            .is_some_and(|info| info.pairing_mode)
    }

    /// Apply a transport-reported state and return the transition.
    pub(crate) fn apply_state(&mut self, new: ConnectionState) -> StateTransition {
        let transition = StateTransition {
            from: self.state,
            to: new,
        };
        self.state = new;
        transition
    }

    /// Replace the cached advertisement. Malformed payloads keep the
    /// previous one.
    pub(crate) fn update_advertisement(&mut self, payload: &[u8]) {
        match ManufacturerInfo::decode(payload) {
            Some(info) => self.advertisement = Some(info),
            None => debug!("ignoring malformed advertisement from {}", self.id),
        }
    }

    pub(crate) fn set_battery(&mut self, percent: u8) {
        self.battery_percent = Some(percent);
    }

    /// Descriptive copy of this peripheral, detached from its live state.
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            name: self.name.clone(),
            model: self.model.clone(),
            manufacturer: self.manufacturer.clone(),
            kind: self.kind,
        }
    }
}
