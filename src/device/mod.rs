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

//! Device model: identity, kinds, advertisement data and live peripherals.

mod advertisement;
mod kind;
mod peripheral;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use advertisement::{ManufacturerInfo, UserSlot};
pub use kind::{Capabilities, DeviceKind};
pub use peripheral::{ConnectionState, Peripheral, StateTransition};

/// Opaque stable identifier of a peripheral.
///
/// Assigned by the transport and stable across sessions for the same
/// physical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Uuid);

impl DeviceId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for DeviceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_unique() {
        assert_ne!(DeviceId::new(), DeviceId::new());
    }

    #[test]
    fn test_device_id_display_roundtrip() {
        let id = DeviceId::new();
        let text = id.to_string();
        let parsed: Uuid = text.parse().unwrap();
        assert_eq!(DeviceId::from_uuid(parsed), id);
    }

    #[test]
    fn test_device_id_serde_transparent() {
        let id = DeviceId::from_uuid(Uuid::from_u128(0x1234));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}
