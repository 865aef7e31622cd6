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

//! Supported device kinds and their capabilities.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gatt::{self, uuids, DecodeError};
use crate::measurement::Measurement;

/// What a device kind can do beyond being reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Reports a battery level characteristic.
    pub battery_powered: bool,
    /// Accepts wall-clock writes to its Current Time characteristic.
    pub time_syncable: bool,
    /// Emits measurement notifications.
    pub measurement_source: bool,
}

/// The device kinds this crate knows how to pair and decode.
///
/// Adding a kind means extending every `match` below; the compiler
/// points at each site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    WeightScale,
    BloodPressureCuff,
}

impl DeviceKind {
    /// Stable type tag used in the paired-device registry.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::WeightScale => "weight-scale",
            Self::BloodPressureCuff => "blood-pressure-cuff",
        }
    }

    /// Parse a registry type tag. Unknown tags return `None`; the
    /// caller decides whether that is fatal.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "weight-scale" => Some(Self::WeightScale),
            "blood-pressure-cuff" => Some(Self::BloodPressureCuff),
            _ => None,
        }
    }

    /// Human-readable name for logs and device lists.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::WeightScale => "Weight Scale",
            Self::BloodPressureCuff => "Blood Pressure Cuff",
        }
    }

    /// Asset name of the device illustration.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::WeightScale => "Omron-SC-150",
            Self::BloodPressureCuff => "Omron-BP5250",
        }
    }

    /// Model string of the reference hardware for this kind.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::WeightScale => "SC-150",
            Self::BloodPressureCuff => "BP5250",
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            // The reference scale exposes no battery service and keeps
            // no clock.
            Self::WeightScale => Capabilities {
                battery_powered: false,
                time_syncable: false,
                measurement_source: true,
            },
            Self::BloodPressureCuff => Capabilities {
                battery_powered: true,
                time_syncable: true,
                measurement_source: true,
            },
        }
    }

    /// Primary GATT service advertising this kind.
    pub fn measurement_service(&self) -> Uuid {
        match self {
            Self::WeightScale => uuids::WEIGHT_SCALE_SERVICE,
            Self::BloodPressureCuff => uuids::BLOOD_PRESSURE_SERVICE,
        }
    }

    /// Characteristic that carries this kind's measurements.
    pub fn measurement_characteristic(&self) -> Uuid {
        match self {
            Self::WeightScale => uuids::WEIGHT_MEASUREMENT,
            Self::BloodPressureCuff => uuids::BLOOD_PRESSURE_MEASUREMENT,
        }
    }

    /// Decode a measurement payload according to this kind's
    /// characteristic layout.
    pub fn decode_measurement(&self, payload: &[u8]) -> Result<Measurement, DecodeError> {
        match self {
            Self::WeightScale => gatt::weight::decode(payload).map(Measurement::Weight),
            Self::BloodPressureCuff => {
                gatt::blood_pressure::decode(payload).map(Measurement::BloodPressure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for kind in [DeviceKind::WeightScale, DeviceKind::BloodPressureCuff] {
            assert_eq!(DeviceKind::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(DeviceKind::from_tag("thermometer"), None);
        assert_eq!(DeviceKind::from_tag(""), None);
    }

    #[test]
    fn test_capabilities_differ() {
        let scale = DeviceKind::WeightScale.capabilities();
        assert!(!scale.battery_powered);
        assert!(!scale.time_syncable);
        assert!(scale.measurement_source);

        let cuff = DeviceKind::BloodPressureCuff.capabilities();
        assert!(cuff.battery_powered);
        assert!(cuff.time_syncable);
        assert!(cuff.measurement_source);
    }

    #[test]
    fn test_decode_dispatch() {
        // 70 kg on the scale layout.
        let m = DeviceKind::WeightScale
            .decode_measurement(&[0x00, 0xB0, 0x36])
            .unwrap();
        assert!(matches!(m, Measurement::Weight(_)));

        // The same bytes are not a valid blood pressure payload.
        assert!(DeviceKind::BloodPressureCuff
            .decode_measurement(&[0x00, 0xB0, 0x36])
            .is_err());
    }
}
