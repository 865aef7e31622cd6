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

//! Weight Measurement characteristic (0x2A9D) decoding.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{decode_timestamp, DecodeError};

/// Flag bits of the Weight Measurement characteristic.
const FLAG_IMPERIAL: u8 = 1 << 0;
const FLAG_TIMESTAMP: u8 = 1 << 1;
const FLAG_USER_ID: u8 = 1 << 2;
const FLAG_BMI_HEIGHT: u8 = 1 << 3;

/// Raw weight value reserved for "measurement unsuccessful".
const WEIGHT_UNSUCCESSFUL: u16 = 0xFFFF;

/// User id value reserved for "unknown user".
const USER_UNKNOWN: u8 = 0xFF;

/// Unit of a decoded weight value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightUnit {
    Kilograms,
    Pounds,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kilograms => "kg",
            Self::Pounds => "lb",
        }
    }
}

/// A decoded Weight Measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightMeasurement {
    /// Weight in `unit`.
    pub value: f64,
    pub unit: WeightUnit,
    /// Device wall-clock at measurement time, when the scale sent one.
    pub timestamp: Option<NaiveDateTime>,
    /// User slot the scale attributed the reading to (1-based).
    pub user_slot: Option<u8>,
    /// Body mass index, 0.1 resolution.
    pub bmi: Option<f64>,
    /// Height in meters (SI) or inches (imperial).
    pub height: Option<f64>,
}

/// Decode a Weight Measurement payload.
///
/// The payload length must match the fields announced by the flags byte
/// exactly; trailing bytes are rejected.
pub fn decode(payload: &[u8]) -> Result<WeightMeasurement, DecodeError> {
    if payload.len() < 3 {
        return Err(DecodeError::Truncated {
            expected: 3,
            actual: payload.len(),
        });
    }
    let flags = payload[0];
    let imperial = flags & FLAG_IMPERIAL != 0;

    let mut expected = 3;
    if flags & FLAG_TIMESTAMP != 0 {
        expected += 7;
    }
    if flags & FLAG_USER_ID != 0 {
        expected += 1;
    }
    if flags & FLAG_BMI_HEIGHT != 0 {
        expected += 4;
    }
    if payload.len() != expected {
        return Err(DecodeError::LengthMismatch {
            expected,
            actual: payload.len(),
        });
    }

    let raw = u16::from_le_bytes([payload[1], payload[2]]);
    if raw == WEIGHT_UNSUCCESSFUL {
        return Err(DecodeError::InvalidValue);
    }
    // Resolution is 0.005 kg or 0.01 lb per SIG assigned numbers.
    let (value, unit) = if imperial {
        (f64::from(raw) * 0.01, WeightUnit::Pounds)
    } else {
        (f64::from(raw) * 0.005, WeightUnit::Kilograms)
    };

    let mut offset = 3;
    let timestamp = if flags & FLAG_TIMESTAMP != 0 {
        let ts = decode_timestamp(&payload[offset..offset + 7])?;
        offset += 7;
        ts
    } else {
        None
    };

    let user_slot = if flags & FLAG_USER_ID != 0 {
        let slot = payload[offset];
        offset += 1;
        (slot != USER_UNKNOWN).then_some(slot)
    } else {
        None
    };

    let (bmi, height) = if flags & FLAG_BMI_HEIGHT != 0 {
        let bmi_raw = u16::from_le_bytes([payload[offset], payload[offset + 1]]);
        let height_raw = u16::from_le_bytes([payload[offset + 2], payload[offset + 3]]);
        let height_resolution = if imperial { 0.1 } else { 0.001 };
        (
            Some(f64::from(bmi_raw) * 0.1),
            Some(f64::from(height_raw) * height_resolution),
        )
    } else {
        (None, None)
    };

    Ok(WeightMeasurement {
        value,
        unit,
        timestamp,
        user_slot,
        bmi,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_si() {
        // 14000 * 0.005 = 70 kg.
        let m = decode(&[0x00, 0xB0, 0x36]).unwrap();
        assert_eq!(m.value, 70.0);
        assert_eq!(m.unit, WeightUnit::Kilograms);
        assert_eq!(m.timestamp, None);
        assert_eq!(m.user_slot, None);
        assert_eq!(m.bmi, None);
    }

    #[test]
    fn test_minimal_imperial() {
        // 15432 * 0.01 = 154.32 lb.
        let m = decode(&[0x01, 0x48, 0x3C]).unwrap();
        assert!((m.value - 154.32).abs() < 1e-9);
        assert_eq!(m.unit, WeightUnit::Pounds);
    }

    #[test]
    fn test_timestamp_and_user() {
        // Flags: timestamp + user id. 2024-06-05 12:33:11, slot 1.
        let payload = [0x06, 0xB0, 0x36, 0xE8, 0x07, 6, 5, 12, 33, 11, 1];
        let m = decode(&payload).unwrap();
        assert_eq!(m.value, 70.0);
        assert_eq!(m.timestamp.unwrap().to_string(), "2024-06-05 12:33:11");
        assert_eq!(m.user_slot, Some(1));
    }

    #[test]
    fn test_unknown_user_slot() {
        let payload = [0x04, 0xB0, 0x36, 0xFF];
        let m = decode(&payload).unwrap();
        assert_eq!(m.user_slot, None);
    }

    #[test]
    fn test_bmi_and_height() {
        // BMI 22.5 (225), height 1.800 m (1800).
        let payload = [0x08, 0xB0, 0x36, 0xE1, 0x00, 0x08, 0x07];
        let m = decode(&payload).unwrap();
        assert!((m.bmi.unwrap() - 22.5).abs() < 1e-9);
        assert!((m.height.unwrap() - 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_unsuccessful_measurement_rejected() {
        assert_eq!(decode(&[0x00, 0xFF, 0xFF]), Err(DecodeError::InvalidValue));
    }

    #[test]
    fn test_truncated() {
        assert!(matches!(decode(&[0x00, 0xB0]), Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn test_length_mismatch() {
        // Flags announce a timestamp that is not there.
        assert_eq!(
            decode(&[0x02, 0xB0, 0x36]),
            Err(DecodeError::LengthMismatch {
                expected: 10,
                actual: 3
            })
        );
        // Trailing garbage after a minimal payload.
        assert_eq!(
            decode(&[0x00, 0xB0, 0x36, 0x99]),
            Err(DecodeError::LengthMismatch {
                expected: 3,
                actual: 4
            })
        );
    }

    #[test]
    fn test_empty() {
        assert!(matches!(decode(&[]), Err(DecodeError::Truncated { .. })));
    }
}
