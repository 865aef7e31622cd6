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

//! Blood Pressure Measurement characteristic (0x2A35) decoding.
//!
//! All clinical values are IEEE-11073 SFLOATs; non-numeric SFLOAT
//! patterns in any field reject the whole payload.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{decode_timestamp, sfloat, DecodeError};

/// Flag bits of the Blood Pressure Measurement characteristic.
const FLAG_KPA: u8 = 1 << 0;
const FLAG_TIMESTAMP: u8 = 1 << 1;
const FLAG_PULSE_RATE: u8 = 1 << 2;
const FLAG_USER_ID: u8 = 1 << 3;
const FLAG_STATUS: u8 = 1 << 4;

/// Unit of the pressure values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressureUnit {
    MmHg,
    KPa,
}

impl PressureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MmHg => "mmHg",
            Self::KPa => "kPa",
        }
    }
}

/// Pulse rate range detection reported by the cuff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PulseRange {
    InRange,
    ExceedsUpperLimit,
    BelowLowerLimit,
}

/// Measurement status flags reported alongside a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementStatus {
    pub body_movement: bool,
    pub cuff_too_loose: bool,
    pub irregular_pulse: bool,
    pub pulse_range: PulseRange,
    pub improper_position: bool,
}

impl MeasurementStatus {
    fn from_raw(raw: u16) -> Result<Self, DecodeError> {
        let pulse_range = match (raw >> 3) & 0b11 {
            0b00 => PulseRange::InRange,
            0b01 => PulseRange::ExceedsUpperLimit,
            0b10 => PulseRange::BelowLowerLimit,
            _ => return Err(DecodeError::InvalidValue),
        };
        Ok(Self {
            body_movement: raw & (1 << 0) != 0,
            cuff_too_loose: raw & (1 << 1) != 0,
            irregular_pulse: raw & (1 << 2) != 0,
            pulse_range,
            improper_position: raw & (1 << 5) != 0,
        })
    }
}

/// A decoded Blood Pressure Measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodPressureMeasurement {
    pub systolic: f64,
    pub diastolic: f64,
    pub mean_arterial: f64,
    pub unit: PressureUnit,
    /// Device wall-clock at measurement time, when the cuff sent one.
    pub timestamp: Option<NaiveDateTime>,
    /// Beats per minute.
    pub pulse_rate: Option<f64>,
    /// User slot the cuff attributed the reading to (1-based).
    pub user_slot: Option<u8>,
    pub status: Option<MeasurementStatus>,
}

fn clinical_sfloat(bytes: &[u8]) -> Result<f64, DecodeError> {
    sfloat::decode_bytes(bytes).ok_or(DecodeError::InvalidValue)
}

/// Decode a Blood Pressure Measurement payload.
///
/// The payload length must match the fields announced by the flags byte
/// exactly; trailing bytes are rejected.
pub fn decode(payload: &[u8]) -> Result<BloodPressureMeasurement, DecodeError> {
    if payload.len() < 7 {
        return Err(DecodeError::Truncated {
            expected: 7,
            actual: payload.len(),
        });
    }
    let flags = payload[0];

    let mut expected = 7;
    if flags & FLAG_TIMESTAMP != 0 {
        expected += 7;
    }
    if flags & FLAG_PULSE_RATE != 0 {
        expected += 2;
    }
    if flags & FLAG_USER_ID != 0 {
        expected += 1;
    }
    if flags & FLAG_STATUS != 0 {
        expected += 2;
    }
    if payload.len() != expected {
        return Err(DecodeError::LengthMismatch {
            expected,
            actual: payload.len(),
        });
    }

    let unit = if flags & FLAG_KPA != 0 {
        PressureUnit::KPa
    } else {
        PressureUnit::MmHg
    };
    let systolic = clinical_sfloat(&payload[1..3])?;
    let diastolic = clinical_sfloat(&payload[3..5])?;
    let mean_arterial = clinical_sfloat(&payload[5..7])?;

    let mut offset = 7;
    let timestamp = if flags & FLAG_TIMESTAMP != 0 {
        let ts = decode_timestamp(&payload[offset..offset + 7])?;
        offset += 7;
        ts
    } else {
        None
    };

    let pulse_rate = if flags & FLAG_PULSE_RATE != 0 {
        let rate = clinical_sfloat(&payload[offset..offset + 2])?;
        offset += 2;
        Some(rate)
    } else {
        None
    };

    let user_slot = if flags & FLAG_USER_ID != 0 {
        let slot = payload[offset];
        offset += 1;
        Some(slot)
    } else {
        None
    };

    let status = if flags & FLAG_STATUS != 0 {
        let raw = u16::from_le_bytes([payload[offset], payload[offset + 1]]);
        Some(MeasurementStatus::from_raw(raw)?)
    } else {
        None
    };

    Ok(BloodPressureMeasurement {
        systolic,
        diastolic,
        mean_arterial,
        unit,
        timestamp,
        pulse_rate,
        user_slot,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 103/64 mmHg, MAP 77, pulse 62: a typical cuff reading.
    fn typical_reading() -> Vec<u8> {
        vec![
            0x04, // pulse rate present, mmHg
            0x67, 0x00, // systolic 103
            0x40, 0x00, // diastolic 64
            0x4D, 0x00, // MAP 77
            0x3E, 0x00, // pulse 62
        ]
    }

    #[test]
    fn test_typical_reading() {
        let m = decode(&typical_reading()).unwrap();
        assert_eq!(m.systolic, 103.0);
        assert_eq!(m.diastolic, 64.0);
        assert_eq!(m.mean_arterial, 77.0);
        assert_eq!(m.pulse_rate, Some(62.0));
        assert_eq!(m.unit, PressureUnit::MmHg);
        assert_eq!(m.timestamp, None);
        assert_eq!(m.user_slot, None);
        assert_eq!(m.status, None);
    }

    #[test]
    fn test_full_payload() {
        // All optional fields: timestamp, pulse, user slot, status.
        let payload = vec![
            0x1E, // timestamp + pulse + user + status, mmHg
            0x67, 0x00, 0x40, 0x00, 0x4D, 0x00, // 103/64, MAP 77
            0xE8, 0x07, 6, 5, 12, 33, 11, // 2024-06-05 12:33:11
            0x3E, 0x00, // pulse 62
            0x01, // user slot 1
            0x04, 0x00, // irregular pulse detected
        ];
        let m = decode(&payload).unwrap();
        assert_eq!(m.timestamp.unwrap().to_string(), "2024-06-05 12:33:11");
        assert_eq!(m.user_slot, Some(1));
        let status = m.status.unwrap();
        assert!(status.irregular_pulse);
        assert!(!status.body_movement);
        assert_eq!(status.pulse_range, PulseRange::InRange);
    }

    #[test]
    fn test_kpa_unit() {
        let mut payload = typical_reading();
        payload[0] |= 0x01;
        let m = decode(&payload).unwrap();
        assert_eq!(m.unit, PressureUnit::KPa);
    }

    #[test]
    fn test_nan_systolic_rejected() {
        let mut payload = typical_reading();
        // 0x07FF is the SFLOAT NaN pattern.
        payload[1] = 0xFF;
        payload[2] = 0x07;
        assert_eq!(decode(&payload), Err(DecodeError::InvalidValue));
    }

    #[test]
    fn test_truncated() {
        assert!(matches!(
            decode(&[0x00, 0x67, 0x00]),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_length_mismatch() {
        // Flags announce pulse rate but the field is missing.
        let payload = [0x04, 0x67, 0x00, 0x40, 0x00, 0x4D, 0x00];
        assert_eq!(
            decode(&payload),
            Err(DecodeError::LengthMismatch {
                expected: 9,
                actual: 7
            })
        );
    }

    #[test]
    fn test_reserved_pulse_range_rejected() {
        let mut payload = typical_reading();
        payload[0] |= FLAG_STATUS;
        payload.extend_from_slice(&[0x18, 0x00]); // pulse range bits 0b11
        assert_eq!(decode(&payload), Err(DecodeError::InvalidValue));
    }
}
