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

//! GATT characteristic decoding for the supported health devices.
//!
//! Decoders are strict: a payload that does not match its characteristic
//! layout is rejected as a whole, never partially applied.

pub mod battery;
pub mod blood_pressure;
pub mod sfloat;
pub mod uuids;
pub mod weight;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// A characteristic payload could not be decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than the layout requires.
    #[error("payload truncated: need at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// The payload length does not match the fields announced by its flags.
    #[error("payload length {actual} does not match flags (expected {expected})")]
    LengthMismatch { expected: usize, actual: usize },

    /// A field carries a value outside its representable range.
    #[error("value outside representable range")]
    InvalidValue,

    /// The embedded date-time fields do not form a valid timestamp.
    #[error("invalid timestamp fields")]
    InvalidTimestamp,
}

/// Decode the 7-byte SIG date-time layout shared by the measurement
/// characteristics: year u16 LE, month, day, hours, minutes, seconds.
///
/// A year of zero means the device clock was never set; that decodes to
/// `None` rather than an error.
pub(crate) fn decode_timestamp(bytes: &[u8]) -> Result<Option<NaiveDateTime>, DecodeError> {
    if bytes.len() < 7 {
        return Err(DecodeError::Truncated {
            expected: 7,
            actual: bytes.len(),
        });
    }
    let year = u16::from_le_bytes([bytes[0], bytes[1]]);
    if year == 0 {
        return Ok(None);
    }
    let (month, day) = (bytes[2], bytes[3]);
    let (hours, minutes, seconds) = (bytes[4], bytes[5], bytes[6]);
    NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
        .and_then(|date| {
            date.and_hms_opt(u32::from(hours), u32::from(minutes), u32::from(seconds))
        })
        .map(Some)
        .ok_or(DecodeError::InvalidTimestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_decodes() {
        // 2024-06-05 12:33:11
        let bytes = [0xE8, 0x07, 6, 5, 12, 33, 11];
        let ts = decode_timestamp(&bytes).unwrap().unwrap();
        assert_eq!(ts.to_string(), "2024-06-05 12:33:11");
    }

    #[test]
    fn test_timestamp_unset_clock() {
        let bytes = [0, 0, 6, 5, 12, 33, 11];
        assert_eq!(decode_timestamp(&bytes).unwrap(), None);
    }

    #[test]
    fn test_timestamp_invalid_month() {
        let bytes = [0xE8, 0x07, 13, 5, 12, 33, 11];
        assert_eq!(decode_timestamp(&bytes), Err(DecodeError::InvalidTimestamp));
    }

    #[test]
    fn test_timestamp_invalid_time() {
        let bytes = [0xE8, 0x07, 6, 5, 24, 0, 0];
        assert_eq!(decode_timestamp(&bytes), Err(DecodeError::InvalidTimestamp));
    }

    #[test]
    fn test_timestamp_truncated() {
        assert!(matches!(
            decode_timestamp(&[0xE8, 0x07, 6]),
            Err(DecodeError::Truncated { expected: 7, actual: 3 })
        ));
    }
}
