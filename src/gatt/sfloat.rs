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

//! IEEE-11073 16-bit SFLOAT decoding.
//!
//! An SFLOAT packs a 4-bit signed exponent (base 10) and a 12-bit signed
//! mantissa into a `u16`. Blood pressure characteristics transmit all
//! clinical values in this format.

/// Special bit patterns defined by IEEE-11073. None of them represents a
/// usable clinical value.
const NAN: u16 = 0x07FF;
const NRES: u16 = 0x0800;
const RESERVED: u16 = 0x0801;
const POSITIVE_INFINITY: u16 = 0x07FE;
const NEGATIVE_INFINITY: u16 = 0x0802;

/// Decode a raw little-endian SFLOAT value.
///
/// Returns `None` for the NaN, NRes, reserved and infinity patterns:
/// a device reporting one of those has no number to give us.
pub fn decode(raw: u16) -> Option<f64> {
    match raw {
        NAN | NRES | RESERVED | POSITIVE_INFINITY | NEGATIVE_INFINITY => None,
        _ => {
            // Sign-extend the 4-bit exponent and the 12-bit mantissa.
            let mut exponent = (raw >> 12) as i32;
            if exponent >= 0x8 {
                exponent -= 0x10;
            }
            let mut mantissa = (raw & 0x0FFF) as i32;
            if mantissa >= 0x800 {
                mantissa -= 0x1000;
            }
            Some(f64::from(mantissa) * 10f64.powi(exponent))
        }
    }
}

/// Read an SFLOAT from the first two bytes of `bytes` (little endian).
///
/// Returns `None` when fewer than two bytes are available or the value
/// is one of the special patterns.
pub fn decode_bytes(bytes: &[u8]) -> Option<f64> {
    let raw = u16::from_le_bytes([*bytes.first()?, *bytes.get(1)?]);
    decode(raw)
}
