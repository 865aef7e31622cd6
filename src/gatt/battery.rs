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

//! Battery Level characteristic (0x2A19) decoding.

use super::DecodeError;

/// Decode a Battery Level payload: a single byte, 0 to 100 percent.
pub fn decode(payload: &[u8]) -> Result<u8, DecodeError> {
    match payload {
        [percent] if *percent <= 100 => Ok(*percent),
        [_] => Err(DecodeError::InvalidValue),
        _ => Err(DecodeError::LengthMismatch {
            expected: 1,
            actual: payload.len(),
        }),
    }
}
