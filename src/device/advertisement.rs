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

//! Manufacturer-specific advertisement decoding.
//!
//! Health peripherals broadcast a small status block in their
//! manufacturer data (after the company identifier, which the transport
//! strips): whether the device is in pairing mode, whether its clock has
//! been set, and per-user-slot record counters.
//!
//! Layout:
//!   byte 0        data type (0x01 = user-slot block)
//!   byte 1        flags: bits 0-1 slot count - 1, bit 2 time set,
//!                 bit 3 pairing mode
//!   per slot      sequence number u16 LE, stored record count u8

use tracing::debug;

/// Data type marker for the user-slot status block.
const DATA_TYPE_USER_SLOTS: u8 = 0x01;

const FLAG_SLOT_COUNT_MASK: u8 = 0b0000_0011;
const FLAG_TIME_SET: u8 = 1 << 2;
const FLAG_PAIRING_MODE: u8 = 1 << 3;

/// Bytes per encoded user slot.
const SLOT_LEN: usize = 3;

/// Per-user-slot counters carried in the advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserSlot {
    /// Slot number, 1-based.
    pub slot: u8,
    /// Sequence number of the latest stored measurement.
    pub sequence: u16,
    /// Number of measurements stored for this slot.
    pub records: u8,
}

/// Decoded manufacturer advertisement block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerInfo {
    /// Device is accepting pairing requests.
    pub pairing_mode: bool,
    /// Device clock has been synchronized at least once.
    pub time_set: bool,
    pub users: Vec<UserSlot>,
}

impl ManufacturerInfo {
    /// Decode a manufacturer data block. Returns `None` for payloads
    /// that are not a well-formed user-slot block.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        if payload.len() < 2 {
            debug!("advertisement too short: {} bytes", payload.len());
            return None;
        }
        if payload[0] != DATA_TYPE_USER_SLOTS {
            debug!("unsupported advertisement data type 0x{:02x}", payload[0]);
            return None;
        }
        let flags = payload[1];
        let slot_count = usize::from(flags & FLAG_SLOT_COUNT_MASK) + 1;
        let expected = 2 + slot_count * SLOT_LEN;
        if payload.len() != expected {
            debug!(
                "advertisement length {} does not match {} user slots",
                payload.len(),
                slot_count
            );
            return None;
        }

        let mut users = Vec::with_capacity(slot_count);
        for index in 0..slot_count {
            let base = 2 + index * SLOT_LEN;
            users.push(UserSlot {
                slot: index as u8 + 1,
                sequence: u16::from_le_bytes([payload[base], payload[base + 1]]),
                records: payload[base + 2],
            });
        }

        Some(Self {
            pairing_mode: flags & FLAG_PAIRING_MODE != 0,
            time_set: flags & FLAG_TIME_SET != 0,
            users,
        })
    }

    /// Encode back into the wire layout. Used by the simulated transport
    /// to script advertisements.
    pub fn encode(&self) -> Vec<u8> {
        let slot_count = self.users.len().clamp(1, 4);
        let mut flags = (slot_count as u8 - 1) & FLAG_SLOT_COUNT_MASK;
        if self.time_set {
            flags |= FLAG_TIME_SET;
        }
        if self.pairing_mode {
            flags |= FLAG_PAIRING_MODE;
        }
        let mut out = Vec::with_capacity(2 + slot_count * SLOT_LEN);
        out.push(DATA_TYPE_USER_SLOTS);
        out.push(flags);
        for index in 0..slot_count {
            let slot = self.users.get(index).copied().unwrap_or(UserSlot {
                slot: index as u8 + 1,
                sequence: 0,
                records: 0,
            });
            out.extend_from_slice(&slot.sequence.to_le_bytes());
            out.push(slot.records);
        }
        out
    }

    /// A minimal pairing-mode block with one empty user slot.
    pub fn pairing() -> Self {
        Self {
            pairing_mode: true,
            time_set: false,
            users: vec![UserSlot {
                slot: 1,
                sequence: 0,
                records: 0,
            }],
        }
    }
}
