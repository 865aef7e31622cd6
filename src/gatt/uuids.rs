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

//! Bluetooth SIG assigned numbers used by the supported health devices.
//!
//! All values are 16-bit assigned numbers expanded onto the Bluetooth
//! base UUID (0000xxxx-0000-1000-8000-00805f9b34fb).

use uuid::Uuid;

/// Weight Scale service (0x181D).
pub const WEIGHT_SCALE_SERVICE: Uuid = Uuid::from_u128(0x0000181d_0000_1000_8000_00805f9b34fb);

/// Weight Measurement characteristic (0x2A9D), indicate.
pub const WEIGHT_MEASUREMENT: Uuid = Uuid::from_u128(0x00002a9d_0000_1000_8000_00805f9b34fb);

/// Weight Scale Feature characteristic (0x2A9E), read.
pub const WEIGHT_SCALE_FEATURE: Uuid = Uuid::from_u128(0x00002a9e_0000_1000_8000_00805f9b34fb);

/// Blood Pressure service (0x1810).
pub const BLOOD_PRESSURE_SERVICE: Uuid = Uuid::from_u128(0x00001810_0000_1000_8000_00805f9b34fb);

/// Blood Pressure Measurement characteristic (0x2A35), indicate.
pub const BLOOD_PRESSURE_MEASUREMENT: Uuid =
    Uuid::from_u128(0x00002a35_0000_1000_8000_00805f9b34fb);

/// Battery service (0x180F).
pub const BATTERY_SERVICE: Uuid = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);

/// Battery Level characteristic (0x2A19), read + notify.
pub const BATTERY_LEVEL: Uuid = Uuid::from_u128(0x00002a19_0000_1000_8000_00805f9b34fb);

/// Current Time service (0x1805).
pub const CURRENT_TIME_SERVICE: Uuid = Uuid::from_u128(0x00001805_0000_1000_8000_00805f9b34fb);

/// Current Time characteristic (0x2A2B), read + write.
pub const CURRENT_TIME: Uuid = Uuid::from_u128(0x00002a2b_0000_1000_8000_00805f9b34fb);
