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

//! VitalBridge device core.
//!
//! Discovers, pairs and supervises BLE health peripherals (weight scales
//! and blood pressure cuffs), decodes their GATT measurements and hands
//! confirmed readings to a persistence backend. All device state lives
//! behind a single [`manager::DeviceManager`] task; callers interact
//! through a cloneable [`manager::ManagerHandle`] and an event stream.

pub mod config;
pub mod device;
pub mod error;
pub mod gatt;
pub mod manager;
pub mod measurement;
pub mod pairing;
pub mod storage;
pub mod transport;

pub use error::Error;
pub use manager::{DeviceManager, ManagerBuilder, ManagerEvent, ManagerHandle};
pub use pairing::{PairingSession, PairingState};
