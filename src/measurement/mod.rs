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

//! Measurement model: decoded readings paired with the device that
//! produced them.

mod pending;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::DeviceKind;
use crate::gatt::blood_pressure::BloodPressureMeasurement;
use crate::gatt::weight::WeightMeasurement;

pub use pending::PendingMeasurement;

/// A decoded measurement from any supported device kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Measurement {
    Weight(WeightMeasurement),
    BloodPressure(BloodPressureMeasurement),
}

impl Measurement {
    /// Short label for logs and notifications.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Weight(_) => "Weight",
            Self::BloodPressure(_) => "Blood Pressure",
        }
    }

    /// One-line rendering of the clinical values.
    pub fn summary(&self) -> String {
        match self {
            Self::Weight(w) => format!("{:.2} {}", w.value, w.unit.as_str()),
            Self::BloodPressure(bp) => match bp.pulse_rate {
                Some(pulse) => format!(
                    "{:.0}/{:.0} {} at {:.0} bpm",
                    bp.systolic,
                    bp.diastolic,
                    bp.unit.as_str(),
                    pulse
                ),
                None => format!("{:.0}/{:.0} {}", bp.systolic, bp.diastolic, bp.unit.as_str()),
            },
        }
    }
}

/// Descriptive copy of the originating device, captured at decode time.
///
/// Deliberately holds no reference back to the live peripheral: the
/// measurement stays valid after the device disconnects or is forgotten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub name: String,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub kind: DeviceKind,
}

/// A measurement as received: the decoded values, who sent them, and
/// when we got them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedMeasurement {
    pub measurement: Measurement,
    pub device: DeviceSnapshot,
    /// Transport sequence number of the carrying notification.
    pub seq: u64,
    /// Local receive time, distinct from the device-reported timestamp.
    pub received_at: DateTime<Utc>,
}
