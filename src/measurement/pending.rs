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

//! Single-slot buffer for the measurement awaiting user confirmation.

use crate::measurement::RecordedMeasurement;

/// Holds at most one unconfirmed measurement.
///
/// A new reading replaces an unconfirmed one: the user is looking at a
/// confirmation prompt and the device just produced a fresher value, so
/// the prompt should show that instead.
#[derive(Debug, Default)]
pub struct PendingMeasurement {
    slot: Option<RecordedMeasurement>,
}

impl PendingMeasurement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a measurement, returning the one it displaced, if any.
    pub fn replace(&mut self, measurement: RecordedMeasurement) -> Option<RecordedMeasurement> {
        self.slot.replace(measurement)
    }

    /// Consume the buffered measurement.
    pub fn take(&mut self) -> Option<RecordedMeasurement> {
        self.slot.take()
    }

    pub fn peek(&self) -> Option<&RecordedMeasurement> {
        self.slot.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceKind;
    use crate::gatt::weight::{WeightMeasurement, WeightUnit};
    use crate::measurement::{DeviceSnapshot, Measurement};
    use chrono::Utc;

    fn recorded(seq: u64) -> RecordedMeasurement {
        RecordedMeasurement {
            measurement: Measurement::Weight(WeightMeasurement {
                value: 70.0 + seq as f64,
                unit: WeightUnit::Kilograms,
                timestamp: None,
                user_slot: None,
                bmi: None,
                height: None,
            }),
            device: DeviceSnapshot {
                name: "Scale".into(),
                model: None,
                manufacturer: None,
                kind: DeviceKind::WeightScale,
            },
            seq,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_starts_empty() {
        let pending = PendingMeasurement::new();
        assert!(pending.is_empty());
        assert!(pending.peek().is_none());
    }

    #[test]
    fn test_replace_returns_displaced() {
        let mut pending = PendingMeasurement::new();
        assert!(pending.replace(recorded(1)).is_none());
        let displaced = pending.replace(recorded(2)).unwrap();
        assert_eq!(displaced.seq, 1);
        assert_eq!(pending.peek().unwrap().seq, 2);
    }

    #[test]
    fn test_take_consumes() {
        let mut pending = PendingMeasurement::new();
        pending.replace(recorded(1));
        assert_eq!(pending.take().unwrap().seq, 1);
        assert!(pending.take().is_none());
        assert!(pending.is_empty());
    }
}
