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

//! Remote measurement store.
//!
//! Confirmed measurements and the notifications announcing them are
//! handed to a collaborator-supplied store. Delivery is fire-and-forget:
//! failures are logged, never retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::measurement::{Measurement, RecordedMeasurement};

/// Errors from the remote measurement store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote store rejected payload: {0}")]
    Rejected(String),

    #[error("remote store unreachable: {0}")]
    Unreachable(String),
}

/// A user-facing notice that a measurement was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
}

impl Notification {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            completed: false,
        }
    }

    /// The notice announcing a confirmed measurement.
    pub fn for_measurement(recorded: &RecordedMeasurement) -> Self {
        match recorded.measurement {
            Measurement::Weight(_) => Self::new(
                "Weight Recorded",
                "A weight measurement has been recorded.",
            ),
            Measurement::BloodPressure(_) => Self::new(
                "Blood Pressure Recorded",
                "A blood pressure measurement has been recorded.",
            ),
        }
    }
}

/// Destination for confirmed measurements and their notifications.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn persist_measurement(&self, recorded: &RecordedMeasurement)
        -> Result<(), RemoteError>;

    async fn persist_notification(&self, notification: &Notification) -> Result<(), RemoteError>;
}

/// Default store: logs what would be persisted. Used when no remote
/// backend is wired up.
#[derive(Debug, Default)]
pub struct LoggingRemoteStore;

#[async_trait]
impl RemoteStore for LoggingRemoteStore {
    async fn persist_measurement(
        &self,
        recorded: &RecordedMeasurement,
    ) -> Result<(), RemoteError> {
        info!(
            "measurement recorded: {} from {} ({})",
            recorded.measurement.summary(),
            recorded.device.name,
            recorded.measurement.kind_label()
        );
        Ok(())
    }

    async fn persist_notification(&self, notification: &Notification) -> Result<(), RemoteError> {
        info!("notification: {} - {}", notification.title, notification.description);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceKind;
    use crate::gatt::blood_pressure::{BloodPressureMeasurement, PressureUnit};
    use crate::gatt::weight::{WeightMeasurement, WeightUnit};
    use crate::measurement::DeviceSnapshot;
    use chrono::Utc;

    fn recorded(measurement: Measurement) -> RecordedMeasurement {
        RecordedMeasurement {
            measurement,
            device: DeviceSnapshot {
                name: "Device".into(),
                model: None,
                manufacturer: None,
                kind: DeviceKind::WeightScale,
            },
            seq: 0,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_weight_notification_text() {
        let recorded = recorded(Measurement::Weight(WeightMeasurement {
            value: 70.0,
            unit: WeightUnit::Kilograms,
            timestamp: None,
            user_slot: None,
            bmi: None,
            height: None,
        }));
        let notification = Notification::for_measurement(&recorded);
        assert_eq!(notification.title, "Weight Recorded");
        assert_eq!(notification.description, "A weight measurement has been recorded.");
        assert!(!notification.completed);
    }

    #[test]
    fn test_blood_pressure_notification_text() {
        let recorded = recorded(Measurement::BloodPressure(BloodPressureMeasurement {
            systolic: 103.0,
            diastolic: 64.0,
            mean_arterial: 77.0,
            unit: PressureUnit::MmHg,
            timestamp: None,
            pulse_rate: None,
            user_slot: None,
            status: None,
        }));
        let notification = Notification::for_measurement(&recorded);
        assert_eq!(notification.title, "Blood Pressure Recorded");
    }

    #[test]
    fn test_notification_ids_unique() {
        let a = Notification::new("T", "D");
        let b = Notification::new("T", "D");
        assert_ne!(a.id, b.id);
    }
}
