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

//! Pairing workflow.
//!
//! A [`PairingSession`] is the single open pairing surface: it owns a
//! snapshot of the discovered candidates, runs the handshake against
//! the selected one and commits the result through the manager. Only
//! one session exists at a time; dropping it closes the workflow and
//! flushes the discovered set.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::device::{DeviceId, DeviceKind, Peripheral};
use crate::error::Error;
use crate::manager::ManagerHandle;
use crate::transport::Transport;

/// Where the workflow currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingState {
    /// Browsing candidates; `pair` may be called.
    Discovery,
    /// Handshake in progress.
    Pairing,
    /// The device was paired and registered.
    Paired(DeviceId),
    /// The last attempt failed; `retry` returns to `Discovery`.
    Error(String),
}

impl PairingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Pairing => "pairing",
            Self::Paired(_) => "paired",
            Self::Error(_) => "error",
        }
    }
}

/// A discovered device offered for pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingCandidate {
    pub id: DeviceId,
    pub kind: DeviceKind,
    pub name: String,
    pub model: Option<String>,
}

impl PairingCandidate {
    pub(crate) fn from_peripheral(peripheral: &Peripheral) -> Self {
        Self {
            id: peripheral.id(),
            kind: peripheral.kind(),
            name: peripheral.name().to_owned(),
            model: peripheral.model().map(str::to_owned),
        }
    }

    /// Asset name of the device illustration.
    pub fn icon(&self) -> &'static str {
        self.kind.icon()
    }
}

/// The open pairing workflow.
///
/// Runs independently of the manager task: the handshake touches only
/// its own candidate device and commits atomically via
/// [`ManagerHandle::register_paired`], so measurements and reconnects of
/// already-paired devices keep flowing while a session is open.
///
/// Dropping the session closes the workflow.
pub struct PairingSession {
    handle: ManagerHandle,
    transport: Arc<dyn Transport>,
    candidates: Vec<PairingCandidate>,
    selected: usize,
    state: PairingState,
}

impl PairingSession {
    pub(crate) fn new(
        handle: ManagerHandle,
        transport: Arc<dyn Transport>,
        candidates: Vec<PairingCandidate>,
    ) -> Self {
        Self {
            handle,
            transport,
            candidates,
            selected: 0,
            state: PairingState::Discovery,
        }
    }

    pub fn state(&self) -> &PairingState {
        &self.state
    }

    /// Candidates as discovered when the session opened.
    pub fn candidates(&self) -> &[PairingCandidate] {
        &self.candidates
    }

    pub fn selected(&self) -> &PairingCandidate {
        &self.candidates[self.selected]
    }

    /// Choose the candidate to pair. Out-of-range indices keep the
    /// current selection.
    pub fn select(&mut self, index: usize) {
        if index < self.candidates.len() {
            self.selected = index;
        } else {
            warn!(
                "candidate index {index} out of range ({} candidates)",
                self.candidates.len()
            );
        }
    }

    /// Pair the selected candidate: connect, probe its measurement
    /// characteristic, sync its clock where supported, then register it.
    ///
    /// On failure the session moves to [`PairingState::Error`] with the
    /// candidate list intact; call [`PairingSession::retry`] to try
    /// again.
    pub async fn pair(&mut self) -> Result<DeviceId, Error> {
        if self.state != PairingState::Discovery {
            return Err(Error::PairingFailed {
                reason: format!("cannot pair from the {} state", self.state.as_str()),
            });
        }
        let candidate = self.selected().clone();
        self.state = PairingState::Pairing;
        info!(
            "pairing {} \"{}\"",
            candidate.kind.display_name(),
            candidate.name
        );
        match self.handshake(&candidate).await {
            Ok(()) => {
                self.state = PairingState::Paired(candidate.id);
                Ok(candidate.id)
            }
            Err(e) => {
                warn!("pairing {} failed: {e}", candidate.name);
                self.state = PairingState::Error(e.to_string());
                Err(e)
            }
        }
    }

    async fn handshake(&self, candidate: &PairingCandidate) -> Result<(), Error> {
        self.transport
            .connect(candidate.id)
            .await
            .map_err(|e| Error::PairingFailed {
                reason: format!("connect failed: {e}"),
            })?;

        // Probe the measurement characteristic: a device that cannot
        // serve it is unusable even when it connects fine.
        let probe = self
            .transport
            .subscribe(candidate.id, candidate.kind.measurement_characteristic())
            .await
            .map_err(|e| Error::PairingFailed {
                reason: format!("characteristic probe failed: {e}"),
            })?;
        drop(probe);

        if candidate.kind.capabilities().time_syncable {
            // Clock drift is tolerable; a failed sync does not block
            // the pairing.
            if let Err(e) = self.transport.write_time(candidate.id, Utc::now()).await {
                warn!("clock sync during pairing failed: {e}");
            }
        }

        self.handle.register_paired(candidate.id).await
    }

    /// Return to `Discovery` after a failed attempt, keeping the
    /// original candidate list.
    pub fn retry(&mut self) {
        if matches!(self.state, PairingState::Error(_)) {
            self.state = PairingState::Discovery;
        }
    }
}

impl Drop for PairingSession {
    fn drop(&mut self) {
        self.handle.end_pairing();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::DiscoveredPeripheral;

    #[test]
    fn test_state_labels() {
        assert_eq!(PairingState::Discovery.as_str(), "discovery");
        assert_eq!(PairingState::Pairing.as_str(), "pairing");
        assert_eq!(PairingState::Paired(DeviceId::new()).as_str(), "paired");
        assert_eq!(PairingState::Error("x".into()).as_str(), "error");
    }

    #[test]
    fn test_candidate_from_peripheral() {
        let peripheral = Peripheral::from_discovered(DiscoveredPeripheral {
            id: DeviceId::new(),
            kind: DeviceKind::WeightScale,
            name: "Scale".into(),
            model: Some("SC-150".into()),
            manufacturer: None,
            advertisement: None,
        });
        let candidate = PairingCandidate::from_peripheral(&peripheral);
        assert_eq!(candidate.id, peripheral.id());
        assert_eq!(candidate.kind, DeviceKind::WeightScale);
        assert_eq!(candidate.name, "Scale");
        assert_eq!(candidate.icon(), "Omron-SC-150");
    }
}
