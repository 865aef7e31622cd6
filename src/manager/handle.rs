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

//! Cloneable handle to the device manager task.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::device::DeviceId;
use crate::error::Error;
use crate::manager::ManagerMessage;
use crate::measurement::RecordedMeasurement;
use crate::pairing::{PairingCandidate, PairingSession};
use crate::storage::PairedDeviceInfo;
use crate::transport::Transport;

/// Requests the manager task serves, each answered over a oneshot.
pub(crate) enum Command {
    Configure {
        respond_to: oneshot::Sender<Result<(), Error>>,
    },
    BeginPairing {
        respond_to: oneshot::Sender<Result<Vec<PairingCandidate>, Error>>,
    },
    EndPairing,
    RegisterPaired {
        id: DeviceId,
        respond_to: oneshot::Sender<Result<(), Error>>,
    },
    Forget {
        id: DeviceId,
        respond_to: oneshot::Sender<Result<(), Error>>,
    },
    PairedDevices {
        respond_to: oneshot::Sender<Vec<PairedDeviceInfo>>,
    },
    DiscoveredDevices {
        respond_to: oneshot::Sender<Vec<PairingCandidate>>,
    },
    IsConnected {
        id: DeviceId,
        respond_to: oneshot::Sender<bool>,
    },
    UpdateBattery {
        id: DeviceId,
        percent: u8,
    },
    PendingMeasurement {
        respond_to: oneshot::Sender<Option<RecordedMeasurement>>,
    },
    ConfirmPending {
        respond_to: oneshot::Sender<Option<RecordedMeasurement>>,
    },
    DiscardPending {
        respond_to: oneshot::Sender<Option<RecordedMeasurement>>,
    },
    Shutdown {
        respond_to: oneshot::Sender<()>,
    },
}

/// Handle to a running [`DeviceManager`](crate::manager::DeviceManager).
///
/// Cheap to clone; every method sends a command into the manager's
/// queue and awaits the answer, so callers never race each other.
#[derive(Clone)]
pub struct ManagerHandle {
    messages: mpsc::Sender<ManagerMessage>,
    transport: Option<Arc<dyn Transport>>,
}

impl ManagerHandle {
    pub(crate) fn new(
        messages: mpsc::Sender<ManagerMessage>,
        transport: Option<Arc<dyn Transport>>,
    ) -> Self {
        Self { messages, transport }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, Error> {
        let (tx, rx) = oneshot::channel();
        self.messages
            .send(ManagerMessage::Command(make(tx)))
            .await
            .map_err(|_| Error::ManagerClosed)?;
        rx.await.map_err(|_| Error::ManagerClosed)
    }

    /// Resolve registry entries to live handles and connect them.
    /// Idempotent; run it again to retry entries that failed to resolve.
    pub async fn configure(&self) -> Result<(), Error> {
        self.request(|respond_to| Command::Configure { respond_to })
            .await?
    }

    /// Open the pairing workflow over the currently discovered devices.
    ///
    /// Fails with [`Error::PairingInProgress`] while another session is
    /// open and [`Error::NoPairableDevices`] when nothing has been
    /// discovered.
    pub async fn begin_pairing(&self) -> Result<PairingSession, Error> {
        let transport = self.transport.clone().ok_or(Error::TransportUnavailable)?;
        let candidates = self
            .request(|respond_to| Command::BeginPairing { respond_to })
            .await??;
        Ok(PairingSession::new(self.clone(), transport, candidates))
    }

    /// Commit a successfully paired device: registry record, removal
    /// from the discovered set and live-handle registration, all or
    /// nothing. Normally driven by [`PairingSession::pair`].
    pub async fn register_paired(&self, id: DeviceId) -> Result<(), Error> {
        self.request(|respond_to| Command::RegisterPaired { id, respond_to })
            .await?
    }

    /// Remove a device everywhere: registry, live handle, discovery.
    /// Unknown ids are a no-op.
    pub async fn forget(&self, id: DeviceId) -> Result<(), Error> {
        self.request(|respond_to| Command::Forget { id, respond_to })
            .await?
    }

    pub async fn paired_devices(&self) -> Result<Vec<PairedDeviceInfo>, Error> {
        self.request(|respond_to| Command::PairedDevices { respond_to })
            .await
    }

    pub async fn discovered_devices(&self) -> Result<Vec<PairingCandidate>, Error> {
        self.request(|respond_to| Command::DiscoveredDevices { respond_to })
            .await
    }

    pub async fn is_connected(&self, id: DeviceId) -> Result<bool, Error> {
        self.request(|respond_to| Command::IsConnected { id, respond_to })
            .await
    }

    /// Record a battery reading for a paired device. No-op when the id
    /// is not paired.
    pub async fn update_battery(&self, id: DeviceId, percent: u8) -> Result<(), Error> {
        self.messages
            .send(ManagerMessage::Command(Command::UpdateBattery { id, percent }))
            .await
            .map_err(|_| Error::ManagerClosed)
    }

    /// The measurement currently awaiting confirmation, if any.
    pub async fn pending_measurement(&self) -> Result<Option<RecordedMeasurement>, Error> {
        self.request(|respond_to| Command::PendingMeasurement { respond_to })
            .await
    }

    /// Confirm the pending measurement, handing it to the remote store.
    /// Returns the confirmed measurement, or `None` when nothing was
    /// pending.
    pub async fn confirm_pending(&self) -> Result<Option<RecordedMeasurement>, Error> {
        self.request(|respond_to| Command::ConfirmPending { respond_to })
            .await
    }

    /// Drop the pending measurement without persisting it.
    pub async fn discard_pending(&self) -> Result<Option<RecordedMeasurement>, Error> {
        self.request(|respond_to| Command::DiscardPending { respond_to })
            .await
    }

    /// Stop the manager task. Outstanding handles keep failing with
    /// [`Error::ManagerClosed`] afterwards.
    pub async fn shutdown(&self) -> Result<(), Error> {
        self.request(|respond_to| Command::Shutdown { respond_to })
            .await
    }

    /// Close the pairing session. Called from the session's `Drop`, so
    /// it cannot await; the command is queued best-effort.
    pub(crate) fn end_pairing(&self) {
        if let Err(e) = self
            .messages
            .try_send(ManagerMessage::Command(Command::EndPairing))
        {
            warn!("could not close pairing session cleanly: {e}");
        }
    }
}
