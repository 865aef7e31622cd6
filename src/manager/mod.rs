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

//! The device manager task.
//!
//! One task owns all mutable device state: the discovered set, the
//! live-handle table, the paired-device cache and the pending
//! measurement. Commands from [`ManagerHandle`] and transport events are
//! funneled through a single queue, so no operation ever observes
//! half-applied state.

mod handle;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::device::{ConnectionState, DeviceId, DeviceKind, ManufacturerInfo, Peripheral};
use crate::error::Error;
use crate::gatt::{battery, uuids};
use crate::measurement::{PendingMeasurement, RecordedMeasurement};
use crate::pairing::PairingCandidate;
use crate::storage::{
    LoggingRemoteStore, MemoryRegistry, Notification, PairedDeviceInfo, RegistryStore, RemoteStore,
};
use crate::transport::{
    CharacteristicEvent, DiscoveredPeripheral, LinkChange, LinkEvent, Transport, TransportError,
};

pub(crate) use handle::Command;
pub use handle::ManagerHandle;

const MESSAGE_QUEUE_DEPTH: usize = 64;
const EVENT_QUEUE_DEPTH: usize = 64;

/// Events pushed to the embedding application.
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    /// A pairable device appeared nearby.
    DeviceDiscovered {
        id: DeviceId,
        kind: DeviceKind,
        name: String,
    },
    /// A discovered device is gone (invalidated, forgotten or the
    /// pairing session closed).
    DeviceDiscarded { id: DeviceId },
    /// A peripheral's connection state moved.
    StateChanged {
        id: DeviceId,
        state: ConnectionState,
    },
    /// A paired device reported a battery level.
    BatteryUpdated { id: DeviceId, percent: u8 },
    /// A measurement was decoded and is awaiting confirmation.
    MeasurementReady(RecordedMeasurement),
    /// The set of paired devices changed.
    PairedChanged,
}

/// Everything that can land in the manager's queue.
pub(crate) enum ManagerMessage {
    Command(Command),
    Discovered(DiscoveredPeripheral),
    Link(LinkEvent),
    Notification {
        id: DeviceId,
        characteristic: Uuid,
        event: CharacteristicEvent,
    },
    ConnectFinished {
        id: DeviceId,
        result: Result<(), TransportError>,
    },
}

/// Builds and spawns a [`DeviceManager`].
pub struct ManagerBuilder {
    transport: Option<Arc<dyn Transport>>,
    registry: Arc<dyn RegistryStore>,
    remote: Arc<dyn RemoteStore>,
    config: Config,
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            registry: Arc::new(MemoryRegistry::new()),
            remote: Arc::new(LoggingRemoteStore),
            config: Config::default(),
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn registry(mut self, registry: Arc<dyn RegistryStore>) -> Self {
        self.registry = registry;
        self
    }

    pub fn remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = remote;
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Spawn the manager task. Must be called within a Tokio runtime.
    pub fn spawn(self) -> (ManagerHandle, mpsc::Receiver<ManagerEvent>) {
        let (msg_tx, msg_rx) = mpsc::channel(MESSAGE_QUEUE_DEPTH);
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let handle = ManagerHandle::new(msg_tx.clone(), self.transport.clone());
        let manager = DeviceManager {
            transport: self.transport,
            registry: self.registry,
            remote: self.remote,
            config: self.config,
            msg_tx,
            msg_rx,
            event_tx,
            paired: Vec::new(),
            discovered: Vec::new(),
            peripherals: HashMap::new(),
            connects_in_flight: HashSet::new(),
            subscriptions: HashMap::new(),
            pending: PendingMeasurement::new(),
            pairing_active: false,
            scan_task: None,
            link_task: None,
        };
        tokio::spawn(manager.run());
        (handle, event_rx)
    }
}

/// The manager task state. Constructed via [`ManagerBuilder`], driven by
/// [`DeviceManager::run`] until shutdown.
pub struct DeviceManager {
    transport: Option<Arc<dyn Transport>>,
    registry: Arc<dyn RegistryStore>,
    remote: Arc<dyn RemoteStore>,
    config: Config,
    msg_tx: mpsc::Sender<ManagerMessage>,
    msg_rx: mpsc::Receiver<ManagerMessage>,
    event_tx: mpsc::Sender<ManagerEvent>,

    /// Mirror of the registry, in last-seen order.
    paired: Vec<PairedDeviceInfo>,
    /// Pairable devices surfaced to the pairing workflow, insertion
    /// ordered.
    discovered: Vec<Peripheral>,
    /// Live handles of registered (paired) devices.
    peripherals: HashMap<DeviceId, Peripheral>,
    connects_in_flight: HashSet<DeviceId>,
    subscriptions: HashMap<DeviceId, Vec<JoinHandle<()>>>,
    pending: PendingMeasurement,
    pairing_active: bool,
    scan_task: Option<JoinHandle<()>>,
    link_task: Option<JoinHandle<()>>,
}

impl DeviceManager {
    async fn run(mut self) {
        self.start_link_forwarder();
        while let Some(message) = self.msg_rx.recv().await {
            match message {
                ManagerMessage::Command(command) => {
                    if !self.handle_command(command).await {
                        break;
                    }
                }
                ManagerMessage::Discovered(found) => self.on_discovered(found),
                ManagerMessage::Link(event) => self.on_link_event(event).await,
                ManagerMessage::Notification {
                    id,
                    characteristic,
                    event,
                } => self.on_notification(id, characteristic, event).await,
                ManagerMessage::ConnectFinished { id, result } => {
                    self.on_connect_finished(id, result)
                }
            }
        }
        self.teardown();
        debug!("device manager stopped");
    }

    /// Serve one command. Returns false when the manager should stop.
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Configure { respond_to } => {
                let _ = respond_to.send(self.configure().await);
            }
            Command::BeginPairing { respond_to } => self.begin_pairing(respond_to).await,
            Command::EndPairing => self.end_pairing().await,
            Command::RegisterPaired { id, respond_to } => {
                let _ = respond_to.send(self.register_paired(id).await);
            }
            Command::Forget { id, respond_to } => {
                let _ = respond_to.send(self.forget(id).await);
            }
            Command::PairedDevices { respond_to } => {
                let _ = respond_to.send(self.paired.clone());
            }
            Command::DiscoveredDevices { respond_to } => {
                let candidates = self
                    .discovered
                    .iter()
                    .map(PairingCandidate::from_peripheral)
                    .collect();
                let _ = respond_to.send(candidates);
            }
            Command::IsConnected { id, respond_to } => {
                let connected = self
                    .peripherals
                    .get(&id)
                    .is_some_and(|p| p.state() == ConnectionState::Connected);
                let _ = respond_to.send(connected);
            }
            Command::UpdateBattery { id, percent } => self.update_battery(id, percent).await,
            Command::PendingMeasurement { respond_to } => {
                let _ = respond_to.send(self.pending.peek().cloned());
            }
            Command::ConfirmPending { respond_to } => {
                let _ = respond_to.send(self.confirm_pending());
            }
            Command::DiscardPending { respond_to } => {
                let _ = respond_to.send(self.discard_pending());
            }
            Command::Shutdown { respond_to } => {
                let _ = respond_to.send(());
                return false;
            }
        }
        true
    }

    /// Load the registry and bring every stored device back to life:
    /// resolve a handle through the transport and initiate a connect.
    /// Entries that fail to resolve are skipped and retried on the next
    /// call.
    async fn configure(&mut self) -> Result<(), Error> {
        self.paired = self.registry.load_all().await?;
        info!("configuring {} paired device(s)", self.paired.len());

        let Some(transport) = self.transport.clone() else {
            warn!("device manager configured without a transport, device features disabled");
            return Ok(());
        };

        for info in self.paired.clone() {
            if self.peripherals.contains_key(&info.id) {
                continue;
            }
            let Some(kind) = info.kind() else {
                let err = Error::UnknownDeviceType {
                    tag: info.device_type.clone(),
                };
                warn!("skipping {}: {err}", info.name);
                continue;
            };
            match transport.retrieve(info.id, kind).await {
                Ok(Some(found)) => {
                    let peripheral = Peripheral::from_discovered(found);
                    if let Err(e) = self.insert_peripheral(peripheral) {
                        warn!("{e}");
                        continue;
                    }
                    self.spawn_connect(info.id);
                }
                Ok(None) => {
                    let err = Error::ResolutionFailed { id: info.id };
                    warn!("{err} ({}), retrying on next configure", info.name);
                }
                Err(e) => warn!("transport failed retrieving {} ({}): {e}", info.id, info.name),
            }
        }
        self.refresh_scan().await;
        Ok(())
    }

    async fn begin_pairing(
        &mut self,
        respond_to: oneshot::Sender<Result<Vec<PairingCandidate>, Error>>,
    ) {
        let result = if self.transport.is_none() {
            Err(Error::TransportUnavailable)
        } else if self.pairing_active {
            Err(Error::PairingInProgress)
        } else if self.discovered.is_empty() {
            Err(Error::NoPairableDevices)
        } else {
            Ok(self
                .discovered
                .iter()
                .map(PairingCandidate::from_peripheral)
                .collect::<Vec<_>>())
        };
        let opened = result.is_ok();
        // Only mark the session open if the caller is still listening.
        if respond_to.send(result).is_ok() && opened {
            self.pairing_active = true;
            info!("pairing session opened");
            self.refresh_scan().await;
        }
    }

    /// Close the pairing session and flush the discovered set.
    async fn end_pairing(&mut self) {
        if !self.pairing_active {
            return;
        }
        self.pairing_active = false;
        info!("pairing session closed");
        let dropped: Vec<DeviceId> = self.discovered.drain(..).map(|p| p.id()).collect();
        for id in dropped {
            self.emit(ManagerEvent::DeviceDiscarded { id });
        }
        self.refresh_scan().await;
    }

    /// Commit a paired device: durable registry record first, then the
    /// in-memory moves. A registry failure leaves everything untouched,
    /// so the candidate stays available for a retry.
    async fn register_paired(&mut self, id: DeviceId) -> Result<(), Error> {
        let Some(position) = self.discovered.iter().position(|p| p.id() == id) else {
            return Err(Error::PairingFailed {
                reason: format!("device {id} is no longer discovered"),
            });
        };
        if self.peripherals.contains_key(&id) {
            debug_assert!(false, "live handle already registered for {id}");
            return Err(Error::DuplicateRegistration { id });
        }

        let info = {
            let peripheral = &self.discovered[position];
            PairedDeviceInfo {
                id,
                device_type: peripheral.kind().tag().to_owned(),
                name: peripheral.name().to_owned(),
                model: peripheral.model().map(str::to_owned),
                icon: peripheral.kind().icon().to_owned(),
                battery_percent: peripheral.battery_percent(),
                last_seen: Utc::now(),
            }
        };
        self.registry.upsert(info.clone()).await?;

        let peripheral = self.discovered.remove(position);
        let name = peripheral.name().to_owned();
        let connected = peripheral.state() == ConnectionState::Connected;
        match self.paired.iter_mut().find(|entry| entry.id == id) {
            Some(existing) => *existing = info,
            None => self.paired.push(info),
        }
        self.peripherals.insert(id, peripheral);
        if connected {
            self.setup_subscriptions(id);
        }
        info!("paired {name} ({id})");
        self.emit(ManagerEvent::PairedChanged);
        self.refresh_scan().await;
        Ok(())
    }

    /// Remove a device everywhere. Unknown ids are a no-op.
    async fn forget(&mut self, id: DeviceId) -> Result<(), Error> {
        let discovered_position = self.discovered.iter().position(|p| p.id() == id);
        let was_paired = self.is_paired(id);
        if !was_paired && discovered_position.is_none() && !self.peripherals.contains_key(&id) {
            return Ok(());
        }

        self.registry.remove(id).await?;
        self.paired.retain(|info| info.id != id);
        self.drop_subscriptions(id);
        self.connects_in_flight.remove(&id);

        if self.peripherals.remove(&id).is_some() {
            if let Some(transport) = self.transport.clone() {
                tokio::spawn(async move {
                    if let Err(e) = transport.disconnect(id).await {
                        debug!("disconnect of forgotten device {id} failed: {e}");
                    }
                });
            }
        }
        if let Some(position) = discovered_position {
            self.discovered.remove(position);
            self.emit(ManagerEvent::DeviceDiscarded { id });
        }
        if was_paired {
            info!("forgot device {id}");
            self.emit(ManagerEvent::PairedChanged);
        }
        self.refresh_scan().await;
        Ok(())
    }

    /// A scan hit. Devices advertising pairing mode are surfaced to the
    /// pairing workflow; everything else only refreshes cached data.
    fn on_discovered(&mut self, found: DiscoveredPeripheral) {
        if let Some(existing) = self.discovered.iter_mut().find(|p| p.id() == found.id) {
            if let Some(payload) = &found.advertisement {
                existing.update_advertisement(payload);
            }
            return;
        }
        if self.is_paired(found.id) {
            return;
        }
        let Some(info) = found
            .advertisement
            .as_deref()
            .and_then(ManufacturerInfo::decode)
        else {
            debug!("scan hit {} without a readable advertisement", found.id);
            return;
        };
        if !info.pairing_mode {
            debug!("{} is not in pairing mode", found.id);
            return;
        }
        self.nearby_pairable(found);
    }

    /// Surface a pairable device, unless it is already discovered or
    /// paired. Safe to call repeatedly with the same device.
    fn nearby_pairable(&mut self, found: DiscoveredPeripheral) {
        if self.discovered.iter().any(|p| p.id() == found.id) || self.is_paired(found.id) {
            return;
        }
        info!(
            "detected nearby {} \"{}\"",
            found.kind.display_name(),
            found.name
        );
        let peripheral = Peripheral::from_discovered(found);
        self.emit(ManagerEvent::DeviceDiscovered {
            id: peripheral.id(),
            kind: peripheral.kind(),
            name: peripheral.name().to_owned(),
        });
        self.discovered.push(peripheral);
    }

    async fn on_link_event(&mut self, event: LinkEvent) {
        match event.change {
            LinkChange::State(state) => self.on_state_changed(event.id, state).await,
            LinkChange::Advertisement(payload) => self.on_advertisement(event.id, &payload),
            LinkChange::Discarded => self.on_discarded(event.id),
        }
    }

    async fn on_state_changed(&mut self, id: DeviceId, state: ConnectionState) {
        let (live, transition) = if let Some(peripheral) = self.peripherals.get_mut(&id) {
            (true, peripheral.apply_state(state))
        } else if let Some(peripheral) = self.discovered.iter_mut().find(|p| p.id() == id) {
            (false, peripheral.apply_state(state))
        } else {
            debug!("state event for unknown device {id}, dropped");
            return;
        };
        if transition.is_noop() {
            return;
        }
        debug!(
            "{id} {} -> {}",
            transition.from.as_str(),
            transition.to.as_str()
        );
        self.emit(ManagerEvent::StateChanged { id, state });

        // Supervision applies to registered devices only; candidates are
        // driven by their pairing session.
        if !live {
            return;
        }
        if transition.entered_connected() {
            self.on_device_connected(id);
        } else if transition.lost_link() {
            self.on_link_lost(id).await;
        }
    }

    fn on_device_connected(&mut self, id: DeviceId) {
        let Some(peripheral) = self.peripherals.get(&id) else {
            return;
        };
        info!("{} ({id}) connected", peripheral.name());
        if peripheral.kind().capabilities().time_syncable {
            self.spawn_time_write(id);
        }
        self.setup_subscriptions(id);
    }

    /// A paired device dropped an established link: stamp last-seen and
    /// schedule exactly one reconnect attempt. Failed attempts are
    /// retried lazily on the next disconnect, never on a timer.
    async fn on_link_lost(&mut self, id: DeviceId) {
        self.drop_subscriptions(id);
        let Some(position) = self.paired.iter().position(|info| info.id == id) else {
            return;
        };
        self.paired[position].last_seen = Utc::now();
        let info = self.paired[position].clone();
        if let Err(e) = self.registry.upsert(info).await {
            warn!("could not persist last-seen for {id}: {e}");
        }
        if self.config.reconnect.auto {
            self.spawn_connect(id);
        }
    }

    fn on_advertisement(&mut self, id: DeviceId, payload: &[u8]) {
        if let Some(peripheral) = self.peripherals.get_mut(&id) {
            peripheral.update_advertisement(payload);
        } else if let Some(peripheral) = self.discovered.iter_mut().find(|p| p.id() == id) {
            peripheral.update_advertisement(payload);
        } else {
            debug!("advertisement for unknown device {id}, dropped");
        }
    }

    /// The transport invalidated a peripheral; drop it from discovery.
    fn on_discarded(&mut self, id: DeviceId) {
        if let Some(position) = self.discovered.iter().position(|p| p.id() == id) {
            let peripheral = self.discovered.remove(position);
            info!("transport discarded {} ({id})", peripheral.name());
            self.emit(ManagerEvent::DeviceDiscarded { id });
        }
    }

    async fn on_notification(
        &mut self,
        id: DeviceId,
        characteristic: Uuid,
        event: CharacteristicEvent,
    ) {
        if event.retransmission {
            debug!("dropping retransmitted notification seq {} from {id}", event.seq);
            return;
        }
        let Some(peripheral) = self.peripherals.get_mut(&id) else {
            debug!("notification for unregistered device {id}, dropped");
            return;
        };
        let kind = peripheral.kind();

        if characteristic == uuids::BATTERY_LEVEL {
            match battery::decode(&event.payload) {
                Ok(percent) => self.update_battery(id, percent).await,
                Err(e) => warn!(
                    "dropping battery payload from {id}: {e} ({})",
                    hex::encode(&event.payload)
                ),
            }
        } else if characteristic == kind.measurement_characteristic() {
            match kind.decode_measurement(&event.payload) {
                Ok(measurement) => {
                    let recorded = RecordedMeasurement {
                        measurement,
                        device: peripheral.snapshot(),
                        seq: event.seq,
                        received_at: Utc::now(),
                    };
                    info!(
                        "{} measurement from {}: {}",
                        recorded.measurement.kind_label(),
                        recorded.device.name,
                        recorded.measurement.summary()
                    );
                    if let Some(displaced) = self.pending.replace(recorded.clone()) {
                        warn!(
                            "unconfirmed {} measurement (seq {}) replaced by a newer reading",
                            displaced.measurement.kind_label(),
                            displaced.seq
                        );
                    }
                    self.emit(ManagerEvent::MeasurementReady(recorded));
                }
                Err(e) => warn!(
                    "dropping {} payload from {id}: {e} ({})",
                    kind.display_name(),
                    hex::encode(&event.payload)
                ),
            }
        } else {
            debug!("notification for unhandled characteristic {characteristic} from {id}");
        }
    }

    /// Record a battery level for a paired device; refreshes last-seen.
    /// Ignored for unpaired ids.
    async fn update_battery(&mut self, id: DeviceId, percent: u8) {
        if let Some(peripheral) = self.peripherals.get_mut(&id) {
            peripheral.set_battery(percent);
        }
        let Some(position) = self.paired.iter().position(|info| info.id == id) else {
            debug!("battery update for unpaired device {id}, ignored");
            return;
        };
        let entry = &mut self.paired[position];
        entry.battery_percent = Some(percent);
        entry.last_seen = Utc::now();
        let info = entry.clone();
        debug!("battery of {} now {percent}%", info.name);
        if let Err(e) = self.registry.upsert(info).await {
            warn!("could not persist battery level for {id}: {e}");
        }
        self.emit(ManagerEvent::BatteryUpdated { id, percent });
    }

    fn confirm_pending(&mut self) -> Option<RecordedMeasurement> {
        let recorded = self.pending.take()?;
        info!(
            "confirmed {} measurement from {}",
            recorded.measurement.kind_label(),
            recorded.device.name
        );
        let remote = self.remote.clone();
        let to_store = recorded.clone();
        // Fire and forget: delivery failures are logged, not retried.
        tokio::spawn(async move {
            if let Err(e) = remote.persist_measurement(&to_store).await {
                error!("could not persist measurement: {e}");
            }
            let notification = Notification::for_measurement(&to_store);
            if let Err(e) = remote.persist_notification(&notification).await {
                error!("could not persist notification: {e}");
            }
        });
        Some(recorded)
    }

    fn discard_pending(&mut self) -> Option<RecordedMeasurement> {
        let recorded = self.pending.take()?;
        info!(
            "discarded unconfirmed {} measurement",
            recorded.measurement.kind_label()
        );
        Some(recorded)
    }

    fn is_paired(&self, id: DeviceId) -> bool {
        self.paired.iter().any(|info| info.id == id)
    }

    /// Register a live handle, rejecting duplicates.
    fn insert_peripheral(&mut self, peripheral: Peripheral) -> Result<(), Error> {
        let id = peripheral.id();
        if self.peripherals.contains_key(&id) {
            debug_assert!(false, "live handle already registered for {id}");
            return Err(Error::DuplicateRegistration { id });
        }
        self.peripherals.insert(id, peripheral);
        Ok(())
    }

    /// Start a connect attempt unless one is already in flight.
    fn spawn_connect(&mut self, id: DeviceId) {
        let Some(transport) = self.transport.clone() else {
            return;
        };
        if !self.connects_in_flight.insert(id) {
            debug!("connect already in flight for {id}");
            return;
        }
        debug!("connecting {id}");
        let tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let result = transport.connect(id).await;
            let _ = tx.send(ManagerMessage::ConnectFinished { id, result }).await;
        });
    }

    fn on_connect_finished(&mut self, id: DeviceId, result: Result<(), TransportError>) {
        self.connects_in_flight.remove(&id);
        if !self.peripherals.contains_key(&id) {
            // The device was forgotten while the connect was in flight.
            debug!("connect completion for unregistered device {id}, dropped");
            return;
        }
        if let Err(e) = result {
            warn!("connect to {id} failed: {e}, retrying on next link event");
        }
    }

    /// Subscribe to the characteristics this device's kind offers.
    /// Each subscription runs as a forwarder task into the queue.
    fn setup_subscriptions(&mut self, id: DeviceId) {
        let Some(transport) = self.transport.clone() else {
            return;
        };
        let Some(peripheral) = self.peripherals.get(&id) else {
            return;
        };
        let kind = peripheral.kind();
        let capabilities = kind.capabilities();
        let mut characteristics = Vec::new();
        if capabilities.measurement_source {
            characteristics.push(kind.measurement_characteristic());
        }
        if capabilities.battery_powered {
            characteristics.push(uuids::BATTERY_LEVEL);
        }

        self.drop_subscriptions(id);
        let mut tasks = Vec::with_capacity(characteristics.len());
        for characteristic in characteristics {
            let transport = transport.clone();
            let tx = self.msg_tx.clone();
            tasks.push(tokio::spawn(async move {
                match transport.subscribe(id, characteristic).await {
                    Ok(mut stream) => {
                        while let Some(event) = stream.next().await {
                            let message = ManagerMessage::Notification {
                                id,
                                characteristic,
                                event,
                            };
                            if tx.send(message).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => warn!("subscription to {characteristic} on {id} failed: {e}"),
                }
            }));
        }
        self.subscriptions.insert(id, tasks);
    }

    fn drop_subscriptions(&mut self, id: DeviceId) {
        if let Some(tasks) = self.subscriptions.remove(&id) {
            for task in tasks {
                task.abort();
            }
        }
    }

    fn spawn_time_write(&self, id: DeviceId) {
        let Some(transport) = self.transport.clone() else {
            return;
        };
        tokio::spawn(async move {
            match transport.write_time(id, Utc::now()).await {
                Ok(()) => debug!("synchronized clock of {id}"),
                Err(e) => warn!("clock sync for {id} failed: {e}"),
            }
        });
    }

    /// Scanning runs while no device is paired (first-run experience)
    /// or a pairing session is open.
    fn should_scan(&self) -> bool {
        (self.paired.is_empty() && self.config.discovery.scan_when_unpaired)
            || self.pairing_active
    }

    async fn refresh_scan(&mut self) {
        match (self.should_scan(), self.scan_task.is_some()) {
            (true, false) => self.start_scan().await,
            (false, true) => self.stop_scan(),
            _ => {}
        }
    }

    async fn start_scan(&mut self) {
        let Some(transport) = self.transport.clone() else {
            return;
        };
        match transport.scan().await {
            Ok(mut stream) => {
                info!("scanning for nearby devices");
                let tx = self.msg_tx.clone();
                self.scan_task = Some(tokio::spawn(async move {
                    while let Some(found) = stream.next().await {
                        if tx.send(ManagerMessage::Discovered(found)).await.is_err() {
                            break;
                        }
                    }
                }));
            }
            Err(e) => warn!("could not start discovery scan: {e}"),
        }
    }

    fn stop_scan(&mut self) {
        if let Some(task) = self.scan_task.take() {
            task.abort();
            info!("stopped scanning");
        }
    }

    fn start_link_forwarder(&mut self) {
        let Some(transport) = &self.transport else {
            return;
        };
        let mut stream = transport.link_events();
        let tx = self.msg_tx.clone();
        self.link_task = Some(tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if tx.send(ManagerMessage::Link(event)).await.is_err() {
                    break;
                }
            }
        }));
    }

    fn teardown(&mut self) {
        self.stop_scan();
        if let Some(task) = self.link_task.take() {
            task.abort();
        }
        let ids: Vec<DeviceId> = self.subscriptions.keys().copied().collect();
        for id in ids {
            self.drop_subscriptions(id);
        }
    }

    fn emit(&self, event: ManagerEvent) {
        use mpsc::error::TrySendError;
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!("event consumer lagging, dropped {event:?}"),
            Err(TrySendError::Closed(_)) => debug!("no event consumer, event dropped"),
        }
    }
}
