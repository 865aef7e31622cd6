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

//! Scriptable in-process transport.
//!
//! Drives the device manager without a radio: tests and the simulator
//! binary script devices, link events and characteristic notifications,
//! and can make individual operations fail.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::channel::mpsc;
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::device::{ConnectionState, DeviceId, DeviceKind, ManufacturerInfo};
use crate::transport::{
    CharacteristicEvent, DiscoveredPeripheral, LinkChange, LinkEvent, Transport, TransportError,
};

/// A device the simulated transport knows about.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    pub id: DeviceId,
    pub kind: DeviceKind,
    pub name: String,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub advertisement: Option<Vec<u8>>,
}

impl SimulatedDevice {
    pub fn new(kind: DeviceKind, name: impl Into<String>) -> Self {
        Self {
            id: DeviceId::new(),
            kind,
            name: name.into(),
            model: Some(kind.default_model().into()),
            manufacturer: Some("Omron Healthcare".into()),
            advertisement: None,
        }
    }

    /// A device advertising in pairing mode, ready to be discovered.
    pub fn pairable(kind: DeviceKind, name: impl Into<String>) -> Self {
        Self::new(kind, name).with_advertisement(&ManufacturerInfo::pairing())
    }

    pub fn with_advertisement(mut self, info: &ManufacturerInfo) -> Self {
        self.advertisement = Some(info.encode());
        self
    }

    fn as_discovered(&self) -> DiscoveredPeripheral {
        DiscoveredPeripheral {
            id: self.id,
            kind: self.kind,
            name: self.name.clone(),
            model: self.model.clone(),
            manufacturer: self.manufacturer.clone(),
            advertisement: self.advertisement.clone(),
        }
    }
}

type SubKey = (DeviceId, Uuid);

#[derive(Default)]
struct Script {
    devices: HashMap<DeviceId, SimulatedDevice>,
    scan_tx: Option<mpsc::UnboundedSender<DiscoveredPeripheral>>,
    link_tx: Option<mpsc::UnboundedSender<LinkEvent>>,
    subscriptions: HashMap<SubKey, mpsc::UnboundedSender<CharacteristicEvent>>,
    last_notification: HashMap<SubKey, (u64, Vec<u8>)>,
    next_seq: HashMap<SubKey, u64>,
    connect_attempts: HashMap<DeviceId, usize>,
    disconnect_attempts: HashMap<DeviceId, usize>,
    time_writes: HashMap<DeviceId, usize>,
    complete_connects: bool,
    scan_fails: bool,
    connect_fails: HashSet<DeviceId>,
    subscribe_fails: HashSet<DeviceId>,
    unretrievable: HashSet<DeviceId>,
}

impl Script {
    fn push_link(&mut self, id: DeviceId, change: LinkChange) {
        if let Some(tx) = &self.link_tx {
            let _ = tx.unbounded_send(LinkEvent { id, change });
        }
    }
}

/// In-process [`Transport`] implementation driven by explicit script
/// calls.
///
/// By default `connect` and `disconnect` complete themselves by
/// emitting the matching link state events, the way a healthy radio
/// would. Tests that need manual control call
/// [`SimulatedTransport::set_complete_connects`] with `false` and drive
/// states via [`SimulatedTransport::drive_state`].
pub struct SimulatedTransport {
    script: Mutex<Script>,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                complete_connects: true,
                ..Script::default()
            }),
        }
    }

    /// Make a device known to the transport. If a scan is running and
    /// the device is advertising, it is reported immediately.
    pub fn add_device(&self, device: SimulatedDevice) {
        let mut script = self.script.lock();
        if device.advertisement.is_some() {
            if let Some(tx) = &script.scan_tx {
                let _ = tx.unbounded_send(device.as_discovered());
            }
        }
        script.devices.insert(device.id, device);
    }

    pub fn remove_device(&self, id: DeviceId) {
        self.script.lock().devices.remove(&id);
    }

    /// Report a known device on the active scan stream again, e.g. a
    /// fresh advertising burst. Returns whether anyone was scanning.
    pub fn discover(&self, id: DeviceId) -> bool {
        let script = self.script.lock();
        match (&script.scan_tx, script.devices.get(&id)) {
            (Some(tx), Some(device)) if !tx.is_closed() => {
                tx.unbounded_send(device.as_discovered()).is_ok()
            }
            _ => false,
        }
    }

    /// Emit a link state change for a device.
    pub fn drive_state(&self, id: DeviceId, state: ConnectionState) {
        debug!("sim: {} -> {}", id, state.as_str());
        self.script.lock().push_link(id, LinkChange::State(state));
    }

    /// Emit a manufacturer advertisement and remember it as the
    /// device's current one.
    pub fn advertise(&self, id: DeviceId, payload: Vec<u8>) {
        let mut script = self.script.lock();
        if let Some(device) = script.devices.get_mut(&id) {
            device.advertisement = Some(payload.clone());
        }
        script.push_link(id, LinkChange::Advertisement(payload));
    }

    /// Invalidate a peripheral, as the stack does when a device is
    /// gone for good.
    pub fn discard(&self, id: DeviceId) {
        self.script.lock().push_link(id, LinkChange::Discarded);
    }

    /// Deliver a characteristic notification. Returns false when nobody
    /// is subscribed.
    pub fn notify(&self, id: DeviceId, characteristic: Uuid, payload: Vec<u8>) -> bool {
        let mut script = self.script.lock();
        let key = (id, characteristic);
        let Some(tx) = script.subscriptions.get(&key).cloned() else {
            return false;
        };
        let counter = script.next_seq.entry(key).or_insert(0);
        let seq = *counter;
        *counter += 1;
        script.last_notification.insert(key, (seq, payload.clone()));
        tx.unbounded_send(CharacteristicEvent {
            payload,
            seq,
            retransmission: false,
        })
        .is_ok()
    }

    /// Re-deliver the last notification with the retransmission flag
    /// set. Returns false when nothing was ever delivered.
    pub fn notify_retransmission(&self, id: DeviceId, characteristic: Uuid) -> bool {
        let script = self.script.lock();
        let key = (id, characteristic);
        let (Some(tx), Some((seq, payload))) = (
            script.subscriptions.get(&key),
            script.last_notification.get(&key),
        ) else {
            return false;
        };
        tx.unbounded_send(CharacteristicEvent {
            payload: payload.clone(),
            seq: *seq,
            retransmission: true,
        })
        .is_ok()
    }

    /// Whether `connect`/`disconnect` emit their own link state events.
    pub fn set_complete_connects(&self, complete: bool) {
        self.script.lock().complete_connects = complete;
    }

    pub fn set_scan_failure(&self, fail: bool) {
        self.script.lock().scan_fails = fail;
    }

    pub fn set_connect_failure(&self, id: DeviceId, fail: bool) {
        let mut script = self.script.lock();
        if fail {
            script.connect_fails.insert(id);
        } else {
            script.connect_fails.remove(&id);
        }
    }

    pub fn set_subscribe_failure(&self, id: DeviceId, fail: bool) {
        let mut script = self.script.lock();
        if fail {
            script.subscribe_fails.insert(id);
        } else {
            script.subscribe_fails.remove(&id);
        }
    }

    /// Whether `retrieve` can produce a handle for this device.
    pub fn set_retrievable(&self, id: DeviceId, retrievable: bool) {
        let mut script = self.script.lock();
        if retrievable {
            script.unretrievable.remove(&id);
        } else {
            script.unretrievable.insert(id);
        }
    }

    pub fn connect_attempts(&self, id: DeviceId) -> usize {
        self.script.lock().connect_attempts.get(&id).copied().unwrap_or(0)
    }

    pub fn disconnect_attempts(&self, id: DeviceId) -> usize {
        self.script.lock().disconnect_attempts.get(&id).copied().unwrap_or(0)
    }

    pub fn time_writes(&self, id: DeviceId) -> usize {
        self.script.lock().time_writes.get(&id).copied().unwrap_or(0)
    }

    pub fn is_subscribed(&self, id: DeviceId, characteristic: Uuid) -> bool {
        self.script
            .lock()
            .subscriptions
            .get(&(id, characteristic))
            .is_some_and(|tx| !tx.is_closed())
    }

    pub fn scan_active(&self) -> bool {
        self.script
            .lock()
            .scan_tx
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn scan(&self) -> Result<BoxStream<'static, DiscoveredPeripheral>, TransportError> {
        let mut script = self.script.lock();
        if script.scan_fails {
            return Err(TransportError::Unavailable);
        }
        let (tx, rx) = mpsc::unbounded();
        // Devices already advertising show up right away, like a real
        // scan picking up periodic advertising bursts.
        for device in script.devices.values() {
            if device.advertisement.is_some() {
                let _ = tx.unbounded_send(device.as_discovered());
            }
        }
        script.scan_tx = Some(tx);
        debug!("sim: scan started");
        Ok(rx.boxed())
    }

    fn link_events(&self) -> BoxStream<'static, LinkEvent> {
        let (tx, rx) = mpsc::unbounded();
        self.script.lock().link_tx = Some(tx);
        rx.boxed()
    }

    async fn connect(&self, id: DeviceId) -> Result<(), TransportError> {
        let mut script = self.script.lock();
        *script.connect_attempts.entry(id).or_insert(0) += 1;
        if !script.devices.contains_key(&id) {
            return Err(TransportError::UnknownPeripheral(id));
        }
        if script.connect_fails.contains(&id) {
            return Err(TransportError::Link("scripted connect failure".into()));
        }
        if script.complete_connects {
            script.push_link(id, LinkChange::State(ConnectionState::Connecting));
            script.push_link(id, LinkChange::State(ConnectionState::Connected));
        }
        Ok(())
    }

    async fn disconnect(&self, id: DeviceId) -> Result<(), TransportError> {
        let mut script = self.script.lock();
        *script.disconnect_attempts.entry(id).or_insert(0) += 1;
        if !script.devices.contains_key(&id) {
            return Err(TransportError::UnknownPeripheral(id));
        }
        if script.complete_connects {
            script.push_link(id, LinkChange::State(ConnectionState::Disconnecting));
            script.push_link(id, LinkChange::State(ConnectionState::Disconnected));
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        id: DeviceId,
        characteristic: Uuid,
    ) -> Result<BoxStream<'static, CharacteristicEvent>, TransportError> {
        let mut script = self.script.lock();
        if !script.devices.contains_key(&id) {
            return Err(TransportError::UnknownPeripheral(id));
        }
        if script.subscribe_fails.contains(&id) {
            return Err(TransportError::UnsupportedCharacteristic { id, characteristic });
        }
        let (tx, rx) = mpsc::unbounded();
        script.subscriptions.insert((id, characteristic), tx);
        debug!("sim: subscribed {} on {}", characteristic, id);
        Ok(rx.boxed())
    }

    async fn write_time(&self, id: DeviceId, _now: DateTime<Utc>) -> Result<(), TransportError> {
        let mut script = self.script.lock();
        if !script.devices.contains_key(&id) {
            return Err(TransportError::UnknownPeripheral(id));
        }
        *script.time_writes.entry(id).or_insert(0) += 1;
        Ok(())
    }

    async fn retrieve(
        &self,
        id: DeviceId,
        kind: DeviceKind,
    ) -> Result<Option<DiscoveredPeripheral>, TransportError> {
        let script = self.script.lock();
        let device = script.devices.get(&id);
        Ok(device
            .filter(|d| d.kind == kind && !script.unretrievable.contains(&id))
            .map(SimulatedDevice::as_discovered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatt::uuids;

    #[tokio::test]
    async fn test_scan_reports_advertising_devices() {
        let transport = SimulatedTransport::new();
        let device = SimulatedDevice::pairable(DeviceKind::WeightScale, "Scale");
        let id = device.id;
        transport.add_device(device);

        let mut scan = transport.scan().await.unwrap();
        let hit = scan.next().await.unwrap();
        assert_eq!(hit.id, id);
        assert!(transport.scan_active());

        drop(scan);
        assert!(!transport.scan_active());
    }

    #[tokio::test]
    async fn test_connect_completes_itself() {
        let transport = SimulatedTransport::new();
        let device = SimulatedDevice::new(DeviceKind::BloodPressureCuff, "Cuff");
        let id = device.id;
        transport.add_device(device);

        let mut links = transport.link_events();
        transport.connect(id).await.unwrap();
        assert_eq!(transport.connect_attempts(id), 1);

        let first = links.next().await.unwrap();
        assert!(matches!(
            first.change,
            LinkChange::State(ConnectionState::Connecting)
        ));
        let second = links.next().await.unwrap();
        assert!(matches!(
            second.change,
            LinkChange::State(ConnectionState::Connected)
        ));
    }

    #[tokio::test]
    async fn test_connect_unknown_device() {
        let transport = SimulatedTransport::new();
        assert!(matches!(
            transport.connect(DeviceId::new()).await,
            Err(TransportError::UnknownPeripheral(_))
        ));
    }

    #[tokio::test]
    async fn test_notifications_carry_sequence() {
        let transport = SimulatedTransport::new();
        let device = SimulatedDevice::new(DeviceKind::BloodPressureCuff, "Cuff");
        let id = device.id;
        transport.add_device(device);

        let mut stream = transport
            .subscribe(id, uuids::BLOOD_PRESSURE_MEASUREMENT)
            .await
            .unwrap();
        assert!(transport.notify(id, uuids::BLOOD_PRESSURE_MEASUREMENT, vec![1]));
        assert!(transport.notify(id, uuids::BLOOD_PRESSURE_MEASUREMENT, vec![2]));
        assert!(transport.notify_retransmission(id, uuids::BLOOD_PRESSURE_MEASUREMENT));

        let first = stream.next().await.unwrap();
        assert_eq!((first.seq, first.retransmission), (0, false));
        let second = stream.next().await.unwrap();
        assert_eq!((second.seq, second.retransmission), (1, false));
        let replay = stream.next().await.unwrap();
        assert_eq!((replay.seq, replay.retransmission), (1, true));
        assert_eq!(replay.payload, second.payload);
    }

    #[tokio::test]
    async fn test_notify_without_subscription() {
        let transport = SimulatedTransport::new();
        let device = SimulatedDevice::new(DeviceKind::WeightScale, "Scale");
        let id = device.id;
        transport.add_device(device);
        assert!(!transport.notify(id, uuids::WEIGHT_MEASUREMENT, vec![0]));
    }

    #[tokio::test]
    async fn test_retrieve_respects_kind_and_script() {
        let transport = SimulatedTransport::new();
        let device = SimulatedDevice::new(DeviceKind::WeightScale, "Scale");
        let id = device.id;
        transport.add_device(device);

        assert!(transport
            .retrieve(id, DeviceKind::WeightScale)
            .await
            .unwrap()
            .is_some());
        assert!(transport
            .retrieve(id, DeviceKind::BloodPressureCuff)
            .await
            .unwrap()
            .is_none());

        transport.set_retrievable(id, false);
        assert!(transport
            .retrieve(id, DeviceKind::WeightScale)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let transport = SimulatedTransport::new();
        let device = SimulatedDevice::new(DeviceKind::BloodPressureCuff, "Cuff");
        let id = device.id;
        transport.add_device(device);

        transport.set_connect_failure(id, true);
        assert!(transport.connect(id).await.is_err());

        transport.set_subscribe_failure(id, true);
        assert!(transport
            .subscribe(id, uuids::BLOOD_PRESSURE_MEASUREMENT)
            .await
            .is_err());

        transport.set_scan_failure(true);
        assert!(transport.scan().await.is_err());
    }
}
