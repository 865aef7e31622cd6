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

//! Transport abstraction over the BLE stack.
//!
//! The core never talks radio directly. A [`Transport`] adapter maps
//! scanning, connection management and characteristic subscriptions onto
//! whatever stack the host platform provides; the crate ships a
//! scriptable [`SimulatedTransport`] for tests and the simulator binary.

mod simulated;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use thiserror::Error;
use uuid::Uuid;

use crate::device::{ConnectionState, DeviceId, DeviceKind};

pub use simulated::{SimulatedDevice, SimulatedTransport};

/// Errors reported by a transport adapter.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The radio is powered off or the adapter is gone.
    #[error("transport powered off or unavailable")]
    Unavailable,

    /// The transport has no peripheral under this id.
    #[error("unknown peripheral {0}")]
    UnknownPeripheral(DeviceId),

    /// The operation needs an established link.
    #[error("peripheral {0} is not connected")]
    NotConnected(DeviceId),

    /// The peripheral does not offer the requested characteristic.
    #[error("peripheral {id} does not offer characteristic {characteristic}")]
    UnsupportedCharacteristic { id: DeviceId, characteristic: Uuid },

    /// A link-level failure, e.g. a dropped connection mid-operation.
    #[error("link failure: {0}")]
    Link(String),
}

/// A peripheral reported by a scan or an explicit retrieval.
///
/// The transport resolves the advertised GATT services to a
/// [`DeviceKind`]; devices matching no supported kind are never
/// reported.
#[derive(Debug, Clone)]
pub struct DiscoveredPeripheral {
    pub id: DeviceId,
    pub kind: DeviceKind,
    pub name: String,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    /// Raw manufacturer-specific advertisement block, company identifier
    /// already stripped.
    pub advertisement: Option<Vec<u8>>,
}

/// What changed about a peripheral link.
#[derive(Debug, Clone)]
pub enum LinkChange {
    /// The connection state machine moved.
    State(ConnectionState),
    /// A fresh manufacturer advertisement was observed.
    Advertisement(Vec<u8>),
    /// The transport invalidated the peripheral; any discovery state
    /// for it must be dropped.
    Discarded,
}

/// A link-level event for one peripheral.
#[derive(Debug, Clone)]
pub struct LinkEvent {
    pub id: DeviceId,
    pub change: LinkChange,
}

/// One characteristic notification.
#[derive(Debug, Clone)]
pub struct CharacteristicEvent {
    pub payload: Vec<u8>,
    /// Transport-assigned sequence number, monotonic per subscription.
    pub seq: u64,
    /// The transport re-delivered a notification it already delivered.
    /// Marked events must be ignored.
    pub retransmission: bool,
}

/// BLE stack adapter consumed by the device manager.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start scanning for supported peripherals. The stream yields
    /// devices as they advertise and ends when dropped.
    async fn scan(&self) -> Result<BoxStream<'static, DiscoveredPeripheral>, TransportError>;

    /// Link events for every peripheral this transport tracks.
    fn link_events(&self) -> BoxStream<'static, LinkEvent>;

    /// Initiate a connection. Completion is reported through
    /// [`Transport::link_events`].
    async fn connect(&self, id: DeviceId) -> Result<(), TransportError>;

    /// Initiate a disconnect.
    async fn disconnect(&self, id: DeviceId) -> Result<(), TransportError>;

    /// Subscribe to notifications of one characteristic.
    async fn subscribe(
        &self,
        id: DeviceId,
        characteristic: Uuid,
    ) -> Result<BoxStream<'static, CharacteristicEvent>, TransportError>;

    /// Write the current wall-clock to the device's Current Time
    /// characteristic.
    async fn write_time(&self, id: DeviceId, now: DateTime<Utc>) -> Result<(), TransportError>;

    /// Resolve a known id to a peripheral handle without scanning, e.g.
    /// for devices restored from the registry. `None` when the transport
    /// cannot produce one right now.
    async fn retrieve(
        &self,
        id: DeviceId,
        kind: DeviceKind,
    ) -> Result<Option<DiscoveredPeripheral>, TransportError>;
}
