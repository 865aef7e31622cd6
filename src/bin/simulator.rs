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

//! VitalBridge simulator.
//!
//! Walks the full device lifecycle against the simulated radio: pair a
//! blood pressure cuff, capture a reading, confirm it and show the
//! registry. Useful for exercising the manager without BLE hardware.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitalbridge::config::Config;
use vitalbridge::device::DeviceKind;
use vitalbridge::gatt::uuids;
use vitalbridge::storage::JsonRegistry;
use vitalbridge::transport::{SimulatedDevice, SimulatedTransport, Transport};
use vitalbridge::ManagerBuilder;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vitalbridge=info".parse().unwrap()),
        )
        .init();

    info!(
        "Starting VitalBridge simulator v{}...",
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded");

    // Registry backed by the data directory
    let registry = Arc::new(JsonRegistry::open(&config.data_dir)?);
    info!("Device registry opened");

    // Simulated radio with one cuff waiting to pair
    let transport = Arc::new(SimulatedTransport::new());
    let cuff = SimulatedDevice::pairable(DeviceKind::BloodPressureCuff, "BP5250 Cuff");
    let cuff_id = cuff.id;
    transport.add_device(cuff);

    let (handle, mut events) = ManagerBuilder::new()
        .transport(transport.clone() as Arc<dyn Transport>)
        .registry(registry)
        .config(config)
        .spawn();

    // Surface manager events as they arrive
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!("event: {:?}", event);
        }
    });

    handle.configure().await?;
    transport.discover(cuff_id);
    sleep(Duration::from_millis(100)).await;

    // Pair the cuff
    let mut session = handle.begin_pairing().await?;
    for candidate in session.candidates() {
        info!(
            "candidate: {} ({})",
            candidate.name,
            candidate.kind.display_name()
        );
    }
    let paired_id = session.pair().await?;
    info!("Paired {}", paired_id);
    drop(session);
    sleep(Duration::from_millis(100)).await;

    // The cuff takes a reading: 103/64 mmHg, pulse 62
    let reading = vec![0x04, 0x67, 0x00, 0x40, 0x00, 0x4D, 0x00, 0x3E, 0x00];
    transport.notify(paired_id, uuids::BLOOD_PRESSURE_MEASUREMENT, reading);
    sleep(Duration::from_millis(100)).await;

    if let Some(pending) = handle.pending_measurement().await? {
        info!(
            "Pending {}: {}",
            pending.measurement.kind_label(),
            pending.measurement.summary()
        );
        handle.confirm_pending().await?;
        info!("Reading confirmed and persisted");
    }

    for entry in handle.paired_devices().await? {
        info!(
            "Registered: {} ({}), last seen {}",
            entry.name, entry.device_type, entry.last_seen
        );
    }

    info!("Simulation complete. Press Ctrl-C to exit.");
    tokio::signal::ctrl_c().await?;
    handle.shutdown().await?;
    info!("VitalBridge simulator stopped");
    Ok(())
}
