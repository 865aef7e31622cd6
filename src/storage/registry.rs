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

//! Durable registry of paired devices.
//!
//! The registry is the system of record for which devices belong to the
//! user. It is read in full at configure time and written through on
//! every mutation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::device::{DeviceId, DeviceKind};

/// Registry file within the data directory.
const REGISTRY_FILE: &str = "paired_devices.json";

/// Descriptive record of a paired device. Survives restarts; everything
/// needed to resolve and display the device without a live handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedDeviceInfo {
    pub id: DeviceId,
    /// Type tag, see [`DeviceKind::tag`].
    pub device_type: String,
    pub name: String,
    pub model: Option<String>,
    /// Asset name of the device illustration.
    pub icon: String,
    /// Last reported battery level, if the device has a battery service.
    pub battery_percent: Option<u8>,
    pub last_seen: DateTime<Utc>,
}

impl PairedDeviceInfo {
    /// Parse the stored type tag back into a kind.
    pub fn kind(&self) -> Option<DeviceKind> {
        DeviceKind::from_tag(&self.device_type)
    }
}

/// Errors from the paired-device registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry file corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// An implementation-specific failure, e.g. a backing service being
    /// unreachable.
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Durable key-value store of paired devices, at most one record per id.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Load every stored record, ordered by last-seen time.
    async fn load_all(&self) -> Result<Vec<PairedDeviceInfo>, RegistryError>;

    /// Insert or replace the record for `info.id`.
    async fn upsert(&self, info: PairedDeviceInfo) -> Result<(), RegistryError>;

    /// Remove the record for `id`. Removing an unknown id is a no-op.
    async fn remove(&self, id: DeviceId) -> Result<(), RegistryError>;
}

fn sorted(map: &HashMap<DeviceId, PairedDeviceInfo>) -> Vec<PairedDeviceInfo> {
    let mut records: Vec<_> = map.values().cloned().collect();
    records.sort_by_key(|info| (info.last_seen, info.id));
    records
}

/// File-backed registry: a JSON map keyed by device id, written through
/// on every mutation.
pub struct JsonRegistry {
    path: PathBuf,
    devices: RwLock<HashMap<DeviceId, PairedDeviceInfo>>,
}

impl JsonRegistry {
    /// Open (or create) the registry under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, RegistryError> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(REGISTRY_FILE);
        let devices = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };
        info!("paired-device registry at {:?}", path);
        Ok(Self {
            path,
            devices: RwLock::new(devices),
        })
    }

    fn save(&self) -> Result<(), RegistryError> {
        let json = serde_json::to_string_pretty(&*self.devices.read())?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[async_trait]
impl RegistryStore for JsonRegistry {
    async fn load_all(&self) -> Result<Vec<PairedDeviceInfo>, RegistryError> {
        Ok(sorted(&self.devices.read()))
    }

    async fn upsert(&self, info: PairedDeviceInfo) -> Result<(), RegistryError> {
        debug!("registry upsert {} ({})", info.name, info.id);
        self.devices.write().insert(info.id, info);
        self.save()
    }

    async fn remove(&self, id: DeviceId) -> Result<(), RegistryError> {
        if self.devices.write().remove(&id).is_some() {
            debug!("registry removed {}", id);
            self.save()?;
        }
        Ok(())
    }
}

/// In-memory registry for tests and previews.
#[derive(Default)]
pub struct MemoryRegistry {
    devices: RwLock<HashMap<DeviceId, PairedDeviceInfo>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistry {
    async fn load_all(&self) -> Result<Vec<PairedDeviceInfo>, RegistryError> {
        Ok(sorted(&self.devices.read()))
    }

    async fn upsert(&self, info: PairedDeviceInfo) -> Result<(), RegistryError> {
        self.devices.write().insert(info.id, info);
        Ok(())
    }

    async fn remove(&self, id: DeviceId) -> Result<(), RegistryError> {
        self.devices.write().remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    fn info(name: &str) -> PairedDeviceInfo {
        PairedDeviceInfo {
            id: DeviceId::new(),
            device_type: DeviceKind::BloodPressureCuff.tag().into(),
            name: name.into(),
            model: Some("BP5250".into()),
            icon: DeviceKind::BloodPressureCuff.icon().into(),
            battery_percent: Some(85),
            last_seen: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_json_registry_roundtrip() -> Result<()> {
        let dir = TempDir::new()?;
        let stored = info("Cuff");
        {
            let registry = JsonRegistry::open(dir.path())?;
            registry.upsert(stored.clone()).await?;
        }

        let reopened = JsonRegistry::open(dir.path())?;
        let records = reopened.load_all().await?;
        assert_eq!(records, vec![stored]);
        Ok(())
    }

    #[tokio::test]
    async fn test_json_registry_single_record_per_id() -> Result<()> {
        let dir = TempDir::new()?;
        let registry = JsonRegistry::open(dir.path())?;

        let mut record = info("Cuff");
        registry.upsert(record.clone()).await?;
        record.battery_percent = Some(12);
        registry.upsert(record.clone()).await?;

        let records = registry.load_all().await?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].battery_percent, Some(12));
        Ok(())
    }

    #[tokio::test]
    async fn test_json_registry_remove() -> Result<()> {
        let dir = TempDir::new()?;
        let registry = JsonRegistry::open(dir.path())?;
        let record = info("Cuff");
        registry.upsert(record.clone()).await?;

        registry.remove(record.id).await?;
        assert!(registry.load_all().await?.is_empty());

        // Removing again is a no-op.
        registry.remove(record.id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_json_registry_missing_file_is_empty() -> Result<()> {
        let dir = TempDir::new()?;
        let registry = JsonRegistry::open(dir.path())?;
        assert!(registry.load_all().await?.is_empty());
        Ok(())
    }

    #[test]
    fn test_json_registry_corrupt_file() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join(REGISTRY_FILE), "not json")?;
        assert!(matches!(
            JsonRegistry::open(dir.path()),
            Err(RegistryError::Corrupt(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_all_ordered_by_last_seen() -> Result<()> {
        let registry = MemoryRegistry::new();
        let mut older = info("Older");
        older.last_seen = Utc::now() - chrono::Duration::hours(1);
        let newer = info("Newer");
        registry.upsert(newer.clone()).await?;
        registry.upsert(older.clone()).await?;

        let names: Vec<_> = registry
            .load_all()
            .await?
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Older", "Newer"]);
        Ok(())
    }
}
