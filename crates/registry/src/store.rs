use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use blewatch_core::DeviceRecord;

use crate::error::RegistryError;

/// Persistence seam for the discovery registry.
///
/// The registry is always handled wholesale: one `load` at the start of
/// a poll cycle, one `save` at the end. There is no record-level access
/// and no locking across the load/save window; overlapping cycles are
/// not guarded against.
#[async_trait]
pub trait DiscoveryStore: Send + Sync {
    async fn load(&self) -> Result<Vec<DeviceRecord>, RegistryError>;
    async fn save(&self, records: &[DeviceRecord]) -> Result<(), RegistryError>;
}

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<DeviceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DiscoveryStore for MemoryStore {
    async fn load(&self) -> Result<Vec<DeviceRecord>, RegistryError> {
        Ok(self.records.read().clone())
    }

    async fn save(&self, records: &[DeviceRecord]) -> Result<(), RegistryError> {
        *self.records.write() = records.to_vec();
        Ok(())
    }
}

/// Whole-file JSON store. A missing file loads as an empty registry;
/// unreadable content is surfaced to the caller.
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DiscoveryStore for JsonStore {
    async fn load(&self) -> Result<Vec<DeviceRecord>, RegistryError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, records: &[DeviceRecord]) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
