// In-process snapshot store
use crate::application::snapshot_store::{RawSnapshot, SnapshotStore, SnapshotVersion};
use crate::domain::error::{Result, TelemetryError};
use async_trait::async_trait;
use tokio::sync::{RwLock, watch};

/// Keeps the latest snapshot in memory. Used when no snapshot path is
/// configured.
pub struct MemorySnapshotStore {
    latest: RwLock<Option<RawSnapshot>>,
    version_tx: watch::Sender<Option<SnapshotVersion>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        let (version_tx, _) = watch::channel(None);
        Self {
            latest: RwLock::new(None),
            version_tx,
        }
    }
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn publish(&self, body: Vec<u8>) -> Result<SnapshotVersion> {
        let mut latest = self.latest.write().await;
        let version = latest
            .as_ref()
            .map_or_else(SnapshotVersion::first, |s| s.version.next());
        *latest = Some(RawSnapshot { version, body });
        self.version_tx.send_replace(Some(version));
        Ok(version)
    }

    fn current_version(&self) -> Option<SnapshotVersion> {
        *self.version_tx.borrow()
    }

    async fn read(&self) -> Result<RawSnapshot> {
        self.latest
            .read()
            .await
            .clone()
            .ok_or(TelemetryError::NotInitialized)
    }

    fn subscribe(&self) -> watch::Receiver<Option<SnapshotVersion>> {
        self.version_tx.subscribe()
    }
}
