// Repository trait for the published snapshot
use crate::domain::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

/// Monotonic publication counter. Starts at 1 for the first publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SnapshotVersion(pub u64);

impl SnapshotVersion {
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Encoded snapshot bytes together with the version they were published as
#[derive(Debug, Clone)]
pub struct RawSnapshot {
    pub version: SnapshotVersion,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Replace the whole snapshot. Readers see either the old or the new
    /// body, never a mix. Returns the new version.
    async fn publish(&self, body: Vec<u8>) -> Result<SnapshotVersion>;

    /// Latest published version, `None` before the first publish
    fn current_version(&self) -> Option<SnapshotVersion>;

    /// Latest body with its version; `NotInitialized` before the first publish
    async fn read(&self) -> Result<RawSnapshot>;

    /// Change notifications carrying the latest version
    fn subscribe(&self) -> watch::Receiver<Option<SnapshotVersion>>;
}
