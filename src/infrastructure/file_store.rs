// On-disk snapshot store
use crate::application::snapshot_store::{RawSnapshot, SnapshotStore, SnapshotVersion};
use crate::domain::error::{Result, TelemetryError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{RwLock, watch};

/// Snapshot persisted as a single CSV file.
///
/// Publish writes a sibling temp file and renames it over the target, so the
/// file on disk is always a complete table. Versions are counted here rather
/// than derived from file mtimes.
pub struct CsvFileStore {
    path: PathBuf,
    tmp_path: PathBuf,
    // Held for write across rename + version bump, for read across version + read
    io_lock: RwLock<()>,
    version_tx: watch::Sender<Option<SnapshotVersion>>,
}

impl CsvFileStore {
    /// Open a store at `path`. An existing file is adopted as version 1.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let existing = fs::try_exists(&path).await?;
        let initial = existing.then(SnapshotVersion::first);
        if existing {
            tracing::info!(path = %path.display(), "adopting existing snapshot");
        }

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        let (version_tx, _) = watch::channel(initial);
        Ok(Self {
            path,
            tmp_path,
            io_lock: RwLock::new(()),
            version_tx,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for CsvFileStore {
    async fn publish(&self, body: Vec<u8>) -> Result<SnapshotVersion> {
        let _guard = self.io_lock.write().await;

        let mut file = fs::File::create(&self.tmp_path).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&self.tmp_path, &self.path).await?;

        let version = self
            .current_version()
            .map_or_else(SnapshotVersion::first, SnapshotVersion::next);
        self.version_tx.send_replace(Some(version));

        tracing::debug!(path = %self.path.display(), %version, bytes = body.len(), "snapshot published");
        Ok(version)
    }

    fn current_version(&self) -> Option<SnapshotVersion> {
        *self.version_tx.borrow()
    }

    async fn read(&self) -> Result<RawSnapshot> {
        let _guard = self.io_lock.read().await;
        let version = self.current_version().ok_or(TelemetryError::NotInitialized)?;
        let body = fs::read(&self.path).await?;
        Ok(RawSnapshot { version, body })
    }

    fn subscribe(&self) -> watch::Receiver<Option<SnapshotVersion>> {
        self.version_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_replaces_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("beaches.csv");
        let store = CsvFileStore::open(&path).await.unwrap();

        assert_eq!(store.current_version(), None);
        assert_eq!(store.read().await.unwrap_err(), TelemetryError::NotInitialized);

        let v1 = store.publish(b"h\n1\n2\n3\n".to_vec()).await.unwrap();
        let v2 = store.publish(b"h\n4\n".to_vec()).await.unwrap();
        assert_eq!(v1, SnapshotVersion(1));
        assert_eq!(v2, SnapshotVersion(2));

        let snapshot = store.read().await.unwrap();
        assert_eq!(snapshot.version, v2);
        assert_eq!(snapshot.body, b"h\n4\n");
        assert_eq!(std::fs::read(&path).unwrap(), b"h\n4\n");
        assert!(!dir.path().join("data").join("beaches.csv.tmp").exists());
    }

    #[tokio::test]
    async fn test_existing_file_is_adopted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stock.csv");
        std::fs::write(&path, "Company,Ticker,RegularMarketPrice,Time\n").unwrap();

        let store = CsvFileStore::open(&path).await.unwrap();
        assert_eq!(store.current_version(), Some(SnapshotVersion::first()));
        let next = store.publish(Vec::new()).await.unwrap();
        assert_eq!(next, SnapshotVersion(2));
    }

    #[tokio::test]
    async fn test_reader_versions_are_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(CsvFileStore::open(dir.path().join("w.csv")).await.unwrap());
        store.publish(b"0".to_vec()).await.unwrap();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..20u8 {
                    store.publish(vec![i]).await.unwrap();
                }
            })
        };

        let mut last = SnapshotVersion(0);
        for _ in 0..50 {
            let snapshot = store.read().await.unwrap();
            assert!(snapshot.version >= last);
            last = snapshot.version;
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();
        assert_eq!(store.current_version(), Some(SnapshotVersion(21)));
    }
}
