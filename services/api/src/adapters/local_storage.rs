//! services/api/src/adapters/local_storage.rs
//!
//! File-backed implementation of the `KeyValueStorage` port. Every device gets its own
//! directory under `<DATA_DIR>/devices/<device id>/`, and every key is one JSON file
//! inside it, so a device's saved events survive reconnects and server restarts.

use async_trait::async_trait;
use festival_planner_core::ports::{DeviceStorageProvider, KeyValueStorage, PortError, PortResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// The slot store of a single device.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PortResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(PortError::Unexpected(format!("Invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PortError::Unexpected(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Write-then-rename so a crash never leaves a half-written slot behind.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}

/// Hands out `FileStorage` instances rooted under one data directory.
#[derive(Clone, Debug)]
pub struct FileStorageProvider {
    root: PathBuf,
}

impl FileStorageProvider {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join("devices"),
        }
    }
}

impl DeviceStorageProvider for FileStorageProvider {
    fn storage_for(&self, device_id: Uuid) -> Arc<dyn KeyValueStorage> {
        Arc::new(FileStorage::new(self.root.join(device_id.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("device"));
        assert_eq!(storage.get_item("bfp_saved_events").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_overwrites_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("device"));
        storage.set_item("bfp_saved_events", "[]").await.unwrap();
        storage.set_item("bfp_saved_events", r#"[{"id":"1"}]"#).await.unwrap();
        assert_eq!(
            storage.get_item("bfp_saved_events").await.unwrap().as_deref(),
            Some(r#"[{"id":"1"}]"#)
        );
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_device_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(storage.set_item("../escape", "x").await.is_err());
        assert!(storage.get_item("").await.is_err());
    }

    #[tokio::test]
    async fn devices_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileStorageProvider::new(dir.path());
        let a = provider.storage_for(Uuid::new_v4());
        let b = provider.storage_for(Uuid::new_v4());

        a.set_item("bfp_saved_events", "[1]").await.unwrap();
        assert_eq!(b.get_item("bfp_saved_events").await.unwrap(), None);
        assert_eq!(a.get_item("bfp_saved_events").await.unwrap().as_deref(), Some("[1]"));
    }
}
