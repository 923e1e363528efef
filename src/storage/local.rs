use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::{
    error::{AppError, Result},
    storage::{object_key, ObjectStorage},
};

/// Filesystem-backed storage. Objects land under `base_path` and the
/// returned URL uses the `file://` scheme.
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            AppError::StorageUnavailable(format!("failed to create storage directory: {e}"))
        })?;

        Ok(Self { base_path })
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(&self, data: &[u8], mime: &str) -> Result<String> {
        let key = object_key(data, mime);
        let full_path = self.base_path.join(&key);

        fs::write(&full_path, data)
            .await
            .map_err(|e| AppError::StorageUnavailable(format!("failed to write object: {e}")))?;

        Ok(format!("file://{}", full_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_the_payload_and_returns_a_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).unwrap();

        let url = storage.upload(b"not really a jpeg", "image/jpeg").await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with(".jpg"));

        let path = url.strip_prefix("file://").unwrap();
        let stored = std::fs::read(path).unwrap();
        assert_eq!(stored, b"not really a jpeg");
    }

    #[tokio::test]
    async fn identical_payloads_share_an_object() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).unwrap();

        let first = storage.upload(b"same bytes", "image/png").await.unwrap();
        let second = storage.upload(b"same bytes", "image/png").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
