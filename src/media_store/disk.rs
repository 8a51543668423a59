/// Disk-based media storage backend
use crate::{
    error::{ApiError, ApiResult},
    media_store::{is_safe_key, MediaBackend},
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Disk storage backend
///
/// Files live directly under the base directory so the same directory can
/// be served statically under the media URL prefix.
#[derive(Clone)]
pub struct DiskMediaBackend {
    base_path: PathBuf,
}

impl DiskMediaBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the file path for a key
    fn get_media_path(&self, key: &str) -> ApiResult<PathBuf> {
        if !is_safe_key(key) {
            return Err(ApiError::NotFound(format!("Invalid media key: {}", key)));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl MediaBackend for DiskMediaBackend {
    async fn put(&self, key: &str, data: Vec<u8>) -> ApiResult<()> {
        let path = self.get_media_path(key)?;

        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            ApiError::MediaStorage(format!("Failed to create media directory: {}", e))
        })?;

        fs::write(&path, data).await.map_err(|e| {
            ApiError::MediaStorage(format!("Failed to write media {}: {}", key, e))
        })?;

        Ok(())
    }

    async fn get(&self, key: &str) -> ApiResult<Option<Vec<u8>>> {
        let path = self.get_media_path(key)?;

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ApiError::MediaStorage(format!(
                "Failed to read media {}: {}",
                key, e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> ApiResult<()> {
        let path = match self.get_media_path(key) {
            Ok(path) => path,
            // Nothing can be stored under an unsafe key
            Err(_) => return Ok(()),
        };

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::MediaStorage(format!(
                "Failed to delete media {}: {}",
                key, e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> ApiResult<bool> {
        let path = self.get_media_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }
}
