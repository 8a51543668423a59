/// Media Store Manager
///
/// Validates uploads, generates storage keys and normalises images before
/// handing the bytes to a backend.
use crate::{
    error::{ApiError, ApiResult},
    media_store::{disk::DiskMediaBackend, is_safe_key, ImageDimensions, MediaBackend, StoredMedia},
};
use chrono::Utc;
use image::{DynamicImage, ImageFormat};
use rand::{distributions::Alphanumeric, Rng};
use std::path::PathBuf;
use std::sync::Arc;

/// MIME types accepted for upload
pub const SUPPORTED_UPLOAD_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/heic",
];

/// Media store configuration
#[derive(Debug, Clone)]
pub struct MediaStoreConfig {
    pub location: PathBuf,
    /// URL prefix the stored files are served under
    pub url_prefix: String,
    pub max_size: usize,
}

impl Default for MediaStoreConfig {
    fn default() -> Self {
        Self {
            location: PathBuf::from("./uploads/images"),
            url_prefix: "/uploads/images".to_string(),
            max_size: 5 * 1024 * 1024, // 5MB
        }
    }
}

/// Main media store manager
#[derive(Clone)]
pub struct MediaStore {
    config: MediaStoreConfig,
    backend: Arc<dyn MediaBackend>,
}

impl MediaStore {
    /// Create a media store on local disk
    pub fn new(config: MediaStoreConfig) -> Self {
        let backend: Arc<dyn MediaBackend> = Arc::new(DiskMediaBackend::new(config.location.clone()));
        Self { config, backend }
    }

    /// Public URL for a key
    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.config.url_prefix, key)
    }

    /// Validate MIME type is allowed
    pub fn validate_mime_type(mime_type: &str) -> ApiResult<()> {
        if SUPPORTED_UPLOAD_TYPES.contains(&mime_type) {
            Ok(())
        } else {
            Err(ApiError::Validation(
                "Unsupported file format. Use JPEG, PNG, WebP or GIF.".to_string(),
            ))
        }
    }

    /// Store an uploaded image
    ///
    /// Decodable images are re-encoded to JPEG and their dimensions reported;
    /// anything else is stored as-is under its original extension.
    pub async fn store(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        original_name: &str,
    ) -> ApiResult<StoredMedia> {
        if data.is_empty() {
            return Err(ApiError::Validation("No image file was sent".to_string()));
        }
        if data.len() > self.config.max_size {
            return Err(ApiError::Validation(format!(
                "File too large. Maximum size is {}MB",
                self.config.max_size / (1024 * 1024)
            )));
        }
        Self::validate_mime_type(mime_type)?;

        let (bytes, stored_mime, extension, dimensions) = match Self::reencode_as_jpeg(&data) {
            Some((jpeg, dims)) => (jpeg, "image/jpeg".to_string(), "jpg".to_string(), Some(dims)),
            None => {
                let ext = Self::extension_for(original_name, mime_type);
                (data, mime_type.to_string(), ext, None)
            }
        };

        let mut key = Self::generate_key(&extension);
        while self.exists(&key).await? {
            key = Self::generate_key(&extension);
        }
        let file_size = bytes.len() as i64;
        self.backend.put(&key, bytes).await?;

        tracing::info!(key = %key, size = file_size, "Stored media");

        Ok(StoredMedia {
            file_url: self.url_for(&key),
            file_name: key,
            original_name: original_name.to_string(),
            mime_type: stored_mime,
            file_size,
            width: dimensions.map(|d| d.width),
            height: dimensions.map(|d| d.height),
            uploaded_at: Utc::now(),
        })
    }

    /// Fetch stored bytes and their MIME type
    pub async fn fetch(&self, key: &str) -> ApiResult<(Vec<u8>, String)> {
        let data = self
            .backend
            .get(key)
            .await?
            .ok_or_else(|| ApiError::NotFound("Image file not found".to_string()))?;

        Ok((data, mime_type_for_key(key).to_string()))
    }

    /// Delete stored bytes; a missing key is not an error
    pub async fn delete(&self, key: &str) -> ApiResult<()> {
        self.backend.delete(key).await
    }

    /// Whether a key is present in storage
    pub async fn exists(&self, key: &str) -> ApiResult<bool> {
        if !is_safe_key(key) {
            return Ok(false);
        }
        self.backend.exists(key).await
    }

    /// Collision-resistant key: millisecond timestamp plus random suffix
    fn generate_key(extension: &str) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect::<String>()
            .to_lowercase();
        format!(
            "image_{}_{}.{}",
            Utc::now().timestamp_millis(),
            suffix,
            extension
        )
    }

    /// Extension from the original file name, falling back to the MIME type
    fn extension_for(original_name: &str, mime_type: &str) -> String {
        let from_name = std::path::Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()));

        from_name.unwrap_or_else(|| {
            match mime_type {
                "image/png" => "png",
                "image/gif" => "gif",
                "image/webp" => "webp",
                "image/heic" => "heic",
                _ => "jpg",
            }
            .to_string()
        })
    }

    /// Decode and re-encode as JPEG, reporting the pixel dimensions
    fn reencode_as_jpeg(data: &[u8]) -> Option<(Vec<u8>, ImageDimensions)> {
        let img = match image::load_from_memory(data) {
            Ok(img) => img,
            Err(e) => {
                tracing::debug!("Image not decodable, storing as-is: {}", e);
                return None;
            }
        };

        let dimensions = ImageDimensions {
            width: img.width(),
            height: img.height(),
        };

        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut buf = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buf);

        match rgb.write_to(&mut cursor, ImageFormat::Jpeg) {
            Ok(_) => Some((buf, dimensions)),
            Err(e) => {
                tracing::warn!("Failed to encode JPEG: {}", e);
                None
            }
        }
    }
}

/// MIME type served for a stored key, derived from its extension
pub fn mime_type_for_key(key: &str) -> &'static str {
    let ext = std::path::Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_store(dir: &std::path::Path) -> MediaStore {
        MediaStore::new(MediaStoreConfig {
            location: dir.to_path_buf(),
            url_prefix: "/uploads/images".to_string(),
            max_size: 1024 * 1024,
        })
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::new(width, height);
        let mut buf = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buf);
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        buf
    }

    #[tokio::test]
    async fn test_store_reencodes_and_reports_dimensions() {
        let dir = tempdir().unwrap();
        let store = create_test_store(dir.path());

        let stored = store
            .store(png_bytes(12, 7), "image/png", "photo.png")
            .await
            .unwrap();

        assert!(stored.file_name.starts_with("image_"));
        assert!(stored.file_name.ends_with(".jpg"));
        assert_eq!(stored.file_url, format!("/uploads/images/{}", stored.file_name));
        assert_eq!(stored.mime_type, "image/jpeg");
        assert_eq!(stored.width, Some(12));
        assert_eq!(stored.height, Some(7));
        assert_eq!(stored.original_name, "photo.png");

        let (bytes, mime) = store.fetch(&stored.file_name).await.unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(bytes.len() as i64, stored.file_size);
    }

    #[tokio::test]
    async fn test_undecodable_kept_with_original_extension() {
        let dir = tempdir().unwrap();
        let store = create_test_store(dir.path());

        let stored = store
            .store(b"not really heic".to_vec(), "image/heic", "IMG_0001.HEIC")
            .await
            .unwrap();

        assert!(stored.file_name.ends_with(".heic"));
        assert_eq!(stored.width, None);
        assert_eq!(stored.file_size, 15);
    }

    #[tokio::test]
    async fn test_oversized_rejected() {
        let dir = tempdir().unwrap();
        let store = create_test_store(dir.path());

        let result = store
            .store(vec![0u8; 2 * 1024 * 1024], "image/png", "big.png")
            .await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unsupported_mime_rejected() {
        let dir = tempdir().unwrap();
        let store = create_test_store(dir.path());

        let result = store
            .store(b"MZ".to_vec(), "application/x-msdownload", "evil.exe")
            .await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let dir = tempdir().unwrap();
        let store = create_test_store(dir.path());

        store.delete("image_0_missing.jpg").await.unwrap();
    }

    #[tokio::test]
    async fn test_generated_keys_differ() {
        let a = MediaStore::generate_key("jpg");
        let b = MediaStore::generate_key("jpg");
        assert_ne!(a, b);
        assert!(is_safe_key(&a));
    }

    #[test]
    fn test_mime_type_for_key() {
        assert_eq!(mime_type_for_key("a.PNG"), "image/png");
        assert_eq!(mime_type_for_key("a.gif"), "image/gif");
        assert_eq!(mime_type_for_key("a.webp"), "image/webp");
        assert_eq!(mime_type_for_key("a.jpeg"), "image/jpeg");
        assert_eq!(mime_type_for_key("noext"), "image/jpeg");
    }
}
