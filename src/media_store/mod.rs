/// Media storage
///
/// Opaque image storage keyed by generated file names. Notes reference
/// media by key; they never own the bytes.

pub mod disk;
pub mod models;
pub mod store;

pub use models::*;
pub use store::{MediaStore, MediaStoreConfig};

use crate::error::ApiResult;
use async_trait::async_trait;

/// Media storage backend trait
///
/// Implementations handle the actual storage and retrieval of file data.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Store data under a key, replacing any previous content
    async fn put(&self, key: &str, data: Vec<u8>) -> ApiResult<()>;

    /// Retrieve data by key
    async fn get(&self, key: &str) -> ApiResult<Option<Vec<u8>>>;

    /// Delete data by key; deleting a missing key succeeds
    async fn delete(&self, key: &str) -> ApiResult<()>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> ApiResult<bool>;
}

/// A key is a single file name: no separators, no parent references
pub fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && !key.contains("..")
        && !key.contains('/')
        && !key.contains('\\')
        && !key.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_keys() {
        assert!(is_safe_key("image_1700000000000_ab12cd34.jpg"));
        assert!(!is_safe_key(""));
        assert!(!is_safe_key("../secret"));
        assert!(!is_safe_key("dir/file.jpg"));
        assert!(!is_safe_key("dir\\file.jpg"));
    }
}
