/// Media storage data models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of storing an uploaded image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMedia {
    /// Generated storage key
    pub file_name: String,
    /// Public-facing URL of the stored file
    pub file_url: String,
    pub original_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub uploaded_at: DateTime<Utc>,
}

/// Image dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}
