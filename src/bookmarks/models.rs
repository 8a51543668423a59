/// Bookmark data models
use crate::notes::PublicNote;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Bookmark record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub account_id: String,
    pub note_id: String,
    pub bookmarked_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// What a toggle did
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    Created(Bookmark),
    Removed,
}

/// Result of toggling a bookmark on a public note
#[derive(Debug, Clone)]
pub struct ToggleResult {
    pub outcome: ToggleOutcome,
    pub note_id: String,
    pub note_title: String,
}

impl ToggleResult {
    pub fn is_bookmarked(&self) -> bool {
        matches!(self.outcome, ToggleOutcome::Created(_))
    }
}

/// Response body for a toggle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub is_bookmarked: bool,
    pub note_id: String,
    pub note_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmarked_at: Option<DateTime<Utc>>,
}

impl From<ToggleResult> for ToggleResponse {
    fn from(result: ToggleResult) -> Self {
        let (bookmark_id, bookmarked_at) = match result.outcome {
            ToggleOutcome::Created(bookmark) => (Some(bookmark.id), Some(bookmark.bookmarked_at)),
            ToggleOutcome::Removed => (None, None),
        };
        Self {
            is_bookmarked: bookmark_id.is_some(),
            note_id: result.note_id,
            note_title: result.note_title,
            bookmark_id,
            bookmarked_at,
        }
    }
}

/// Bookmark listing item joined to its still-public note
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkedNote {
    pub bookmark_id: String,
    pub bookmarked_at: DateTime<Utc>,
    pub note: PublicNote,
}
