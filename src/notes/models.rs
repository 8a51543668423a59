/// Note data models
use crate::error::{ApiError, ApiResult};
use crate::media_store::{is_safe_key, StoredMedia};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of tags on a note
pub const MAX_TAGS: usize = 5;

/// Maximum title length in characters
pub const MAX_TITLE_CHARS: usize = 200;

/// Image reference embedded in a note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteImage {
    pub file_name: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default, alias = "filePath")]
    pub file_url: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default = "Utc::now")]
    pub uploaded_at: DateTime<Utc>,
    /// Display order; absent sorts as 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl NoteImage {
    pub fn from_stored(media: StoredMedia, position: Option<i64>) -> Self {
        Self {
            file_name: media.file_name,
            original_name: media.original_name,
            file_url: media.file_url,
            mime_type: media.mime_type,
            file_size: media.file_size,
            width: media.width,
            height: media.height,
            uploaded_at: media.uploaded_at,
            position,
        }
    }
}

/// Sort images ascending by position; stable, so ties keep arrival order
pub fn sort_images(images: &mut [NoteImage]) {
    images.sort_by_key(|img| img.position.unwrap_or(0));
}

/// A stored note
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub images: Vec<NoteImage>,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display name of a note's owner
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub first_name: String,
    pub last_name: String,
}

/// Public listing item; exposes the author's name and nothing else about them
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicNote {
    pub id: String,
    pub title: String,
    pub content: String,
    pub images: Vec<NoteImage>,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: Author,
}

impl PublicNote {
    pub fn new(note: Note, author: Author) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            images: note.images,
            tags: note.tags,
            is_public: note.is_public,
            created_at: note.created_at,
            updated_at: note.updated_at,
            author,
        }
    }
}

/// Create note request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub images: Option<Vec<NoteImage>>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

/// Partial update; omitted fields keep their previous value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub images: Option<Vec<NoteImage>>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

/// Trimmed tags with empty entries removed
pub fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn check_tag_count(tags: &[String]) -> ApiResult<()> {
    if tags.len() > MAX_TAGS {
        return Err(ApiError::Validation(format!(
            "A note can have at most {} tags",
            MAX_TAGS
        )));
    }
    Ok(())
}

/// Check the invariants a note must satisfy before it is written
pub fn validate_note(
    title: &str,
    content: &str,
    images: &[NoteImage],
    tags: &[String],
) -> ApiResult<()> {
    if title.trim().is_empty() && content.trim().is_empty() && images.is_empty() {
        return Err(ApiError::Validation(
            "At least one of title, content or images must be provided".to_string(),
        ));
    }

    check_tag_count(tags)?;

    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::Validation(format!(
            "Title cannot be longer than {} characters",
            MAX_TITLE_CHARS
        )));
    }

    if let Some(bad) = images.iter().find(|img| !is_safe_key(&img.file_name)) {
        return Err(ApiError::Validation(format!(
            "Invalid image reference: {}",
            bad.file_name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str, position: Option<i64>) -> NoteImage {
        NoteImage {
            file_name: name.to_string(),
            original_name: name.to_string(),
            file_url: format!("/uploads/images/{}", name),
            mime_type: "image/jpeg".to_string(),
            file_size: 10,
            width: None,
            height: None,
            uploaded_at: Utc::now(),
            position,
        }
    }

    #[test]
    fn test_sort_images_nulls_as_zero() {
        let mut images = vec![
            image("c.jpg", Some(2)),
            image("a.jpg", None),
            image("b.jpg", Some(1)),
            image("z.jpg", Some(-1)),
        ];
        sort_images(&mut images);

        let names: Vec<&str> = images.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, vec!["z.jpg", "a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_validate_requires_some_field() {
        let err = validate_note("  ", "\n", &[], &[]).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        assert!(validate_note("", "", &[image("a.jpg", None)], &[]).is_ok());
        assert!(validate_note("Title", "", &[], &[]).is_ok());
    }

    #[test]
    fn test_validate_tag_limit() {
        let five: Vec<String> = (0..5).map(|i| format!("t{}", i)).collect();
        assert!(validate_note("x", "", &[], &five).is_ok());

        let six: Vec<String> = (0..6).map(|i| format!("t{}", i)).collect();
        assert!(matches!(
            validate_note("x", "", &[], &six),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_title_length() {
        let long = "x".repeat(MAX_TITLE_CHARS + 1);
        assert!(validate_note(&long, "", &[], &[]).is_err());
    }

    #[test]
    fn test_validate_rejects_path_like_image() {
        assert!(validate_note("x", "", &[image("../secret", None)], &[]).is_err());
    }

    #[test]
    fn test_clean_tags() {
        let tags = clean_tags(vec![" rust ".into(), "".into(), "  ".into(), "rust".into()]);
        assert_eq!(tags, vec!["rust", "rust"]);
    }

    #[test]
    fn test_image_deserializes_with_defaults() {
        let img: NoteImage =
            serde_json::from_str(r#"{"fileName":"image_1_a.jpg","filePath":"/uploads/images/image_1_a.jpg"}"#)
                .unwrap();
        assert_eq!(img.file_url, "/uploads/images/image_1_a.jpg");
        assert_eq!(img.position, None);
    }
}
