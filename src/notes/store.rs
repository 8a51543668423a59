/// Note store using runtime queries
use crate::{
    error::{ApiError, ApiResult},
    media_store::MediaStore,
    notes::{
        models::{
            check_tag_count, clean_tags, sort_images, validate_note, Author, CreateNoteRequest,
            Note, NoteImage, PublicNote, UpdateNoteRequest,
        },
        query::{fold_case, NoteFilter, PageRequest, Paginated, Pagination, SortSpec},
    },
};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Sort fields accepted by note listings
pub const NOTE_SORT_FIELDS: &[(&str, &str)] = &[
    ("createdAt", "n.created_at"),
    ("updatedAt", "n.updated_at"),
    ("title", "n.title"),
];

pub const DEFAULT_NOTE_SORT: &str = "createdAt";

const NOTE_COLUMNS: &str =
    "n.id, n.account_id, n.title, n.content, n.images, n.tags, n.is_public, n.created_at, n.updated_at";

/// Note store
pub struct NoteStore {
    db: SqlitePool,
    media: Arc<MediaStore>,
}

impl NoteStore {
    pub fn new(db: SqlitePool, media: Arc<MediaStore>) -> Self {
        Self { db, media }
    }

    /// List an owner's notes
    pub async fn list(
        &self,
        owner_id: &str,
        filter: &NoteFilter,
        sort: SortSpec,
        page: PageRequest,
    ) -> ApiResult<Paginated<Note>> {
        let mut where_sql = String::from(" WHERE n.account_id = ?");
        let mut binds = vec![owner_id.to_string()];
        filter.push_sql(&mut where_sql, &mut binds);

        let total = self.count("SELECT COUNT(*) FROM note n", &where_sql, &binds).await?;

        let sql = format!(
            "SELECT {} FROM note n{} ORDER BY {} LIMIT ? OFFSET ?",
            NOTE_COLUMNS,
            where_sql,
            sort.order_by()
        );
        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind.as_str());
        }
        let rows = query
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.db)
            .await?;

        let items = rows.iter().map(note_from_row).collect::<ApiResult<Vec<_>>>()?;

        Ok(Paginated {
            items,
            pagination: Pagination::new(page, total),
        })
    }

    /// Get a note owned by `owner_id`; someone else's note is reported as missing
    pub async fn get_by_id(&self, owner_id: &str, note_id: &str) -> ApiResult<Note> {
        let sql = format!(
            "SELECT {} FROM note n WHERE n.id = ?1 AND n.account_id = ?2",
            NOTE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(note_id)
            .bind(owner_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))?;

        note_from_row(&row)
    }

    /// Get a note only if it is currently public
    pub async fn find_public(&self, note_id: &str) -> ApiResult<Note> {
        let sql = format!(
            "SELECT {} FROM note n WHERE n.id = ?1 AND n.is_public = 1",
            NOTE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(note_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Public note not found".to_string()))?;

        note_from_row(&row)
    }

    /// Create a note
    pub async fn create(&self, owner_id: &str, request: CreateNoteRequest) -> ApiResult<Note> {
        let title = request.title.unwrap_or_default().trim().to_string();
        let content = request.content.unwrap_or_default().trim().to_string();
        let mut images = request.images.unwrap_or_default();
        let tags = clean_tags(request.tags.unwrap_or_default());

        validate_note(&title, &content, &images, &tags)?;
        sort_images(&mut images);

        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title,
            content,
            images,
            tags,
            is_public: request.is_public.unwrap_or(false),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO note (id, account_id, title, content, title_fold, content_fold, images, tags, is_public, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&note.id)
        .bind(&note.owner_id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(fold_case(&note.title))
        .bind(fold_case(&note.content))
        .bind(to_json(&note.images)?)
        .bind(to_json(&note.tags)?)
        .bind(note.is_public)
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(&self.db)
        .await?;

        tracing::info!(note_id = %note.id, owner = %owner_id, "Created note");

        Ok(note)
    }

    /// Apply a partial update; the resulting note is validated before it is written
    pub async fn update(
        &self,
        owner_id: &str,
        note_id: &str,
        patch: UpdateNoteRequest,
    ) -> ApiResult<Note> {
        let patch_tags = patch.tags.map(clean_tags);
        if let Some(tags) = &patch_tags {
            check_tag_count(tags)?;
        }

        let mut note = self.get_by_id(owner_id, note_id).await?;

        if let Some(title) = patch.title {
            note.title = title.trim().to_string();
        }
        if let Some(content) = patch.content {
            note.content = content.trim().to_string();
        }
        if let Some(images) = patch.images {
            note.images = images;
        }
        if let Some(tags) = patch_tags {
            note.tags = tags;
        }
        if let Some(is_public) = patch.is_public {
            note.is_public = is_public;
        }

        validate_note(&note.title, &note.content, &note.images, &note.tags)?;
        sort_images(&mut note.images);
        note.updated_at = Utc::now();

        let result = sqlx::query(
            "UPDATE note SET title = ?1, content = ?2, title_fold = ?3, content_fold = ?4, images = ?5, tags = ?6,
                 is_public = ?7, updated_at = ?8
             WHERE id = ?9 AND account_id = ?10",
        )
        .bind(&note.title)
        .bind(&note.content)
        .bind(fold_case(&note.title))
        .bind(fold_case(&note.content))
        .bind(to_json(&note.images)?)
        .bind(to_json(&note.tags)?)
        .bind(note.is_public)
        .bind(note.updated_at)
        .bind(&note.id)
        .bind(owner_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Note not found".to_string()));
        }

        Ok(note)
    }

    /// Delete a note and remove its media
    ///
    /// Media removal is best effort: failures are logged and the record is
    /// deleted regardless.
    pub async fn delete(&self, owner_id: &str, note_id: &str) -> ApiResult<()> {
        let note = self.get_by_id(owner_id, note_id).await?;

        sqlx::query("DELETE FROM note WHERE id = ?1 AND account_id = ?2")
            .bind(&note.id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;

        self.remove_media(&note.images).await;

        tracing::info!(note_id = %note.id, owner = %owner_id, "Deleted note");

        Ok(())
    }

    /// List public notes across all owners
    pub async fn list_public(
        &self,
        filter: &NoteFilter,
        sort: SortSpec,
        page: PageRequest,
    ) -> ApiResult<Paginated<PublicNote>> {
        let mut where_sql = String::from(" WHERE n.is_public = 1");
        let mut binds = Vec::new();
        filter.push_sql(&mut where_sql, &mut binds);

        let total = self.count("SELECT COUNT(*) FROM note n", &where_sql, &binds).await?;

        let sql = format!(
            "SELECT {}, a.first_name, a.last_name FROM note n
             JOIN account a ON a.id = n.account_id{} ORDER BY {} LIMIT ? OFFSET ?",
            NOTE_COLUMNS,
            where_sql,
            sort.order_by()
        );
        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind.as_str());
        }
        let rows = query
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.db)
            .await?;

        let items = rows
            .iter()
            .map(|row| {
                let author = Author {
                    first_name: row.get("first_name"),
                    last_name: row.get("last_name"),
                };
                note_from_row(row).map(|note| PublicNote::new(note, author))
            })
            .collect::<ApiResult<Vec<_>>>()?;

        Ok(Paginated {
            items,
            pagination: Pagination::new(page, total),
        })
    }

    /// Distinct, trimmed, non-empty tags across an owner's notes
    pub async fn list_tags_for_owner(&self, owner_id: &str) -> ApiResult<Vec<String>> {
        let tags = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT TRIM(t.value) FROM note n, json_each(n.tags) t
             WHERE n.account_id = ?1 AND t.type = 'text' AND TRIM(t.value) <> ''
             ORDER BY 1",
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(tags)
    }

    /// Image bytes for an owner's note, only if the note references the file
    pub async fn get_image(
        &self,
        owner_id: &str,
        note_id: &str,
        file_name: &str,
    ) -> ApiResult<(Vec<u8>, String)> {
        let note = self.get_by_id(owner_id, note_id).await?;

        if !note.images.iter().any(|img| img.file_name == file_name) {
            return Err(ApiError::NotFound(
                "Image does not belong to this note".to_string(),
            ));
        }

        self.media.fetch(file_name).await
    }

    /// Delete every note an account owns, removing their media first
    pub async fn delete_all_for_owner(&self, owner_id: &str) -> ApiResult<u64> {
        let rows = sqlx::query("SELECT images FROM note WHERE account_id = ?1")
            .bind(owner_id)
            .fetch_all(&self.db)
            .await?;

        let mut images: Vec<NoteImage> = Vec::new();
        for row in &rows {
            let raw: String = row.get("images");
            match serde_json::from_str::<Vec<NoteImage>>(&raw) {
                Ok(list) => images.extend(list),
                Err(e) => tracing::warn!("Skipping unreadable image list: {}", e),
            }
        }
        self.remove_media(&images).await;

        let result = sqlx::query("DELETE FROM note WHERE account_id = ?1")
            .bind(owner_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    async fn remove_media(&self, images: &[NoteImage]) {
        for image in images {
            if let Err(e) = self.media.delete(&image.file_name).await {
                tracing::warn!(file = %image.file_name, "Failed to remove media: {}", e);
            }
        }
    }

    async fn count(&self, select: &str, where_sql: &str, binds: &[String]) -> ApiResult<i64> {
        let sql = format!("{}{}", select, where_sql);
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for bind in binds {
            query = query.bind(bind.as_str());
        }
        Ok(query.fetch_one(&self.db).await?)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> ApiResult<String> {
    serde_json::to_string(value)
        .map_err(|e| ApiError::Internal(format!("Failed to encode note field: {}", e)))
}

/// Map a row selected with `NOTE_COLUMNS`
pub(crate) fn note_from_row(row: &SqliteRow) -> ApiResult<Note> {
    let images: String = row.get("images");
    let tags: String = row.get("tags");

    let mut images: Vec<NoteImage> = serde_json::from_str(&images)
        .map_err(|e| ApiError::Internal(format!("Corrupt image list: {}", e)))?;
    sort_images(&mut images);

    Ok(Note {
        id: row.get("id"),
        owner_id: row.get("account_id"),
        title: row.get("title"),
        content: row.get("content"),
        images,
        tags: serde_json::from_str(&tags)
            .map_err(|e| ApiError::Internal(format!("Corrupt tag list: {}", e)))?,
        is_public: row.get("is_public"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
