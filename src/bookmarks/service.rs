/// Bookmark service: toggle and listing over public notes
use crate::{
    bookmarks::models::{Bookmark, BookmarkedNote, ToggleOutcome, ToggleResult},
    error::{ApiError, ApiResult},
    notes::{
        note_from_row, Author, NoteFilter, NoteStore, PageRequest, Paginated, Pagination,
        PublicNote, SortSpec,
    },
};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Sort fields accepted by bookmark listings
pub const BOOKMARK_SORT_FIELDS: &[(&str, &str)] = &[
    ("bookmarkedAt", "bookmarked_at"),
    ("createdAt", "created_at"),
];

pub const DEFAULT_BOOKMARK_SORT: &str = "bookmarkedAt";

/// Bookmark service
pub struct BookmarkService {
    db: SqlitePool,
    notes: Arc<NoteStore>,
}

impl BookmarkService {
    pub fn new(db: SqlitePool, notes: Arc<NoteStore>) -> Self {
        Self { db, notes }
    }

    /// Create the bookmark if absent, remove it if present
    ///
    /// The note must currently be public. Concurrent creates for the same
    /// pair are settled by the unique index; the loser gets `Conflict`.
    pub async fn toggle_bookmark(&self, account_id: &str, note_id: &str) -> ApiResult<ToggleResult> {
        let note = self.notes.find_public(note_id).await?;

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT id FROM bookmark WHERE account_id = ?1 AND note_id = ?2",
        )
        .bind(account_id)
        .bind(&note.id)
        .fetch_optional(&self.db)
        .await?;

        let outcome = match existing {
            Some(bookmark_id) => {
                sqlx::query("DELETE FROM bookmark WHERE id = ?1")
                    .bind(&bookmark_id)
                    .execute(&self.db)
                    .await?;

                tracing::info!(account = %account_id, note_id = %note.id, "Removed bookmark");
                ToggleOutcome::Removed
            }
            None => {
                let now = Utc::now();
                let bookmark = Bookmark {
                    id: Uuid::new_v4().to_string(),
                    account_id: account_id.to_string(),
                    note_id: note.id.clone(),
                    bookmarked_at: now,
                    created_at: now,
                };

                sqlx::query(
                    "INSERT INTO bookmark (id, account_id, note_id, bookmarked_at, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .bind(&bookmark.id)
                .bind(&bookmark.account_id)
                .bind(&bookmark.note_id)
                .bind(bookmark.bookmarked_at)
                .bind(bookmark.created_at)
                .execute(&self.db)
                .await
                .map_err(|e| ApiError::from_unique_violation(e, "Note is already bookmarked"))?;

                tracing::info!(account = %account_id, note_id = %note.id, "Added bookmark");
                ToggleOutcome::Created(bookmark)
            }
        };

        Ok(ToggleResult {
            outcome,
            note_id: note.id,
            note_title: note.title,
        })
    }

    /// List an account's bookmarks joined to their notes
    ///
    /// Paging runs over the raw bookmark rows; rows whose note is gone,
    /// private, or filtered out are dropped from the page afterwards. The
    /// total therefore counts every bookmark the account holds.
    pub async fn list_bookmarks(
        &self,
        account_id: &str,
        filter: &NoteFilter,
        sort: SortSpec,
        page: PageRequest,
    ) -> ApiResult<Paginated<BookmarkedNote>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookmark WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(&self.db)
            .await?;

        let mut join_sql = String::from(" AND n.is_public = 1");
        let mut binds = Vec::new();
        filter.push_sql(&mut join_sql, &mut binds);

        let sql = format!(
            "SELECT b.id AS bookmark_id, b.bookmarked_at,
                    n.id, n.account_id, n.title, n.content, n.images, n.tags, n.is_public,
                    n.created_at, n.updated_at, a.first_name, a.last_name
             FROM (SELECT * FROM bookmark WHERE account_id = ? ORDER BY {order} LIMIT ? OFFSET ?) b
             LEFT JOIN note n ON n.id = b.note_id{join}
             LEFT JOIN account a ON a.id = n.account_id
             ORDER BY b.{order}",
            order = sort.order_by(),
            join = join_sql,
        );

        let mut query = sqlx::query(&sql)
            .bind(account_id)
            .bind(page.limit)
            .bind(page.offset());
        for bind in &binds {
            query = query.bind(bind.as_str());
        }
        let rows = query.fetch_all(&self.db).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let note_id: Option<String> = row.get("id");
            if note_id.is_none() {
                continue;
            }

            let author = Author {
                first_name: row.get::<Option<String>, _>("first_name").unwrap_or_default(),
                last_name: row.get::<Option<String>, _>("last_name").unwrap_or_default(),
            };
            items.push(BookmarkedNote {
                bookmark_id: row.get("bookmark_id"),
                bookmarked_at: row.get("bookmarked_at"),
                note: PublicNote::new(note_from_row(row)?, author),
            });
        }

        Ok(Paginated {
            items,
            pagination: Pagination::new(page, total),
        })
    }

    /// Remove every bookmark an account holds
    pub async fn delete_all_for_account(&self, account_id: &str) -> ApiResult<u64> {
        let result = sqlx::query("DELETE FROM bookmark WHERE account_id = ?1")
            .bind(account_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
