/// Note endpoints, public listing and bookmarks
use crate::{
    api::response::{json_body, ApiResponse},
    auth::{AuthContext, OptionalAuthContext},
    bookmarks::{ToggleResponse, BOOKMARK_SORT_FIELDS, DEFAULT_BOOKMARK_SORT},
    context::AppContext,
    error::ApiResult,
    notes::{CreateNoteRequest, ListQuery, UpdateNoteRequest, DEFAULT_NOTE_SORT, NOTE_SORT_FIELDS},
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

/// Note images are owner-scoped; shared caches must not keep them
const NOTE_IMAGE_CACHE_CONTROL: &str = "private, max-age=31536000";

/// Build note routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/tags", get(list_tags))
        .route("/notes/public", get(list_public_notes))
        .route("/notes/bookmarks", get(list_bookmarks))
        .route("/bookmarks", get(list_bookmarks))
        .route("/notes/public/:id/bookmark", post(toggle_bookmark))
        .route(
            "/notes/:id",
            get(get_note).put(update_note).delete(delete_note),
        )
        .route("/notes/:id/image/:file_name", get(get_note_image))
}

async fn list_notes(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = ctx
        .note_store
        .list(
            &auth.account_id,
            &query.filter(),
            query.sort(NOTE_SORT_FIELDS, DEFAULT_NOTE_SORT)?,
            query.page_request()?,
        )
        .await?;

    Ok(ApiResponse::ok(json!({
        "notes": page.items,
        "pagination": page.pagination,
    })))
}

async fn create_note(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let note = ctx
        .note_store
        .create(&auth.account_id, json_body(payload)?)
        .await?;
    Ok(ApiResponse::created(note).with_message("Note created"))
}

async fn get_note(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let note = ctx.note_store.get_by_id(&auth.account_id, &id).await?;
    Ok(ApiResponse::ok(note))
}

async fn update_note(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    payload: Result<Json<UpdateNoteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let note = ctx
        .note_store
        .update(&auth.account_id, &id, json_body(payload)?)
        .await?;
    Ok(ApiResponse::ok(note).with_message("Note updated"))
}

async fn delete_note(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    ctx.note_store.delete(&auth.account_id, &id).await?;
    Ok(ApiResponse::message("Note deleted"))
}

/// Serve an image referenced by one of the caller's notes
async fn get_note_image(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path((id, file_name)): Path<(String, String)>,
) -> ApiResult<Response> {
    let (data, mime_type) = ctx
        .note_store
        .get_image(&auth.account_id, &id, &file_name)
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, mime_type),
            (header::CACHE_CONTROL, NOTE_IMAGE_CACHE_CONTROL.to_string()),
        ],
        data,
    )
        .into_response())
}

async fn list_tags(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<impl IntoResponse> {
    let tags = ctx.note_store.list_tags_for_owner(&auth.account_id).await?;
    Ok(ApiResponse::ok(json!({ "tags": tags })))
}

async fn list_public_notes(
    State(ctx): State<AppContext>,
    viewer: OptionalAuthContext,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    tracing::debug!(
        viewer = ?viewer.auth.as_ref().map(|a| a.account_id.as_str()),
        "Listing public notes"
    );

    let page = ctx
        .note_store
        .list_public(
            &query.filter(),
            query.sort(NOTE_SORT_FIELDS, DEFAULT_NOTE_SORT)?,
            query.page_request()?,
        )
        .await?;

    Ok(ApiResponse::ok(json!({
        "notes": page.items,
        "pagination": page.pagination,
    })))
}

async fn toggle_bookmark(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let result = ctx
        .bookmark_service
        .toggle_bookmark(&auth.account_id, &id)
        .await?;

    let response = if result.is_bookmarked() {
        ApiResponse::created(ToggleResponse::from(result)).with_message("Note bookmarked")
    } else {
        ApiResponse::ok(ToggleResponse::from(result)).with_message("Bookmark removed")
    };
    Ok(response)
}

async fn list_bookmarks(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = ctx
        .bookmark_service
        .list_bookmarks(
            &auth.account_id,
            &query.filter(),
            query.sort(BOOKMARK_SORT_FIELDS, DEFAULT_BOOKMARK_SORT)?,
            query.page_request()?,
        )
        .await?;

    Ok(ApiResponse::ok(json!({
        "bookmarks": page.items,
        "pagination": page.pagination,
    })))
}
