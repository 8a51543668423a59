/// AI endpoints and image upload
use crate::{
    ai::{InlineImage, SummarizeRequest},
    api::response::{json_body, ApiResponse},
    auth::AuthContext,
    context::AppContext,
    error::{ApiError, ApiResult},
    notes::{ListQuery, NoteImage},
};
use axum::{
    extract::{rejection::JsonRejection, Multipart, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;

/// Build AI routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/ai/summarize-text", post(summarize_text))
        .route("/ai/analyze-image", post(analyze_image))
        .route("/ai/upload-image", post(upload_image))
        .route("/ai/analysis-history", get(analysis_history))
}

/// File part of a multipart form
struct UploadedFile {
    data: Vec<u8>,
    mime_type: String,
    file_name: String,
}

/// Multipart form with one file field and plain text fields
struct UploadForm {
    image: Option<UploadedFile>,
    fields: HashMap<String, String>,
}

async fn read_form(mut multipart: Multipart, file_field: &str) -> ApiResult<UploadForm> {
    let mut form = UploadForm {
        image: None,
        fields: HashMap::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart body: {}", e.body_text())))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            let mime_type = field.content_type().unwrap_or_default().to_string();
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read upload: {}", e.body_text())))?;

            form.image = Some(UploadedFile {
                data: data.to_vec(),
                mime_type,
                file_name,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read field {}: {}", name, e.body_text())))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

fn require_image(form: &mut UploadForm) -> ApiResult<UploadedFile> {
    form.image
        .take()
        .filter(|image| !image.data.is_empty())
        .ok_or_else(|| ApiError::Validation("No image file was sent".to_string()))
}

async fn summarize_text(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let summary = ctx.ai_service.summarize(json_body(payload)?).await?;
    Ok(ApiResponse::ok(summary))
}

async fn analyze_image(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut form = read_form(multipart, "image").await?;
    let image = require_image(&mut form)?;

    let analysis = ctx
        .ai_service
        .analyze_image(
            &auth.account_id,
            InlineImage {
                mime_type: image.mime_type,
                data: image.data,
            },
            &image.file_name,
            form.fields.remove("userText"),
        )
        .await?;

    Ok(ApiResponse::ok(analysis))
}

/// Store an image for later attachment to a note
async fn upload_image(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut form = read_form(multipart, "image").await?;
    let image = require_image(&mut form)?;

    let position = match form.fields.get("position").map(|p| p.trim()) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            ApiError::Validation("position must be an integer".to_string())
        })?),
    };

    let stored = ctx
        .media_store
        .store(image.data, &image.mime_type, &image.file_name)
        .await?;

    tracing::info!(account = %auth.account_id, file = %stored.file_name, "Uploaded image");

    Ok(ApiResponse::created(NoteImage::from_stored(stored, position))
        .with_message("Image uploaded"))
}

async fn analysis_history(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = ctx
        .ai_service
        .analysis_history(&auth.account_id, query.page_request()?)
        .await?;

    Ok(ApiResponse::ok(json!({
        "analyses": page.items,
        "pagination": page.pagination,
    })))
}
