/// Summarization and image analysis on top of an `AiProvider`
use crate::{
    ai::{
        prompts::{image_analysis_prompt, summarize_prompt},
        AiProvider, AnalysisRecord, ImageAnalysis, InlineImage, StructuredAnalysis, Summary,
        SummarizeRequest, SummaryLength,
    },
    error::{ApiError, ApiResult},
    notes::{PageRequest, Paginated, Pagination},
};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

pub const MIN_SUMMARY_CHARS: usize = 50;
pub const MAX_SUMMARY_CHARS: usize = 10_000;

/// MIME types the model accepts for analysis
pub const ANALYSIS_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
];

pub const DEFAULT_ANALYSIS_PROMPT: &str = "Analyze this image";

pub struct AiService {
    provider: Arc<dyn AiProvider>,
    db: SqlitePool,
    max_image_bytes: usize,
}

impl AiService {
    pub fn new(provider: Arc<dyn AiProvider>, db: SqlitePool, max_image_bytes: usize) -> Self {
        Self {
            provider,
            db,
            max_image_bytes,
        }
    }

    /// Summarize text; an answer that is not the requested JSON is an upstream error
    pub async fn summarize(&self, request: SummarizeRequest) -> ApiResult<Summary> {
        let text = request
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::Validation("No valid text was provided".to_string()))?;

        let chars = text.chars().count();
        if chars < MIN_SUMMARY_CHARS {
            return Err(ApiError::Validation(format!(
                "Text is too short. It must be at least {} characters",
                MIN_SUMMARY_CHARS
            )));
        }
        if chars > MAX_SUMMARY_CHARS {
            return Err(ApiError::Validation(format!(
                "Text is too long. It must be at most {} characters",
                MAX_SUMMARY_CHARS
            )));
        }

        let length = parse_summary_length(request.summary_length.as_deref())?;

        let raw = self
            .provider
            .generate(&summarize_prompt(&text, length), None)
            .await?;

        let mut summary: Summary = serde_json::from_str(strip_code_fence(&raw)).map_err(|e| {
            tracing::warn!(provider = self.provider.name(), "Unparsable summary: {}", e);
            ApiError::Upstream("The AI response could not be processed".to_string())
        })?;
        summary.original_length = chars;
        summary.summary_length = length.as_str().to_string();

        Ok(summary)
    }

    /// Describe an image; the analysis is recorded for the account
    pub async fn analyze_image(
        &self,
        account_id: &str,
        image: InlineImage,
        original_name: &str,
        user_text: Option<String>,
    ) -> ApiResult<ImageAnalysis> {
        if image.data.is_empty() {
            return Err(ApiError::Validation("No image file was sent".to_string()));
        }
        if !ANALYSIS_MIME_TYPES.contains(&image.mime_type.as_str()) {
            return Err(ApiError::Validation(
                "Unsupported file format. Use JPEG, PNG, WebP or GIF.".to_string(),
            ));
        }
        if image.data.len() > self.max_image_bytes {
            return Err(ApiError::Validation(format!(
                "File too large. Maximum size is {}MB",
                self.max_image_bytes / (1024 * 1024)
            )));
        }

        let user_prompt = match user_text {
            None => DEFAULT_ANALYSIS_PROMPT.to_string(),
            Some(text) if text.trim().is_empty() => {
                return Err(ApiError::Validation(
                    "No valid question or request was provided".to_string(),
                ))
            }
            Some(text) => text.trim().to_string(),
        };

        let file_size = image.data.len() as i64;
        let mime_type = image.mime_type.clone();

        let raw = self
            .provider
            .generate(&image_analysis_prompt(&user_prompt), Some(image))
            .await?;
        let analysis = parse_image_analysis(&raw);

        self.record_analysis(account_id, original_name, file_size, &mime_type, &user_prompt, &analysis)
            .await;

        Ok(analysis)
    }

    /// An account's past analyses, newest first
    pub async fn analysis_history(
        &self,
        account_id: &str,
        page: PageRequest,
    ) -> ApiResult<Paginated<AnalysisRecord>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analyzed_image WHERE account_id = ?1")
            .bind(account_id)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query(
            "SELECT id, original_name, file_size, mime_type, user_prompt, analysis_result, analyzed_at
             FROM analyzed_image WHERE account_id = ?1
             ORDER BY analyzed_at DESC LIMIT ?2 OFFSET ?3",
        )
        .bind(account_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        let items = rows
            .iter()
            .map(|row| {
                let raw: String = row.get("analysis_result");
                AnalysisRecord {
                    id: row.get("id"),
                    original_name: row.get("original_name"),
                    file_size: row.get("file_size"),
                    mime_type: row.get("mime_type"),
                    user_prompt: row.get("user_prompt"),
                    analysis_result: serde_json::from_str(&raw)
                        .unwrap_or(serde_json::Value::String(raw)),
                    analyzed_at: row.get("analyzed_at"),
                }
            })
            .collect();

        Ok(Paginated {
            items,
            pagination: Pagination::new(page, total),
        })
    }

    /// Append to the audit trail; failures are logged, never surfaced
    async fn record_analysis(
        &self,
        account_id: &str,
        original_name: &str,
        file_size: i64,
        mime_type: &str,
        user_prompt: &str,
        analysis: &ImageAnalysis,
    ) {
        let result = match serde_json::to_string(analysis) {
            Ok(json) => sqlx::query(
                "INSERT INTO analyzed_image (id, account_id, original_name, file_size, mime_type, user_prompt, analysis_result, analyzed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(account_id)
            .bind(original_name)
            .bind(file_size)
            .bind(mime_type)
            .bind(user_prompt)
            .bind(json)
            .bind(Utc::now())
            .execute(&self.db)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        if let Err(e) = result {
            tracing::warn!(account = %account_id, "Failed to record image analysis: {}", e);
        }
    }
}

fn parse_summary_length(value: Option<&str>) -> ApiResult<SummaryLength> {
    match value.map(str::trim) {
        None | Some("") | Some("medium") => Ok(SummaryLength::Medium),
        Some("short") => Ok(SummaryLength::Short),
        Some("long") => Ok(SummaryLength::Long),
        Some(_) => Err(ApiError::Validation(
            "Invalid summary length. Use short, medium or long".to_string(),
        )),
    }
}

fn parse_image_analysis(raw: &str) -> ImageAnalysis {
    let cleaned = strip_code_fence(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    match serde_json::from_str::<serde_json::Value>(&cleaned) {
        Ok(value @ serde_json::Value::Object(_)) => {
            match serde_json::from_value::<StructuredAnalysis>(value) {
                Ok(structured) => ImageAnalysis::Structured(structured),
                Err(_) => ImageAnalysis::Raw { raw_text: cleaned },
            }
        }
        _ => ImageAnalysis::Raw { raw_text: cleaned },
    }
}

/// Remove a surrounding markdown code fence, with or without a `json` tag
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}
