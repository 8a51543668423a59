/// AI assistance: text summarization and image analysis through an external model
///
/// The provider is injected at startup and shared read-only by every request.

mod gemini;
pub mod models;
mod prompts;
mod service;

pub use gemini::GeminiClient;
pub use models::*;
pub use service::{strip_code_fence, AiService};

use crate::error::ApiError;
use async_trait::async_trait;

/// Image passed inline with a prompt
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI service is not configured")]
    NotConfigured,
    #[error("AI request failed: {0}")]
    RequestFailed(String),
    #[error("AI request timed out")]
    Timeout,
    #[error("AI response could not be read: {0}")]
    ParseError(String),
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

/// Text generation backend
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Generate a text answer for a prompt, optionally about an image
    async fn generate(&self, prompt: &str, image: Option<InlineImage>) -> Result<String, AiError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
