/// AI request and response models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Requested summary length
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryLength::Short => "short",
            SummaryLength::Medium => "medium",
            SummaryLength::Long => "long",
        }
    }
}

/// Summarize request body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummarizeRequest {
    pub text: Option<String>,
    pub summary_length: Option<String>,
}

/// Summary produced by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(default)]
    pub original_length: usize,
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub summary_length: String,
}

/// Structured image description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuredAnalysis {
    pub description: String,
    pub detailed_analysis: String,
    pub objects: Vec<String>,
    pub colors: Vec<String>,
    pub text_in_image: String,
    pub mood: String,
    pub technical_notes: String,
}

/// Image analysis; falls back to the raw model text when it is not JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageAnalysis {
    Structured(StructuredAnalysis),
    Raw {
        #[serde(rename = "rawText")]
        raw_text: String,
    },
}

/// Persisted record of one image analysis
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub original_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub user_prompt: String,
    pub analysis_result: serde_json::Value,
    pub analyzed_at: DateTime<Utc>,
}
