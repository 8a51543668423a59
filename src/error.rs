/// Unified error types for the notekeeper API
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Main error type for the API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or invalid credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Malformed or out-of-range input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Several fields failed validation at once (registration)
    #[error("Validation failed for {} field(s)", .0.len())]
    InvalidFields(Vec<FieldError>),

    /// Resource absent or owned by someone else
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violations (duplicate bookmark, taken email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// AI service failures or unparsable AI answers
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Media storage errors
    #[error("Media storage error: {0}")]
    MediaStorage(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(String),
}

impl ApiError {
    /// Map a unique-constraint violation to `Conflict`, pass everything else through
    pub fn from_unique_violation(err: sqlx::Error, message: &str) -> Self {
        let unique = matches!(&err, sqlx::Error::Database(db_err) if db_err.is_unique_violation());
        if unique {
            ApiError::Conflict(message.to_string())
        } else {
            ApiError::Database(err)
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Authentication(_) | ApiError::Jwt(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) | ApiError::InvalidFields(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database(_)
            | ApiError::Internal(_)
            | ApiError::Io(_)
            | ApiError::MediaStorage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error envelope returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, errors) = match self {
            ApiError::InvalidFields(fields) => ("Validation failed".to_string(), Some(fields)),
            ApiError::Database(e) => {
                tracing::error!(error = %e, "database failure");
                ("Internal server error".to_string(), None) // Don't leak details
            }
            ApiError::Io(e) => {
                tracing::error!(error = %e, "io failure");
                ("Internal server error".to_string(), None)
            }
            ApiError::Internal(e) | ApiError::MediaStorage(e) => {
                tracing::error!(error = %e, "internal failure");
                ("Internal server error".to_string(), None)
            }
            ApiError::Upstream(e) => {
                tracing::warn!(error = %e, "AI service failure");
                (format!("Upstream error: {}", e), None)
            }
            other => (other.to_string(), None),
        };

        let body = Json(ErrorEnvelope {
            success: false,
            message,
            errors,
        });

        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Authentication("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Upstream("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_non_unique_error_passes_through() {
        let err = ApiError::from_unique_violation(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(err, ApiError::Database(sqlx::Error::RowNotFound)));
    }

    #[tokio::test]
    async fn test_internal_details_not_leaked() {
        let response = ApiError::Internal("secret path /var/db".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert!(!body.success);
        assert_eq!(body.message, "Internal server error");
    }

    #[tokio::test]
    async fn test_invalid_fields_envelope() {
        let response = ApiError::InvalidFields(vec![FieldError {
            field: "email".into(),
            message: "Invalid email".into(),
        }])
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.errors.unwrap()[0].field, "email");
    }
}
