/// Configuration management for notekeeper
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub ai: AiConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
    /// Base URL used when building absolute links (defaults to http://hostname:port)
    pub public_url: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    /// Directory holding uploaded images
    pub media_directory: PathBuf,
    /// URL prefix under which `media_directory` is served
    pub media_url_prefix: String,
    pub max_upload_bytes: usize,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub token_ttl_secs: i64,
}

/// Generative AI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// API key; the AI endpoints answer with an upstream error when absent
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origin, `*` for any
    pub origin: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("NOTES_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port: u16 = env::var("NOTES_PORT")
            .or_else(|_| env::var("PORT"))
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;
        let version = env::var("NOTES_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());
        let public_url = env::var("NOTES_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", hostname, port));

        let data_directory: PathBuf = env::var("NOTES_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("NOTES_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("notes.sqlite"));
        let media_directory = env::var("NOTES_MEDIA_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads/images"));
        let media_url_prefix = env::var("NOTES_MEDIA_URL_PREFIX")
            .unwrap_or_else(|_| "/uploads/images".to_string())
            .trim_end_matches('/')
            .to_string();
        let max_upload_bytes = env::var("NOTES_MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| "5242880".to_string())
            .parse()
            .unwrap_or(5 * 1024 * 1024);

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| ApiError::Validation("JWT secret required".to_string()))?;
        let token_ttl_secs = env::var("JWT_EXPIRE_SECS")
            .unwrap_or_else(|_| "604800".to_string())
            .parse()
            .unwrap_or(7 * 24 * 3600);

        let api_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty());
        let ai_base_url = env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string());
        let ai_model = env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());
        let ai_timeout_secs = env::var("GEMINI_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);

        let cors_origin = env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string());
        let log_level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "notekeeper=debug,tower_http=debug".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
                public_url,
            },
            storage: StorageConfig {
                data_directory,
                database,
                media_directory,
                media_url_prefix,
                max_upload_bytes,
            },
            authentication: AuthConfig {
                jwt_secret,
                token_ttl_secs,
            },
            ai: AiConfig {
                api_key,
                base_url: ai_base_url,
                model: ai_model,
                timeout_secs: ai_timeout_secs,
            },
            cors: CorsConfig {
                origin: cors_origin,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(ApiError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.token_ttl_secs <= 0 {
            return Err(ApiError::Validation(
                "Token lifetime must be positive".to_string(),
            ));
        }

        if self.storage.max_upload_bytes == 0 {
            return Err(ApiError::Validation(
                "Upload limit must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Configuration for tests: temp directories, no AI key
    #[cfg(test)]
    pub fn for_tests(root: &std::path::Path) -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 3000,
                version: "test".to_string(),
                public_url: "http://localhost:3000".to_string(),
            },
            storage: StorageConfig {
                data_directory: root.to_path_buf(),
                database: root.join("notes.sqlite"),
                media_directory: root.join("images"),
                media_url_prefix: "/uploads/images".to_string(),
                max_upload_bytes: 5 * 1024 * 1024,
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-that-is-at-least-32-characters".to_string(),
                token_ttl_secs: 3600,
            },
            ai: AiConfig {
                api_key: None,
                base_url: "http://127.0.0.1:9".to_string(),
                model: "test-model".to_string(),
                timeout_secs: 1,
            },
            cors: CorsConfig {
                origin: "*".to_string(),
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_secret_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::for_tests(dir.path());
        config.authentication.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_test_config_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ServerConfig::for_tests(dir.path()).validate().is_ok());
    }
}
