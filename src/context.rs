/// Application context and dependency injection
use crate::{
    account::AccountManager,
    ai::{AiProvider, AiService, GeminiClient},
    bookmarks::BookmarkService,
    config::ServerConfig,
    db,
    error::{ApiError, ApiResult},
    media_store::{MediaStore, MediaStoreConfig},
    notes::NoteStore,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub note_store: Arc<NoteStore>,
    pub bookmark_service: Arc<BookmarkService>,
    pub media_store: Arc<MediaStore>,
    pub ai_service: Arc<AiService>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        if config.ai.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; AI endpoints will report the service as unavailable");
        }
        let provider: Arc<dyn AiProvider> = Arc::new(GeminiClient::from_config(&config.ai));

        Ok(Self::from_parts(config, db, provider))
    }

    /// Wire services over an existing pool and AI provider
    pub fn from_parts(config: ServerConfig, db: SqlitePool, provider: Arc<dyn AiProvider>) -> Self {
        let config = Arc::new(config);

        let media_store = Arc::new(MediaStore::new(MediaStoreConfig {
            location: config.storage.media_directory.clone(),
            url_prefix: config.storage.media_url_prefix.clone(),
            max_size: config.storage.max_upload_bytes,
        }));
        let note_store = Arc::new(NoteStore::new(db.clone(), media_store.clone()));
        let bookmark_service = Arc::new(BookmarkService::new(db.clone(), note_store.clone()));
        let account_manager = Arc::new(AccountManager::new(
            db.clone(),
            config.clone(),
            note_store.clone(),
            bookmark_service.clone(),
        ));
        let ai_service = Arc::new(AiService::new(
            provider,
            db.clone(),
            config.storage.max_upload_bytes,
        ));

        Self {
            config,
            db,
            account_manager,
            note_store,
            bookmark_service,
            media_store,
            ai_service,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ApiResult<()> {
        for dir in [&config.storage.data_directory, &config.storage.media_directory] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                ApiError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }
        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> &str {
        &self.config.service.public_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_creates_directories_and_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::for_tests(dir.path());

        let ctx = AppContext::new(config).await.unwrap();

        assert!(ctx.config.storage.media_directory.exists());
        assert!(ctx.config.storage.database.exists());
        assert_eq!(ctx.service_url(), "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::for_tests(dir.path());
        config.authentication.jwt_secret = "short".to_string();

        assert!(AppContext::new(config).await.is_err());
    }
}
