/// Account manager implementation using runtime queries
use crate::{
    account::{
        field_errors, normalize_email, AuthResponse, LoginRequest, RegisterRequest,
        UpdateProfileRequest, ValidatedSession,
    },
    bookmarks::BookmarkService,
    config::ServerConfig,
    db::account::Account,
    error::{ApiError, ApiResult},
    notes::NoteStore,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Access token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

const ACCOUNT_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, created_at, updated_at";

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
    notes: Arc<NoteStore>,
    bookmarks: Arc<BookmarkService>,
}

impl AccountManager {
    pub fn new(
        db: SqlitePool,
        config: Arc<ServerConfig>,
        notes: Arc<NoteStore>,
        bookmarks: Arc<BookmarkService>,
    ) -> Self {
        Self {
            db,
            config,
            notes,
            bookmarks,
        }
    }

    /// Register a new account; every invalid field is reported at once
    pub async fn register(&self, request: RegisterRequest) -> ApiResult<AuthResponse> {
        let request = request.normalized();
        request
            .validate()
            .map_err(|e| ApiError::InvalidFields(field_errors(&e)))?;

        if self.email_exists(&request.email, None).await? {
            return Err(ApiError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password)?;
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4().to_string(),
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            password_hash,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO account (id, first_name, last_name, email, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&account.id)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.db)
        .await
        .map_err(|e| {
            ApiError::from_unique_violation(e, "An account with this email already exists")
        })?;

        tracing::info!(account = %account.id, "Registered account");

        let token = self.generate_access_token(&account)?;
        Ok(AuthResponse {
            user: account.into(),
            token,
        })
    }

    /// Authenticate with email and password
    ///
    /// An unknown email and a wrong password fail identically.
    pub async fn login(&self, request: LoginRequest) -> ApiResult<AuthResponse> {
        let request = LoginRequest {
            email: normalize_email(&request.email),
            password: request.password,
        };
        request
            .validate()
            .map_err(|e| ApiError::InvalidFields(field_errors(&e)))?;

        let invalid = || ApiError::Authentication("Email or password is incorrect".to_string());

        let account = self
            .find_by_email(&request.email)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&request.password, &account.password_hash)? {
            return Err(invalid());
        }

        let token = self.generate_access_token(&account)?;
        Ok(AuthResponse {
            user: account.into(),
            token,
        })
    }

    /// Get account by id
    pub async fn get_account(&self, account_id: &str) -> ApiResult<Account> {
        let sql = format!("SELECT {} FROM account WHERE id = ?1", ACCOUNT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(account_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

        Ok(account_from_row(&row))
    }

    /// Update name and email; blank or omitted fields keep their value
    pub async fn update_profile(
        &self,
        account_id: &str,
        request: UpdateProfileRequest,
    ) -> ApiResult<Account> {
        let request = request.normalized();
        request
            .validate()
            .map_err(|e| ApiError::InvalidFields(field_errors(&e)))?;

        let mut account = self.get_account(account_id).await?;

        if let Some(email) = &request.email {
            if self.email_exists(email, Some(account_id)).await? {
                return Err(ApiError::Conflict(
                    "This email is already used by another account".to_string(),
                ));
            }
        }

        if let Some(first_name) = request.first_name {
            account.first_name = first_name;
        }
        if let Some(last_name) = request.last_name {
            account.last_name = last_name;
        }
        if let Some(email) = request.email {
            account.email = email;
        }
        account.updated_at = Utc::now();

        sqlx::query(
            "UPDATE account SET first_name = ?1, last_name = ?2, email = ?3, updated_at = ?4 WHERE id = ?5",
        )
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.email)
        .bind(account.updated_at)
        .bind(&account.id)
        .execute(&self.db)
        .await
        .map_err(|e| {
            ApiError::from_unique_violation(e, "This email is already used by another account")
        })?;

        Ok(account)
    }

    /// Delete an account with its notes, their media and its bookmarks
    ///
    /// Steps run in order without a spanning transaction; a failure part way
    /// leaves earlier deletions in place.
    pub async fn delete_account(&self, account_id: &str) -> ApiResult<()> {
        let account = self.get_account(account_id).await?;

        let notes = self.notes.delete_all_for_owner(&account.id).await?;
        let bookmarks = self.bookmarks.delete_all_for_account(&account.id).await?;

        sqlx::query("DELETE FROM account WHERE id = ?1")
            .bind(&account.id)
            .execute(&self.db)
            .await?;

        tracing::info!(
            account = %account.id,
            notes,
            bookmarks,
            "Deleted account"
        );

        Ok(())
    }

    /// Issue a signed access token for an account
    pub fn generate_access_token(&self, account: &Account) -> ApiResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: account.id.clone(),
            email: account.email.clone(),
            iat: now,
            exp: now + self.config.authentication.token_ttl_secs,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Jwt(format!("Failed to generate token: {}", e)))
    }

    /// Verify a token and confirm its account still exists
    pub async fn validate_access_token(&self, token: &str) -> ApiResult<ValidatedSession> {
        let claims = crate::auth::verify_jwt_token(token, &self.config.authentication.jwt_secret)?;

        let account = self.get_account(&claims.sub).await.map_err(|e| match e {
            ApiError::NotFound(_) => {
                ApiError::Authentication("Account no longer exists".to_string())
            }
            other => other,
        })?;

        Ok(ValidatedSession {
            account_id: account.id,
            email: account.email,
        })
    }

    async fn find_by_email(&self, email: &str) -> ApiResult<Option<Account>> {
        let sql = format!("SELECT {} FROM account WHERE email = ?1", ACCOUNT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.as_ref().map(account_from_row))
    }

    async fn email_exists(&self, email: &str, except_id: Option<&str>) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM account WHERE email = ?1 AND id <> COALESCE(?2, '')",
        )
        .bind(email)
        .bind(except_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count > 0)
    }
}

fn account_from_row(row: &SqliteRow) -> Account {
    Account {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Hash a password with Argon2id
fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> ApiResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(format!("Stored password hash is invalid: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::media_store::{MediaStore, MediaStoreConfig};
    use crate::notes::{CreateNoteRequest, NoteImage};
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        pool: SqlitePool,
        media: Arc<MediaStore>,
        notes: Arc<NoteStore>,
        bookmarks: Arc<BookmarkService>,
        manager: AccountManager,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(ServerConfig::for_tests(dir.path()));
        let pool = test_pool().await;
        let media = Arc::new(MediaStore::new(MediaStoreConfig {
            location: config.storage.media_directory.clone(),
            ..Default::default()
        }));
        let notes = Arc::new(NoteStore::new(pool.clone(), media.clone()));
        let bookmarks = Arc::new(BookmarkService::new(pool.clone(), notes.clone()));
        let manager = AccountManager::new(pool.clone(), config, notes.clone(), bookmarks.clone());
        Fixture {
            dir,
            pool,
            media,
            notes,
            bookmarks,
            manager,
        }
    }

    fn registration(email: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let f = fixture().await;

        let registered = f.manager.register(registration("Ada@Example.com")).await.unwrap();
        assert_eq!(registered.user.email, "ada@example.com");
        assert!(!registered.token.is_empty());

        let session = f.manager.validate_access_token(&registered.token).await.unwrap();
        assert_eq!(session.account_id, registered.user.id);

        let logged_in = f
            .manager
            .login(LoginRequest {
                email: "ADA@example.com ".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);

        let stored: String = sqlx::query_scalar("SELECT password_hash FROM account")
            .fetch_one(&f.pool)
            .await
            .unwrap();
        assert!(stored.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_reports_all_fields() {
        let f = fixture().await;

        let result = f
            .manager
            .register(RegisterRequest {
                first_name: "A".into(),
                last_name: "B".into(),
                email: "nope".into(),
                password: "123".into(),
                confirm_password: "321".into(),
            })
            .await;

        match result {
            Err(ApiError::InvalidFields(errors)) => assert_eq!(errors.len(), 5),
            other => panic!("expected field errors, got {:?}", other.map(|r| r.user)),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let f = fixture().await;
        f.manager.register(registration("ada@example.com")).await.unwrap();

        let result = f.manager.register(registration("ADA@example.com")).await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let f = fixture().await;
        f.manager.register(registration("ada@example.com")).await.unwrap();

        let wrong_password = f
            .manager
            .login(LoginRequest {
                email: "ada@example.com".into(),
                password: "wrong-one".into(),
            })
            .await
            .unwrap_err();
        let unknown_email = f
            .manager
            .login(LoginRequest {
                email: "who@example.com".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, ApiError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let f = fixture().await;
        let ada = f.manager.register(registration("ada@example.com")).await.unwrap();
        f.manager.register(registration("taken@example.com")).await.unwrap();

        let updated = f
            .manager
            .update_profile(
                &ada.user.id,
                UpdateProfileRequest {
                    first_name: Some("Augusta".into()),
                    last_name: Some("".into()),
                    email: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Augusta");
        assert_eq!(updated.last_name, "Lovelace");
        assert_eq!(updated.email, "ada@example.com");

        // Keeping one's own email is not a conflict
        f.manager
            .update_profile(
                &ada.user.id,
                UpdateProfileRequest {
                    email: Some("ada@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result = f
            .manager
            .update_profile(
                &ada.user.id,
                UpdateProfileRequest {
                    email: Some("Taken@example.com".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_tampered_and_expired_tokens_rejected() {
        let f = fixture().await;
        let ada = f.manager.register(registration("ada@example.com")).await.unwrap();

        let mut tampered = ada.token.clone();
        tampered.push('x');
        assert!(matches!(
            f.manager.validate_access_token(&tampered).await,
            Err(ApiError::Authentication(_))
        ));

        let now = Utc::now().timestamp();
        let expired = encode(
            &Header::default(),
            &Claims {
                sub: ada.user.id.clone(),
                email: ada.user.email.clone(),
                iat: now - 7200,
                exp: now - 3600,
            },
            &EncodingKey::from_secret(b"test-secret-that-is-at-least-32-characters"),
        )
        .unwrap();
        assert!(matches!(
            f.manager.validate_access_token(&expired).await,
            Err(ApiError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_account_cascades() {
        let f = fixture().await;
        let ada = f.manager.register(registration("ada@example.com")).await.unwrap();
        let alan = f.manager.register(registration("alan@example.com")).await.unwrap();

        let stored = f
            .media
            .store(b"bytes".to_vec(), "image/heic", "pic.heic")
            .await
            .unwrap();
        let key = stored.file_name.clone();

        let ada_note = f
            .notes
            .create(
                &ada.user.id,
                CreateNoteRequest {
                    title: Some("Ada's".into()),
                    images: Some(vec![NoteImage::from_stored(stored, None)]),
                    is_public: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let alan_note = f
            .notes
            .create(
                &alan.user.id,
                CreateNoteRequest {
                    title: Some("Alan's".into()),
                    is_public: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        f.bookmarks.toggle_bookmark(&ada.user.id, &alan_note.id).await.unwrap();
        f.bookmarks.toggle_bookmark(&alan.user.id, &ada_note.id).await.unwrap();

        f.manager.delete_account(&ada.user.id).await.unwrap();

        assert!(matches!(
            f.manager.get_account(&ada.user.id).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(!f.media.exists(&key).await.unwrap());
        assert!(f.notes.get_by_id(&alan.user.id, &alan_note.id).await.is_ok());

        let remaining: Vec<String> = sqlx::query_scalar("SELECT account_id FROM bookmark")
            .fetch_all(&f.pool)
            .await
            .unwrap();
        assert_eq!(remaining, vec![alan.user.id.clone()]);

        // The token of a deleted account no longer authenticates
        assert!(matches!(
            f.manager.validate_access_token(&ada.token).await,
            Err(ApiError::Authentication(_))
        ));

        drop(f.dir);
    }
}
