//! User directory: account rows and revoked session ids behind one seam.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{User, UserRow};

const EMAIL_TAKEN: &str = "User already registered";

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fails with `Validation` when the email is already registered.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError>;

    async fn create_anonymous(&self) -> Result<User, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, AppError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), AppError>;

    async fn is_token_revoked(&self, jti: &str) -> Result<bool, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(
        &self,
        email: Option<&str>,
        password_hash: Option<&str>,
        is_anonymous: bool,
    ) -> Result<User, AppError> {
        let result = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, password_hash, is_anonymous)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, is_anonymous, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(is_anonymous)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23505") => {
                Err(AppError::Validation(EMAIL_TAKEN.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        self.insert(Some(email), Some(password_hash), false).await
    }

    async fn create_anonymous(&self) -> Result<User, AppError> {
        self.insert(None, None, true).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, is_anonymous, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, is_anonymous, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), AppError> {
        // Expired revocations are dead weight; prune them on the way in.
        sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "INSERT INTO revoked_tokens (jti, expires_at) VALUES ($1, $2) ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_token_revoked(&self, jti: &str) -> Result<bool, AppError> {
        let revoked: Option<(String,)> =
            sqlx::query_as("SELECT jti FROM revoked_tokens WHERE jti = $1")
                .bind(jti)
                .fetch_optional(&self.pool)
                .await?;
        Ok(revoked.is_some())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<Uuid, UserRow>>,
    revoked: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email.as_deref() == Some(email)) {
            return Err(AppError::Validation(EMAIL_TAKEN.to_string()));
        }
        let row = UserRow {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            password_hash: Some(password_hash.to_string()),
            is_anonymous: false,
            created_at: Utc::now(),
        };
        users.insert(row.id, row.clone());
        Ok(row.into())
    }

    async fn create_anonymous(&self) -> Result<User, AppError> {
        let row = UserRow {
            id: Uuid::new_v4(),
            email: None,
            password_hash: None,
            is_anonymous: true,
            created_at: Utc::now(),
        };
        self.users.write().await.insert(row.id, row.clone());
        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, AppError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).cloned().map(User::from))
    }

    async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), AppError> {
        let mut revoked = self.revoked.write().await;
        let now = Utc::now();
        revoked.retain(|_, exp| *exp >= now);
        revoked.insert(jti.to_string(), expires_at);
        Ok(())
    }

    async fn is_token_revoked(&self, jti: &str) -> Result<bool, AppError> {
        Ok(self.revoked.read().await.contains_key(jti))
    }
}
