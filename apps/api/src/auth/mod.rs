//! Identity: accounts, session tokens, and the auth state broadcast.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::User;
use crate::state::AppState;

pub mod directory;
pub mod events;
pub mod handlers;
pub mod password;
pub mod tokens;

use directory::UserDirectory;
use events::{AuthEvent, AuthEvents};
use password::{hash_password, verify_password};
use tokens::TokenIssuer;

pub const MIN_PASSWORD_LEN: usize = 6;
const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_TOKEN: &str = "Invalid or expired token";

/// A signed-in user plus the opaque token that identifies the session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// The identity collaborator: sign up, sign in (password or anonymous),
/// resolve a token to a user, sign out.
#[derive(Clone)]
pub struct Identity {
    directory: Arc<dyn UserDirectory>,
    tokens: TokenIssuer,
    events: AuthEvents,
}

impl Identity {
    pub fn new(directory: Arc<dyn UserDirectory>, tokens: TokenIssuer, events: AuthEvents) -> Self {
        Self {
            directory,
            tokens,
            events,
        }
    }

    #[cfg(test)]
    pub fn events(&self) -> &AuthEvents {
        &self.events
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password = password.to_string();
        let hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))?;

        let user = self.directory.create_user(&email, &hash).await?;
        self.start_session(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = normalize_email(email)?;
        let row = self
            .directory
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;
        let hash = row
            .password_hash
            .clone()
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .map_err(|e| AppError::Internal(anyhow::anyhow!("stored hash unreadable: {e}")))?;
        if !matches {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        self.start_session(row.into())
    }

    pub async fn sign_in_anonymous(&self) -> Result<Session, AppError> {
        let user = self.directory.create_anonymous().await?;
        self.start_session(user)
    }

    /// Resolves a bearer token to its user: valid signature, not expired,
    /// not revoked, and the account still exists.
    pub async fn authenticate(&self, token: &str) -> Result<User, AppError> {
        let claims = self
            .tokens
            .validate(token)
            .map_err(|_| AppError::Unauthorized(INVALID_TOKEN.to_string()))?;
        if self.directory.is_token_revoked(&claims.jti).await? {
            return Err(AppError::Unauthorized(INVALID_TOKEN.to_string()));
        }
        self.directory
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_TOKEN.to_string()))
    }

    /// Revokes `token` if it is still valid. Signing out with a dead token is a no-op.
    pub async fn sign_out(&self, token: &str) -> Result<(), AppError> {
        let Ok(claims) = self.tokens.validate(token) else {
            return Ok(());
        };
        self.directory
            .revoke_token(&claims.jti, claims.expires_at())
            .await?;
        self.events
            .publish(AuthEvent::SignedOut { user_id: claims.sub });
        Ok(())
    }

    fn start_session(&self, user: User) -> Result<Session, AppError> {
        let token = self
            .tokens
            .issue(user.id)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token signing failed: {e}")))?;
        self.events.publish(AuthEvent::SignedIn { user: user.clone() });
        Ok(Session { user, token })
    }
}

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AppError::Validation("A valid email address is required".to_string())),
    }
}

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authenticated user extracted from a Bearer token.
///
/// Use as a handler parameter on every owner-scoped route.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = state.identity()?;
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Access token required".to_string()))?;
        let user = identity.authenticate(token).await?;
        Ok(AuthUser { user })
    }
}
